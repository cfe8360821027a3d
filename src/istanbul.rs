//! Reader for Istanbul / NYC `coverage-final.json`.
//!
//! Reference: https://github.com/istanbuljs/istanbuljs
//!
//! The format is a JSON object keyed by file path. Each value contains:
//!   - `statementMap`: `{ "0": { "start": { "line": 1, "column": 0 }, "end": { ... } }, ... }`
//!   - `s`:            `{ "0": 5, "1": 0, ... }`  hit counts per statement
//!   - `branchMap`:    branch site locations (not needed for summaries)
//!   - `b`:            `{ "0": [5, 0], ... }`  hit counts per branch arm
//!   - `fnMap`:        function locations (not needed for summaries)
//!   - `f`:            `{ "0": 3, ... }`  hit counts per function

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::{CovgateError, Result};
use crate::model::{CoverageMap, FileCoverageData};

/// Parse Istanbul JSON from raw bytes.
pub fn parse(input: &[u8]) -> Result<CoverageMap> {
    parse_reader(&mut &*input)
}

/// Read and parse an Istanbul JSON file from disk.
pub fn parse_file(path: &Path) -> Result<CoverageMap> {
    let content = std::fs::read(path).map_err(|source| CovgateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let map = parse(&content)?;
    debug!(path = %path.display(), files = map.len(), "parsed istanbul coverage");
    Ok(map)
}

/// Deserializes the top-level JSON object entry by entry using a serde
/// `MapAccess` visitor so only one file entry is held as a `Value` at a time.
fn parse_reader(reader: &mut dyn BufRead) -> Result<CoverageMap> {
    let buf = reader.fill_buf().map_err(|source| CovgateError::Io {
        path: "<input>".into(),
        source,
    })?;
    if buf.is_empty() || buf.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(CoverageMap::new());
    }

    let mut deser = serde_json::Deserializer::from_reader(reader);
    let map = serde::Deserializer::deserialize_map(&mut deser, IstanbulVisitor)?;
    deser.end()?;
    Ok(map)
}

/// Serde visitor that iterates over the top-level `{ path: entry }` map.
struct IstanbulVisitor;

impl<'de> serde::de::Visitor<'de> for IstanbulVisitor {
    type Value = CoverageMap;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("an Istanbul JSON object")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<CoverageMap, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut files = CoverageMap::new();
        while let Some(file_path) = map.next_key::<String>()? {
            let entry: Value = map.next_value()?;
            if !entry.is_object() {
                return Err(serde::de::Error::custom(format!(
                    "coverage entry for '{file_path}' is not an object"
                )));
            }
            let file = parse_file_entry(&file_path, &entry);
            files.insert(file.path.clone(), file);
        }
        Ok(files)
    }
}

/// Parse a single file entry. Missing sections are treated as empty.
fn parse_file_entry(file_path: &str, entry: &Value) -> FileCoverageData {
    // Istanbul repeats the path inside the entry; prefer it when present.
    let path = entry
        .get("path")
        .and_then(|p| p.as_str())
        .unwrap_or(file_path)
        .to_string();
    let mut file = FileCoverageData::new(path);

    if let Some(stmt_map) = entry.get("statementMap").and_then(|v| v.as_object()) {
        for (idx, loc) in stmt_map {
            let line = loc
                .get("start")
                .and_then(|s| s.get("line"))
                .and_then(|l| l.as_u64());
            if let Some(line) = line {
                file.statement_map.insert(idx.clone(), line as u32);
            }
        }
    }

    file.s = hit_map(entry.get("s"));
    file.f = hit_map(entry.get("f"));

    if let Some(b) = entry.get("b").and_then(|v| v.as_object()) {
        for (idx, arms) in b {
            let counts = arms
                .as_array()
                .map(|arr| arr.iter().map(hit_count).collect())
                .unwrap_or_default();
            file.b.insert(idx.clone(), counts);
        }
    }

    file
}

fn hit_map(value: Option<&Value>) -> BTreeMap<String, u64> {
    value
        .and_then(|v| v.as_object())
        .map(|obj| obj.iter().map(|(k, v)| (k.clone(), hit_count(v))).collect())
        .unwrap_or_default()
}

/// Hit counts are non-negative integers, but some tools emit floats.
fn hit_count(value: &Value) -> u64 {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
        .unwrap_or(0)
}
