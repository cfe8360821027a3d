//! Loading of threshold configuration files.
//!
//! Three JSON shapes are accepted:
//!
//! ```json
//! { "global": { "lines": 80 }, "./src/api/": { "statements": -10 } }
//! { "coverageThreshold": { "global": { "lines": 80 } } }
//! { "name": "my-package", "jest": { "coverageThreshold": { "global": { "lines": 80 } } } }
//! ```
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{CovgateError, Result};
use crate::threshold::{validate, Thresholds};

#[derive(Deserialize)]
#[serde(untagged)]
enum ThresholdFile {
    Wrapped {
        #[serde(rename = "coverageThreshold")]
        coverage_threshold: Thresholds,
    },
    PackageJson {
        jest: JestSection,
    },
    Bare(Thresholds),
}

#[derive(Deserialize)]
struct JestSection {
    #[serde(rename = "coverageThreshold")]
    coverage_threshold: Thresholds,
}

/// Parse and validate thresholds from JSON text.
pub fn parse_thresholds(input: &str) -> Result<Thresholds> {
    let file: ThresholdFile = serde_json::from_str(input).map_err(|e| {
        CovgateError::Config(format!(
            "expected a map of group → thresholds, a `coverageThreshold` object, \
             or a package.json with `jest.coverageThreshold` ({e})"
        ))
    })?;

    let thresholds = match file {
        ThresholdFile::Wrapped { coverage_threshold } => coverage_threshold,
        ThresholdFile::PackageJson { jest } => jest.coverage_threshold,
        ThresholdFile::Bare(thresholds) => thresholds,
    };
    validate(&thresholds)?;
    Ok(thresholds)
}

/// Read, parse and validate a threshold file.
pub fn load_thresholds(path: &Path) -> Result<Thresholds> {
    let content = std::fs::read_to_string(path).map_err(|source| CovgateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let thresholds = parse_thresholds(&content)?;
    debug!(path = %path.display(), groups = thresholds.len(), "loaded thresholds");
    Ok(thresholds)
}
