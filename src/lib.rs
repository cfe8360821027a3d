pub mod cli;
pub mod config;
pub mod error;
pub mod group;
pub mod istanbul;
pub mod matcher;
pub mod model;
pub mod report;
pub mod summarize;
pub mod threshold;
pub mod verdict;
