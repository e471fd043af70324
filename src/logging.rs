//! Logger setup.
//!
//! Every line is `<local time> <LEVEL>: <message>`, so the log file reads as
//! a plain append-only stream of `INFO:` / `ERROR:` entries.

use crate::error::{ErrorContext, Result};
use crate::types::ScanError;
use chrono::Local;
use env_logger::{Builder, Target};
use log::{Level, LevelFilter};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Sends all log output to `path`, opened in append mode.
pub fn init_file_logger(path: &Path, level: LevelFilter) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let mut builder = base_builder(level);
    builder.target(Target::Pipe(Box::new(file)));
    builder
        .try_init()
        .map_err(|e| ScanError::ConfigError(format!("Failed to initialize logger: {}", e)))
}

/// Stderr logger used until the configured log file is available.
pub fn init_stderr_logger(level: LevelFilter) -> Result<()> {
    let mut builder = base_builder(level);
    builder.target(Target::Stderr);
    builder
        .try_init()
        .map_err(|e| ScanError::ConfigError(format!("Failed to initialize logger: {}", e)))
}

fn base_builder(level: LevelFilter) -> Builder {
    let mut builder = Builder::from_default_env();
    builder.filter_level(level);
    builder.filter_module("reqwest", LevelFilter::Warn);
    builder.filter_module("hyper", LevelFilter::Warn);
    builder.filter_module("hyper_util", LevelFilter::Warn);
    builder.format(|buf, record| {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        writeln!(
            buf,
            "{}",
            format_entry(&timestamp, record.level(), &record.args().to_string())
        )
    });
    builder
}

pub fn format_entry(timestamp: &str, level: Level, message: &str) -> String {
    format!("{} {}: {}", timestamp, level, message)
}
