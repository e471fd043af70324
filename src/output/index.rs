// src/output/index.rs
use crate::error::{ErrorContext, Result};
use crate::types::ScanError;
use std::fs;
use std::path::Path;

/// Name of the output file with the given sequence index.
pub fn file_name(base_name: &str, extension: &str, index: u64) -> String {
    format!("{}-{}.{}", base_name, index, extension)
}

/// Extracts the sequence index from `<base_name>-<index>.<extension>`.
///
/// Returns `Ok(None)` for names that do not follow the pattern at all and
/// `MalformedIndex` for names that do but carry something other than a
/// canonical decimal number between the dash and the extension.
pub fn parse_index(file_name: &str, base_name: &str, extension: &str) -> Result<Option<u64>> {
    let prefix = format!("{}-", base_name);
    let suffix = format!(".{}", extension);

    if file_name.len() < prefix.len() + suffix.len() {
        return Ok(None);
    }
    let middle = match file_name
        .strip_prefix(prefix.as_str())
        .and_then(|rest| rest.strip_suffix(suffix.as_str()))
    {
        Some(middle) => middle,
        None => return Ok(None),
    };

    let malformed = || ScanError::MalformedIndex { file_name: file_name.to_string() };
    if !middle.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let index: u64 = middle.parse().map_err(|_| malformed())?;
    // "007" parses but would never be produced by file_name()
    if index.to_string() != middle {
        return Err(malformed());
    }

    Ok(Some(index))
}

/// Highest positive index among existing output files in `dir`, if any.
pub fn highest_index(dir: &Path, base_name: &str, extension: &str) -> Result<Option<u64>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to list output directory {}", dir.display()))?;

    let mut highest = 0;
    for entry in entries {
        let entry = entry
            .with_context(|| format!("failed to list output directory {}", dir.display()))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(index) = parse_index(name, base_name, extension)? {
            highest = highest.max(index);
        }
    }

    Ok((highest > 0).then_some(highest))
}

/// Highest existing index, or 1 when there is no prior output.
pub fn last_index(dir: &Path, base_name: &str, extension: &str) -> Result<u64> {
    Ok(highest_index(dir, base_name, extension)?.unwrap_or(1))
}

/// First index a new run writes to. Prior output is never reopened.
pub fn next_start_index(dir: &Path, base_name: &str, extension: &str) -> Result<u64> {
    match highest_index(dir, base_name, extension)? {
        Some(highest) => highest.checked_add(1).ok_or_else(|| ScanError::MalformedIndex {
            file_name: file_name(base_name, extension, highest),
        }),
        None => Ok(1),
    }
}
