//! Content validation for prerequisite files.
//!
//! Existence is what the pipeline requires; these checks catch files that
//! exist but cannot work (empty key, config with no entries).

use std::path::Path;

/// Validate the AVB key is a PEM private key. Returns its size in bytes.
pub fn validate_avb_key(path: &Path) -> Result<usize, String> {
    let content = std::fs::read_to_string(path).map_err(|e| format!("Cannot read: {}", e))?;

    if !content.contains("-----BEGIN") || !content.contains("PRIVATE KEY-----") {
        return Err("Not a PEM private key".to_string());
    }

    Ok(content.len())
}

/// Validate a `mkdtimg` config lists at least one device tree.
///
/// Entry lines name a file at column 0; indented lines are per-entry options.
pub fn validate_dt_config(path: &Path) -> Result<usize, String> {
    let content = std::fs::read_to_string(path).map_err(|e| format!("Cannot read: {}", e))?;

    let entries = content
        .lines()
        .filter(|line| {
            !line.trim().is_empty()
                && !line.trim_start().starts_with('#')
                && !line.starts_with(char::is_whitespace)
        })
        .count();

    if entries == 0 {
        return Err("No device tree entries".to_string());
    }

    Ok(entries)
}
