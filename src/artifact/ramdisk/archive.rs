//! newc cpio archive, gzip-compressed.
//!
//! Equivalent to `cd root && find . | cpio -o -H newc -R 0:0 | gzip -9`, with
//! the file list built in-process so the order is stable across runs.

use anyhow::{Context, Result};
use std::path::Path;
use walkdir::WalkDir;

use crate::common::{is_nonempty_file, write_file_with_dirs};
use crate::config::BuildConfig;
use crate::error::{tool_failure, PipelineError, Stage};
use crate::process::Cmd;

/// Paths of every entry under `root`, relative to it, parents first.
///
/// The root itself is listed as `.` so its mode ends up in the archive.
pub fn list_entries(root: &Path) -> Result<Vec<String>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        let rel = entry
            .path()
            .strip_prefix(root)
            .with_context(|| format!("{} escaped {}", entry.path().display(), root.display()))?;
        if rel.as_os_str().is_empty() {
            entries.push(".".to_string());
        } else {
            entries.push(rel.to_string_lossy().into_owned());
        }
    }
    Ok(entries)
}

/// Archive `root` into `output`.
pub fn write_archive(config: &BuildConfig, root: &Path, output: &Path) -> Result<()> {
    let entries = list_entries(root)?;
    println!("  Archiving {} entries into {}", entries.len(), output.display());

    let mut list = entries.join("\n");
    list.push('\n');

    let cpio = Cmd::new(&config.tools.cpio)
        .args(["-o", "-H", "newc", "-R", "0:0"])
        .dir(root)
        .stdin_bytes(list)
        .timeout(config.tool_timeout)
        .error_msg(format!("cpio failed to archive {}", root.display()))
        .run()
        .map_err(tool_failure(Stage::Ramdisk, "cpio"))?;

    let gzip = Cmd::new(&config.tools.gzip)
        .args(["-9", "-c"])
        .stdin_bytes(cpio.raw_stdout)
        .timeout(config.tool_timeout)
        .error_msg(format!("gzip failed to compress {}", output.display()))
        .run()
        .map_err(tool_failure(Stage::Ramdisk, "gzip"))?;

    write_file_with_dirs(output, &gzip.raw_stdout)?;
    if !is_nonempty_file(output) {
        return Err(PipelineError::not_found("ramdisk archive", output).into());
    }
    Ok(())
}
