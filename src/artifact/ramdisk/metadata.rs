//! `modules.softdep` and `modules.alias`.
//!
//! Both are derived per module from `modinfo -F <field>`. A module with no
//! declared soft dependencies or aliases contributes no line at all.

use anyhow::Result;
use std::path::Path;

use super::depgen::module_files;
use crate::common::write_file_with_dirs;
use crate::config::BuildConfig;
use crate::error::{tool_failure, Stage};
use crate::process::Cmd;

/// Kernel module name for a `.ko` file: stem with `-` replaced by `_`.
pub fn module_name(file_name: &str) -> String {
    file_name
        .strip_suffix(".ko")
        .unwrap_or(file_name)
        .replace('-', "_")
}

/// `softdep <module> <deps>` for each non-empty line of `modinfo -F softdep`.
pub fn softdep_lines(module: &str, output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| format!("softdep {} {}", module, line))
        .collect()
}

/// `alias <alias> <module>` for each non-empty line of `modinfo -F alias`.
pub fn alias_lines(module: &str, output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|alias| format!("alias {} {}", alias, module))
        .collect()
}

/// Write `modules.softdep` and `modules.alias` for the modules in `dir`.
///
/// Returns the number of softdep and alias lines written.
pub fn write_softdep_and_alias(config: &BuildConfig, dir: &Path) -> Result<(usize, usize)> {
    let mut softdeps = Vec::new();
    let mut aliases = Vec::new();

    for file in module_files(dir)? {
        let path = dir.join(&file);
        if !path.exists() {
            log::debug!("{} disappeared, skipping", path.display());
            continue;
        }
        let name = module_name(&file);
        softdeps.extend(softdep_lines(&name, &query(config, &path, "softdep")?));
        aliases.extend(alias_lines(&name, &query(config, &path, "alias")?));
    }

    write_file_with_dirs(dir.join("modules.softdep"), join_lines(&softdeps))?;
    write_file_with_dirs(dir.join("modules.alias"), join_lines(&aliases))?;
    Ok((softdeps.len(), aliases.len()))
}

fn query(config: &BuildConfig, module: &Path, field: &str) -> Result<String> {
    let result = Cmd::new(&config.tools.modinfo)
        .args(["-F", field])
        .arg_path(module)
        .timeout(config.tool_timeout)
        .error_msg(format!("modinfo -F {} {} failed", field, module.display()))
        .run()
        .map_err(tool_failure(Stage::Ramdisk, "modinfo"))?;
    Ok(result.stdout)
}

fn join_lines(lines: &[String]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        format!("{}\n", lines.join("\n"))
    }
}
