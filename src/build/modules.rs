//! Kernel module selection.
//!
//! `modules.order` lists every module the kernel build produced, one per line,
//! relative to the output tree. The selected entries are copied flat into
//! `dist/modules/` and stripped of debug info. Any failure is fatal: a vendor
//! ramdisk missing a driver is worse than no build.

use anyhow::{Context, Result};
use std::fs;

use super::{Artifact, ArtifactKind};
use crate::common::prepare_work_dir;
use crate::config::BuildConfig;
use crate::device::ModuleFilter;
use crate::error::{tool_failure, PipelineError, Stage};
use crate::process::Cmd;

/// Parse `modules.order` content into relative module paths.
///
/// Takes the first whitespace-separated field of each line, skips blanks and
/// `#` comments, rewrites `.o` entries (newer kbuild) to `.ko`, and keeps only
/// what `filter` selects.
pub fn parse_modules_order(content: &str, filter: ModuleFilter) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter(|field| !field.starts_with('#'))
        .map(|field| match field.strip_suffix(".o") {
            Some(stem) => format!("{}.ko", stem),
            None => field.to_string(),
        })
        .filter(|path| filter.selects(path))
        .collect()
}

/// Copy and strip every selected module into `dist/modules/`.
pub fn collect_modules(config: &BuildConfig) -> Result<Vec<Artifact>> {
    let order_path = config.out_dir.join("modules.order");
    if !order_path.is_file() {
        return Err(PipelineError::not_found("modules.order", order_path).into());
    }
    let content = fs::read_to_string(&order_path)
        .with_context(|| format!("Failed to read {}", order_path.display()))?;

    let selected = parse_modules_order(&content, config.build.module_filter);
    println!(
        "  {} modules selected from modules.order ({:?})",
        selected.len(),
        config.build.module_filter
    );

    let module_dir = prepare_work_dir(&config.dist_dir, "modules")?;

    let mut staged = Vec::with_capacity(selected.len());
    for rel in &selected {
        let source = config.out_dir.join(rel);
        if !source.is_file() {
            return Err(PipelineError::not_found(format!("module {}", rel), source).into());
        }
        let artifact = Artifact::stage(ArtifactKind::KernelModule, &source, &module_dir)?;
        strip_module(config, &artifact)?;
        // Same file name under two directories: the later entry wins.
        staged.retain(|a: &Artifact| a.destination != artifact.destination);
        staged.push(artifact);
    }

    println!("  Copied and stripped {} modules", staged.len());
    Ok(staged)
}

fn strip_module(config: &BuildConfig, module: &Artifact) -> Result<()> {
    Cmd::new(&config.tools.strip)
        .arg("--strip-debug")
        .arg_path(&module.destination)
        .timeout(config.tool_timeout)
        .error_msg(format!("Stripping {} failed", module.name))
        .run()
        .map_err(tool_failure(Stage::Collect, "strip"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER: &str = "\
drivers/net/wireless/cnss2/cnss2.ko
fs/exfat/exfat.ko

# trailing comment
drivers/input/touchscreen/goodix.ko extra-field
net/wireguard/wireguard.o
drivers/gpu/msm/msm_kgsl.o
";

    #[test]
    fn test_drivers_filter_keeps_only_drivers_entries() {
        let modules = parse_modules_order(ORDER, ModuleFilter::Drivers);
        assert_eq!(
            modules,
            vec![
                "drivers/net/wireless/cnss2/cnss2.ko",
                "drivers/input/touchscreen/goodix.ko",
                "drivers/gpu/msm/msm_kgsl.ko",
            ]
        );
    }

    #[test]
    fn test_all_filter_keeps_everything_in_order() {
        let modules = parse_modules_order(ORDER, ModuleFilter::All);
        assert_eq!(
            modules,
            vec![
                "drivers/net/wireless/cnss2/cnss2.ko",
                "fs/exfat/exfat.ko",
                "drivers/input/touchscreen/goodix.ko",
                "net/wireguard/wireguard.ko",
                "drivers/gpu/msm/msm_kgsl.ko",
            ]
        );
    }

    #[test]
    fn test_empty_manifest() {
        assert!(parse_modules_order("", ModuleFilter::All).is_empty());
        assert!(parse_modules_order("\n  \n", ModuleFilter::All).is_empty());
    }
}
