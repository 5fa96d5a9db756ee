//! Vendor ramdisk: modules, module metadata, fstab and firmware.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::{depgen, metadata, RamdiskTree, VENDOR_RAMDISK_ROOT};
use crate::build::Artifact;
use crate::common::{copy_file, copy_tree};
use crate::config::BuildConfig;
use crate::error::PipelineError;

/// Finished vendor ramdisk archive.
#[derive(Debug, Clone)]
pub struct VendorRamdisk {
    pub archive: PathBuf,
    /// Optional inputs that were absent.
    pub warnings: Vec<String>,
}

/// Assemble the vendor ramdisk tree from `modules` and archive it to
/// `vendor_ramdisk.cpio.gz`.
pub fn build_vendor_ramdisk(config: &BuildConfig, modules: &[Artifact]) -> Result<VendorRamdisk> {
    println!("Building vendor ramdisk...");

    let fstab_name = config.profile.fstab_name();
    let fstab = config.fstab_dir.join(&fstab_name);
    if !fstab.is_file() {
        return Err(PipelineError::missing("fstab", fstab).into());
    }
    if !config.modules_load.is_file() {
        return Err(PipelineError::missing("modules.load", &config.modules_load).into());
    }

    let mut warnings = Vec::new();
    let tree = RamdiskTree::create(&config.dist_dir, VENDOR_RAMDISK_ROOT)?;

    let module_dir = tree.join("lib/modules");
    fs::create_dir_all(&module_dir)
        .with_context(|| format!("Failed to create {}", module_dir.display()))?;
    for module in modules {
        copy_file(&module.destination, &module_dir.join(&module.name))?;
    }
    println!("  Copied {} modules", modules.len());
    write_module_metadata(config, &module_dir)?;

    copy_file(&fstab, &tree.join(&fstab_name))?;
    let first_stage = config.fstab_dir.join("first_stage_ramdisk").join(&fstab_name);
    if first_stage.is_file() {
        copy_file(&first_stage, &tree.join("first_stage_ramdisk").join(&fstab_name))?;
    } else {
        warn(
            &mut warnings,
            format!(
                "First-stage fstab not found at {}, continuing without it",
                first_stage.display()
            ),
        );
    }

    if config.firmware_dir.is_dir() {
        let count = copy_tree(&config.firmware_dir, &tree.join("lib/firmware"))?;
        println!("  Copied {} firmware files", count);
    } else {
        warn(
            &mut warnings,
            format!(
                "Vendor firmware directory not found at {}, continuing without it",
                config.firmware_dir.display()
            ),
        );
    }

    let archive = tree.archive(config, &config.dist("vendor_ramdisk.cpio.gz"))?;
    Ok(VendorRamdisk {
        archive,
        warnings,
    })
}

/// Write `modules.dep` and `modules.load`, plus `modules.softdep` and
/// `modules.alias` when the profile asks for full metadata.
pub fn write_module_metadata(config: &BuildConfig, module_dir: &Path) -> Result<()> {
    depgen::generate(config, module_dir, &module_dir.join("modules.dep"), config.jobs)?;

    if config.build.full_module_metadata {
        let (softdeps, aliases) = metadata::write_softdep_and_alias(config, module_dir)?;
        println!("  Module metadata: {} softdeps, {} aliases", softdeps, aliases);
    }

    copy_file(&config.modules_load, &module_dir.join("modules.load"))
}

fn warn(warnings: &mut Vec<String>, message: String) {
    log::warn!("{}", message);
    warnings.push(message);
}
