//! Stage sequencing.
//!
//! preflight -> kernel build (optional) -> collect -> dtbo/dtb -> boot ramdisk
//! (own-ramdisk only) -> boot.img -> vendor ramdisk -> vendor_boot.img -> sign
//!
//! Each stage returns `Result`; the first failure ends the run. Nothing is
//! reported as built until all four images exist and both boot images are
//! signed.

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::artifact::{self, SignedImage, IMAGE_NAMES};
use crate::build;
use crate::common::{is_nonempty_file, write_file_with_dirs};
use crate::config::BuildConfig;
use crate::device::DeviceId;
use crate::error::PipelineError;
use crate::preflight;
use crate::timing::Timer;

/// Written to the distribution tree after a successful run.
pub const MANIFEST_NAME: &str = "build-manifest.json";

/// Signing parameters recorded for a signed image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedPartition {
    pub partition: String,
    pub partition_size: u64,
}

/// A finished top-level image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
    pub signed: Option<SignedPartition>,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub device: DeviceId,
    pub images: Vec<ImageRecord>,
    pub warnings: Vec<String>,
}

impl PipelineResult {
    pub fn image(&self, name: &str) -> Option<&ImageRecord> {
        self.images.iter().find(|i| i.name == name)
    }

    pub fn print(&self) {
        println!("\n=== Build Complete ({}) ===", self.device);
        for image in &self.images {
            let signed = match &image.signed {
                Some(s) => format!(" [signed: {}]", s.partition),
                None => String::new(),
            };
            println!(
                "  {} ({:.1} MB){}",
                image.path.display(),
                image.size as f64 / 1_048_576.0,
                signed
            );
        }
        if !self.warnings.is_empty() {
            println!("\n{} warning(s):", self.warnings.len());
            for warning in &self.warnings {
                println!("  - {}", warning);
            }
        }
    }
}

/// Run the whole pipeline for `config`.
pub fn run(config: &BuildConfig) -> Result<PipelineResult> {
    println!("=== bootpack: {} ===\n", config.device);
    let total = Timer::start("Total");
    let mut warnings = Vec::new();

    let t = Timer::start("Preflight");
    preflight::require_prerequisites(config)?;
    fs::create_dir_all(&config.dist_dir)
        .with_context(|| format!("Failed to create {}", config.dist_dir.display()))?;
    t.finish();

    if config.skip_kernel_build {
        println!("Skipping kernel build (reusing {})", config.out_dir.display());
    } else {
        let t = Timer::start("Kernel build");
        build::kernel::build_kernel(config)?;
        t.finish();
    }

    let t = Timer::start("Collect");
    let collected = build::collect_artifacts(config)?;
    t.finish();

    let t = Timer::start("Device tree images");
    artifact::build_dtbo_image(config)?;
    let dtb = artifact::build_dtb_image(config)?;
    t.finish();

    let kernel = collected.kernel.destination.clone();
    let t = Timer::start("boot.img");
    let boot_ramdisk = if config.build.own_ramdisk {
        Some(artifact::build_boot_ramdisk(config)?)
    } else {
        None
    };
    artifact::build_boot_image(config, &kernel, boot_ramdisk.as_deref())?;
    t.finish();

    let t = Timer::start("vendor_boot.img");
    let vendor = artifact::build_vendor_ramdisk(config, &collected.modules)?;
    warnings.extend(vendor.warnings);
    artifact::build_vendor_boot_image(config, &kernel, &dtb, &vendor.archive)?;
    t.finish();

    let t = Timer::start("Sign");
    let signed = artifact::sign_boot_images(config)?;
    t.finish();

    let images = verify_images(config, &signed)?;
    let result = PipelineResult {
        device: config.device,
        images,
        warnings,
    };
    write_manifest(config, &result)?;

    total.finish();
    Ok(result)
}

/// Every top-level image must exist and be non-empty.
pub fn verify_images(config: &BuildConfig, signed: &[SignedImage]) -> Result<Vec<ImageRecord>> {
    IMAGE_NAMES
        .iter()
        .map(|name| -> Result<ImageRecord> {
            let path = config.dist(name);
            if !is_nonempty_file(&path) {
                return Err(PipelineError::not_found(*name, &path).into());
            }
            let size = fs::metadata(&path)
                .with_context(|| format!("Failed to stat {}", path.display()))?
                .len();
            let signed = signed
                .iter()
                .find(|s| s.path == path)
                .map(|s| SignedPartition {
                    partition: s.partition.clone(),
                    partition_size: s.partition_size,
                });
            Ok(ImageRecord {
                name: name.to_string(),
                sha256: sha256_file(&path)?,
                path,
                size,
                signed,
            })
        })
        .collect()
}

/// Hex SHA-256 of a file, read in 1MB chunks.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file =
        fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 1024 * 1024];
    loop {
        let n = file
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Write `build-manifest.json` into the distribution tree.
pub fn write_manifest(config: &BuildConfig, result: &PipelineResult) -> Result<PathBuf> {
    let path = config.dist(MANIFEST_NAME);
    let json = serde_json::to_string_pretty(result).context("Failed to serialize manifest")?;
    write_file_with_dirs(&path, json)?;
    Ok(path)
}
