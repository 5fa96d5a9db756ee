//! `boot.img` and `vendor_boot.img` via `mkbootimg`.
//!
//! The two variants differ only in whether `boot.img` carries a ramdisk.
//! Every geometry value comes from the device profile and is rendered exactly
//! as the bootloader expects.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::common::is_nonempty_file;
use crate::config::BuildConfig;
use crate::device::{hex, BootGeometry};
use crate::error::{tool_failure, PipelineError, Stage};
use crate::process::Cmd;

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Header fields shared by both images.
fn geometry_args(g: &BootGeometry) -> Vec<String> {
    vec![
        "--pagesize".to_string(),
        g.page_size.to_string(),
        "--base".to_string(),
        hex(g.base),
        "--kernel_offset".to_string(),
        hex(g.kernel_offset),
        "--header_version".to_string(),
        g.header_version.to_string(),
        "--os_version".to_string(),
        g.os_version.to_string(),
        "--os_patch_level".to_string(),
        g.os_patch_level.to_string(),
    ]
}

/// Arguments for `boot.img`: kernel, optional ramdisk, geometry, output.
pub fn boot_image_args(
    kernel: &Path,
    ramdisk: Option<&Path>,
    geometry: &BootGeometry,
    output: &Path,
) -> Vec<String> {
    let mut args = vec!["--kernel".to_string(), path_arg(kernel)];
    if let Some(ramdisk) = ramdisk {
        args.push("--ramdisk".to_string());
        args.push(path_arg(ramdisk));
    }
    args.extend(geometry_args(geometry));
    args.push("-o".to_string());
    args.push(path_arg(output));
    args
}

/// Arguments for `vendor_boot.img`: kernel, DTB image, vendor ramdisk and the
/// vendor-only offsets, board string and command line.
pub fn vendor_boot_args(
    kernel: &Path,
    dtb: &Path,
    vendor_ramdisk: &Path,
    geometry: &BootGeometry,
    output: &Path,
) -> Vec<String> {
    let mut args = vec![
        "--kernel".to_string(),
        path_arg(kernel),
        "--dtb".to_string(),
        path_arg(dtb),
        "--vendor_ramdisk".to_string(),
        path_arg(vendor_ramdisk),
    ];
    args.extend(geometry_args(geometry));
    args.extend([
        "--ramdisk_offset".to_string(),
        hex(geometry.ramdisk_offset),
        "--dtb_offset".to_string(),
        hex(geometry.dtb_offset),
        "--tags_offset".to_string(),
        hex(geometry.tags_offset),
    ]);
    if !geometry.board.is_empty() {
        args.push("--board".to_string());
        args.push(geometry.board.to_string());
    }
    if !geometry.vendor_cmdline.is_empty() {
        args.push("--vendor_cmdline".to_string());
        args.push(geometry.vendor_cmdline.to_string());
    }
    args.push("--vendor_boot".to_string());
    args.push(path_arg(output));
    args
}

/// Compose `boot.img`; `ramdisk` is only present in the own-ramdisk variant.
pub fn build_boot_image(config: &BuildConfig, kernel: &Path, ramdisk: Option<&Path>) -> Result<PathBuf> {
    println!("Composing boot.img...");
    let output = config.dist("boot.img");
    let args = boot_image_args(kernel, ramdisk, &config.profile.geometry, &output);
    run_mkbootimg(config, args, &output, "boot.img")?;
    Ok(output)
}

/// Compose `vendor_boot.img`.
pub fn build_vendor_boot_image(
    config: &BuildConfig,
    kernel: &Path,
    dtb: &Path,
    vendor_ramdisk: &Path,
) -> Result<PathBuf> {
    println!("Composing vendor_boot.img...");
    let output = config.dist("vendor_boot.img");
    let args = vendor_boot_args(kernel, dtb, vendor_ramdisk, &config.profile.geometry, &output);
    run_mkbootimg(config, args, &output, "vendor_boot.img")?;
    Ok(output)
}

fn run_mkbootimg(config: &BuildConfig, args: Vec<String>, output: &Path, name: &str) -> Result<()> {
    Cmd::new(&config.tools.mkbootimg)
        .args(args)
        .timeout(config.tool_timeout)
        .error_msg(format!("mkbootimg failed to create {}", name))
        .run()
        .map_err(tool_failure(Stage::Compose, "mkbootimg"))?;

    if !is_nonempty_file(output) {
        return Err(PipelineError::not_found(name, output).into());
    }
    println!("  Created {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceId;

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_boot_args_without_ramdisk() {
        let g = DeviceId::Alioth.profile().geometry;
        let args = boot_image_args(Path::new("/d/Image"), None, &g, Path::new("/d/boot.img"));

        assert!(!args.contains(&"--ramdisk".to_string()));
        assert_eq!(value_after(&args, "--kernel"), Some("/d/Image"));
        assert_eq!(value_after(&args, "--pagesize"), Some("4096"));
        assert_eq!(value_after(&args, "--base"), Some("0x00000000"));
        assert_eq!(value_after(&args, "--kernel_offset"), Some("0x00008000"));
        assert_eq!(value_after(&args, "--header_version"), Some("3"));
        assert_eq!(value_after(&args, "--os_version"), Some("13.0.0"));
        assert_eq!(value_after(&args, "--os_patch_level"), Some("2023-06"));
        assert_eq!(value_after(&args, "-o"), Some("/d/boot.img"));
    }

    #[test]
    fn test_boot_args_with_ramdisk_differ_only_by_ramdisk() {
        let g = DeviceId::Lmi.profile().geometry;
        let without = boot_image_args(Path::new("/d/Image"), None, &g, Path::new("/d/boot.img"));
        let with = boot_image_args(
            Path::new("/d/Image"),
            Some(Path::new("/d/ramdisk.cpio.gz")),
            &g,
            Path::new("/d/boot.img"),
        );

        assert_eq!(value_after(&with, "--ramdisk"), Some("/d/ramdisk.cpio.gz"));
        let stripped: Vec<String> = with
            .iter()
            .filter(|a| *a != "--ramdisk" && *a != "/d/ramdisk.cpio.gz")
            .cloned()
            .collect();
        assert_eq!(stripped, without);
    }

    #[test]
    fn test_vendor_boot_args() {
        let g = DeviceId::Apollo.profile().geometry;
        let args = vendor_boot_args(
            Path::new("/d/Image"),
            Path::new("/d/dtb.img"),
            Path::new("/d/vendor_ramdisk.cpio.gz"),
            &g,
            Path::new("/d/vendor_boot.img"),
        );

        assert_eq!(value_after(&args, "--dtb"), Some("/d/dtb.img"));
        assert_eq!(value_after(&args, "--vendor_ramdisk"), Some("/d/vendor_ramdisk.cpio.gz"));
        assert_eq!(value_after(&args, "--ramdisk_offset"), Some("0x01000000"));
        assert_eq!(value_after(&args, "--dtb_offset"), Some("0x01f00000"));
        assert_eq!(value_after(&args, "--tags_offset"), Some("0x00000100"));
        assert_eq!(value_after(&args, "--board"), Some("apollo"));
        assert_eq!(value_after(&args, "--vendor_boot"), Some("/d/vendor_boot.img"));
        assert!(value_after(&args, "--vendor_cmdline")
            .unwrap()
            .contains("androidboot.hardware=qcom"));
        assert!(!args.contains(&"-o".to_string()));
    }
}
