//! AVB hash footers via `avbtool add_hash_footer`.
//!
//! Signing is the last stage. An image that could not be signed must never be
//! reported as built, so every failure here is fatal.

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::common::is_nonempty_file;
use crate::config::BuildConfig;
use crate::device::AVB_ALGORITHM;
use crate::error::{tool_failure, PipelineError, Stage};
use crate::process::Cmd;

/// A partition image with a hash footer appended in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedImage {
    pub path: PathBuf,
    pub partition: String,
    pub partition_size: u64,
}

pub fn add_hash_footer_args(
    image: &Path,
    partition: &str,
    partition_size: u64,
    key: &Path,
    algorithm: &str,
) -> Vec<String> {
    vec![
        "add_hash_footer".to_string(),
        "--image".to_string(),
        image.to_string_lossy().into_owned(),
        "--partition_name".to_string(),
        partition.to_string(),
        "--partition_size".to_string(),
        partition_size.to_string(),
        "--key".to_string(),
        key.to_string_lossy().into_owned(),
        "--algorithm".to_string(),
        algorithm.to_string(),
    ]
}

/// Append a hash footer to `image` for `partition` of `partition_size` bytes.
///
/// Fails with `ImageMissing` before `avbtool` is ever started when the image
/// is absent or empty.
pub fn sign_image(
    config: &BuildConfig,
    image: &Path,
    partition: &str,
    partition_size: u64,
) -> Result<SignedImage> {
    if !is_nonempty_file(image) {
        return Err(PipelineError::ImageMissing(image.to_path_buf()).into());
    }
    if !config.avb_key.is_file() {
        return Err(PipelineError::missing("AVB signing key", &config.avb_key).into());
    }

    println!("Signing {} ({} partition, {} bytes)...", image.display(), partition, partition_size);
    Cmd::new(&config.tools.avbtool)
        .args(add_hash_footer_args(
            image,
            partition,
            partition_size,
            &config.avb_key,
            AVB_ALGORITHM,
        ))
        .timeout(config.tool_timeout)
        .error_msg(format!("avbtool failed to sign {}", image.display()))
        .run()
        .map_err(tool_failure(Stage::Sign, "avbtool"))?;

    Ok(SignedImage {
        path: image.to_path_buf(),
        partition: partition.to_string(),
        partition_size,
    })
}

/// Sign `boot.img` and `vendor_boot.img`, in that order.
pub fn sign_boot_images(config: &BuildConfig) -> Result<Vec<SignedImage>> {
    let sizes = config.profile.partitions;
    let boot = sign_image(config, &config.dist("boot.img"), "boot", sizes.boot)?;
    let vendor_boot = sign_image(
        config,
        &config.dist("vendor_boot.img"),
        "vendor_boot",
        sizes.vendor_boot,
    )?;
    Ok(vec![boot, vendor_boot])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_hash_footer_args() {
        let args = add_hash_footer_args(
            Path::new("/d/boot.img"),
            "boot",
            67108864,
            Path::new("/keys/k.pem"),
            AVB_ALGORITHM,
        );
        assert_eq!(
            args.join(" "),
            "add_hash_footer --image /d/boot.img --partition_name boot \
             --partition_size 67108864 --key /keys/k.pem --algorithm SHA256_RSA4096"
        );
    }
}
