//! Build environment checks (inputs, output tree, disk space).

use crate::config::BuildConfig;
use crate::process::Cmd;

use super::types::{CheckResult, Prerequisite};
use super::validators::{validate_avb_key, validate_dt_config};

/// Inputs the pipeline cannot run without, in the order they are checked.
pub fn prerequisites(config: &BuildConfig) -> Vec<Prerequisite> {
    let mut items = vec![
        Prerequisite::file("AVB signing key", config.avb_key.clone()),
        Prerequisite::file(
            "fstab",
            config.fstab_dir.join(config.profile.fstab_name()),
        ),
        Prerequisite::file("modules.load", config.modules_load.clone()),
    ];
    if config.build.own_ramdisk {
        items.push(Prerequisite::dir(
            "boot ramdisk source tree",
            config.ramdisk_source.clone(),
        ));
    }
    items
}

/// Check build environment (inputs, directories, disk space).
pub fn check_build_environment(config: &BuildConfig) -> Vec<CheckResult> {
    let mut results = Vec::new();

    for item in prerequisites(config) {
        if item.is_present() {
            results.push(CheckResult::pass_with(&item.what, &item.path.display().to_string()));
        } else {
            results.push(CheckResult::fail(
                &item.what,
                &format!("Not found at {}", item.path.display()),
            ));
        }
    }
    if !config.build.own_ramdisk {
        results.push(CheckResult::skip(
            "boot ramdisk source tree",
            "boot.img carries no ramdisk on this device",
        ));
    }

    // Content checks: an empty key passes is_file() but avbtool rejects it.
    if config.avb_key.is_file() {
        if let Err(e) = validate_avb_key(&config.avb_key) {
            results.push(CheckResult::fail("AVB key content", &e));
        }
    }

    let dt_configs = [
        ("DTBO config", config.profile.dtbo_config(&config.dt_config_dir)),
        ("DTB config", config.profile.dtb_config(&config.dt_config_dir)),
    ];
    for (name, path) in dt_configs {
        if !path.is_file() {
            results.push(CheckResult::fail(
                name,
                &format!("Not found at {}", path.display()),
            ));
            continue;
        }
        match validate_dt_config(&path) {
            Ok(entries) => {
                results.push(CheckResult::pass_with(name, &format!("{} entries", entries)))
            }
            Err(e) => results.push(CheckResult::fail(name, &e)),
        }
    }

    let first_stage = config
        .fstab_dir
        .join("first_stage_ramdisk")
        .join(config.profile.fstab_name());
    if first_stage.is_file() {
        results.push(CheckResult::pass("first-stage fstab"));
    } else {
        results.push(CheckResult::warn(
            "first-stage fstab",
            &format!("Not found at {} - vendor ramdisk will not include it", first_stage.display()),
        ));
    }

    if config.firmware_dir.is_dir() {
        results.push(CheckResult::pass("vendor firmware"));
    } else {
        results.push(CheckResult::warn(
            "vendor firmware",
            &format!("Not found at {} - vendor ramdisk will not include it", config.firmware_dir.display()),
        ));
    }

    if config.skip_kernel_build {
        let image = config.kernel_image();
        if image.is_file() {
            results.push(CheckResult::pass_with("kernel image", &image.display().to_string()));
        } else {
            results.push(CheckResult::fail(
                "kernel image",
                &format!("Not found at {} (kernel build skipped)", image.display()),
            ));
        }
    } else if config.kernel_source.join("Makefile").is_file() {
        results.push(CheckResult::pass_with(
            "kernel source",
            &config.kernel_source.display().to_string(),
        ));
    } else {
        results.push(CheckResult::fail(
            "kernel source",
            &format!("No Makefile in {}", config.kernel_source.display()),
        ));
    }

    match std::fs::create_dir_all(&config.dist_dir) {
        Ok(_) => results.push(CheckResult::pass("dist/ writable")),
        Err(e) => results.push(CheckResult::fail(
            "dist/ writable",
            &format!("Cannot create {}: {}", config.dist_dir.display(), e),
        )),
    }

    if let Some(result) = check_disk_space(config) {
        results.push(result);
    }

    results
}

/// Warn when the output filesystem has less than 2GB free.
fn check_disk_space(config: &BuildConfig) -> Option<CheckResult> {
    let result = Cmd::new("df")
        .args(["--output=avail", "-B1"])
        .arg_path(&config.dist_dir)
        .allow_fail()
        .run()
        .ok()?;
    if !result.success() {
        return None;
    }
    // Skip header line, get available bytes
    let avail_bytes: u64 = result.stdout.lines().nth(1)?.trim().parse().ok()?;
    let free_mb = avail_bytes / (1024 * 1024);
    Some(if free_mb < 2048 {
        CheckResult::warn("disk space", &format!("{}MB free - images need ~500MB", free_mb))
    } else {
        CheckResult::pass_with("disk space", &format!("{}MB free", free_mb))
    })
}
