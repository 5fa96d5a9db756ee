//! bootpack - Android boot image builder.
//!
//! Turns a kernel build's output into signed, flashable partition images:
//! - `dtbo.img` / `dtb.img` (device tree images)
//! - `boot.img` (kernel, plus our own ramdisk on some devices)
//! - `vendor_boot.img` (DTB, vendor ramdisk with modules, fstab, firmware)

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bootpack::config::{BuildConfig, Overrides};
use bootpack::device::{DeviceId, ModuleFilter};
use bootpack::logging;

#[derive(Parser)]
#[command(name = "bootpack")]
#[command(about = "Android boot image builder")]
#[command(
    after_help = "QUICK START:\n  bootpack -d alioth preflight  Check inputs and tools\n  bootpack -d alioth build      Build and sign all images\n  bootpack show devices         List supported devices\n  bootpack -d alioth clean      Remove the distribution tree"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Target device (overrides DEVICE)
    #[arg(short, long, global = true, value_enum)]
    device: Option<DeviceId>,

    /// Kernel build-output tree (overrides OUT_DIR)
    #[arg(short, long, global = true)]
    out: Option<PathBuf>,

    /// Distribution tree (overrides DIST_DIR)
    #[arg(long, global = true)]
    dist: Option<PathBuf>,

    /// Show every tool invocation
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and sign dtbo.img, dtb.img, boot.img and vendor_boot.img
    Build {
        /// Parallel jobs for the kernel build and modules.dep (overrides JOBS)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Reuse an existing kernel build-output tree
        #[arg(long)]
        skip_kernel_build: bool,

        /// Which modules.order entries go into the vendor ramdisk (overrides MODULE_FILTER)
        #[arg(long, value_enum)]
        module_filter: Option<ModuleFilter>,

        /// Kill any external tool running longer than this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Run preflight checks (verify inputs and tools before build)
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },

    /// Clean build artifacts (default: the whole distribution tree)
    Clean {
        #[command(subcommand)]
        what: Option<CleanTarget>,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show resolved configuration
    Config,
    /// List device profiles
    Devices,
}

#[derive(Subcommand)]
enum CleanTarget {
    /// Remove finished images and ramdisk archives only
    Images,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env if present
    dotenvy::dotenv().ok();
    logging::init(cli.verbose);

    let base_dir = std::env::current_dir()?;
    let mut overrides = Overrides {
        device: cli.device,
        out_dir: cli.out,
        dist_dir: cli.dist,
        ..Default::default()
    };

    match cli.command {
        Commands::Build {
            jobs,
            skip_kernel_build,
            module_filter,
            timeout,
        } => {
            overrides.jobs = jobs;
            overrides.skip_kernel_build = skip_kernel_build;
            overrides.module_filter = module_filter;
            overrides.timeout_secs = timeout;
            let config = BuildConfig::load(&base_dir, &overrides)?;
            commands::cmd_build(&config)?;
        }

        Commands::Preflight { strict } => {
            let config = BuildConfig::load(&base_dir, &overrides)?;
            commands::cmd_preflight(&config, strict)?;
        }

        Commands::Show { what } => {
            let show_target = match what {
                ShowTarget::Config => commands::show::ShowTarget::Config,
                ShowTarget::Devices => commands::show::ShowTarget::Devices,
            };
            commands::cmd_show(show_target, BuildConfig::load(&base_dir, &overrides))?;
        }

        Commands::Clean { what } => {
            let clean_target = match what {
                None => commands::clean::CleanTarget::Dist,
                Some(CleanTarget::Images) => commands::clean::CleanTarget::Images,
            };
            let config = BuildConfig::load(&base_dir, &overrides)?;
            commands::cmd_clean(&config, clean_target)?;
        }
    }

    Ok(())
}
