//! Host tool availability checks.

use crate::config::BuildConfig;
use crate::process;

use super::types::CheckResult;

/// A tool the pipeline invokes, as configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTool<'a> {
    pub label: &'static str,
    pub program: &'a str,
    pub purpose: &'static str,
}

/// Every tool this run will invoke, in pipeline order.
pub fn required_tools(config: &BuildConfig) -> Vec<HostTool<'_>> {
    let t = &config.tools;
    let mut tools = Vec::new();
    if !config.skip_kernel_build {
        tools.push(HostTool {
            label: "make",
            program: &t.make,
            purpose: "Required to build the kernel",
        });
    }
    tools.extend([
        HostTool {
            label: "strip",
            program: &t.strip,
            purpose: "Required to strip kernel modules",
        },
        HostTool {
            label: "mkdtimg",
            program: &t.mkdtimg,
            purpose: "Required to create dtbo.img and dtb.img",
        },
        HostTool {
            label: "mkbootimg",
            program: &t.mkbootimg,
            purpose: "Required to create boot.img and vendor_boot.img",
        },
        HostTool {
            label: "cpio",
            program: &t.cpio,
            purpose: "Required to archive ramdisks",
        },
        HostTool {
            label: "gzip",
            program: &t.gzip,
            purpose: "Required to compress ramdisks",
        },
        HostTool {
            label: "modinfo",
            program: &t.modinfo,
            purpose: "Required for module metadata",
        },
        HostTool {
            label: "avbtool",
            program: &t.avbtool,
            purpose: "Required to sign images",
        },
    ]);
    tools
}

/// Check host tools are installed.
pub fn check_host_tools(config: &BuildConfig) -> Vec<CheckResult> {
    required_tools(config)
        .into_iter()
        .map(|tool| match process::which(tool.program) {
            Some(path) => CheckResult::pass_with(tool.label, &path.display().to_string()),
            None => CheckResult::fail(
                tool.label,
                &format!("'{}' not found. {}", tool.program, tool.purpose),
            ),
        })
        .collect()
}

/// First configured tool that cannot be resolved, if any.
pub fn first_missing_tool(config: &BuildConfig) -> Option<HostTool<'_>> {
    required_tools(config)
        .into_iter()
        .find(|tool| !process::exists(tool.program))
}
