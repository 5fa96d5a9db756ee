//! `modules.dep` generator.
//!
//! Direct dependencies come from `modinfo -F depends`, queried in parallel.
//! Only dependencies that are themselves present in the module directory are
//! kept. Each module then lists its full transitive closure, so the loader
//! never has to recurse.

use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Mutex;

use super::metadata::module_name;
use crate::common::write_file_with_dirs;
use crate::config::BuildConfig;
use crate::process::Cmd;

/// Module path prefix inside the ramdisk.
pub const MODULE_PREFIX: &str = "/lib/modules";

/// Module file name -> direct dependency file names.
pub type DependencyGraph = BTreeMap<String, BTreeSet<String>>;

/// `.ko` file names directly inside `dir`, sorted.
pub fn module_files(dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".ko") && entry.file_type()?.is_file() {
            files.push(name);
        }
    }
    files.sort();
    Ok(files)
}

/// Parse `modinfo -F depends` output (`a,b,c`) into `.ko` names present in `available`.
///
/// Names compare with `-` and `_` treated alike, since the kernel records
/// `fts_touch` for `fts-touch.ko`.
pub fn parse_depends(output: &str, available: &BTreeSet<String>) -> BTreeSet<String> {
    output
        .split(',')
        .map(str::trim)
        .filter(|dep| !dep.is_empty())
        .filter_map(|dep| {
            let wanted = module_name(dep);
            available.iter().find(|ko| module_name(ko) == wanted).cloned()
        })
        .collect()
}

/// Every module reachable from `module`, excluding `module` itself.
///
/// Cycles terminate: each module is expanded at most once.
pub fn transitive_deps(graph: &DependencyGraph, module: &str) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<&str> = vec![module];
    while let Some(current) = stack.pop() {
        if let Some(direct) = graph.get(current) {
            for dep in direct {
                // A module in a cycle is never listed as its own dependency.
                if dep != module && seen.insert(dep.clone()) {
                    stack.push(dep);
                }
            }
        }
    }
    seen
}

/// Render the whole file: one line per module, sorted, no trailing newline.
pub fn render(graph: &DependencyGraph) -> String {
    graph
        .keys()
        .map(|module| {
            let deps = transitive_deps(graph, module);
            if deps.is_empty() {
                format!("{}/{}:", MODULE_PREFIX, module)
            } else {
                let paths: Vec<String> = deps
                    .iter()
                    .map(|d| format!("{}/{}", MODULE_PREFIX, d))
                    .collect();
                format!("{}/{}: {}", MODULE_PREFIX, module, paths.join(" "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Query direct dependencies for every module in `dir` using `jobs` workers.
pub fn build_graph(config: &BuildConfig, dir: &Path, jobs: usize) -> Result<DependencyGraph> {
    let modules = module_files(dir)?;
    let available: BTreeSet<String> = modules.iter().cloned().collect();

    let queue = Mutex::new(modules.iter());
    let graph = Mutex::new(DependencyGraph::new());
    let workers = jobs.clamp(1, modules.len().max(1));

    let (queue_ref, graph_ref, available) = (&queue, &graph, &available);
    std::thread::scope(|scope| -> Result<()> {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(move || -> Result<()> {
                    loop {
                        let next = match queue_ref.lock() {
                            Ok(mut q) => q.next(),
                            Err(_) => anyhow::bail!("module queue poisoned"),
                        };
                        let Some(module) = next else {
                            return Ok(());
                        };
                        let deps = query_depends(config, &dir.join(module), available)?;
                        match graph_ref.lock() {
                            Ok(mut g) => {
                                g.insert(module.clone(), deps);
                            }
                            Err(_) => anyhow::bail!("dependency graph poisoned"),
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            match handle.join() {
                Ok(result) => result?,
                Err(_) => anyhow::bail!("dependency worker panicked"),
            }
        }
        Ok(())
    })?;

    graph
        .into_inner()
        .map_err(|_| anyhow::anyhow!("dependency graph poisoned"))
}

/// A module whose metadata cannot be read is treated as having no dependencies.
fn query_depends(
    config: &BuildConfig,
    module: &Path,
    available: &BTreeSet<String>,
) -> Result<BTreeSet<String>> {
    let result = Cmd::new(&config.tools.modinfo)
        .args(["-F", "depends"])
        .arg_path(module)
        .timeout(config.tool_timeout)
        .allow_fail()
        .run()?;
    if !result.success() {
        log::debug!(
            "modinfo -F depends {} exited {}: {}",
            module.display(),
            result.code(),
            result.stderr_trimmed()
        );
        return Ok(BTreeSet::new());
    }
    Ok(parse_depends(result.stdout_trimmed(), available))
}

/// Generate `modules.dep` for the modules in `dir`, writing it to `output`.
pub fn generate(config: &BuildConfig, dir: &Path, output: &Path, jobs: usize) -> Result<()> {
    let graph = build_graph(config, dir, jobs)?;
    write_file_with_dirs(output, render(&graph))?;
    log::debug!("modules.dep: {} modules", graph.len());
    Ok(())
}
