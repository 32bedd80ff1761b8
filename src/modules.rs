//! Hook module discovery and deterministic ordering
//!
//! Layers contribute hook modules: files under a `setup-environment.d`
//! directory that customize configuration generation. The filesystem scan
//! that finds them is unordered by nature, so this module imposes a total
//! order before anything executes:
//!
//! 1. A module owned by a layer (its path lives under the layer's
//!    directory) takes the layer's priority.
//! 2. Otherwise a sibling `priority` file (a single integer on its first
//!    line) supplies one.
//! 3. Otherwise the module is *unscoped*. Exactly one unscoped module is
//!    allowed per run; it always executes last. A second unscoped module
//!    makes the "default" position ambiguous and aborts the run before
//!    any module executes.
//!
//! Priority-bearing modules sort ascending by priority, ties keeping
//! discovery order.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::document::ConfDocument;
use crate::error::{Error, Result};
use crate::hooks::Hooks;
use crate::layers::Layer;

/// Directory name that marks a hook module location.
const MODULE_DIR: &str = "setup-environment.d";

/// Depth limit for the module scan under `sources/`.
const MODULE_SCAN_DEPTH: usize = 3;

/// A discovered hook module. `priority` is `None` for the single allowed
/// unscoped module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub path: PathBuf,
    pub priority: Option<i64>,
}

/// Find hook module files under `<root>/sources`.
///
/// Directories named `setup-environment.d` are searched up to three
/// levels deep; the `*.conf` files inside them are the modules. The walk
/// and the per-directory listing are both sorted, so discovery order is
/// deterministic.
pub fn discover_modules(root: &Path) -> Vec<PathBuf> {
    let sources = root.join("sources");
    let mut modules = Vec::new();
    for entry in WalkDir::new(&sources)
        .max_depth(MODULE_SCAN_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
    {
        if !entry.file_type().is_dir() || entry.file_name().to_str() != Some(MODULE_DIR) {
            continue;
        }
        let pattern = entry.path().join("*.conf").to_string_lossy().into_owned();
        if let Ok(paths) = glob::glob(&pattern) {
            let mut found: Vec<PathBuf> = paths.filter_map(|path| path.ok()).collect();
            found.sort();
            modules.extend(found);
        }
    }
    modules
}

/// Priority from a sibling `priority` file, if one parses.
fn priority_file(module_path: &Path) -> Option<i64> {
    let sibling = module_path.parent()?.join("priority");
    let content = fs::read_to_string(&sibling).ok()?;
    content.lines().next()?.trim().parse::<i64>().ok()
}

/// Resolve one module's priority: owning layer first, then sibling
/// priority file.
fn resolve_priority(module_path: &Path, layers: &[Layer]) -> Option<i64> {
    for layer in layers {
        if module_path.starts_with(&layer.path) {
            return Some(layer.priority);
        }
    }
    priority_file(module_path)
}

/// Impose the deterministic execution order over discovered modules.
///
/// Returns the modules sorted ascending by priority (stable for ties),
/// with the unscoped module, if any, appended last. Two unscoped modules
/// are a fatal configuration error reporting both paths.
pub fn order_modules(paths: Vec<PathBuf>, layers: &[Layer]) -> Result<Vec<Module>> {
    let mut scoped: Vec<Module> = Vec::new();
    let mut unscoped: Option<Module> = None;

    for path in paths {
        match resolve_priority(&path, layers) {
            Some(priority) => scoped.push(Module {
                path,
                priority: Some(priority),
            }),
            None => {
                debug!("no layer or priority file for module {}", path.display());
                if let Some(existing) = &unscoped {
                    return Err(Error::ModuleConflict {
                        first: existing.path.display().to_string(),
                        second: path.display().to_string(),
                    });
                }
                unscoped = Some(Module {
                    path,
                    priority: None,
                });
            }
        }
    }

    scoped.sort_by_key(|module| module.priority);
    if let Some(module) = unscoped {
        scoped.push(module);
    }
    Ok(scoped)
}

/// Register a module's hooks.
///
/// Hook module files are declarative assignment documents in the same
/// dialect as the configuration files. Their assignments replay through
/// the session during the after-init phase, once the documents are
/// readable: `BBLAYERS` values go through the layer-append path (which
/// re-sorts the layer list by priority), everything else lands in the
/// build variables document with its operator preserved.
pub fn register(module: &Module, hooks: &mut Hooks) -> Result<()> {
    let mut doc = ConfDocument::new_quiet(&module.path);
    doc.read()?;
    let assignments = doc.assignments().to_vec();
    hooks.register_after_init(move |session| {
        for assignment in &assignments {
            if assignment.variable == "BBLAYERS" {
                for dir in &assignment.value {
                    session.append_layer(dir.trim())?;
                }
            } else {
                session.apply(assignment.clone());
            }
        }
        Ok(())
    });
    Ok(())
}
