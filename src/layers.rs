//! Layer discovery and priority resolution
//!
//! A layer is a self-contained directory tree under `sources/` carrying a
//! `conf/layer.conf`. Layers exist only as a transient lookup table for
//! the duration of a run: they are discovered, never created.
//!
//! Priority comes from the layer's own configuration document: the first
//! `BBFILE_PRIORITY*` assignment whose leading value token parses as an
//! integer. Everything that prevents that — a missing file, unparsable
//! content, no matching variable — falls back to the default priority of
//! `1` and is logged at debug level only, since probing non-layer
//! directories is an expected part of discovery.

use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::document::ConfDocument;

/// Priority used when a layer's own configuration does not declare one.
pub const DEFAULT_PRIORITY: i64 = 1;

/// A discovered layer: name, root directory and resolved priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub name: String,
    pub path: PathBuf,
    pub priority: i64,
}

/// Resolve a layer's priority from `<layer_dir>/conf/layer.conf`.
///
/// Never fatal: an unresolvable priority yields [`DEFAULT_PRIORITY`].
pub fn layer_priority(layer_dir: &Path) -> i64 {
    let conf_path = layer_dir.join("conf").join("layer.conf");
    let mut conf = ConfDocument::new_quiet(&conf_path);
    if let Err(err) = conf.read() {
        debug!(
            "no readable layer.conf under {}: {}",
            layer_dir.display(),
            err
        );
        return DEFAULT_PRIORITY;
    }
    for assignment in conf.assignments() {
        if !assignment.variable.starts_with("BBFILE_PRIORITY") {
            continue;
        }
        if let Some(priority) = assignment
            .value
            .first()
            .and_then(|token| token.trim().parse::<i64>().ok())
        {
            return priority;
        }
    }
    debug!(
        "no BBFILE_PRIORITY in {}, defaulting to {}",
        conf_path.display(),
        DEFAULT_PRIORITY
    );
    DEFAULT_PRIORITY
}

/// Discover all layers under `<root>/sources`.
///
/// A directory containing `conf/layer.conf` is a layer; its name is the
/// directory's base name. The walk is sorted so discovery order is
/// deterministic for a fixed filesystem layout.
pub fn find_layers(root: &Path) -> Vec<Layer> {
    let sources = root.join("sources");
    let mut layers = Vec::new();
    for entry in WalkDir::new(&sources)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
    {
        if !entry.file_type().is_file() || entry.file_name().to_str() != Some("layer.conf") {
            continue;
        }
        let conf_dir = match entry.path().parent() {
            Some(dir) if dir.file_name().and_then(|name| name.to_str()) == Some("conf") => dir,
            _ => continue,
        };
        let Some(layer_dir) = conf_dir.parent() else {
            continue;
        };
        let name = layer_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        layers.push(Layer {
            name,
            path: layer_dir.to_path_buf(),
            priority: layer_priority(layer_dir),
        });
    }
    layers
}

/// Look a layer up by name.
pub fn layer_by_name<'a>(layers: &'a [Layer], name: &str) -> Option<&'a Layer> {
    layers.iter().find(|layer| layer.name == name)
}

/// List the machine names a layer provides (`conf/machine/*.conf`,
/// without the extension).
pub fn machines_in_layer(layer: &Layer) -> Vec<String> {
    let pattern = layer
        .path
        .join("conf")
        .join("machine")
        .join("*.conf")
        .to_string_lossy()
        .into_owned();
    let mut machines: Vec<String> = glob::glob(&pattern)
        .map(|paths| {
            paths
                .filter_map(|path| path.ok())
                .filter_map(|path| {
                    path.file_stem()
                        .map(|stem| stem.to_string_lossy().into_owned())
                })
                .collect()
        })
        .unwrap_or_default();
    machines.sort();
    machines
}
