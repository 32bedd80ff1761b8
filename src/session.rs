//! The per-invocation session
//!
//! A [`Session`] owns every piece of mutable run state: the two
//! configuration documents, the defaults table, the discovered layer
//! table, the EULA registry and a snapshot of the process environment.
//! It is constructed once per invocation and threaded through hook
//! execution, so repeated invocations (and tests) stay independent —
//! there is no process-wide state.
//!
//! The mutation methods on `Session` are the module-facing API: hook
//! callbacks receive `&mut Session` and shape the generated
//! configuration exclusively through them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::assignment::{Assignment, Operator};
use crate::document::ConfDocument;
use crate::error::{Error, Result};
use crate::eula::EulaRegistry;
use crate::layers::{self, Layer};

/// Variables seeded weakly into the build configuration, with their
/// fallback values when absent from the environment.
const DEFAULTS: [(&str, &str); 4] = [
    ("DISTRO", "poky"),
    ("MACHINE", "qemuarm"),
    ("SDKMACHINE", "i686"),
    ("PACKAGE_CLASSES", "package_ipk"),
];

/// All mutable state of one setup run.
pub struct Session {
    root: PathBuf,
    build_dir: PathBuf,
    local_conf: ConfDocument,
    layers_conf: ConfDocument,
    defaults: BTreeMap<String, String>,
    env: BTreeMap<String, String>,
    layers: Vec<Layer>,
    eulas: EulaRegistry,
}

impl Session {
    /// Create a session for `build_dir` under the workspace `root`,
    /// snapshotting the current process environment.
    ///
    /// The configuration documents are created here, before the
    /// bootstrap runs: whether a file pre-exists *now* decides its
    /// read-only fate for the whole run.
    pub fn new(root: &Path, build_dir: impl AsRef<Path>) -> Self {
        Self::with_env(root, build_dir, std::env::vars().collect())
    }

    /// Create a session with an explicit environment snapshot.
    pub fn with_env(
        root: &Path,
        build_dir: impl AsRef<Path>,
        env: BTreeMap<String, String>,
    ) -> Self {
        let build_dir = build_dir.as_ref().to_path_buf();
        let conf_dir = root.join(&build_dir).join("conf");
        Self {
            root: root.to_path_buf(),
            build_dir,
            local_conf: ConfDocument::new(conf_dir.join("local.conf")),
            layers_conf: ConfDocument::new(conf_dir.join("bblayers.conf")),
            defaults: DEFAULTS
                .iter()
                .map(|(var, val)| (var.to_string(), val.to_string()))
                .collect(),
            env,
            layers: Vec::new(),
            eulas: EulaRegistry::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// The `conf/` directory of the build tree.
    pub fn conf_dir(&self) -> PathBuf {
        self.root.join(&self.build_dir).join("conf")
    }

    pub fn local_conf(&self) -> &ConfDocument {
        &self.local_conf
    }

    pub fn local_conf_mut(&mut self) -> &mut ConfDocument {
        &mut self.local_conf
    }

    pub fn layers_conf(&self) -> &ConfDocument {
        &self.layers_conf
    }

    pub fn layers_conf_mut(&mut self) -> &mut ConfDocument {
        &mut self.layers_conf
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Install the discovered layer table.
    pub fn set_layers(&mut self, layers: Vec<Layer>) {
        self.layers = layers;
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn env_var(&self, var: &str) -> Option<&str> {
        self.env.get(var).map(String::as_str)
    }

    pub fn set_env(&mut self, var: &str, val: &str) {
        self.env.insert(var.to_string(), val.to_string());
    }

    pub fn default(&self, var: &str) -> Option<&str> {
        self.defaults.get(var).map(String::as_str)
    }

    /// Override a default, to be picked up by later `weak_set_var` calls.
    pub fn set_default(&mut self, var: &str, val: &str) {
        self.defaults.insert(var.to_string(), val.to_string());
    }

    /// Bind `var` in the build variables document.
    pub fn set_var(&mut self, var: &str, op: Operator, val: &str) {
        self.local_conf.add(var, op, val);
    }

    /// Append to `var` in the build variables document.
    pub fn append_var(&mut self, var: &str, val: &str) {
        self.local_conf.add(var, Operator::Append, val);
    }

    /// Drop every binding of `var` from the build variables document.
    pub fn remove_var(&mut self, var: &str) {
        self.local_conf.remove(var);
    }

    /// Replace all bindings of `var` with a single one at the end.
    pub fn reset_var(&mut self, var: &str, op: Operator, val: &str) {
        self.local_conf.reset(var, op, val);
    }

    /// Replay an already-parsed assignment into the build variables
    /// document, operator preserved.
    pub fn apply(&mut self, assignment: Assignment) {
        self.local_conf.push(assignment);
    }

    /// Weakly bind `var`: environment value if present, else the default
    /// table's value, written with `?=` so the build's own configuration
    /// can still override it.
    pub fn weak_set_var(&mut self, var: &str) {
        let val = self
            .env
            .get(var)
            .or_else(|| self.defaults.get(var))
            .cloned()
            .unwrap_or_default();
        self.reset_var(var, Operator::Default, &val);
    }

    /// Append a layer directory to the layer search list.
    ///
    /// The current `BBLAYERS` value (all bindings, in order) is extended
    /// with the new directory, every listed directory's priority is
    /// resolved, and the whole list is rewritten sorted descending by
    /// priority. Any prior manual ordering is discarded: higher-priority
    /// layers are listed first, ties keeping their existing order.
    pub fn append_layer(&mut self, layer_dir: &str) -> Result<()> {
        let mut dirs: Vec<String> = self
            .layers_conf
            .assignments()
            .iter()
            .filter(|a| a.variable == "BBLAYERS")
            .flat_map(|a| a.value.iter())
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .collect();
        dirs.push(layer_dir.to_string());

        let mut prioritized: Vec<(i64, String)> = dirs
            .into_iter()
            .map(|dir| (layers::layer_priority(Path::new(&dir)), dir))
            .collect();
        prioritized.sort_by_key(|(priority, _)| std::cmp::Reverse(*priority));

        let listing = prioritized
            .into_iter()
            .map(|(_, dir)| dir)
            .collect::<Vec<_>>()
            .join(" ");
        self.layers_conf.reset("BBLAYERS", Operator::Append, &listing);
        Ok(())
    }

    /// Append several layer directories, in order.
    pub fn append_layers<S: AsRef<str>>(&mut self, layer_dirs: &[S]) -> Result<()> {
        for dir in layer_dirs {
            self.append_layer(dir.as_ref())?;
        }
        Ok(())
    }

    /// Machines provided by a discovered layer.
    pub fn machines_by_layer(&self, layer_name: &str) -> Result<Vec<String>> {
        let layer =
            layers::layer_by_name(&self.layers, layer_name).ok_or_else(|| Error::UnknownLayer {
                name: layer_name.to_string(),
            })?;
        Ok(layers::machines_in_layer(layer))
    }

    /// Register a EULA: accepting it appends `acceptance_expr` to the
    /// build variables file.
    pub fn require_eula(&mut self, eula_file: &str, acceptance_expr: &str) {
        self.eulas.require(eula_file, acceptance_expr);
    }

    pub fn eulas(&self) -> &EulaRegistry {
        &self.eulas
    }
}
