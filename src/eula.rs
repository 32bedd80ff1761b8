//! EULA registration and acceptance
//!
//! Vendor layers may gate their use behind a license text. Hook modules
//! register these during setup: a text file under `sources/` plus the
//! acceptance line that must end up in the build variables file. After
//! the configuration is written, every registered EULA is walked: already
//! accepted ones are skipped, pre-approved ones (via the
//! `ACCEPTED_EULAS` environment variable) are recorded silently, and the
//! rest are shown to the user for an interactive yes/no.
//!
//! Acceptance is recorded by appending the acceptance line verbatim to
//! the build variables file, even when that file pre-existed: a recorded
//! acceptance must survive the no-clobber policy, and appending never
//! destroys hand-edited content.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use console::style;
use dialoguer::Confirm;
use log::{info, warn};

use crate::assignment::parse_assignment;
use crate::document::ConfDocument;
use crate::error::{Error, Result};
use crate::session::Session;

/// Registered EULAs: text file name (relative to `sources/`) mapped to
/// the acceptance assignment line.
#[derive(Debug, Default, Clone)]
pub struct EulaRegistry {
    accept: BTreeMap<String, String>,
}

impl EulaRegistry {
    /// Register a EULA. Re-registering a file replaces its acceptance
    /// line.
    pub fn require(&mut self, eula_file: &str, acceptance_expr: &str) {
        self.accept
            .insert(eula_file.to_string(), acceptance_expr.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.accept.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.accept
            .iter()
            .map(|(file, expr)| (file.as_str(), expr.as_str()))
    }
}

/// The on-disk location of a registered EULA text.
fn eula_path(root: &Path, eula_file: &str) -> PathBuf {
    root.join("sources").join(eula_file)
}

/// Whether `conf_path` already carries the acceptance line.
///
/// The match ignores the operator: any binding of the acceptance
/// variable to the acceptance value counts, however it was spelled.
fn accepted_in_conf(conf_path: &Path, acceptance_expr: &str) -> bool {
    let Ok(Some(wanted)) = parse_assignment(acceptance_expr) else {
        return false;
    };
    let mut conf = ConfDocument::new_quiet(conf_path);
    if conf.read().is_err() {
        return false;
    }
    conf.assignments()
        .iter()
        .any(|a| a.variable == wanted.variable && a.value == wanted.value)
}

/// Append the acceptance line to `conf_path`, verbatim.
fn record_acceptance(conf_path: &Path, acceptance_expr: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(conf_path)?;
    writeln!(file, "{}", acceptance_expr)?;
    Ok(())
}

/// Names pre-approved through the `ACCEPTED_EULAS` environment variable.
fn pre_approved(session: &Session, eula_file: &str) -> bool {
    session
        .env_var("ACCEPTED_EULAS")
        .map(|accepted| accepted.split_whitespace().any(|name| name == eula_file))
        .unwrap_or(false)
}

/// Show one EULA and ask for acceptance.
fn prompt_acceptance(eula_file: &str, text: &str, banner_shown: &mut bool) -> Result<bool> {
    if !*banner_shown {
        println!(
            "{}",
            style("Some layers in this build require accepting an end user license.").bold()
        );
        *banner_shown = true;
    }
    println!("{}", text);
    let accepted = Confirm::new()
        .with_prompt(format!("Do you accept the {} end user license?", eula_file))
        .default(false)
        .interact()
        .map_err(|err| Error::Bootstrap {
            message: format!("EULA prompt failed: {}", err),
        })?;
    Ok(accepted)
}

/// Walk every registered EULA and settle its acceptance state.
///
/// A registered EULA whose text file is missing aborts the run. A
/// declined EULA is not fatal; the build is simply left without the
/// acceptance line, and the vendor layer will refuse to build until the
/// user accepts.
pub fn handle(session: &Session) -> Result<()> {
    if session.eulas().is_empty() {
        return Ok(());
    }
    let conf_path = session.local_conf().path().to_path_buf();
    let mut banner_shown = false;

    for (eula_file, acceptance_expr) in session.eulas().iter() {
        let path = eula_path(session.root(), eula_file);
        if !path.exists() {
            return Err(Error::MissingEula {
                path: path.display().to_string(),
            });
        }
        if accepted_in_conf(&conf_path, acceptance_expr) {
            info!("EULA {} already accepted", eula_file);
            continue;
        }
        if pre_approved(session, eula_file) {
            info!("EULA {} pre-approved via ACCEPTED_EULAS", eula_file);
            record_acceptance(&conf_path, acceptance_expr)?;
            continue;
        }
        let text = fs::read_to_string(&path)?;
        if prompt_acceptance(eula_file, &text, &mut banner_shown)? {
            record_acceptance(&conf_path, acceptance_expr)?;
        } else {
            warn!("EULA {} was not accepted", eula_file);
        }
    }
    Ok(())
}
