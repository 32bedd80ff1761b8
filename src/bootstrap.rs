//! Build environment bootstrap
//!
//! The actual build directory scaffolding (including the initial
//! `conf/local.conf` and `conf/bblayers.conf` when absent) is delegated
//! to the build system's own init script. This module locates that
//! script, sources it in a shell, and captures the environment it
//! exports so the rest of the run (and the calling wrapper) see the same
//! build environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::session::Session;

/// The script name supplied by the core layer.
const INIT_SCRIPT: &str = "oe-init-build-env";

/// Locate the core layer directory holding the init script.
///
/// `sources/oe-core` wins over `sources/poky` when both exist.
pub fn oe_root(root: &Path) -> PathBuf {
    let oe_core = root.join("sources").join("oe-core");
    if oe_core.exists() {
        return oe_core;
    }
    root.join("sources").join("poky")
}

/// Split `env(1)`-style output into variable bindings.
///
/// Lines without a `=` (continuation lines of multi-line values, mostly
/// exported shell functions) are dropped.
fn parse_env_lines(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(var, val)| (var.to_string(), val.to_string()))
        .collect()
}

/// Source the init script and absorb the environment it sets up.
///
/// The script is sourced in a throwaway bash with the build directory as
/// its argument; its chatter goes to `/dev/null` and the resulting
/// environment is read back from `env`. Every binding is mirrored into
/// both the session snapshot and the real process environment, so later
/// child processes inherit it.
pub fn run_init_script(session: &mut Session) -> Result<()> {
    let oe_root = oe_root(session.root());
    let script = oe_root.join(INIT_SCRIPT);
    if !script.exists() {
        return Err(Error::Bootstrap {
            message: format!("{} not found", script.display()),
        });
    }

    let build_dir = session.root().join(session.build_dir());
    let command = format!(
        "source {} {} > /dev/null && env",
        script.display(),
        build_dir.display()
    );
    debug!("bootstrapping build environment: bash -c {:?}", command);
    let output = Command::new("bash")
        .arg("-c")
        .arg(&command)
        .current_dir(&oe_root)
        .output()
        .map_err(|err| Error::Bootstrap {
            message: format!("could not run bash: {}", err),
        })?;
    if !output.status.success() {
        return Err(Error::Bootstrap {
            message: format!(
                "{} exited with {}: {}",
                INIT_SCRIPT,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    for (var, val) in parse_env_lines(&stdout) {
        std::env::set_var(&var, &val);
        session.set_env(&var, &val);
    }
    Ok(())
}

/// Link the user's personal `site.conf` into the build tree.
///
/// `~/.oe/site.conf` is preferred over `~/.yocto/site.conf`. A stale
/// symlink at the destination is replaced; a regular file there is the
/// user's own and is left untouched with a warning.
pub fn link_site_conf(session: &Session) -> Result<()> {
    let Some(home) = dirs::home_dir() else {
        debug!("no home directory, skipping site.conf");
        return Ok(());
    };
    let source = [home.join(".oe"), home.join(".yocto")]
        .iter()
        .map(|dir| dir.join("site.conf"))
        .find(|path| path.exists());
    let Some(source) = source else {
        debug!("no personal site.conf found");
        return Ok(());
    };

    let dest = session.conf_dir().join("site.conf");
    if dest.exists() || dest.is_symlink() {
        if !dest.is_symlink() {
            warn!(
                "{} exists but is not a symlink. Not touching it.",
                dest.display()
            );
            return Ok(());
        }
        fs::remove_file(&dest)?;
    }
    debug!("linking {} -> {}", dest.display(), source.display());
    std::os::unix::fs::symlink(&source, &dest)?;
    Ok(())
}

/// Write the environment report the calling wrapper sources.
///
/// One `VAR=VAL` line per variable in the session snapshot, sorted, so
/// consecutive runs over an unchanged environment produce identical
/// files.
pub fn report_environment(session: &Session, env_file: &Path) -> Result<()> {
    let mut out = String::new();
    for (var, val) in session.env() {
        out.push_str(var);
        out.push('=');
        out.push_str(val);
        out.push('\n');
    }
    fs::write(env_file, out)?;
    Ok(())
}
