//! The setup run
//!
//! One call to [`execute`] performs a complete setup pass:
//!
//! 1. Refuse to run privileged and check the wrapper handed us an
//!    environment report file.
//! 2. Discover layers and hook modules, order the modules, register
//!    their hooks.
//! 3. Run the `set-defaults` and `before-init` phases.
//! 4. Bootstrap the build directory through the core layer's init
//!    script and link the personal `site.conf`.
//! 5. Read the configuration documents, seed the weak defaults, run the
//!    `after-init` phase, write the documents back.
//! 6. Settle EULAs and write the environment report.
//!
//! Documents opened over pre-existing files stay untouched throughout
//! (the no-clobber policy lives in [`crate::document`]); the run itself
//! does not special-case them.

use std::path::Path;

use log::{debug, info};

use crate::assignment::Operator;
use crate::bootstrap;
use crate::error::{Error, Result};
use crate::eula;
use crate::hooks::{Hooks, Phase};
use crate::layers;
use crate::modules;
use crate::session::Session;

/// Whether the current process runs as root.
///
/// Builds create files owned by the invoking user all over the
/// workspace; a root-owned build tree is unusable afterwards.
pub fn is_root() -> bool {
    // SAFETY: getuid has no failure mode and touches no memory.
    unsafe { libc::getuid() == 0 }
}

/// Variables seeded with `?=` into a fresh build configuration.
const WEAK_VARS: [&str; 4] = ["MACHINE", "DISTRO", "SDKMACHINE", "PACKAGE_CLASSES"];

/// Run the whole setup for `build_dir` under `root`, reporting the
/// resulting environment into `env_file`.
pub fn execute(root: &Path, build_dir: &str, env_file: &Path) -> Result<()> {
    if is_root() {
        return Err(Error::Privilege);
    }
    if !env_file.exists() {
        return Err(Error::MissingEnvFile {
            path: env_file.display().to_string(),
        });
    }

    let mut session = Session::new(root, build_dir);
    let oe_root = bootstrap::oe_root(root);
    session.set_env("OEROOT", &oe_root.display().to_string());
    session.set_env("PLATFORM_ROOT_DIR", &root.display().to_string());
    std::env::set_var("OEROOT", &oe_root);
    std::env::set_var("PLATFORM_ROOT_DIR", root);

    let found = layers::find_layers(root);
    info!("found {} layers under {}", found.len(), root.display());
    session.set_layers(found);

    let mut hooks = Hooks::new();
    let ordered = modules::order_modules(modules::discover_modules(root), session.layers())?;
    for module in &ordered {
        debug!("registering hook module {}", module.path.display());
        modules::register(module, &mut hooks)?;
    }

    hooks.run(Phase::SetDefaults, &mut session)?;
    hooks.run(Phase::BeforeInit, &mut session)?;

    bootstrap::run_init_script(&mut session)?;
    bootstrap::link_site_conf(&session)?;

    session.local_conf_mut().read()?;
    session.layers_conf_mut().read()?;

    session.reset_var(
        "PLATFORM_ROOT_DIR",
        Operator::Assign,
        &root.display().to_string(),
    );
    for var in WEAK_VARS {
        session.weak_set_var(var);
    }

    hooks.run(Phase::AfterInit, &mut session)?;

    session.local_conf().write()?;
    session.layers_conf().write()?;

    eula::handle(&session)?;
    bootstrap::report_environment(&session, env_file)?;
    info!(
        "build directory {} is ready",
        root.join(build_dir).display()
    );
    Ok(())
}
