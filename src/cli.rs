//! CLI argument parsing and dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::run;

/// Set up a BSP build directory from the workspace's layers
#[derive(Parser, Debug)]
#[command(name = "bsp-setup")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Build directory to create or reuse, relative to the workspace root
    #[arg(value_name = "BUILD_DIR")]
    build_dir: String,

    /// Environment report file pre-created by the calling wrapper
    #[arg(value_name = "ENV_FILE")]
    env_file: PathBuf,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// Only log warnings and errors
    #[arg(long)]
    quiet: bool,
}

impl Cli {
    /// Run the setup described by the parsed arguments.
    pub fn execute(self) -> Result<()> {
        let level = if self.quiet { "warn" } else { &self.log_level };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
            .format_timestamp(None)
            .init();

        // The wrapper exports the workspace root; running the binary
        // directly falls back to the current directory.
        let root = match std::env::var_os("PLATFORM_ROOT_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir()?,
        };
        run::execute(&root, &self.build_dir, &self.env_file)?;
        Ok(())
    }
}
