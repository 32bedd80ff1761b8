//! # BSP Setup CLI
//!
//! This is the binary entry point for the `bsp-setup` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Running the setup and translating failures into user-friendly
//!   output.
//!
//! The core application logic lives in the library crate; the binary is
//! a thin wrapper around it. Every failure exits with status 1 — the
//! calling shell wrapper only distinguishes success from failure.

use std::process::ExitCode;

use clap::Parser;

use bsp_setup::cli::Cli;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version land here too; those are not failures.
            let failed = err.use_stderr();
            let _ = err.print();
            return if failed {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    if let Err(err) = cli.execute() {
        eprintln!("Error: {:#}", err);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}
