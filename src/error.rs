//! # Error Handling
//!
//! Centralized error type for `bsp-setup`, built with `thiserror`. Every
//! fatal failure mode of a setup run has a dedicated variant carrying the
//! context needed for a one-line actionable message:
//!
//! - Malformed assignment lines (`Syntax`, `InvalidOperator`) — fatal,
//!   configuration files must not be silently misread.
//! - An ambiguous default hook module (`ModuleConflict`) — fatal, reported
//!   with both offending paths before any module executes.
//! - A missing EULA text file (`MissingEula`) — fatal.
//! - Bootstrap and privilege failures.
//!
//! Recoverable conditions (an undeterminable layer priority, a read-only
//! configuration file) are *not* errors; they are handled locally and
//! logged at the appropriate level.

use thiserror::Error;

/// Main error type for bsp-setup operations
#[derive(Error, Debug)]
pub enum Error {
    /// An assignment line contained a character that cannot be part of an
    /// operator where an operator was expected.
    #[error("Syntax error (operator): {line}")]
    Syntax { line: String },

    /// An assignment line used an operator spelling outside the closed
    /// operator set.
    #[error("Invalid operator `{operator}`: {line}")]
    InvalidOperator { operator: String, line: String },

    /// Two hook modules resolved to neither a layer nor a priority file.
    /// Only one "unscoped" module is allowed per run; a second one makes
    /// the default-module position ambiguous.
    #[error("Ambiguous unscoped hook modules: {first} and {second} both lack an owning layer and a priority file")]
    ModuleConflict { first: String, second: String },

    /// A registered EULA's text file does not exist on disk.
    #[error("{path} does not exist. Aborting.")]
    MissingEula { path: String },

    /// The environment report file was not created by the calling wrapper.
    #[error("env file ({path}) does not exist. Aborting.")]
    MissingEnvFile { path: String },

    /// The external build-environment bootstrap could not be run or
    /// reported a failure.
    #[error("Build environment bootstrap failed: {message}")]
    Bootstrap { message: String },

    /// The tool was invoked by a privileged user.
    #[error("do not run the BSP setup as root. Exiting...")]
    Privilege,

    /// A named layer was not found in the workspace.
    #[error("Could not find layer {name}")]
    UnknownLayer { name: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
