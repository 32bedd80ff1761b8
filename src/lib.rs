//! # BSP Setup Library
//!
//! This library provides the core functionality for setting up
//! OpenEmbedded-style BSP build directories from a layered workspace. It
//! is designed to be used by the `bsp-setup` command-line tool but the
//! individual pieces (the assignment parser in particular) stand on
//! their own.
//!
//! ## Quick Example
//!
//! ```
//! use bsp_setup::assignment::{parse_assignment, Operator};
//!
//! let parsed = parse_assignment("MACHINE ?= 'wandboard-solo'")
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(parsed.variable, "MACHINE");
//! assert_eq!(parsed.operator, Operator::Default);
//! assert_eq!(parsed.value, vec!["wandboard-solo"]);
//! ```
//!
//! ## Core Concepts
//!
//! The library is built around a few key concepts:
//!
//! - **Assignments (`assignment`)**: The parser and formatter for the
//!   line-oriented assignment dialect used by the configuration files,
//!   with a closed operator set and whitespace-run-preserving values.
//! - **Documents (`document`)**: Ordered assignment collections backed
//!   by files, with a strict no-clobber policy for pre-existing files.
//! - **Layers (`layers`)**: Discovery of layer directories under
//!   `sources/` and resolution of their priorities.
//! - **Hook modules (`modules`, `hooks`)**: Per-layer customization
//!   files, deterministically ordered and replayed through the three
//!   hook phases.
//! - **The session (`session`)**: All mutable state of one run, and the
//!   mutation API hook callbacks program against.
//!
//! ## Execution Flow
//!
//! The main entry point is [`run::execute`], which performs the
//! following high-level steps:
//!
//! 1.  **Discovery**: Find layers and hook modules, order the modules,
//!     register their hooks.
//! 2.  **Early phases**: Run `set-defaults` and `before-init`.
//! 3.  **Bootstrap**: Source the core layer's init script and absorb the
//!     build environment it exports.
//! 4.  **Configuration**: Read the documents, seed weak defaults, run
//!     `after-init`, write the documents back.
//! 5.  **Settlement**: Resolve EULA acceptances and write the
//!     environment report for the calling wrapper.

pub mod assignment;
pub mod bootstrap;
pub mod cli;
pub mod document;
pub mod error;
pub mod eula;
pub mod hooks;
pub mod layers;
pub mod modules;
pub mod run;
pub mod session;

pub use error::{Error, Result};
