//! A transpile-and-execute toolchain for the fenrir surface language.
//!
//! A `.fnr` file is split into statements, rewritten line by line into
//! JavaScript, terminated and emitted as one ES module. The module then runs
//! under Node.js in a throwaway workspace that mirrors the project's
//! dependencies, with a small capability object bound to `globalThis.fenrir`.
//!
//! The main entry point is [`Toolchain`]. The stage modules are public so each
//! step can be driven on its own, e.g. to inspect the output of
//! [`transform::transform_all`] without running anything.

pub mod bridge;
pub mod cli;
pub mod config;
pub mod emitter;
pub mod env;
pub mod error;
mod host;
pub mod io_adapters;
mod runner;
pub mod sandbox;
pub mod scanner;
pub mod source;
pub mod terminator;
pub mod transform;
mod workspace;

pub use error::{FenrirError, Result};
pub use runner::{Compiled, RunOptions, Toolchain};
pub use sandbox::{Execution, ExitCode};
pub use workspace::MirrorWarning;
