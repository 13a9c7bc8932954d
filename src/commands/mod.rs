//! Command tree with hierarchical organization
//!
//! A tool is described by a single tree of [`Command`] nodes built once at startup. Every node
//! is one of three shapes: a *group* (has subcommands, cannot run), a *leaf* (can run, has no
//! subcommands) or a *topic* (neither, only exists to be listed by `help`).
//!
//! The tree is immutable for the duration of an invocation. The dispatcher and the help renderer
//! both walk it by exact name, one token per level.

pub mod command;
pub mod run;

pub use command::{Command, TreeError};
pub use run::{Invocation, Run, RunResult, Status, Streams};
