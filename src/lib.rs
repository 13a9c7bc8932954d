//! Dispatch core of a multi-level command-line tool
//!
//! A tree of named commands and help topics, a dispatcher that resolves an
//! argument vector to one runnable command, a help renderer driven by the same
//! tree, and a layered environment configuration store. The `clitree` binary
//! wires these together with a small set of built-in commands.

pub mod builtin;
pub mod commands;
pub mod config_file;
pub mod context;
pub mod dispatch;
pub mod flags;
pub mod help;
pub mod logger;
pub mod repo;
