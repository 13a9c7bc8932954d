use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use clap::Arg;
use thiserror::Error;

use crate::commands::run::Run;

/// Structural problems in a command tree
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TreeError {
    #[error("duplicate command name `{name}` under `{parent}`")]
    DuplicateName { parent: String, name: String },
    #[error("invalid command name `{name}` under `{parent}`")]
    InvalidName { parent: String, name: String },
    #[error("command `{0}` is runnable but also has subcommands")]
    RunnableGroup(String),
}

/// A single node of the command tree
#[derive(Clone, Default)]
pub struct Command {
    pub name: String,
    /// One-line synopsis, starting with the full command path (`tool mod download [-x]`)
    pub usage_line: String,
    pub short: String,
    pub long: String,
    /// The command parses its own arguments; the dispatcher passes them through verbatim
    pub custom_flags: bool,
    pub commands: Vec<Command>,
    pub flags: Vec<Arg>,
    pub runner: Option<Arc<dyn Run>>,
}

impl Command {
    /// The root of a tree. Its usage line is the program name.
    #[must_use]
    pub fn root(prog: &str, long: &str, commands: Vec<Command>) -> Self {
        Command {
            name: prog.to_string(),
            usage_line: prog.to_string(),
            long: long.to_string(),
            commands,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn group(
        name: &str,
        usage_line: &str,
        short: &str,
        long: &str,
        commands: Vec<Command>,
    ) -> Self {
        Command {
            name: name.to_string(),
            usage_line: usage_line.to_string(),
            short: short.to_string(),
            long: long.to_string(),
            commands,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn leaf(
        name: &str,
        usage_line: &str,
        short: &str,
        long: &str,
        runner: impl Run + 'static,
    ) -> Self {
        Command {
            name: name.to_string(),
            usage_line: usage_line.to_string(),
            short: short.to_string(),
            long: long.to_string(),
            runner: Some(Arc::new(runner)),
            ..Default::default()
        }
    }

    /// A documentation-only node, listed under "additional help topics"
    #[must_use]
    pub fn topic(name: &str, short: &str, long: &str) -> Self {
        Command {
            name: name.to_string(),
            usage_line: name.to_string(),
            short: short.to_string(),
            long: long.to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn flag(mut self, arg: Arg) -> Self {
        self.flags.push(arg);
        self
    }

    #[must_use]
    pub fn custom_flags(mut self) -> Self {
        self.custom_flags = true;
        self
    }

    #[must_use]
    pub fn is_runnable(&self) -> bool {
        self.runner.is_some()
    }

    #[must_use]
    pub fn is_group(&self) -> bool {
        !self.commands.is_empty()
    }

    #[must_use]
    pub fn is_topic(&self) -> bool {
        !self.is_runnable() && !self.is_group()
    }

    /// Finds the direct child with exactly this name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|cmd| cmd.name == name)
    }

    /// Check the authoring invariants of the whole tree: sibling names are unique
    /// single tokens, and no node is both runnable and a group.
    ///
    /// # Errors
    ///
    /// Returns the first `TreeError` found in a depth-first walk.
    pub fn validate(&self) -> Result<(), TreeError> {
        self.validate_at(&self.name)
    }

    fn validate_at(&self, path: &str) -> Result<(), TreeError> {
        if self.is_runnable() && self.is_group() {
            return Err(TreeError::RunnableGroup(path.to_string()));
        }
        let mut seen = HashSet::new();
        for child in &self.commands {
            if child.name.is_empty() || child.name.contains(char::is_whitespace) {
                return Err(TreeError::InvalidName {
                    parent: path.to_string(),
                    name: child.name.clone(),
                });
            }
            if !seen.insert(child.name.as_str()) {
                return Err(TreeError::DuplicateName {
                    parent: path.to_string(),
                    name: child.name.clone(),
                });
            }
            child.validate_at(&format!("{path} {}", child.name))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("usage_line", &self.usage_line)
            .field("custom_flags", &self.custom_flags)
            .field("commands", &self.commands)
            .field("flags", &self.flags.len())
            .field("runnable", &self.is_runnable())
            .finish_non_exhaustive()
    }
}
