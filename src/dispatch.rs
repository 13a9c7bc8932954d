//! Resolving an argument vector to a single command
//!
//! The first token is matched against the root's children, the next against
//! the matched group's children, and so on until a runnable command is reached.
//! A leading `help` token, or `help` right after a group name, hands the rest of
//! the arguments to the help renderer instead.

use std::io;

use clap::{Arg, ArgAction};
use log::debug;
use thiserror::Error;

use crate::commands::{Command, Invocation, Status, Streams};
use crate::context::Context;
use crate::help::{Help, strip_marker};

/// Id of the catch-all positional argument added to every leaf's flag set
const POSITIONAL: &str = "args";

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("writing output: {0}")]
    Output(#[from] io::Error),
}

impl DispatchError {
    /// A write to a closed pipe; the process should exit quietly with status 1
    #[must_use]
    pub fn is_broken_pipe(&self) -> bool {
        match self {
            DispatchError::Output(e) => e.kind() == io::ErrorKind::BrokenPipe,
        }
    }
}

pub struct Dispatcher<'a> {
    root: &'a Command,
    ctx: &'a Context,
}

impl<'a> Dispatcher<'a> {
    #[must_use]
    pub fn new(root: &'a Command, ctx: &'a Context) -> Self {
        Dispatcher { root, ctx }
    }

    fn help(&self) -> Help<'a> {
        Help::new(self.root)
    }

    fn prog(&self) -> &str {
        &self.root.usage_line
    }

    /// Run the command named by `args` (the process arguments without the
    /// program name).
    ///
    /// Returns `Status::USAGE` for unknown commands and incomplete group
    /// paths; otherwise whatever the help renderer or the command reports.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Output` when writing help or diagnostics fails,
    /// or when a command fails writing to a closed pipe.
    pub fn run(&self, args: &[String], io: &mut Streams<'_>) -> Result<Status, DispatchError> {
        let Some(first) = args.first() else {
            self.help().print_usage(io.err, self.root, &[])?;
            return Ok(Status::USAGE);
        };
        if first == "help" {
            return Ok(self.help().help(&args[1..], io)?);
        }

        let mut cmd = self.root;
        let mut consumed = 0;
        loop {
            let token = &args[consumed];
            let Some(sub) = cmd
                .find(token)
                .filter(|sub| sub.is_group() || sub.is_runnable())
            else {
                return self.unknown_command(&args[..=consumed], io);
            };
            consumed += 1;

            if !sub.is_group() {
                return self.invoke(sub, &args[..consumed], &args[consumed..], io);
            }
            cmd = sub;
            match args.get(consumed).map(String::as_str) {
                None => {
                    self.help().print_usage(io.err, cmd, &args[..consumed])?;
                    return Ok(Status::USAGE);
                }
                Some("help") => {
                    // `tool mod help download` is `tool help mod download`
                    let mut topic = args[..consumed].to_vec();
                    topic.extend_from_slice(&args[consumed + 1..]);
                    return Ok(self.help().help(&topic, io)?);
                }
                Some(_) => {}
            }
        }
    }

    fn unknown_command(
        &self,
        path: &[String],
        io: &mut Streams<'_>,
    ) -> Result<Status, DispatchError> {
        let prog = self.prog();
        let help_arg = match path.split_last() {
            Some((_, parents)) if !parents.is_empty() => format!(" {}", parents.join(" ")),
            _ => String::new(),
        };
        write!(
            io.err,
            "{prog} {}: unknown command\nRun '{prog} help{help_arg}' for usage.\n",
            path.join(" ")
        )?;
        io.err.flush()?;
        Ok(Status::USAGE)
    }

    fn invoke(
        &self,
        cmd: &Command,
        path: &[String],
        rest: &[String],
        io: &mut Streams<'_>,
    ) -> Result<Status, DispatchError> {
        let long_name = path.join(" ");
        let mut inv = Invocation {
            program: self.prog().to_string(),
            path: long_name,
            args: rest.to_vec(),
            matches: None,
        };
        if !cmd.custom_flags {
            match flag_parser(cmd).try_get_matches_from(rest) {
                Ok(matches) => {
                    inv.args = matches
                        .get_many::<String>(POSITIONAL)
                        .map(|values| values.cloned().collect())
                        .unwrap_or_default();
                    inv.matches = Some(matches);
                }
                Err(e) => return self.flag_error(cmd, &inv.path, &e, io),
            }
        }

        let Some(runner) = &cmd.runner else {
            return self.unknown_command(path, io);
        };
        debug!("Running `{}` with {} arguments", inv.path, inv.args.len());
        match runner.run(self.ctx, &inv, io) {
            Ok(status) => Ok(status),
            Err(e) => match e.downcast::<io::Error>() {
                Ok(e) if e.kind() == io::ErrorKind::BrokenPipe => Err(DispatchError::Output(*e)),
                Ok(e) => self.report(&inv, &*e, io),
                Err(e) => self.report(&inv, &*e, io),
            },
        }
    }

    fn report(
        &self,
        inv: &Invocation,
        e: &dyn std::error::Error,
        io: &mut Streams<'_>,
    ) -> Result<Status, DispatchError> {
        writeln!(io.err, "{}: {e}", inv.command_line())?;
        io.err.flush()?;
        Ok(Status::FAILURE)
    }

    fn flag_error(
        &self,
        cmd: &Command,
        long_name: &str,
        e: &clap::Error,
        io: &mut Streams<'_>,
    ) -> Result<Status, DispatchError> {
        let rendered = e.render().to_string();
        let message = rendered.lines().next().unwrap_or_default();
        write!(
            io.err,
            "{message}\nusage: {}\nRun '{} help {long_name}' for details.\n",
            strip_marker(&cmd.usage_line),
            self.prog()
        )?;
        io.err.flush()?;
        Ok(Status::USAGE)
    }
}

/// The leaf's flags plus a trailing positional that collects everything from
/// the first non-flag argument on. A repeated flag keeps its last value.
fn flag_parser(cmd: &Command) -> clap::Command {
    clap::Command::new(cmd.name.clone())
        .no_binary_name(true)
        .args_override_self(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .args(cmd.flags.iter().cloned())
        .arg(
            Arg::new(POSITIONAL)
                .action(ArgAction::Append)
                .num_args(0..)
                .trailing_var_arg(true),
        )
}
