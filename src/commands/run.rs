use std::any::Any;
use std::io::Write;
use std::process::ExitCode;

use clap::ArgMatches;

use crate::context::Context;
use crate::flags::ExplicitString;

/// Process exit status reported by a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub u8);

impl Status {
    pub const SUCCESS: Status = Status(0);
    pub const FAILURE: Status = Status(1);
    /// Usage and dispatch errors
    pub const USAGE: Status = Status(2);

    #[must_use]
    pub fn code(self) -> u8 {
        self.0
    }

    /// Map a child process exit code onto a status; codes outside `0..=255`
    /// (or a missing code) collapse to `FAILURE`.
    #[must_use]
    pub fn from_code(code: Option<i32>) -> Self {
        code.and_then(|c| u8::try_from(c).ok())
            .map_or(Status::FAILURE, Status)
    }
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        ExitCode::from(status.code())
    }
}

/// Output and diagnostic streams handed to the renderer and to running commands
pub struct Streams<'a> {
    pub out: &'a mut dyn Write,
    pub err: &'a mut dyn Write,
}

impl<'a> Streams<'a> {
    pub fn new(out: &'a mut dyn Write, err: &'a mut dyn Write) -> Self {
        Streams { out, err }
    }
}

/// Arguments of a single leaf invocation
#[derive(Debug)]
pub struct Invocation {
    pub program: String,
    /// Usage path of the running command, e.g. `mod download`
    pub path: String,
    /// Positional arguments, or every remaining token for custom-flag commands
    pub args: Vec<String>,
    /// Parsed flags; `None` when the command parses its own flags
    pub matches: Option<ArgMatches>,
}

impl Invocation {
    /// Typed value of a flag, `None` when absent or undeclared
    #[must_use]
    pub fn get_one<T: Any + Clone + Send + Sync + 'static>(&self, id: &str) -> Option<&T> {
        self.matches
            .as_ref()
            .and_then(|m| m.try_get_one::<T>(id).ok().flatten())
    }

    /// Value of a boolean switch
    #[must_use]
    pub fn flag(&self, id: &str) -> bool {
        self.get_one::<bool>(id).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn explicit_string(&self, id: &str, default: &str) -> ExplicitString {
        match &self.matches {
            Some(matches) => ExplicitString::from_matches(matches, id, default),
            None => ExplicitString::new(default),
        }
    }

    /// `"<program> <path>"`, the prefix used in command diagnostics
    #[must_use]
    pub fn command_line(&self) -> String {
        format!("{} {}", self.program, self.path)
    }
}

pub type RunResult = Result<Status, Box<dyn std::error::Error + Send + Sync>>;

/// The run capability of a leaf command
pub trait Run: Send + Sync {
    /// Execute the command.
    ///
    /// # Errors
    ///
    /// Any error is reported by the dispatcher as a diagnostic on the error
    /// stream with status 1.
    fn run(&self, ctx: &Context, inv: &Invocation, io: &mut Streams<'_>) -> RunResult;
}

impl<F> Run for F
where
    F: Fn(&Context, &Invocation, &mut Streams<'_>) -> RunResult + Send + Sync,
{
    fn run(&self, ctx: &Context, inv: &Invocation, io: &mut Streams<'_>) -> RunResult {
        self(ctx, inv, io)
    }
}
