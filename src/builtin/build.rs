use std::path::Path;
use std::str::FromStr;

use clap::{Arg, ArgAction};

use crate::builtin::{FLAGS, TAGS};
use crate::commands::{Command, Invocation, RunResult, Status, Streams};
use crate::config_file::ConfigStore;
use crate::context::Context;
use crate::flags::{FlagError, QuotedList, TagList};

const LONG: &str = "
Build resolves a build request and prints it. Compiling is left to the
builder that consumes the request.

The -o flag names the output file. When it is not given, the output is
named after the last element of the first argument, or a.out.

The --tags flag takes a comma-separated list of build tags. The older
space-separated form, optionally quoted, is accepted too. Without the flag
the tags come from CLITREE_TAGS.

The --flags flag takes a space-separated list of arguments for the
builder, where an argument containing spaces is written in single or double
quotes. Without the flag the list comes from CLITREE_FLAGS.

The -x flag also prints the configuration handed to the builder.

For more about build tags, see 'clitree help buildtags'.
";

#[must_use]
pub fn command() -> Command {
    Command::leaf(
        "build",
        "clitree build [-o output] [-x] [--tags list] [--flags list] [args...]",
        "resolve and print a build request",
        LONG,
        run,
    )
    .flag(Arg::new("o").short('o').value_name("output"))
    .flag(Arg::new("x").short('x').action(ArgAction::SetTrue))
    .flag(
        Arg::new("tags")
            .long("tags")
            .value_name("list")
            .value_parser(TagList::from_str),
    )
    .flag(
        Arg::new("flags")
            .long("flags")
            .value_name("list")
            .value_parser(QuotedList::from_str),
    )
}

fn quote(field: &str) -> String {
    if field.is_empty() || field.contains(char::is_whitespace) {
        format!("'{field}'")
    } else {
        field.to_string()
    }
}

/// Parse the configured value of `key` the way the matching flag would be parsed
fn from_config<T>(config: &ConfigStore, key: &str) -> Result<T, String>
where
    T: FromStr<Err = FlagError>,
{
    T::from_str(config.resolved(key))
        .map_err(|e| format!("{key}: {e}"))
}

fn run(ctx: &Context, inv: &Invocation, io: &mut Streams<'_>) -> RunResult {
    let config = ctx.config();
    let tags = match inv.get_one::<TagList>("tags") {
        Some(tags) => tags.clone(),
        None => from_config(config, TAGS)?,
    };
    let flags = match inv.get_one::<QuotedList>("flags") {
        Some(flags) => flags.clone(),
        None => from_config(config, FLAGS)?,
    };
    let default_output = inv
        .args
        .first()
        .and_then(|arg| Path::new(arg).file_name())
        .and_then(|name| name.to_str())
        .unwrap_or("a.out");
    let output = inv.explicit_string("o", default_output);

    let origin = if output.explicit { "" } else { " (default)" };
    writeln!(io.out, "output: {}{origin}", output.value)?;
    writeln!(io.out, "tags: {}", tags.join(","))?;
    let flags: Vec<String> = flags.iter().map(|f| quote(f)).collect();
    writeln!(io.out, "flags: {}", flags.join(" "))?;
    writeln!(io.out, "args: {}", inv.args.join(" "))?;
    if inv.flag("x") {
        for entry in config.entries() {
            writeln!(io.out, "{}={}", entry.name, quote(&entry.value))?;
        }
    }
    Ok(Status::SUCCESS)
}
