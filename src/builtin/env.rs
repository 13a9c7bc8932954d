use clap::{Arg, ArgAction};
use serde_json::{Map, Value};

use crate::commands::{Command, Invocation, RunResult, Status, Streams};
use crate::config_file::ConfigStore;
use crate::context::Context;

const LONG: &str = "
Env prints clitree configuration.

By default env prints every setting as a shell assignment. If one or more
names are given as arguments, env prints the value of each named variable
on its own line.

The --json flag prints the settings as a JSON object instead.

The -w flag requires one or more arguments of the form NAME=VALUE and
changes the default settings of the named variables to the given values,
by writing them to the configuration file.

The -u flag requires one or more arguments and unsets the default settings
for the named variables, if one has been set with 'clitree env -w'.

For more about configuration variables, see 'clitree help environment'.
";

#[must_use]
pub fn command() -> Command {
    Command::leaf(
        "env",
        "clitree env [--json] [-u] [-w] [var ...]",
        "print clitree configuration",
        LONG,
        run,
    )
    .flag(Arg::new("json").long("json").action(ArgAction::SetTrue))
    .flag(Arg::new("u").short('u').action(ArgAction::SetTrue))
    .flag(Arg::new("w").short('w').action(ArgAction::SetTrue))
}

/// Quote `value` for a POSIX shell
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

fn value_of(config: &ConfigStore, name: &str) -> String {
    if config.can_getenv(name) {
        config.resolved(name).to_string()
    } else {
        String::new()
    }
}

fn run(ctx: &Context, inv: &Invocation, io: &mut Streams<'_>) -> RunResult {
    let config = ctx.config();
    let cmd = inv.command_line();
    match (inv.flag("w"), inv.flag("u")) {
        (true, true) => {
            writeln!(io.err, "{cmd}: -w and -u are mutually exclusive")?;
            return Ok(Status::USAGE);
        }
        (true, false) => return write_values(config, inv, io),
        (false, true) => return unset_values(config, inv, io),
        (false, false) => {}
    }

    let pairs: Vec<(String, String)> = if inv.args.is_empty() {
        config
            .entries()
            .iter()
            .map(|e| (e.name.clone(), e.value.clone()))
            .collect()
    } else {
        inv.args
            .iter()
            .map(|name| (name.clone(), value_of(config, name)))
            .collect()
    };

    if inv.flag("json") {
        let map: Map<String, Value> = pairs
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect();
        serde_json::to_writer_pretty(&mut *io.out, &map)?;
        writeln!(io.out)?;
    } else if inv.args.is_empty() {
        for (name, value) in pairs {
            writeln!(io.out, "{name}={}", shell_quote(&value))?;
        }
    } else {
        for (_, value) in pairs {
            writeln!(io.out, "{value}")?;
        }
    }
    Ok(Status::SUCCESS)
}

fn write_values(config: &ConfigStore, inv: &Invocation, io: &mut Streams<'_>) -> RunResult {
    let cmd = inv.command_line();
    if inv.args.is_empty() {
        writeln!(io.err, "{cmd}: no NAME=VALUE arguments given")?;
        return Ok(Status::USAGE);
    }
    let mut set = Vec::with_capacity(inv.args.len());
    for arg in &inv.args {
        let Some((name, value)) = arg.split_once('=') else {
            writeln!(
                io.err,
                "{cmd}: arguments must be NAME=VALUE: invalid argument: {arg}"
            )?;
            return Ok(Status::USAGE);
        };
        set.push((name.to_string(), value.to_string()));
    }
    config.write_env_file(&set, &[])?;
    for (name, value) in &set {
        if let Some(os_value) = config.os_value(name)
            && os_value != value
        {
            writeln!(
                io.err,
                "warning: {cmd} -w {name}={value} does not override conflicting OS environment variable"
            )?;
        }
    }
    Ok(Status::SUCCESS)
}

fn unset_values(config: &ConfigStore, inv: &Invocation, io: &mut Streams<'_>) -> RunResult {
    if inv.args.is_empty() {
        writeln!(io.err, "{}: no variable names given", inv.command_line())?;
        return Ok(Status::USAGE);
    }
    config.write_env_file(&[], &inv.args)?;
    Ok(Status::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{CONFIG_DIRNAME, ENV_NAME, FLAGS, MODCACHE, Settings, TAGS, defaults};
    use crate::dispatch::Dispatcher;

    fn run_env(environ: &[(&str, &str)], args: &[&str]) -> (Status, String, String) {
        let ctx = Context::new(
            ConfigStore::builder(ENV_NAME, CONFIG_DIRNAME)
                .environ(environ.iter().copied())
                .setup(defaults(&Settings::default())),
        );
        let root = crate::builtin::tree();
        let mut argv = vec!["env".to_string()];
        argv.extend(args.iter().map(|s| (*s).to_string()));
        let mut out = Vec::new();
        let mut err = Vec::new();
        let status = Dispatcher::new(&root, &ctx)
            .run(&argv, &mut Streams::new(&mut out, &mut err))
            .unwrap();
        (
            status,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn test_named_values() {
        let (status, out, _) = run_env(
            &[(ENV_NAME, "off"), (TAGS, "a,b"), (MODCACHE, "/cache")],
            &[TAGS, "UNKNOWN", MODCACHE],
        );
        assert_eq!(status, Status::SUCCESS);
        assert_eq!(out, "a,b\n\n/cache\n");
    }

    #[test]
    fn test_all_values_as_assignments() {
        let (_, out, _) = run_env(&[(ENV_NAME, "off"), (MODCACHE, "/cache")], &[]);
        assert_eq!(
            out,
            "CLITREE_MODCACHE='/cache'\n\
             CLITREE_FLAGS=''\n\
             CLITREE_TAGS=''\n\
             CLITREE_LOG=''\n\
             CLITREE_ENV='off'\n"
        );
    }

    #[test]
    fn test_json() {
        let (_, out, _) = run_env(&[(ENV_NAME, "off"), (FLAGS, "-v")], &["--json", FLAGS]);
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value, serde_json::json!({ "CLITREE_FLAGS": "-v" }));
    }

    #[test]
    fn test_write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("env").to_string_lossy().to_string();
        let (status, _, err) = run_env(
            &[(ENV_NAME, &file), (TAGS, "from-os")],
            &["-w", "CLITREE_FLAGS=-v -race", "CLITREE_TAGS=a,b"],
        );
        assert_eq!(status, Status::SUCCESS);
        assert_eq!(
            err,
            "warning: clitree env -w CLITREE_TAGS=a,b does not override conflicting OS environment variable\n"
        );

        let (_, out, _) = run_env(&[(ENV_NAME, &file)], &[FLAGS, TAGS]);
        assert_eq!(out, "-v -race\na,b\n");

        let (status, _, _) = run_env(&[(ENV_NAME, &file)], &["-u", TAGS]);
        assert_eq!(status, Status::SUCCESS);
        assert_eq!(
            std::fs::read_to_string(&file).unwrap(),
            "CLITREE_FLAGS=-v -race\n"
        );
    }

    #[test]
    fn test_write_errors() {
        let (status, _, err) = run_env(&[(ENV_NAME, "off")], &["-w", "NOEQUALS"]);
        assert_eq!(status, Status::USAGE);
        assert_eq!(
            err,
            "clitree env: arguments must be NAME=VALUE: invalid argument: NOEQUALS\n"
        );

        let (status, _, err) = run_env(&[(ENV_NAME, "off")], &["-w", "HOME=/root"]);
        assert_eq!(status, Status::FAILURE);
        assert_eq!(err, "clitree env: unknown config key HOME\n");

        let (status, _, err) = run_env(&[(ENV_NAME, "off")], &["-w", "-u", "CLITREE_TAGS"]);
        assert_eq!(status, Status::USAGE);
        assert_eq!(err, "clitree env: -w and -u are mutually exclusive\n");
    }
}
