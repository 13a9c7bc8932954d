use std::process;

use log::debug;

use crate::commands::{Command, Invocation, RunResult, Status, Streams};
use crate::context::Context;

const LONG: &str = "
Tool runs the program named by name with the given arguments.

Every clitree configuration variable that has a value is added to the
program's environment. Arguments are passed through untouched, flags
included; a leading -- is dropped. The program's exit status becomes the
exit status of clitree.
";

#[must_use]
pub fn command() -> Command {
    Command::leaf(
        "tool",
        "clitree tool -- name [args...]",
        "run specified tool",
        LONG,
        run,
    )
    .custom_flags()
}

fn run(ctx: &Context, inv: &Invocation, io: &mut Streams<'_>) -> RunResult {
    let args = match inv.args.split_first() {
        Some((first, rest)) if first == "--" => rest,
        _ => inv.args.as_slice(),
    };
    let Some((name, args)) = args.split_first() else {
        writeln!(io.err, "usage: clitree tool name [args...]")?;
        return Ok(Status::USAGE);
    };

    let env = ctx
        .config()
        .entries()
        .iter()
        .filter(|e| !e.value.is_empty())
        .map(|e| (e.name.as_str(), e.value.as_str()));
    debug!("Running tool {name} {args:?}");
    let output = process::Command::new(name)
        .args(args)
        .envs(env)
        .stdin(process::Stdio::inherit())
        .output()
        .map_err(|e| format!("running {name}: {e}"))?;

    io.out.write_all(&output.stdout)?;
    io.err.write_all(&output.stderr)?;
    Ok(Status::from_code(output.status.code()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{CONFIG_DIRNAME, ENV_NAME, Settings, TAGS, defaults};
    use crate::config_file::{ConfigStore, DISABLED};
    use crate::dispatch::Dispatcher;

    fn run_tool(args: &[&str]) -> (Status, String, String) {
        let ctx = Context::new(
            ConfigStore::builder(ENV_NAME, CONFIG_DIRNAME)
                .environ([(ENV_NAME, DISABLED), (TAGS, "netgo")])
                .setup(defaults(&Settings::default())),
        );
        let root = crate::builtin::tree();
        let mut argv = vec!["tool".to_string()];
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
    fn test_missing_name_is_usage_error() {
        let (status, _, err) = run_tool(&[]);
        assert_eq!(status, Status::USAGE);
        assert_eq!(err, "usage: clitree tool name [args...]\n");
        assert_eq!(run_tool(&["--"]).0, Status::USAGE);
    }

    #[test]
    fn test_missing_program_is_reported() {
        let (status, _, err) = run_tool(&["clitree-no-such-tool"]);
        assert_eq!(status, Status::FAILURE);
        assert!(
            err.starts_with("clitree tool: running clitree-no-such-tool: "),
            "{err}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_passes_flags_and_environment() {
        let (status, out, _) = run_tool(&[
            "--",
            "sh",
            "-c",
            "echo \"$CLITREE_TAGS $CLITREE_ENV $1\"",
            "sh",
            "-x",
        ]);
        assert_eq!(status, Status::SUCCESS);
        assert_eq!(out, "netgo off -x\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status_is_forwarded() {
        let (status, _, err) = run_tool(&["sh", "-c", "echo oops >&2; exit 3"]);
        assert_eq!(status, Status(3));
        assert_eq!(err, "oops\n");
    }
}
