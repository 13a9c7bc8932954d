//! The command tree of the `clitree` binary

use crate::commands::{Command, Invocation, RunResult, Status, Streams};
use crate::config_file::{Binding, ConfigStore, EnvVar};
use crate::context::Context;

pub mod build;
pub mod env;
pub mod modules;
pub mod tool;
pub mod topics;

pub const PROG: &str = "clitree";

/// Override key naming the configuration file (`off` disables it)
pub const ENV_NAME: &str = "CLITREE_ENV";
pub const CONFIG_DIRNAME: &str = "clitree";
pub const MODCACHE: &str = "CLITREE_MODCACHE";
pub const FLAGS: &str = "CLITREE_FLAGS";
pub const TAGS: &str = "CLITREE_TAGS";
pub const LOG: &str = "CLITREE_LOG";

/// Values the entry point needs before dispatching
#[derive(Debug, Default, Clone)]
pub struct Settings {
    pub log_file: Binding,
}

/// The registered configuration keys and their defaults
#[must_use]
pub fn defaults(settings: &Settings) -> Vec<EnvVar> {
    let mod_cache = dirs::cache_dir()
        .map(|dir| dir.join(CONFIG_DIRNAME).join("mod"))
        .map(|dir| dir.display().to_string())
        .unwrap_or_default();
    vec![
        EnvVar::new(MODCACHE, &mod_cache),
        EnvVar::new(FLAGS, ""),
        EnvVar::new(TAGS, ""),
        EnvVar::bound(LOG, "", &settings.log_file),
    ]
}

/// Configuration of this process, from the process environment and the user's config file
#[must_use]
pub fn config(settings: &Settings) -> ConfigStore {
    ConfigStore::builder(ENV_NAME, CONFIG_DIRNAME)
        .setup(defaults(settings))
}

const LONG: &str = "
Clitree is a demonstration front end for the clitree dispatch library.
";

#[must_use]
pub fn tree() -> Command {
    Command::root(
        PROG,
        LONG,
        vec![
            build::command(),
            env::command(),
            modules::command(),
            tool::command(),
            version(),
            topics::environment(),
            topics::buildtags(),
        ],
    )
}

fn version() -> Command {
    Command::leaf(
        "version",
        "clitree version",
        "print clitree version",
        "Version prints the clitree version.",
        run_version,
    )
}

fn run_version(_: &Context, inv: &Invocation, io: &mut Streams<'_>) -> RunResult {
    if !inv.args.is_empty() {
        writeln!(io.err, "usage: clitree version")?;
        return Ok(Status::USAGE);
    }
    writeln!(
        io.out,
        "{} version {}",
        inv.program,
        env!("CARGO_PKG_VERSION")
    )?;
    Ok(Status::SUCCESS)
}
