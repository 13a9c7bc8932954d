use std::error::Error;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Arg, ArgAction};
use log::debug;
use serde::Serialize;

use crate::builtin::MODCACHE;
use crate::commands::{Command, Invocation, RunResult, Status, Streams};
use crate::context::Context;
use crate::repo::Repo;

type BoxError = Box<dyn Error + Send + Sync>;

const LONG: &str = "
Mod provides access to operations on the configured module repository.

Downloaded files are kept under CLITREE_MODCACHE, one directory per module,
with an .info, .mod and .zip file for each version.
";

#[must_use]
pub fn command() -> Command {
    Command::group(
        "mod",
        "clitree mod",
        "module maintenance",
        LONG,
        vec![download(), verify(), info()],
    )
}

fn download() -> Command {
    Command::leaf(
        "download",
        "clitree mod download [--json] version...",
        "download modules to local cache",
        "
Download fetches the named versions of the module into the module cache.

The --json flag prints a JSON object for each downloaded version, naming
the files written to the cache.
",
        run_download,
    )
    .flag(Arg::new("json").long("json").action(ArgAction::SetTrue))
}

fn verify() -> Command {
    Command::leaf(
        "verify",
        "clitree mod verify [version...]",
        "verify cached modules",
        "
Verify checks that the cached module descriptors of the named versions, or
of every cached version when none are named, still match the repository.
",
        run_verify,
    )
}

fn info() -> Command {
    Command::leaf(
        "info",
        "clitree mod info [rev]",
        "print revision information",
        "
Info prints the version and commit time of rev as JSON. Without rev it
describes the latest revision on the default branch.
",
        run_info,
    )
}

fn repo(ctx: &Context) -> Result<&dyn Repo, BoxError> {
    ctx.repo()
        .ok_or_else(|| "no module repository configured".into())
}

/// `<CLITREE_MODCACHE>/<module path>/@v`
fn cache_dir(ctx: &Context, repo: &dyn Repo) -> Result<PathBuf, BoxError> {
    let root = ctx.config().resolved(MODCACHE);
    if root.is_empty() {
        return Err(format!("{MODCACHE} is not set").into());
    }
    Ok(Path::new(root).join(repo.module_path()).join("@v"))
}

/// Files written for one downloaded version
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Downloaded {
    path: String,
    version: String,
    info: String,
    #[serde(rename = "Mod")]
    descriptor: String,
    zip: String,
}

fn fetch(repo: &dyn Repo, dir: &Path, version: &str) -> Result<Downloaded, BoxError> {
    let rev = repo.stat(version)?;
    fs::create_dir_all(dir)?;

    let info = dir.join(format!("{}.info", rev.version));
    fs::write(&info, serde_json::to_vec(&rev)?)?;

    let descriptor = dir.join(format!("{}.mod", rev.version));
    fs::write(&descriptor, repo.module_descriptor(&rev.version)?)?;

    let zip = dir.join(format!("{}.zip", rev.version));
    let partial = dir.join(format!("{}.zip.partial", rev.version));
    let mut writer = BufWriter::new(File::create(&partial)?);
    let written = repo
        .archive(&mut writer, &rev.version)
        .map_err(BoxError::from)
        .and_then(|()| writer.flush().map_err(BoxError::from));
    if let Err(e) = written {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }
    drop(writer);
    fs::rename(&partial, &zip)?;
    debug!(
        "Downloaded {} {} to {}",
        repo.module_path(),
        rev.version,
        dir.display()
    );

    Ok(Downloaded {
        path: repo.module_path().to_string(),
        version: rev.version,
        info: info.display().to_string(),
        descriptor: descriptor.display().to_string(),
        zip: zip.display().to_string(),
    })
}

fn run_download(ctx: &Context, inv: &Invocation, io: &mut Streams<'_>) -> RunResult {
    if inv.args.is_empty() {
        writeln!(io.err, "usage: clitree mod download [--json] version...")?;
        return Ok(Status::USAGE);
    }
    let repo = repo(ctx)?;
    let dir = cache_dir(ctx, repo)?;
    let mut status = Status::SUCCESS;
    for version in &inv.args {
        match fetch(repo, &dir, version) {
            Ok(downloaded) => {
                if inv.flag("json") {
                    serde_json::to_writer_pretty(&mut *io.out, &downloaded)?;
                    writeln!(io.out)?;
                }
            }
            Err(e) => {
                writeln!(io.err, "{}: {version}: {e}", inv.command_line())?;
                status = Status::FAILURE;
            }
        }
    }
    Ok(status)
}

/// Versions with a cached descriptor, sorted by name
fn cached_versions(dir: &Path) -> Result<Vec<String>, BoxError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut versions = Vec::new();
    for entry in entries {
        let name = entry?.file_name();
        if let Some(version) = name.to_str().and_then(|n| n.strip_suffix(".mod")) {
            versions.push(version.to_string());
        }
    }
    versions.sort();
    Ok(versions)
}

fn run_verify(ctx: &Context, inv: &Invocation, io: &mut Streams<'_>) -> RunResult {
    let repo = repo(ctx)?;
    let dir = cache_dir(ctx, repo)?;
    let versions = if inv.args.is_empty() {
        cached_versions(&dir)?
    } else {
        inv.args.clone()
    };

    let module = repo.module_path();
    let mut ok = true;
    for version in &versions {
        let cached = match fs::read(dir.join(format!("{version}.mod"))) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                writeln!(io.out, "{module} {version}: not downloaded")?;
                ok = false;
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        match repo.module_descriptor(version) {
            Ok(current) if current == cached => {}
            Ok(_) => {
                writeln!(io.out, "{module} {version}: descriptor has been modified")?;
                ok = false;
            }
            Err(e) => {
                writeln!(io.out, "{module} {version}: {e}")?;
                ok = false;
            }
        }
    }

    if ok {
        writeln!(io.out, "all modules verified")?;
        Ok(Status::SUCCESS)
    } else {
        Ok(Status::FAILURE)
    }
}

fn run_info(ctx: &Context, inv: &Invocation, io: &mut Streams<'_>) -> RunResult {
    let rev = match inv.args.as_slice() {
        [] => repo(ctx)?.latest()?,
        [rev] => repo(ctx)?.stat(rev)?,
        _ => {
            writeln!(io.err, "usage: clitree mod info [rev]")?;
            return Ok(Status::USAGE);
        }
    };
    serde_json::to_writer_pretty(&mut *io.out, &rev)?;
    writeln!(io.out)?;
    Ok(Status::SUCCESS)
}
