use std::io::{self, Write};
use std::process::ExitCode;

use log::debug;

use clitree::builtin::{self, PROG, Settings};
use clitree::commands::{Status, Streams};
use clitree::context::Context;
use clitree::dispatch::{DispatchError, Dispatcher};

fn main() -> ExitCode {
    let settings = Settings::default();
    let ctx = Context::new(builtin::config(&settings));

    let log_file = match settings.log_file.get() {
        "" => None,
        path => match std::fs::File::create(path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("{PROG}: opening log file {path}: {e}");
                None
            }
        },
    };
    clitree::logger::init(log_file);

    let root = builtin::tree();
    if let Err(e) = root.validate() {
        eprintln!("{PROG}: internal error: {e}");
        return ExitCode::FAILURE;
    }

    let args: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    debug!("Dispatching {args:?}");

    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    let mut streams = Streams::new(&mut stdout, &mut stderr);
    let result = Dispatcher::new(&root, &ctx).run(&args, &mut streams);
    let result = result.and_then(|status| {
        stdout.flush()?;
        Ok(status)
    });

    match result {
        Ok(status) => status.into(),
        Err(e) if e.is_broken_pipe() => Status::FAILURE.into(),
        Err(e @ DispatchError::Output(_)) => {
            let _ = writeln!(stderr, "{PROG}: {e}");
            Status::FAILURE.into()
        }
    }
}
