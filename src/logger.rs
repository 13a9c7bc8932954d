use std::io::Write;
use std::time::Instant;

use log::{Log, Metadata, Record};
use parking_lot::Mutex;

/// Where log records end up. Diagnostics meant for the user never go through here.
enum Sink {
    Stderr,
    File(Mutex<std::fs::File>),
}

struct ClitreeLogger {
    sink: Sink,
    filter: log::LevelFilter,
    start: Instant,
}

impl Log for ClitreeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let elapsed = self.start.elapsed().as_secs_f64();
        let line = format!(
            "[{elapsed:.3}s] [{}] {}: {}\n",
            record.level(),
            record.target(),
            record.args()
        );
        match &self.sink {
            Sink::Stderr => {
                let _ = std::io::stderr().lock().write_all(line.as_bytes());
            }
            Sink::File(file) => {
                let _ = file.lock().write_all(line.as_bytes());
            }
        }
    }

    fn flush(&self) {
        match &self.sink {
            Sink::Stderr => {
                let _ = std::io::stderr().flush();
            }
            Sink::File(file) => {
                let _ = file.lock().flush();
            }
        }
    }
}

/// Parse a `RUST_LOG`-style level, falling back to `Warn`
fn level_filter(spec: Option<&str>) -> log::LevelFilter {
    spec.and_then(|s| s.parse().ok())
        .unwrap_or(log::LevelFilter::Warn)
}

/// Initialize the global logger. Must be called once before any logging.
///
/// Records go to `log_file` when given, otherwise to stderr. The level comes
/// from `RUST_LOG` and defaults to `warn`.
///
/// # Panics
///
/// Panics if called more than once.
pub fn init(log_file: Option<std::fs::File>) {
    let filter = level_filter(std::env::var("RUST_LOG").ok().as_deref());
    let logger = ClitreeLogger {
        sink: log_file.map_or(Sink::Stderr, |f| Sink::File(Mutex::new(f))),
        filter,
        start: Instant::now(),
    };

    log::set_boxed_logger(Box::new(logger)).expect("logger already initialized");
    log::set_max_level(filter);
}
