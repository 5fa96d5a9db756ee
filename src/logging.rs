//! Backend for the `log` facade.
//!
//! Progress output stays on stdout via `println!`; warnings and diagnostics
//! raised through `log::warn!`/`log::debug!` land on stderr in the same
//! indented style.

use log::{Level, LevelFilter, Log, Metadata, Record};

struct ConsoleLogger {
    level: LevelFilter,
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        eprintln!("  [{}] {}", tag, record.args());
    }

    fn flush(&self) {}
}

/// Install the console logger. `verbose` enables debug output (every tool invocation).
pub fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    if let Err(e) = log::set_boxed_logger(Box::new(ConsoleLogger { level }))
        .map(|()| log::set_max_level(level))
    {
        eprintln!("  [WARN] Failed to install logger: {}", e);
    }
}
