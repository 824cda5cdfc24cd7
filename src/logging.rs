//! Two-phase logging setup.
//!
//! [`init`] installs the global subscriber once, with a provisional level taken
//! from the `proto` layer. When the command line has been parsed the pipeline
//! calls [`LogHandle::set_level`] with the requested verbosity, which swaps the
//! level behind a `reload` layer instead of re-initializing anything.
//!
//! When `RUST_LOG` is set it wins: the subscriber uses it as-is and
//! `set_level` only records the requested level.

use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, Registry, fmt as tracing_fmt, prelude::*, reload};

/// Message severity as named in config files and on the command line.
///
/// Accepts the conventional names (`DEBUG`, `INFO`, `WARNING`, `ERROR`,
/// `CRITICAL`) case-insensitively, plus their numeric values `10`..`50`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn name(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// tracing has no level above ERROR, so CRITICAL shares it.
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" | "10" => Ok(LogLevel::Debug),
            "INFO" | "20" => Ok(LogLevel::Info),
            "WARNING" | "WARN" | "30" => Ok(LogLevel::Warning),
            "ERROR" | "40" => Ok(LogLevel::Error),
            "CRITICAL" | "FATAL" | "50" => Ok(LogLevel::Critical),
            _ => Err(format!(
                "unknown log level '{s}' (expected DEBUG, INFO, WARNING, ERROR or CRITICAL)"
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Controls the stream level of the installed subscriber.
pub struct LogHandle {
    reload: Option<reload::Handle<LevelFilter, Registry>>,
    level: Cell<LogLevel>,
}

impl LogHandle {
    /// A handle that is not attached to any subscriber. It still records the
    /// requested level, which is what tests and embedders usually want.
    pub fn detached(level: LogLevel) -> Self {
        Self {
            reload: None,
            level: Cell::new(level),
        }
    }

    /// The most recently requested level.
    pub fn level(&self) -> LogLevel {
        self.level.get()
    }

    /// Second phase: apply the verbosity requested by the resolved config.
    pub fn set_level(&self, level: LogLevel) {
        self.level.set(level);
        if let Some(handle) = &self.reload
            && let Err(e) = handle.modify(|filter| *filter = level.as_filter())
        {
            tracing::warn!("could not change log level to {level}: {e}");
        }
    }
}

/// First phase: install the global subscriber on stderr at `level`.
///
/// Only the first call in a process installs anything; later calls return a
/// detached handle.
pub fn init(level: LogLevel) -> LogHandle {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        let _ = tracing_subscriber::registry()
            .with(tracing_fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .try_init();
        return LogHandle::detached(level);
    }

    let (subscriber, handle) = subscriber(level, std::io::stderr);
    if subscriber.try_init().is_ok() {
        handle
    } else {
        LogHandle::detached(level)
    }
}

/// A fmt subscriber writing to `writer` behind a reloadable level, plus the
/// handle that controls it. [`init`] installs one on stderr.
pub fn subscriber<W>(
    level: LogLevel,
    writer: W,
) -> (impl tracing::Subscriber + Send + Sync + 'static, LogHandle)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let (filter, handle) = reload::Layer::new(level.as_filter());
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_fmt::layer().with_writer(writer).with_target(false));
    let handle = LogHandle {
        reload: Some(handle),
        level: Cell::new(level),
    };
    (subscriber, handle)
}
