//! Tracing initialization.
//!
//! Builds a subscriber with an `EnvFilter` derived from [`LogLevel`], in compact
//! or JSON format. Events go to stderr so that stdout only carries the report.

use chrono::Local;
use clap::ValueEnum;
use std::fmt as stdfmt;
use std::io;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt as tsfmt;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Verbosity of diagnostic logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Errors only.
    Quiet,
    /// Warnings, e.g. failed relocations and cleanup problems.
    #[default]
    Normal,
    /// Every relocation.
    Info,
    /// Discovery, planning and filter decisions.
    Debug,
}

/// Human-friendly timestamp formatter (DD/MM/YY HH:MM:SS)
struct LocalHumanTime;

impl FormatTime for LocalHumanTime {
    fn format_time(&self, w: &mut tsfmt::format::Writer<'_>) -> stdfmt::Result {
        write!(w, "{}", Local::now().format("%d/%m/%y %H:%M:%S"))
    }
}

fn to_level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Quiet => LevelFilter::ERROR,
        LogLevel::Normal => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::TRACE,
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(level: LogLevel, json: bool) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::default().add_directive(to_level_filter(level).into());

    if json {
        let layer = tsfmt::layer()
            .event_format(tsfmt::format().json())
            .with_timer(LocalHumanTime)
            .with_level(true)
            .with_target(true)
            .with_writer(io::stderr);
        registry().with(env_filter).with(layer).try_init()
    } else {
        let layer = tsfmt::layer()
            .with_timer(LocalHumanTime)
            .with_level(true)
            .with_target(false)
            .compact()
            .with_writer(io::stderr);
        registry().with(env_filter).with(layer).try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(to_level_filter(LogLevel::Quiet), LevelFilter::ERROR);
        assert_eq!(to_level_filter(LogLevel::Normal), LevelFilter::WARN);
        assert_eq!(to_level_filter(LogLevel::Info), LevelFilter::INFO);
        assert_eq!(to_level_filter(LogLevel::Debug), LevelFilter::TRACE);
    }

    #[test]
    fn test_log_level_parses_from_cli_names() {
        assert_eq!(LogLevel::from_str("quiet", true), Ok(LogLevel::Quiet));
        assert_eq!(LogLevel::from_str("DEBUG", true), Ok(LogLevel::Debug));
        assert!(LogLevel::from_str("verbose", true).is_err());
    }
}
