//! Structured logging setup.
//!
//! Everything in the crate logs through `tracing`. Binaries call
//! [`init_logging_with_config`] once at startup; libraries and tests that don't
//! install a subscriber simply get no output.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `ROUTEMUX_LOG_LEVEL` | trace/debug/info/warn/error | `info` |
//! | `ROUTEMUX_LOG_FORMAT` | `json` or `pretty` | `json` |
//! | `ROUTEMUX_LOG_ASYNC` | write through a non-blocking buffer | `true` |
//! | `ROUTEMUX_LOG_FILTER` | extra comma-separated directives, e.g. `routemux::router=debug` | unset |
//! | `ROUTEMUX_LOG_LOCATION` | include file and line | `false` |
//!
//! `RUST_LOG`, when set, replaces the level.

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Anything other than `pretty` means JSON.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
    pub async_logging: bool,
    pub target_filter: Option<String>,
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            async_logging: true,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary variable lookup; unparseable values keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };
        Self {
            level: lookup("ROUTEMUX_LOG_LEVEL").unwrap_or(d.level),
            format: lookup("ROUTEMUX_LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or(d.format),
            async_logging: flag("ROUTEMUX_LOG_ASYNC", d.async_logging),
            target_filter: lookup("ROUTEMUX_LOG_FILTER").filter(|s| !s.trim().is_empty()),
            include_location: flag("ROUTEMUX_LOG_LOCATION", d.include_location),
        }
    }

    /// Verbose, synchronous, human-readable.
    #[must_use]
    pub fn dev() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            async_logging: false,
            target_filter: None,
            include_location: true,
        }
    }

    fn level(&self) -> Level {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));
        // Connection resets are logged by may_minihttp at info; keep them out.
        if let Ok(d) = "may_minihttp::http_server=warn".parse() {
            filter = filter.add_directive(d);
        }
        if let Some(extra) = &self.target_filter {
            for directive in extra.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                match directive.parse() {
                    Ok(d) => filter = filter.add_directive(d),
                    Err(_) => eprintln!("Ignoring invalid log directive: {directive}"),
                }
            }
        }
        filter
    }
}

/// Keeps the non-blocking writer flushing; drop it at shutdown.
#[must_use = "dropping the guard stops buffered log output"]
pub struct LoggingGuard(Option<WorkerGuard>);

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging_with_config(config: &LogConfig) -> Result<LoggingGuard> {
    let registry = tracing_subscriber::registry().with(config.env_filter());
    let loc = config.include_location;

    let (writer, guard) = if config.async_logging {
        let (nb, guard) = tracing_appender::non_blocking(std::io::stdout());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(nb), Some(guard))
    } else {
        (
            tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout),
            None,
        )
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(loc)
            .with_line_number(loc)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(loc)
            .with_line_number(loc)
            .with_writer(writer)
            .boxed(),
    };

    registry
        .with(fmt_layer)
        .try_init()
        .context("failed to initialize logging")?;
    Ok(LoggingGuard(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(" PRETTY "), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("xml"), LogFormat::Json);
    }

    #[test]
    fn test_from_lookup() {
        let cfg = LogConfig::from_lookup(|k| match k {
            "ROUTEMUX_LOG_LEVEL" => Some("debug".to_string()),
            "ROUTEMUX_LOG_FORMAT" => Some("pretty".to_string()),
            "ROUTEMUX_LOG_ASYNC" => Some("false".to_string()),
            "ROUTEMUX_LOG_FILTER" => Some("  ".to_string()),
            "ROUTEMUX_LOG_LOCATION" => Some("nope".to_string()),
            _ => None,
        });
        assert_eq!(cfg.level, "debug");
        assert_eq!(cfg.format, LogFormat::Pretty);
        assert!(!cfg.async_logging);
        assert_eq!(cfg.target_filter, None);
        assert!(!cfg.include_location);
        assert_eq!(cfg.level(), Level::DEBUG);
    }

    #[test]
    fn test_defaults() {
        let cfg = LogConfig::from_lookup(|_| None);
        assert_eq!(cfg, LogConfig::default());
        assert_eq!(cfg.level(), Level::INFO);
    }
}
