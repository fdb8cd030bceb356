//! Structured logging setup.
//!
//! Every module logs through `tracing`. The binary installs a
//! `tracing-subscriber` registry configured from `ROUTEDOC_LOG_*` variables:
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `ROUTEDOC_LOG_LEVEL` | `info` | trace/debug/info/warn/error |
//! | `ROUTEDOC_LOG_FORMAT` | `json` | `json` or `pretty` |
//! | `ROUTEDOC_LOG_ASYNC` | `true` | buffered writer via `tracing-appender` |
//! | `ROUTEDOC_LOG_TARGET_FILTER` | unset | extra comma-separated filter directives |
//! | `ROUTEDOC_LOG_INCLUDE_LOCATION` | `false` | add file and line to events |
//!
//! `RUST_LOG`, when set, takes precedence over `ROUTEDOC_LOG_LEVEL`.

use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub log_level: String,
    pub format: LogFormat,
    pub async_logging: bool,
    /// Extra filter directives (comma-separated)
    pub target_filter: Option<String>,
    pub include_location: bool,
}

impl LogConfig {
    /// Read `ROUTEDOC_LOG_*` variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("ROUTEDOC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: LogFormat::parse(
                &env::var("ROUTEDOC_LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
            ),
            async_logging: env::var("ROUTEDOC_LOG_ASYNC")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
            target_filter: env::var("ROUTEDOC_LOG_TARGET_FILTER").ok(),
            include_location: env::var("ROUTEDOC_LOG_INCLUDE_LOCATION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
        }
    }

    /// Verbose, human-readable, synchronous.
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            async_logging: false,
            target_filter: None,
            include_location: true,
        }
    }
}

fn level(raw: &str) -> Level {
    match raw.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Filter from `RUST_LOG` or the configured level, plus extra directives.
///
/// Invalid directives are skipped and returned.
pub fn build_filter(config: &LogConfig) -> (EnvFilter, Vec<String>) {
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level(&config.log_level).as_str()));
    let mut rejected = Vec::new();

    // connection-level noise from the HTTP server
    if let Ok(directive) = "may_minihttp=warn".parse() {
        filter = filter.add_directive(directive);
    }

    if let Some(targets) = &config.target_filter {
        for raw in targets.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match raw.parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(_) => rejected.push(raw.to_string()),
            }
        }
    }
    (filter, rejected)
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging_with_config(config: &LogConfig) -> Result<()> {
    let (filter, rejected) = build_filter(config);
    let registry = tracing_subscriber::registry().with(filter);

    if config.async_logging {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
        let fmt_layer = match config.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_writer(non_blocking)
                .boxed(),
            LogFormat::Pretty => tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_writer(non_blocking)
                .boxed(),
        };
        registry
            .with(fmt_layer)
            .try_init()
            .context("Failed to initialize async logging")?;
        // the writer flushes for as long as the guard lives: keep it for the process lifetime
        std::mem::forget(guard);
    } else {
        let fmt_layer = match config.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .boxed(),
            LogFormat::Pretty => tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .boxed(),
        };
        registry
            .with(fmt_layer)
            .try_init()
            .context("Failed to initialize sync logging")?;
    }

    for directive in rejected {
        tracing::warn!(%directive, "ignoring invalid log filter directive");
    }
    Ok(())
}
