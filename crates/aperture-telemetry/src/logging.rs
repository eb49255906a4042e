//! Logging setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{TelemetryError, TelemetryResult};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, colorized, for local development.
    Pretty,
    /// Newline-delimited JSON, for ingestion by a log pipeline.
    Json,
}

/// Where log lines are written. Only `Stderr` is wired up today; the daemon's
/// stdout is reserved for stdio-transport MCP traffic when the daemon itself
/// is driven as a child process in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Standard error (the default).
    Stderr,
    /// Standard output.
    Stdout,
}

/// Logging configuration, built with a small fluent API.
#[derive(Debug, Clone)]
pub struct LogConfig {
    level: String,
    format: LogFormat,
    target: LogTarget,
    directives: Vec<String>,
}

impl LogConfig {
    /// Start a config at the given default level (e.g. `"info"`, `"debug"`).
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::Pretty,
            target: LogTarget::Stderr,
            directives: Vec::new(),
        }
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the output target.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Add a per-target directive, e.g. `"aperture_mcp=trace"`.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    fn env_filter(&self) -> TelemetryResult<EnvFilter> {
        let mut filter = EnvFilter::try_new(&self.level)
            .map_err(|_| TelemetryError::InvalidDirective(self.level.clone()))?;
        for directive in &self.directives {
            let parsed = directive
                .parse()
                .map_err(|_| TelemetryError::InvalidDirective(directive.clone()))?;
            filter = filter.add_directive(parsed);
        }
        Ok(filter)
    }
}

/// Install a global tracing subscriber built from `config`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidDirective`] if the level or a directive
/// fails to parse, or [`TelemetryError::AlreadyInitialized`] if a global
/// subscriber is already installed (e.g. in a test binary that calls this
/// more than once).
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    let writer = match config.target {
        LogTarget::Stderr => fmt::layer().with_writer(std::io::stderr),
        LogTarget::Stdout => fmt::layer().with_writer(std::io::stdout),
    };

    let result = match config.format {
        LogFormat::Pretty => registry.with(writer.pretty()).try_init(),
        LogFormat::Json => registry.with(writer.json()).try_init(),
    };

    result.map_err(|_| TelemetryError::AlreadyInitialized)
}

/// Install a global subscriber at `info` level with pretty output to stderr.
///
/// # Errors
///
/// See [`setup_logging`].
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::new("info"))
}
