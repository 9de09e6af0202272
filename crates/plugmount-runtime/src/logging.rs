//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! # Configuration-Based Initialization
//!
//! ```rust,ignore
//! use plugmount_runtime::config::load_config;
//! use plugmount_runtime::logging;
//!
//! let config = load_config()?;
//! logging::init_from_config(&config.logging);
//! ```
//!
//! # Manual Initialization
//!
//! ```rust,ignore
//! use plugmount_runtime::logging::LoggingBuilder;
//!
//! LoggingBuilder::new()
//!     .with_level(tracing::Level::DEBUG)
//!     .directive("plugmount_loader=trace")
//!     .init();
//! ```
//!
//! `RUST_LOG`, when set, replaces the configured base level.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::warn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig, SpanEventConfig};

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanEvents {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

impl SpanEvents {
    fn to_fmt_span(self) -> fmt::format::FmtSpan {
        let mut span = fmt::format::FmtSpan::NONE;
        if self.new {
            span |= fmt::format::FmtSpan::NEW;
        }
        if self.enter {
            span |= fmt::format::FmtSpan::ENTER;
        }
        if self.exit {
            span |= fmt::format::FmtSpan::EXIT;
        }
        if self.close {
            span |= fmt::format::FmtSpan::CLOSE;
        }
        span
    }
}

impl From<&SpanEventConfig> for SpanEvents {
    fn from(config: &SpanEventConfig) -> Self {
        Self {
            new: config.new,
            enter: config.enter,
            exit: config.exit,
            close: config.close,
        }
    }
}

// =============================================================================
// Configuration-Based Initialization
// =============================================================================

/// Initializes logging from a [`LoggingConfig`].
///
/// Does nothing if a global subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

// =============================================================================
// LoggingBuilder
// =============================================================================

/// A builder for configuring logging.
#[derive(Debug, Default)]
pub struct LoggingBuilder {
    directives: Vec<String>,
    level: Option<tracing::Level>,
    span_events: SpanEvents,
    format: LogFormat,
    output: LogOutput,
    thread_ids: bool,
    file_location: bool,
    file_path: Option<PathBuf>,
}

impl LoggingBuilder {
    /// Create a new logging builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder from a [`LoggingConfig`].
    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut builder = Self::new();

        builder.level = Some(config.level().to_tracing_level());
        builder.format = config.format;
        builder.output = config.output;
        builder.span_events = SpanEvents::from(&config.span_events);

        builder.thread_ids = config.thread_ids;
        builder.file_location = config.file_location;
        builder.file_path.clone_from(&config.file_path);

        let mut filters: Vec<_> = config.filters.iter().collect();
        filters.sort();
        for (target, level) in filters {
            builder.directives.push(format!("{target}={level}"));
        }

        builder
    }

    /// Set the global log level.
    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Add a filter directive such as `plugmount_loader=trace`.
    pub fn directive(mut self, directive: &str) -> Self {
        self.directives.push(directive.to_string());
        self
    }

    /// The directives this builder will add on top of the base level.
    pub fn directives(&self) -> &[String] {
        &self.directives
    }

    /// Build the filter from directives.
    fn build_filter(&self) -> EnvFilter {
        let base_level = self.level.unwrap_or(tracing::Level::INFO);
        let base_filter = base_level.to_string().to_lowercase();

        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&base_filter));

        for directive in &self.directives {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(e) => warn!(directive = %directive, error = %e, "Ignoring invalid log directive"),
            }
        }

        filter
    }

    /// Initialize the logging system.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Try to initialize the logging system, returning an error on failure.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let filter = self.build_filter();
        let span_events = self.span_events.to_fmt_span();

        macro_rules! configure_layer {
            ($layer:expr) => {
                $layer
                    .with_span_events(span_events)
                    .with_thread_ids(self.thread_ids)
                    .with_file(self.file_location)
                    .with_line_number(self.file_location)
            };
        }

        macro_rules! init_with_writer {
            ($writer:expr) => {
                match self.format {
                    #[cfg(feature = "json-log")]
                    LogFormat::Json => {
                        let layer = fmt::layer()
                            .json()
                            .with_span_events(span_events)
                            .with_writer($writer);
                        tracing_subscriber::registry()
                            .with(layer)
                            .with(filter)
                            .try_init()
                    }
                    LogFormat::Compact => {
                        let layer = configure_layer!(fmt::layer().compact().with_writer($writer));
                        tracing_subscriber::registry()
                            .with(layer)
                            .with(filter)
                            .try_init()
                    }
                    #[cfg(not(feature = "json-log"))]
                    LogFormat::Json | LogFormat::Full => {
                        let layer = configure_layer!(fmt::layer().with_writer($writer));
                        tracing_subscriber::registry()
                            .with(layer)
                            .with(filter)
                            .try_init()
                    }
                    #[cfg(feature = "json-log")]
                    LogFormat::Full => {
                        let layer = configure_layer!(fmt::layer().with_writer($writer));
                        tracing_subscriber::registry()
                            .with(layer)
                            .with(filter)
                            .try_init()
                    }
                    LogFormat::Pretty => {
                        let layer = configure_layer!(fmt::layer().pretty().with_writer($writer));
                        tracing_subscriber::registry()
                            .with(layer)
                            .with(filter)
                            .try_init()
                    }
                }
            };
        }

        match self.output {
            LogOutput::Stdout => init_with_writer!(std::io::stdout),
            LogOutput::Stderr => init_with_writer!(std::io::stderr),
            LogOutput::File => match self.file_path.as_deref() {
                Some(path) => {
                    let file_appender = tracing_appender::rolling::never(
                        path.parent().unwrap_or_else(|| Path::new(".")),
                        path.file_name()
                            .unwrap_or_else(|| OsStr::new("plugmount.log")),
                    );
                    init_with_writer!(file_appender)
                }
                None => {
                    let result = init_with_writer!(std::io::stdout);
                    warn!("File output requested but no file path configured, using stdout");
                    result
                }
            },
        }
    }
}
