//! Logging configuration for profiling runs.
//!
//! Profiling emits `tracing` events: `info!` when a run starts and ends,
//! `warn!` for every degraded artifact, and `debug!` for per-column stages
//! and for the SQL pushed down to the query engine. [`LogConfig`] travels
//! with the settings and decides which of the chatty events are emitted;
//! [`setup`] installs a subscriber for applications that have none.

use tracing::Level;

/// Per-run control over detailed events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Emit a `debug!` event after each describer stage.
    pub log_column_details: bool,
    /// Emit a `debug!` event with every SQL statement of the lazy backend.
    pub log_queries: bool,
    /// Longest logged SQL text, in bytes.
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_column_details: false,
            log_queries: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Every detailed event, with long SQL kept intact.
    pub fn verbose() -> Self {
        Self {
            log_column_details: true,
            log_queries: true,
            max_field_length: 4096,
        }
    }

    /// No per-column or per-query events.
    pub fn production() -> Self {
        Self {
            log_column_details: false,
            log_queries: false,
            max_field_length: 128,
        }
    }
}

/// Logs a describer stage when column details are enabled.
#[macro_export]
macro_rules! log_column_stage {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_column_details {
            tracing::debug!($($arg)*);
        }
    };
}

/// Cuts `value` to at most `max_length` bytes on a character boundary.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &value[..end])
}

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

pub mod setup {
    use super::{Level, LogFormat};

    const LAZY_TARGET: &str = "profunda::backends::lazy";

    /// Filter levels and format of the global subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Level for every crate other than profunda.
        pub default_level: Level,
        pub profunda_level: Level,
        /// Level for the lazy backend, where the SQL events live.
        pub query_level: Option<Level>,
        pub format: LogFormat,
        /// Replaces the generated directives when set.
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                default_level: Level::WARN,
                profunda_level: Level::INFO,
                query_level: None,
                format: LogFormat::Pretty,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// JSON lines with run-level events only.
        pub fn production() -> Self {
            Self {
                format: LogFormat::Json,
                ..Self::default()
            }
        }

        /// Compact output including stage and SQL events.
        pub fn development() -> Self {
            Self {
                default_level: Level::INFO,
                profunda_level: Level::DEBUG,
                query_level: Some(Level::DEBUG),
                format: LogFormat::Compact,
                env_filter: None,
            }
        }

        pub fn with_profunda_level(mut self, level: Level) -> Self {
            self.profunda_level = level;
            self
        }

        pub fn with_query_level(mut self, level: Level) -> Self {
            self.query_level = Some(level);
            self
        }

        pub fn with_format(mut self, format: LogFormat) -> Self {
            self.format = format;
            self
        }

        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// The `EnvFilter` directives for this configuration.
        pub fn directives(&self) -> String {
            if let Some(filter) = &self.env_filter {
                return filter.clone();
            }
            let level = |level: &Level| level.as_str().to_lowercase();
            let mut directives = format!(
                "{},profunda={}",
                level(&self.default_level),
                level(&self.profunda_level)
            );
            if let Some(query) = &self.query_level {
                directives.push_str(&format!(",{LAZY_TARGET}={}", level(query)));
            }
            directives
        }
    }

    /// Installs a global subscriber; `RUST_LOG` overrides the directives.
    ///
    /// ```rust,no_run
    /// use profunda::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development()).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.directives()));
        let layer = match config.format {
            LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
            LogFormat::Compact => tracing_subscriber::fmt::layer().compact().boxed(),
            LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        };
        tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()?;
        Ok(())
    }
}
