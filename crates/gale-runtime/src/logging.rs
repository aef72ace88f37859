//! Logging setup for Gale services.
//!
//! Gale only emits `tracing` data. Every served message runs in a debug-level
//! `dispatch` span, the `trace` middleware adds an info-level `rpc` span,
//! lifecycle transitions log at `info` and lost replies at `warn`. This
//! module installs a `tracing-subscriber` that prints them.
//!
//! ```rust,ignore
//! use gale_runtime::config::{SpanEvents, load_config};
//! use gale_runtime::logging::{self, LoggingBuilder};
//!
//! let config = load_config()?;
//! logging::init_from_config(&config.logging);
//!
//! // Or by hand: application at info, Gale at debug, one line per call.
//! LoggingBuilder::new()
//!     .gale_level(tracing::Level::DEBUG)
//!     .span_events(SpanEvents::Calls)
//!     .init();
//! ```
//!
//! `RUST_LOG`, when set, replaces the base level. Directives from
//! [`LoggingBuilder::directive`] and the config `filters` still apply on top.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig, SpanEvents};

/// Crates whose level [`LoggingBuilder::gale_level`] sets.
pub const GALE_TARGETS: [&str; 4] = [
    "gale_core",
    "gale_framework",
    "gale_runtime",
    "gale_transport",
];

/// Target of the per-message `dispatch` span.
const DISPATCH_TARGET: &str = "gale_core::framework::dispatcher";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

impl SpanEvents {
    fn fmt_span(self) -> FmtSpan {
        match self {
            Self::None => FmtSpan::NONE,
            Self::Calls => FmtSpan::CLOSE,
            Self::Lifecycle => FmtSpan::NEW | FmtSpan::CLOSE,
            Self::Full => FmtSpan::FULL,
        }
    }
}

/// Initializes logging from a [`LoggingConfig`].
///
/// Does nothing if a global subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    LoggingBuilder::from_config(config).init();
}

/// Builds and installs the global subscriber.
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    gale_level: Option<Level>,
    directives: Vec<String>,
    span_events: SpanEvents,
    format: LogFormat,
    output: LogOutput,
    file_path: Option<PathBuf>,
    thread_ids: bool,
    file_location: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    /// Info level, compact lines on stdout, no span events.
    pub fn new() -> Self {
        Self {
            level: Level::INFO,
            gale_level: None,
            directives: Vec::new(),
            span_events: SpanEvents::None,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            thread_ids: false,
            file_location: false,
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut builder = Self {
            level: config.level.to_tracing_level(),
            gale_level: config.gale_level.map(|level| level.to_tracing_level()),
            span_events: config.span_events,
            format: config.format,
            output: config.output,
            file_path: config.file_path.clone(),
            thread_ids: config.thread_ids,
            file_location: config.file_location,
            ..Self::new()
        };
        for (module, level) in &config.filters {
            builder = builder.directive(&format!("{module}={level}"));
        }
        builder
    }

    /// Base level for every target.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Level for Gale's own crates only.
    pub fn gale_level(mut self, level: Level) -> Self {
        self.gale_level = Some(level);
        self
    }

    /// Adds an `EnvFilter` directive such as `my_service::db=trace`.
    pub fn directive(mut self, directive: &str) -> Self {
        self.directives.push(directive.to_string());
        self
    }

    /// Selects which span events are printed.
    ///
    /// Anything other than [`SpanEvents::None`] also enables the debug-level
    /// `dispatch` span, so that every call is visible.
    pub fn span_events(mut self, events: SpanEvents) -> Self {
        self.span_events = events;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Log file used with [`LogOutput::File`].
    pub fn file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Directives added on top of the base level, in application order.
    fn effective_directives(&self) -> Vec<String> {
        let mut directives = Vec::new();

        if let Some(level) = self.gale_level {
            let level = level_name(level);
            directives.extend(GALE_TARGETS.iter().map(|target| format!("{target}={level}")));
        }

        let gale_level = self.gale_level.unwrap_or(self.level);
        if self.span_events != SpanEvents::None && gale_level < Level::DEBUG {
            directives.push(format!("{DISPATCH_TARGET}=debug"));
        }

        directives.extend(self.directives.iter().cloned());
        directives
    }

    fn filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level_name(self.level)));
        for directive in self.effective_directives() {
            if let Ok(directive) = directive.parse() {
                filter = filter.add_directive(directive);
            }
        }
        filter
    }

    fn layer<W>(&self, writer: W) -> BoxedLayer
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(self.output != LogOutput::File)
            .with_span_events(self.span_events.fmt_span())
            .with_thread_ids(self.thread_ids)
            .with_file(self.file_location)
            .with_line_number(self.file_location);

        match self.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
            #[cfg(not(feature = "json-log"))]
            LogFormat::Json => layer.boxed(),
            LogFormat::Full => layer.boxed(),
        }
    }

    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the subscriber, failing if one is already set.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let layer = match (self.output, &self.file_path) {
            (LogOutput::Stderr, _) => self.layer(std::io::stderr),
            (LogOutput::File, Some(path)) => {
                let dir = path
                    .parent()
                    .filter(|dir| !dir.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                let file = path.file_name().unwrap_or_else(|| OsStr::new("gale.log"));
                self.layer(tracing_appender::rolling::never(dir, file))
            }
            // `validate_config` rejects file output without a path.
            (LogOutput::Stdout | LogOutput::File, _) => self.layer(std::io::stdout),
        };

        tracing_subscriber::registry()
            .with(layer)
            .with(self.filter())
            .try_init()
    }
}

fn level_name(level: Level) -> String {
    level.to_string().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_span_event_mapping() {
        assert_eq!(SpanEvents::None.fmt_span(), FmtSpan::NONE);
        assert_eq!(SpanEvents::Calls.fmt_span(), FmtSpan::CLOSE);
        assert_eq!(
            SpanEvents::Lifecycle.fmt_span(),
            FmtSpan::NEW | FmtSpan::CLOSE
        );
        assert_eq!(SpanEvents::Full.fmt_span(), FmtSpan::FULL);
    }

    #[test]
    fn test_gale_level_covers_every_crate() {
        let directives = LoggingBuilder::new()
            .level(Level::WARN)
            .gale_level(Level::TRACE)
            .effective_directives();

        assert_eq!(
            directives,
            vec![
                "gale_core=trace",
                "gale_framework=trace",
                "gale_runtime=trace",
                "gale_transport=trace",
            ]
        );
    }

    #[test]
    fn test_span_events_enable_dispatch_span() {
        let directives = LoggingBuilder::new()
            .span_events(SpanEvents::Calls)
            .effective_directives();
        assert_eq!(directives, vec![format!("{DISPATCH_TARGET}=debug")]);

        // Already verbose enough; the dispatch target is left alone.
        let directives = LoggingBuilder::new()
            .gale_level(Level::TRACE)
            .span_events(SpanEvents::Calls)
            .effective_directives();
        assert!(!directives.iter().any(|d| d.starts_with(DISPATCH_TARGET)));
    }

    #[test]
    fn test_from_config() {
        let mut config = LoggingConfig {
            level: LogLevel::Debug,
            span_events: SpanEvents::Lifecycle,
            file_location: true,
            ..Default::default()
        };
        config
            .filters
            .insert("calculator".to_string(), LogLevel::Trace);

        let builder = LoggingBuilder::from_config(&config);

        assert_eq!(builder.level, Level::DEBUG);
        assert_eq!(builder.gale_level, None);
        assert!(builder.file_location);
        // Debug already includes the dispatch span.
        assert_eq!(builder.effective_directives(), vec!["calculator=trace"]);
    }

    #[test]
    fn test_try_init_is_idempotent() {
        let _ = LoggingBuilder::new().output(LogOutput::Stderr).try_init();
        assert!(
            LoggingBuilder::new()
                .output(LogOutput::Stderr)
                .try_init()
                .is_err()
        );
    }
}
