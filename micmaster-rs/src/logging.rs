//! Logging setup.
//!
//! Console output is always on and filtered by `RUST_LOG` (default `info`).
//! The log file is a reloadable layer so a profile can switch it on and off
//! at runtime. File lines look like
//! `2024-05-01 12:00:00,123:INFO:Microphone muted`.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, Event, Level, Subscriber};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Layer, Registry};

type FileLayer = Option<Box<dyn Layer<Registry> + Send + Sync>>;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to install log subscriber: {0}")]
    Init(String),

    #[error("Failed to open log file {path}: {reason}")]
    File { path: PathBuf, reason: String },

    #[error("Failed to swap log file layer: {0}")]
    Reload(String),
}

/// `timestamp:level:message` formatter for the log file.
pub struct ColonFormat;

impl<S, N> FormatEvent<S, N> for ColonFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f");
        write!(writer, "{}:{}:", now, event.metadata().level())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Handle for switching the log file on and off.
pub struct LogControl {
    path: PathBuf,
    handle: Option<reload::Handle<FileLayer, Registry>>,
    enabled: bool,
}

impl LogControl {
    /// A control not attached to any subscriber. Switching only records the
    /// requested state.
    pub fn detached(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            handle: None,
            enabled: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_file_logging(&self) -> bool {
        self.enabled
    }

    /// Install or remove the file layer.
    pub fn set_file_logging(&mut self, enabled: bool) -> Result<(), LoggingError> {
        if enabled == self.enabled {
            return Ok(());
        }
        if let Some(handle) = &self.handle {
            let layer = if enabled {
                Some(file_layer(&self.path)?)
            } else {
                None
            };
            handle
                .reload(layer)
                .map_err(|e| LoggingError::Reload(e.to_string()))?;
        }
        self.enabled = enabled;
        if enabled {
            info!("Logging has been enabled.");
        }
        Ok(())
    }
}

/// Install the global subscriber. The file layer starts out enabled when
/// `file_logging` is set.
pub fn init(log_path: &Path, file_logging: bool) -> Result<LogControl, LoggingError> {
    let (file, handle) = reload::Layer::new(None::<Box<dyn Layer<Registry> + Send + Sync>>);
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        );

    tracing_subscriber::registry()
        .with(file)
        .with(console)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    let mut control = LogControl {
        path: log_path.to_path_buf(),
        handle: Some(handle),
        enabled: false,
    };
    control.set_file_logging(file_logging)?;
    Ok(control)
}

fn file_layer(path: &Path) -> Result<Box<dyn Layer<Registry> + Send + Sync>, LoggingError> {
    let err = |reason: String| LoggingError::File {
        path: path.to_path_buf(),
        reason,
    };
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| err("no file name".to_string()))?
        .to_string_lossy()
        .into_owned();

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .map_err(|e| err(e.to_string()))?;

    Ok(tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .event_format(ColonFormat)
        .with_writer(appender.with_max_level(Level::INFO))
        .boxed())
}
