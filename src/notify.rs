use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    pub fn label(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Success => "SUCCESS",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// A message for the user, with an optional display duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: Level,
    pub message: String,
    pub timeout: Option<Duration>,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.level.label(), self.message)
    }
}

/// Display durations applied by [`Notifier`] when none is given.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub default: Duration,
    pub error: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            default: Duration::from_secs(3),
            error: Duration::from_secs(10),
        }
    }
}

type Sink = Arc<dyn Fn(Notification) + Send + Sync>;

/// Cheaply cloneable sink for notifications.
#[derive(Clone)]
pub struct Notifier {
    sink: Sink,
    timeouts: Timeouts,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl Notifier {
    pub fn new(sink: impl Fn(Notification) + Send + Sync + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
            timeouts: Timeouts::default(),
        }
    }

    /// A notifier dropping everything, logging at debug level.
    pub fn silent() -> Self {
        Self::new(|n| tracing::debug!("notification: {n}"))
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn notify(&self, notification: Notification) {
        (self.sink)(notification);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(Level::Info, message.into(), self.timeouts.default);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(Level::Success, message.into(), self.timeouts.default);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(Level::Warning, message.into(), self.timeouts.default);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(Level::Error, message.into(), self.timeouts.error);
    }

    fn emit(&self, level: Level, message: String, timeout: Duration) {
        self.notify(Notification {
            level,
            message,
            timeout: Some(timeout),
        });
    }
}
