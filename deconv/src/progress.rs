//! Progress reporting sinks.
//!
//! The engine never logs on its own. Callers hand it an optional [`ProgressSink`] and it
//! reports human-readable status strings synchronously from inside the iteration loop,
//! so implementations must be cheap and must not call back into the engine.

use std::fmt;
use std::sync::Mutex;

/// Receiver for human-readable progress messages.
pub trait ProgressSink {
    fn info(&self, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(&str),
{
    fn info(&self, message: &str) {
        self(message)
    }
}

/// Report through an optional sink
pub(crate) fn report(sink: Option<&dyn ProgressSink>, message: impl FnOnce() -> String) {
    if let Some(sink) = sink {
        sink.info(&message());
    }
}

/// Forwards every message to the `log` facade at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn info(&self, message: &str) {
        log::info!("{message}");
    }
}

/// Severity of a [`MessageLog`] entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Debug => write!(f, "DEBUG"),
            Level::Info => write!(f, "INFO"),
            Level::Warning => write!(f, "WARNING"),
            Level::Error => write!(f, "ERROR"),
        }
    }
}

type Callback = Box<dyn Fn(&str) + Send + Sync>;

/// Records timestamped messages and optionally forwards each formatted line to a callback.
///
/// Lines are formatted as `[HH:MM:SS] LEVEL: message` using local time.
#[derive(Default)]
pub struct MessageLog {
    callback: Option<Callback>,
    messages: Mutex<Vec<String>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log that also forwards each formatted line to `callback`
    pub fn with_callback(callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            callback: Some(Box::new(callback)),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn log(&self, level: Level, message: &str) {
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        let line = format!("[{timestamp}] {level}: {message}");

        // A poisoned lock only means another thread panicked mid-push
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(line.clone());

        if let Some(callback) = &self.callback {
            callback(&line);
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    pub fn warning(&self, message: &str) {
        self.log(Level::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }

    /// All recorded lines, oldest first
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn clear(&self) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl ProgressSink for MessageLog {
    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }
}

impl fmt::Debug for MessageLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageLog")
            .field("has_callback", &self.callback.is_some())
            .field("messages", &self.messages().len())
            .finish()
    }
}
