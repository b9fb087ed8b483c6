use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use crate::error::{Result, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// Events published to whoever watches a run (CLI progress bar, UI push, tests)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SyncEvent {
    Progress(f64),
    Log { level: LogLevel, message: String },
    Finished { success: bool },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: SyncEvent);
}

/// Drops every event
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: SyncEvent) {}
}

/// Forwards events over an unbounded channel; a closed receiver is ignored
pub struct ChannelSink {
    sender: UnboundedSender<SyncEvent>,
}

impl ChannelSink {
    pub fn new(sender: UnboundedSender<SyncEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: SyncEvent) {
        let _ = self.sender.send(event);
    }
}

/// Slice of the 0-100 progress range owned by one phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressBand {
    pub start: f64,
    pub end: f64,
}

impl ProgressBand {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Percentage after `done` of `total` steps, rounded to one decimal
    pub fn at(&self, done: usize, total: usize) -> f64 {
        if total == 0 {
            return self.end;
        }
        let fraction = done.min(total) as f64 / total as f64;
        ((self.start + (self.end - self.start) * fraction) * 10.0).round() / 10.0
    }
}

/// Capabilities handed to every phase of a run: event sink and cancellation signal
pub struct RunContext {
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
    last_progress: Mutex<f64>,
}

impl RunContext {
    pub fn new(sink: Arc<dyn EventSink>, cancel: CancellationToken) -> Self {
        Self {
            sink,
            cancel,
            last_progress: Mutex::new(0.0),
        }
    }

    /// Context without listeners and with a fresh, never-fired token
    pub fn detached() -> Self {
        Self::new(Arc::new(NullSink), CancellationToken::new())
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fails with [`SyncError::Cancelled`] once the token has fired
    pub fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        Ok(())
    }

    /// Report progress; values never go backwards within a run
    pub fn progress(&self, percentage: f64) {
        let percentage = percentage.clamp(0.0, 100.0);
        let reported = match self.last_progress.lock() {
            Ok(mut last) => {
                if percentage > *last {
                    *last = percentage;
                }
                *last
            }
            Err(_) => percentage,
        };
        self.sink.emit(SyncEvent::Progress(reported));
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        info!(target: "media_stat_core::run", "{}", message);
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(target: "media_stat_core::run", "{}", message);
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        error!(target: "media_stat_core::run", "{}", message);
        self.log(LogLevel::Error, message);
    }

    pub fn finished(&self, success: bool) {
        self.sink.emit(SyncEvent::Finished { success });
    }

    fn log(&self, level: LogLevel, message: String) {
        self.sink.emit(SyncEvent::Log { level, message });
    }
}
