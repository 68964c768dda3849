//! Single-slot status line.

use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Success => f.write_str("success"),
            Severity::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub message: String,
    pub severity: Severity,
}

/// Notified on every report, e.g. to print the status line.
pub trait StatusListener: Send + Sync {
    fn on_status(&self, status: &Status);
}

/// Holds the current status. Each report replaces the previous one.
#[derive(Default)]
pub struct StatusReporter {
    current: RwLock<Option<Status>>,
    listener: Option<Arc<dyn StatusListener>>,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener(listener: Arc<dyn StatusListener>) -> Self {
        Self {
            current: RwLock::new(None),
            listener: Some(listener),
        }
    }

    pub fn report(&self, severity: Severity, message: impl Into<String>) {
        let status = Status {
            message: message.into(),
            severity,
        };
        debug!("status [{}]: {}", status.severity, status.message);
        if let Some(listener) = &self.listener {
            listener.on_status(&status);
        }
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(status);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.report(Severity::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.report(Severity::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.report(Severity::Error, message);
    }

    pub fn current(&self) -> Option<Status> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
