use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Error,
}

/// User-facing message; delivery is fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub issued_at: DateTime<Utc>,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Severity::Info, title, description)
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Severity::Error, title, description)
    }

    fn new(severity: Severity, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            description: description.into(),
            issued_at: Utc::now(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Info => info!(title = %notification.title, "{}", notification.description),
            Severity::Error => error!(title = %notification.title, "{}", notification.description),
        }
    }
}

/// Queues notifications until the front end collects them.
#[derive(Debug, Default)]
pub struct BufferedNotifier {
    pending: Mutex<Vec<Notification>>,
}

impl BufferedNotifier {
    pub fn drain(&self) -> Vec<Notification> {
        let mut guard = self.pending.lock().expect("notification mutex poisoned");
        std::mem::take(&mut *guard)
    }
}

impl Notifier for BufferedNotifier {
    fn notify(&self, notification: Notification) {
        TracingNotifier.notify(notification.clone());
        self.pending
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
    }
}
