//! # Notification Module
//!
//! Outbound events for the application boundary, and the sink that delivers
//! them.
//!
//! Delivery is best-effort: the sink is a bounded channel and a full or
//! closed channel drops the notification instead of blocking sample
//! processing. Consumers that fall behind lose events, never the engine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use crate::flight::report::FlightReport;
use crate::telemetry::TelemetrySample;

/// Landing summary emitted at touchdown
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchdownReport {
    pub rate_fpm: f64,
    pub location_text: String,
    pub timestamp: DateTime<Utc>,
}

/// A penalty that made it past the cooldown
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PenaltyApplied {
    pub message: String,
    pub points: u32,
    pub total_score: u32,
}

/// Everything the engine tells the outside world
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum Notification {
    ConnectionStatus { connected: bool },
    /// `None` clears a previously reported error
    ConnectionError { message: Option<String> },
    Telemetry(TelemetrySample),
    TouchdownReport(TouchdownReport),
    PenaltyApplied(PenaltyApplied),
    FlightCompleted(FlightReport),
    FlightStarted,
}

/// Why a notification was not delivered
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification channel full")]
    Full,
    #[error("notification channel closed")]
    Closed,
}

/// Sending half of the notification channel
#[derive(Debug, Clone)]
pub struct NotificationSink {
    tx: mpsc::Sender<Notification>,
    dropped: Arc<AtomicU64>,
}

/// Create a sink and its receiver with room for `capacity` pending events
pub fn channel(capacity: usize) -> (NotificationSink, mpsc::Receiver<Notification>) {
    let (tx, rx) = mpsc::channel(capacity);
    (NotificationSink { tx, dropped: Arc::new(AtomicU64::new(0)) }, rx)
}

impl NotificationSink {
    /// Attempt delivery without waiting
    ///
    /// # Errors
    ///
    /// `Full` if the consumer is behind, `Closed` if it has gone away
    pub fn try_publish(&self, notification: Notification) -> Result<(), NotifyError> {
        self.tx.try_send(notification).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => NotifyError::Full,
            mpsc::error::TrySendError::Closed(_) => NotifyError::Closed,
        })
    }

    /// Deliver if possible, otherwise count and drop
    pub fn publish(&self, notification: Notification) {
        if let Err(e) = self.try_publish(notification) {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            debug!("Dropped notification ({}), {} dropped so far", e, dropped);
        }
    }

    /// Notifications lost to a full or closed channel
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
