//! Rations connection-failure notifications to one per sustained outage.
//!
//! Every poll cycle reports its outcome here. Without this policy a 2-second
//! cadence would raise a toast on every failed tick of an outage.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{UnixTimeMs, OUTAGE_GRACE_MS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ConnectionLost,
    ConnectionRestored,
}

/// A user-facing notice raised by the throttle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub raised_at: UnixTimeMs,
}

impl Notification {
    fn connection_lost(now: UnixTimeMs) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: NotificationKind::ConnectionLost,
            message: "Unable to reach the tactical data feed. Retrying in the background.".into(),
            raised_at: now,
        }
    }

    fn connection_restored(now: UnixTimeMs) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: NotificationKind::ConnectionRestored,
            message: "Tactical data feed restored.".into(),
            raised_at: now,
        }
    }
}

/// Failure/recovery state machine around fetch outcomes.
///
/// A failure is surfaced only while online, only once per outage, and only if
/// the last success is older than the grace window (or never happened). The
/// first success after a surfaced failure raises a recovery notice.
#[derive(Debug, Clone)]
pub struct ErrorThrottle {
    grace_ms: u64,
    last_success: Option<UnixTimeMs>,
    error_shown: bool,
}

impl Default for ErrorThrottle {
    fn default() -> Self {
        Self::new(OUTAGE_GRACE_MS)
    }
}

impl ErrorThrottle {
    #[must_use]
    pub const fn new(grace_ms: u64) -> Self {
        Self {
            grace_ms,
            last_success: None,
            error_shown: false,
        }
    }

    /// Records a failed fetch; returns a notification if this outage should
    /// surface. Offline failures are expected and never surfaced.
    pub fn on_failure(&mut self, is_online: bool, now: UnixTimeMs) -> Option<Notification> {
        if !is_online {
            debug!("fetch failed while offline, not surfacing");
            return None;
        }
        if self.error_shown {
            return None;
        }
        let within_grace = self
            .last_success
            .is_some_and(|t| now.elapsed_since(t) <= self.grace_ms);
        if within_grace {
            return None;
        }
        self.error_shown = true;
        Some(Notification::connection_lost(now))
    }

    /// Records a successful fetch; returns a recovery notification if an
    /// outage had been surfaced.
    pub fn on_success(&mut self, now: UnixTimeMs) -> Option<Notification> {
        let recovered = std::mem::replace(&mut self.error_shown, false);
        self.last_success = Some(now);
        recovered.then(|| Notification::connection_restored(now))
    }

    #[must_use]
    pub const fn error_shown(&self) -> bool {
        self.error_shown
    }

    #[must_use]
    pub const fn last_success(&self) -> Option<UnixTimeMs> {
        self.last_success
    }
}
