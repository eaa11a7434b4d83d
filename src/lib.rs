#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Adaptive presentation core for the AEGIS MIND tactical dashboard.
//!
//! The crate classifies the runtime environment (viewport, pointer modality,
//! frame rate, battery, link quality), derives how much data the dashboard
//! should render and how often it should refresh, and rations user-visible
//! connectivity notifications to one per sustained outage. Rendering itself
//! is owned by the embedding shell; the shell feeds platform events into an
//! [`AdaptiveController`] and reads back snapshots, pictures, and events.

pub mod capabilities;
pub mod controller;
pub mod network;
pub mod perf;
pub mod profile;
pub mod scheduler;
pub mod throttle;
pub mod timer;
pub mod touch;
pub mod viewport;

use serde::{Deserialize, Serialize};

pub use controller::{
    AdaptiveController, ControllerConfig, ControllerError, ControllerEvent, ControllerSnapshot,
    MetricsSnapshot,
};
pub use network::{ConnectionInfo, ConnectionQuality, ConnectionType, NetworkState, SyncMode};
pub use perf::{PerformanceState, PerformanceTier, RenderSettings};
pub use profile::{DeviceClass, DeviceProfile, ProfileTable};
pub use scheduler::{BattlefieldPicture, CollectionCounts, CycleOutcome};
pub use throttle::{ErrorThrottle, Notification, NotificationKind};
pub use touch::{PointerSurface, TouchCapabilities, TouchTargetTier};
pub use viewport::{Orientation, ViewportState, WindowMetrics};

/// Debounce window applied to resize/orientation bursts.
pub const VIEWPORT_DEBOUNCE_MS: u64 = 100;
/// Hold duration before a long-press gesture fires.
pub const LONG_PRESS_DEFAULT_MS: u64 = 800;
/// Minimum length of one frame-rate sampling window.
pub const FPS_WINDOW_MS: u64 = 1_000;
/// Battery percentage below which power-saving settings engage.
pub const LOW_BATTERY_PCT: u8 = 20;
/// Poll cadence while the link quality is poor.
pub const BATCH_INTERVAL_MS: u64 = 30_000;
/// Poll cadence while the link quality is moderate.
pub const THROTTLED_INTERVAL_MS: u64 = 10_000;
/// Window after a successful pull during which failures stay silent.
pub const OUTAGE_GRACE_MS: u64 = 10_000;

/// Unix timestamp in milliseconds.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct UnixTimeMs(pub u64);

impl UnixTimeMs {
    #[must_use]
    pub fn now() -> Self {
        Self(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
        )
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn elapsed_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    #[must_use]
    pub fn add_millis(self, ms: u64) -> Self {
        Self(self.0.saturating_add(ms))
    }
}
