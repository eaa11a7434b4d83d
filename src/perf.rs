//! Frame-rate sampling and the performance tier derived from it, plus the
//! render settings table combining tier, battery, and connection type.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::network::ConnectionType;
use crate::profile::{Animations, MapQuality};
use crate::{UnixTimeMs, LOW_BATTERY_PCT};

/// Frame counts below this over one window classify as `low`.
pub const FPS_LOW_CEILING: u32 = 20;
/// Frame counts below this (and at least [`FPS_LOW_CEILING`]) are `medium`.
pub const FPS_MEDIUM_CEILING: u32 = 40;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    Low,
    Medium,
    #[default]
    High,
}

impl PerformanceTier {
    #[must_use]
    pub const fn from_fps(fps: u32) -> Self {
        if fps < FPS_LOW_CEILING {
            Self::Low
        } else if fps < FPS_MEDIUM_CEILING {
            Self::Medium
        } else {
            Self::High
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Counts frames per window of at least `window_ms`. The count of the window
/// that just closed is the published reading; tier decisions use that closed
/// count, never the freshly reset counter (a zeroed counter is not a
/// measurement).
#[derive(Debug, Clone, Copy)]
pub struct FrameRateSampler {
    window_ms: u64,
    window_started: UnixTimeMs,
    frames: u32,
    latest: Option<u32>,
}

impl FrameRateSampler {
    #[must_use]
    pub const fn new(window_ms: u64, now: UnixTimeMs) -> Self {
        Self {
            window_ms,
            window_started: now,
            frames: 0,
            latest: None,
        }
    }

    /// Records one advanced frame. Returns the closed window's frame count
    /// when this tick crosses a window boundary; the boundary frame itself is
    /// counted into the new window.
    pub fn on_frame(&mut self, now: UnixTimeMs) -> Option<u32> {
        if now.elapsed_since(self.window_started) >= self.window_ms {
            let closed = self.frames;
            self.frames = 1;
            self.window_started = now;
            self.latest = Some(closed);
            Some(closed)
        } else {
            self.frames = self.frames.saturating_add(1);
            None
        }
    }

    #[must_use]
    pub const fn latest(&self) -> Option<u32> {
        self.latest
    }
}

/// Presentation budget derived from runtime conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    pub map_quality: MapQuality,
    pub animations: Animations,
    pub max_data_points: usize,
    pub refresh_interval_ms: u64,
}

impl RenderSettings {
    /// Pure settings table. Low battery and 2g-class links constrain the
    /// dashboard exactly like a low frame rate does.
    #[must_use]
    pub const fn derive(
        tier: PerformanceTier,
        is_low_battery: bool,
        connection_type: ConnectionType,
    ) -> Self {
        if is_low_battery || connection_type.is_constrained() {
            return Self::CONSTRAINED;
        }
        match tier {
            PerformanceTier::Low => Self::CONSTRAINED,
            PerformanceTier::Medium => Self {
                map_quality: MapQuality::Medium,
                animations: Animations::Reduced,
                max_data_points: 500,
                refresh_interval_ms: 5_000,
            },
            PerformanceTier::High => Self {
                map_quality: MapQuality::High,
                animations: Animations::Full,
                max_data_points: 5_000,
                refresh_interval_ms: 2_000,
            },
        }
    }

    const CONSTRAINED: Self = Self {
        map_quality: MapQuality::Low,
        animations: Animations::None,
        max_data_points: 100,
        refresh_interval_ms: 10_000,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceState {
    pub tier: PerformanceTier,
    /// `None` until the first sampling window closes.
    pub fps: Option<u32>,
    pub battery_level: u8,
    pub is_low_battery: bool,
    pub connection_type: ConnectionType,
}

impl PerformanceState {
    #[must_use]
    pub const fn settings(&self) -> RenderSettings {
        RenderSettings::derive(self.tier, self.is_low_battery, self.connection_type)
    }
}

/// Single writer of [`PerformanceState`]. Battery and connection inputs are
/// optional; hosts without those capabilities leave the safe defaults in
/// place (full battery, 4g).
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    sampler: FrameRateSampler,
    state: PerformanceState,
}

impl PerformanceMonitor {
    #[must_use]
    pub fn new(
        window_ms: u64,
        now: UnixTimeMs,
        battery_level: Option<u8>,
        connection_type: Option<ConnectionType>,
    ) -> Self {
        let battery_level = battery_level.unwrap_or(100).min(100);
        Self {
            sampler: FrameRateSampler::new(window_ms, now),
            state: PerformanceState {
                tier: PerformanceTier::default(),
                fps: None,
                battery_level,
                is_low_battery: battery_level < LOW_BATTERY_PCT,
                connection_type: connection_type.unwrap_or_default(),
            },
        }
    }

    /// Advances the frame counter; returns the refreshed state when a
    /// sampling window closes.
    pub fn on_frame(&mut self, now: UnixTimeMs) -> Option<PerformanceState> {
        let fps = self.sampler.on_frame(now)?;
        let tier = PerformanceTier::from_fps(fps);
        if tier != self.state.tier {
            info!(fps, tier = tier.as_str(), "performance tier changed");
        } else {
            debug!(fps, tier = tier.as_str(), "frame window closed");
        }
        self.state.fps = Some(fps);
        self.state.tier = tier;
        Some(self.state)
    }

    pub fn on_battery_level(&mut self, percent: u8) {
        let level = percent.min(100);
        self.state.battery_level = level;
        let low = level < LOW_BATTERY_PCT;
        if low != self.state.is_low_battery {
            info!(battery_level = level, low, "battery threshold crossed");
        }
        self.state.is_low_battery = low;
    }

    pub fn on_connection_type(&mut self, connection_type: ConnectionType) {
        if connection_type != self.state.connection_type {
            debug!(connection_type = connection_type.as_str(), "connection type changed");
        }
        self.state.connection_type = connection_type;
    }

    #[must_use]
    pub const fn state(&self) -> PerformanceState {
        self.state
    }

    #[must_use]
    pub const fn settings(&self) -> RenderSettings {
        self.state.settings()
    }
}
