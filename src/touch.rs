//! Pointer modality detection, touch-target sizing, and long-press tracking.

use serde::{Deserialize, Serialize};

use crate::timer::DeadlineTimer;
use crate::UnixTimeMs;

/// What the hosting shell reports about its pointer hardware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerSurface {
    pub has_touch_start: bool,
    pub max_touch_points: u8,
}

/// Pointer modality, fixed at first evaluation. Hardware does not grow or
/// lose a touchscreen mid-session, so there is no re-detection path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchCapabilities {
    is_touch_device: bool,
}

impl TouchCapabilities {
    #[must_use]
    pub const fn detect(surface: PointerSurface) -> Self {
        Self {
            is_touch_device: surface.has_touch_start || surface.max_touch_points > 0,
        }
    }

    #[must_use]
    pub const fn is_touch_device(self) -> bool {
        self.is_touch_device
    }
}

/// Minimum hit-target geometry for one sizing tier, in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchTargetSpec {
    pub min_width_px: u32,
    pub min_height_px: u32,
    pub padding_px: u32,
}

/// Touch-target sizing tiers. Callers pick the tier; `glove_mode` exists for
/// operators in vehicle or dismounted kit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchTargetTier {
    Small,
    Default,
    Large,
    GloveMode,
}

impl TouchTargetTier {
    #[must_use]
    pub const fn spec(self) -> TouchTargetSpec {
        match self {
            Self::Small => TouchTargetSpec {
                min_width_px: 44,
                min_height_px: 44,
                padding_px: 4,
            },
            Self::Default => TouchTargetSpec {
                min_width_px: 48,
                min_height_px: 48,
                padding_px: 8,
            },
            Self::Large => TouchTargetSpec {
                min_width_px: 56,
                min_height_px: 56,
                padding_px: 12,
            },
            Self::GloveMode => TouchTargetSpec {
                min_width_px: 64,
                min_height_px: 64,
                padding_px: 16,
            },
        }
    }
}

/// Long-press gesture tracker: a hold that survives the configured duration
/// without a pointer-up or pointer-move fires exactly once.
#[derive(Debug, Clone, Copy)]
pub struct LongPressTracker {
    duration_ms: u64,
    timer: DeadlineTimer,
}

impl LongPressTracker {
    #[must_use]
    pub const fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            timer: DeadlineTimer::idle(),
        }
    }

    pub fn pointer_down(&mut self, now: UnixTimeMs) {
        self.timer.arm(now, self.duration_ms);
    }

    pub fn pointer_up(&mut self) {
        self.timer.cancel();
    }

    pub fn pointer_moved(&mut self) {
        self.timer.cancel();
    }

    /// True exactly once per press, when the hold duration has elapsed.
    pub fn poll(&mut self, now: UnixTimeMs) -> bool {
        self.timer.fire(now)
    }

    #[must_use]
    pub const fn is_tracking(&self) -> bool {
        self.timer.is_armed()
    }
}
