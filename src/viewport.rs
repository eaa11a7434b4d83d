//! Viewport tracking with debounced resize handling.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::timer::Debouncer;
use crate::UnixTimeMs;

/// Raw window geometry as reported by the hosting shell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowMetrics {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
}

/// Geometry assumed when the host cannot report any; a laptop-class window.
pub const FALLBACK_WINDOW: WindowMetrics = WindowMetrics {
    width: 1_440,
    height: 900,
    pixel_ratio: 1.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Current viewport. Orientation is derived, never stored independently:
/// landscape exactly when `width > height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
    pub pixel_ratio: f64,
}

impl ViewportState {
    #[must_use]
    pub fn from_metrics(metrics: WindowMetrics) -> Self {
        let orientation = if metrics.width > metrics.height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        };
        Self {
            width: metrics.width,
            height: metrics.height,
            orientation,
            pixel_ratio: metrics.pixel_ratio,
        }
    }
}

/// Single writer of [`ViewportState`]. Resize events are debounced so that a
/// continuous drag produces one terminal update rather than one per pixel.
#[derive(Debug, Clone)]
pub struct ViewportMonitor {
    state: ViewportState,
    debounce: Debouncer<WindowMetrics>,
}

impl ViewportMonitor {
    #[must_use]
    pub fn new(initial: Option<WindowMetrics>, fallback: WindowMetrics, debounce_ms: u64) -> Self {
        Self {
            state: ViewportState::from_metrics(initial.unwrap_or(fallback)),
            debounce: Debouncer::new(debounce_ms),
        }
    }

    pub fn on_resize(&mut self, metrics: WindowMetrics, now: UnixTimeMs) {
        self.debounce.submit(metrics, now);
    }

    /// Resolves a pending resize once the debounce window has elapsed.
    pub fn poll(&mut self, now: UnixTimeMs) -> Option<ViewportState> {
        let metrics = self.debounce.poll(now)?;
        self.state = ViewportState::from_metrics(metrics);
        debug!(
            width = self.state.width,
            height = self.state.height,
            orientation = ?self.state.orientation,
            "viewport updated"
        );
        Some(self.state)
    }

    #[must_use]
    pub const fn state(&self) -> ViewportState {
        self.state
    }

    #[must_use]
    pub const fn has_pending(&self) -> bool {
        self.debounce.has_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(width: u32, height: u32) -> WindowMetrics {
        WindowMetrics {
            width,
            height,
            pixel_ratio: 2.0,
        }
    }

    #[test]
    fn orientation_follows_aspect() {
        assert_eq!(
            ViewportState::from_metrics(metrics(1_024, 768)).orientation,
            Orientation::Landscape
        );
        assert_eq!(
            ViewportState::from_metrics(metrics(768, 1_024)).orientation,
            Orientation::Portrait
        );
        // A square viewport reports portrait; landscape requires width > height.
        assert_eq!(
            ViewportState::from_metrics(metrics(800, 800)).orientation,
            Orientation::Portrait
        );
    }

    #[test]
    fn falls_back_when_host_reports_nothing() {
        let monitor = ViewportMonitor::new(None, FALLBACK_WINDOW, 100);
        assert_eq!(monitor.state().width, 1_440);
        assert_eq!(monitor.state().orientation, Orientation::Landscape);
    }

    #[test]
    fn resize_burst_collapses_to_final_geometry() {
        let mut monitor = ViewportMonitor::new(Some(metrics(800, 600)), FALLBACK_WINDOW, 100);

        // A drag-resize: one event per few ms, final size 1280x1024.
        for step in 0u64..48 {
            let w = 800 + u32::try_from(step).unwrap_or(0) * 10;
            monitor.on_resize(metrics(w, 600), UnixTimeMs(step * 5));
        }
        monitor.on_resize(metrics(1_280, 1_024), UnixTimeMs(240));

        // Mid-burst polls publish nothing.
        assert_eq!(monitor.poll(UnixTimeMs(300)), None);
        assert_eq!(monitor.state().width, 800);

        let published = monitor.poll(UnixTimeMs(340)).expect("debounce elapsed");
        assert_eq!(published.width, 1_280);
        assert_eq!(published.orientation, Orientation::Portrait);

        // No further updates until the next resize.
        assert_eq!(monitor.poll(UnixTimeMs(10_000)), None);
    }
}
