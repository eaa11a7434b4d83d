//! Host capability probe: the one-shot snapshot of what the platform can
//! report at startup. Hosts without a capability return `None` and the
//! controller falls back to safe defaults; this is never an error.

use crate::network::ConnectionInfo;
use crate::touch::PointerSurface;
use crate::viewport::WindowMetrics;

pub trait PlatformProbe {
    fn window_metrics(&self) -> Option<WindowMetrics> {
        None
    }

    fn pointer_surface(&self) -> PointerSurface {
        PointerSurface::default()
    }

    fn battery_percent(&self) -> Option<u8> {
        None
    }

    fn connection(&self) -> Option<ConnectionInfo> {
        None
    }

    fn is_online(&self) -> Option<bool> {
        None
    }

    fn is_visible(&self) -> Option<bool> {
        None
    }
}

/// A host that can report nothing; every capability falls back to defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessProbe;

impl PlatformProbe for HeadlessProbe {}

/// Fixed-answer probe for tests and kiosk builds with known hardware.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    pub window: Option<WindowMetrics>,
    pub pointer: PointerSurface,
    pub battery: Option<u8>,
    pub link: Option<ConnectionInfo>,
    pub online: Option<bool>,
    pub visible: Option<bool>,
}

impl PlatformProbe for StaticProbe {
    fn window_metrics(&self) -> Option<WindowMetrics> {
        self.window
    }

    fn pointer_surface(&self) -> PointerSurface {
        self.pointer
    }

    fn battery_percent(&self) -> Option<u8> {
        self.battery
    }

    fn connection(&self) -> Option<ConnectionInfo> {
        self.link
    }

    fn is_online(&self) -> Option<bool> {
        self.online
    }

    fn is_visible(&self) -> Option<bool> {
        self.visible
    }
}
