//! Connectivity tracking: online state, link quality, and the derived sync
//! mode that drives poll cadence.

use serde::{Deserialize, Serialize};
use tracing::info;

/// Downlink below this is a poor link.
pub const POOR_DOWNLINK_MBPS: f64 = 1.0;
/// Round-trip time above this is a poor link.
pub const POOR_RTT_MS: u64 = 500;
/// Downlink below this (but at least [`POOR_DOWNLINK_MBPS`]) is moderate.
pub const MODERATE_DOWNLINK_MBPS: f64 = 5.0;
/// Round-trip time above this (but at most [`POOR_RTT_MS`]) is moderate.
pub const MODERATE_RTT_MS: u64 = 200;

/// Effective connection type as reported by the network interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionType {
    #[serde(rename = "slow-2g")]
    Slow2g,
    #[serde(rename = "2g")]
    Cell2g,
    #[serde(rename = "3g")]
    Cell3g,
    #[default]
    #[serde(rename = "4g")]
    Cell4g,
    #[serde(rename = "5g")]
    Cell5g,
    #[serde(rename = "wifi")]
    Wifi,
    #[serde(rename = "ethernet")]
    Ethernet,
    #[serde(rename = "unknown")]
    Unknown,
}

impl ConnectionType {
    /// Links too slow to feed the full picture regardless of frame rate.
    #[must_use]
    pub const fn is_constrained(self) -> bool {
        matches!(self, Self::Slow2g | Self::Cell2g)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Slow2g => "slow-2g",
            Self::Cell2g => "2g",
            Self::Cell3g => "3g",
            Self::Cell4g => "4g",
            Self::Cell5g => "5g",
            Self::Wifi => "wifi",
            Self::Ethernet => "ethernet",
            Self::Unknown => "unknown",
        }
    }
}

/// One reading from the connection-information capability. Fields the host
/// cannot measure stay `None` and never trip a threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub connection_type: ConnectionType,
    pub downlink_mbps: Option<f64>,
    pub rtt_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionQuality {
    Good,
    Moderate,
    Poor,
}

impl ConnectionQuality {
    #[must_use]
    pub fn from_link(downlink_mbps: Option<f64>, rtt_ms: Option<u64>) -> Self {
        let downlink_below = |limit: f64| downlink_mbps.is_some_and(|mbps| mbps < limit);
        let rtt_above = |limit: u64| rtt_ms.is_some_and(|rtt| rtt > limit);

        if downlink_below(POOR_DOWNLINK_MBPS) || rtt_above(POOR_RTT_MS) {
            Self::Poor
        } else if downlink_below(MODERATE_DOWNLINK_MBPS) || rtt_above(MODERATE_RTT_MS) {
            Self::Moderate
        } else {
            Self::Good
        }
    }
}

/// Data-freshness policy derived from connectivity. Never stored; recomputed
/// from [`NetworkState`] wherever it is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Offline,
    Batch,
    Throttled,
    Realtime,
}

impl SyncMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Batch => "batch",
            Self::Throttled => "throttled",
            Self::Realtime => "realtime",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkState {
    pub is_online: bool,
    pub quality: ConnectionQuality,
}

impl NetworkState {
    #[must_use]
    pub const fn sync_mode(self) -> SyncMode {
        if !self.is_online {
            return SyncMode::Offline;
        }
        match self.quality {
            ConnectionQuality::Poor => SyncMode::Batch,
            ConnectionQuality::Moderate => SyncMode::Throttled,
            ConnectionQuality::Good => SyncMode::Realtime,
        }
    }

    #[must_use]
    pub const fn should_defer_heavy_operations(self) -> bool {
        !matches!(self.quality, ConnectionQuality::Good)
    }
}

/// Single writer of [`NetworkState`].
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    state: NetworkState,
}

impl NetworkMonitor {
    #[must_use]
    pub fn new(is_online: bool, link: Option<&ConnectionInfo>) -> Self {
        let quality = link.map_or(ConnectionQuality::Good, |info| {
            ConnectionQuality::from_link(info.downlink_mbps, info.rtt_ms)
        });
        Self {
            state: NetworkState { is_online, quality },
        }
    }

    pub fn on_online(&mut self, is_online: bool) {
        if self.state.is_online != is_online {
            info!(is_online, "connectivity changed");
            self.state.is_online = is_online;
        }
    }

    pub fn on_connection_change(&mut self, info: &ConnectionInfo) {
        let quality = ConnectionQuality::from_link(info.downlink_mbps, info.rtt_ms);
        if self.state.quality != quality {
            info!(quality = ?quality, "link quality changed");
            self.state.quality = quality;
        }
    }

    #[must_use]
    pub const fn state(&self) -> NetworkState {
        self.state
    }
}
