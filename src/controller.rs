//! The adaptive controller: one explicit service object owning every monitor
//! and the scheduler task. Shells construct it at startup, feed it platform
//! events, and read back snapshots, pictures, and notifications. Teardown
//! releases every timer and task deterministically.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::capabilities::{Clock, DataFetcher, PlatformProbe, ScenarioActivation};
use crate::network::{ConnectionInfo, NetworkMonitor, NetworkState, SyncMode};
use crate::perf::{PerformanceMonitor, PerformanceState};
use crate::profile::{DeviceProfile, ProfileError, ProfileTable};
use crate::scheduler::{BattlefieldPicture, CycleOutcome, SchedulerCommand, SchedulerTask};
use crate::throttle::{ErrorThrottle, Notification};
use crate::touch::{LongPressTracker, TouchCapabilities};
use crate::viewport::{ViewportMonitor, WindowMetrics, FALLBACK_WINDOW};
use crate::{
    UnixTimeMs, BATCH_INTERVAL_MS, FPS_WINDOW_MS, LONG_PRESS_DEFAULT_MS, OUTAGE_GRACE_MS,
    THROTTLED_INTERVAL_MS, VIEWPORT_DEBOUNCE_MS,
};

const COMMAND_QUEUE_DEPTH: usize = 16;

#[derive(Debug, Clone, Error)]
pub enum ControllerError {
    #[error("invalid controller configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    InvalidProfileTable(#[from] ProfileError),
    #[error("scheduler is not running")]
    SchedulerStopped,
}

/// Tuning knobs, defaulting to the production constants. The profile table
/// is swappable so kiosk builds and tests can reshape the breakpoints.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub profiles: ProfileTable,
    pub debounce_ms: u64,
    pub long_press_ms: u64,
    pub fps_window_ms: u64,
    pub outage_grace_ms: u64,
    pub batch_interval_ms: u64,
    pub throttled_interval_ms: u64,
    pub fallback_window: WindowMetrics,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            profiles: ProfileTable::builtin(),
            debounce_ms: VIEWPORT_DEBOUNCE_MS,
            long_press_ms: LONG_PRESS_DEFAULT_MS,
            fps_window_ms: FPS_WINDOW_MS,
            outage_grace_ms: OUTAGE_GRACE_MS,
            batch_interval_ms: BATCH_INTERVAL_MS,
            throttled_interval_ms: THROTTLED_INTERVAL_MS,
            fallback_window: FALLBACK_WINDOW,
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.debounce_ms == 0 {
            return Err(ControllerError::InvalidConfig(
                "debounce_ms must be > 0".into(),
            ));
        }
        if self.long_press_ms == 0 {
            return Err(ControllerError::InvalidConfig(
                "long_press_ms must be > 0".into(),
            ));
        }
        if self.fps_window_ms == 0 {
            return Err(ControllerError::InvalidConfig(
                "fps_window_ms must be > 0".into(),
            ));
        }
        if self.batch_interval_ms == 0 || self.throttled_interval_ms == 0 {
            return Err(ControllerError::InvalidConfig(
                "poll intervals must be > 0".into(),
            ));
        }
        if self.fallback_window.width == 0 || self.fallback_window.height == 0 {
            return Err(ControllerError::InvalidConfig(
                "fallback window must have a non-zero size".into(),
            ));
        }
        Ok(())
    }
}

/// Read-only view of the controller's decision inputs, published on change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    pub device_profile: DeviceProfile,
    pub viewport: crate::viewport::ViewportState,
    pub performance: PerformanceState,
    pub network: NetworkState,
    pub sync_mode: SyncMode,
}

/// Out-of-band signals for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum ControllerEvent {
    Notification(Notification),
    Cycle(CycleOutcome),
    ScenarioActivated(ScenarioActivation),
}

#[derive(Debug, Default)]
pub struct ControllerMetrics {
    pub cycles_started: AtomicU64,
    pub cycles_applied: AtomicU64,
    pub cycles_failed: AtomicU64,
    pub cycles_discarded_stale: AtomicU64,
    pub cycles_skipped_hidden: AtomicU64,
    pub entities_decimated: AtomicU64,
    pub notifications_shown: AtomicU64,
    pub notifications_suppressed: AtomicU64,
    pub scenario_activations: AtomicU64,
}

impl ControllerMetrics {
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles_started: self.cycles_started.load(Ordering::Relaxed),
            cycles_applied: self.cycles_applied.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            cycles_discarded_stale: self.cycles_discarded_stale.load(Ordering::Relaxed),
            cycles_skipped_hidden: self.cycles_skipped_hidden.load(Ordering::Relaxed),
            entities_decimated: self.entities_decimated.load(Ordering::Relaxed),
            notifications_shown: self.notifications_shown.load(Ordering::Relaxed),
            notifications_suppressed: self.notifications_suppressed.load(Ordering::Relaxed),
            scenario_activations: self.scenario_activations.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cycles_started: u64,
    pub cycles_applied: u64,
    pub cycles_failed: u64,
    pub cycles_discarded_stale: u64,
    pub cycles_skipped_hidden: u64,
    pub entities_decimated: u64,
    pub notifications_shown: u64,
    pub notifications_suppressed: u64,
    pub scenario_activations: u64,
}

/// The adaptive presentation controller.
///
/// Event methods take `&mut self`: the monitors have exactly one writer by
/// construction. Everything published to readers goes through watch channels.
/// Must be started inside a Tokio runtime; the scheduler runs as one task and
/// is released on [`shutdown`](Self::shutdown) or drop.
pub struct AdaptiveController {
    config: ControllerConfig,
    clock: Arc<dyn Clock>,
    viewport: ViewportMonitor,
    perf: PerformanceMonitor,
    network: NetworkMonitor,
    touch: TouchCapabilities,
    snapshot_tx: watch::Sender<ControllerSnapshot>,
    visibility_tx: watch::Sender<bool>,
    picture_rx: watch::Receiver<BattlefieldPicture>,
    events_rx: Option<mpsc::UnboundedReceiver<ControllerEvent>>,
    cmd_tx: mpsc::Sender<SchedulerCommand>,
    scheduler: Option<JoinHandle<()>>,
    metrics: Arc<ControllerMetrics>,
}

impl AdaptiveController {
    pub fn start(
        config: ControllerConfig,
        fetcher: Arc<dyn DataFetcher>,
        probe: &dyn PlatformProbe,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ControllerError> {
        config.validate()?;
        let now = clock.now();

        let viewport = ViewportMonitor::new(
            probe.window_metrics(),
            config.fallback_window,
            config.debounce_ms,
        );
        let touch = TouchCapabilities::detect(probe.pointer_surface());
        let link = probe.connection();
        let perf = PerformanceMonitor::new(
            config.fps_window_ms,
            now,
            probe.battery_percent(),
            link.map(|info| info.connection_type),
        );
        let network = NetworkMonitor::new(probe.is_online().unwrap_or(true), link.as_ref());

        let snapshot = compose_snapshot(&config.profiles, &viewport, &perf, &network);
        info!(
            device = snapshot.device_profile.name.as_str(),
            width = snapshot.viewport.width,
            sync_mode = snapshot.sync_mode.as_str(),
            touch = touch.is_touch_device(),
            "adaptive controller starting"
        );

        let (snapshot_tx, snapshot_rx) = watch::channel(snapshot);
        let (visibility_tx, visibility_rx) =
            watch::channel(probe.is_visible().unwrap_or(true));
        let (picture_tx, picture_rx) = watch::channel(BattlefieldPicture::default());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let metrics = Arc::new(ControllerMetrics::default());

        let task = SchedulerTask {
            fetcher,
            clock: Arc::clone(&clock),
            batch_interval_ms: config.batch_interval_ms,
            throttled_interval_ms: config.throttled_interval_ms,
            snapshot_rx,
            visibility_rx,
            picture_tx,
            events_tx,
            cmd_rx,
            throttle: ErrorThrottle::new(config.outage_grace_ms),
            metrics: Arc::clone(&metrics),
        };
        let scheduler = tokio::spawn(task.run());

        Ok(Self {
            config,
            clock,
            viewport,
            perf,
            network,
            touch,
            snapshot_tx,
            visibility_tx,
            picture_rx,
            events_rx: Some(events_rx),
            cmd_tx,
            scheduler: Some(scheduler),
            metrics,
        })
    }

    // --- Platform event intake -------------------------------------------

    pub fn on_resize(&mut self, metrics: WindowMetrics) {
        let now = self.clock.now();
        self.viewport.on_resize(metrics, now);
        self.pump_at(now);
    }

    /// One animation tick. Also resolves any pending debounced work, so a
    /// shell that drives frames needs no separate pump.
    pub fn on_frame(&mut self) {
        let now = self.clock.now();
        let _ = self.perf.on_frame(now);
        self.pump_at(now);
    }

    pub fn on_battery_level(&mut self, percent: u8) {
        self.perf.on_battery_level(percent);
        self.pump_at(self.clock.now());
    }

    pub fn on_connection_change(&mut self, info: ConnectionInfo) {
        self.network.on_connection_change(&info);
        self.perf.on_connection_type(info.connection_type);
        self.pump_at(self.clock.now());
    }

    pub fn on_online(&mut self, is_online: bool) {
        self.network.on_online(is_online);
        self.pump_at(self.clock.now());
    }

    pub fn on_visibility(&mut self, is_visible: bool) {
        debug!(is_visible, "visibility changed");
        let _ = self.visibility_tx.send_replace(is_visible);
    }

    /// Resolves pending timers and republishes the snapshot if anything
    /// changed. Event intake calls this automatically.
    pub fn pump(&mut self) {
        self.pump_at(self.clock.now());
    }

    fn pump_at(&mut self, now: UnixTimeMs) {
        let _ = self.viewport.poll(now);
        let snapshot = compose_snapshot(
            &self.config.profiles,
            &self.viewport,
            &self.perf,
            &self.network,
        );
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    // --- Read side --------------------------------------------------------

    #[must_use]
    pub fn snapshot(&self) -> ControllerSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    #[must_use]
    pub fn watch_snapshot(&self) -> watch::Receiver<ControllerSnapshot> {
        self.snapshot_tx.subscribe()
    }

    #[must_use]
    pub fn watch_picture(&self) -> watch::Receiver<BattlefieldPicture> {
        self.picture_rx.clone()
    }

    #[must_use]
    pub fn latest_picture(&self) -> BattlefieldPicture {
        self.picture_rx.borrow().clone()
    }

    /// Hands out the event stream (notifications, cycle outcomes, scenario
    /// activations). There is exactly one; subsequent calls return `None`.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<ControllerEvent>> {
        self.events_rx.take()
    }

    #[must_use]
    pub const fn touch(&self) -> TouchCapabilities {
        self.touch
    }

    /// A long-press tracker configured with this controller's hold duration.
    #[must_use]
    pub fn long_press_tracker(&self) -> LongPressTracker {
        LongPressTracker::new(self.config.long_press_ms)
    }

    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    // --- Commands ---------------------------------------------------------

    /// Requests an immediate out-of-band poll cycle.
    pub fn request_poll(&self) -> Result<(), ControllerError> {
        self.send_command(SchedulerCommand::PollNow)
    }

    /// Activates a scenario on the backend, then pulls a fresh picture. The
    /// loaded-entity count arrives as a [`ControllerEvent::ScenarioActivated`].
    pub fn activate_scenario(&self, scenario_id: impl Into<String>) -> Result<(), ControllerError> {
        self.send_command(SchedulerCommand::ActivateScenario {
            scenario_id: scenario_id.into(),
        })
    }

    fn send_command(&self, command: SchedulerCommand) -> Result<(), ControllerError> {
        if self.scheduler.is_none() {
            return Err(ControllerError::SchedulerStopped);
        }
        self.cmd_tx
            .try_send(command)
            .map_err(|_| ControllerError::SchedulerStopped)
    }

    /// Stops the scheduler task. Idempotent; also performed on drop.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.scheduler.take() {
            let _ = self.cmd_tx.try_send(SchedulerCommand::Shutdown);
            handle.abort();
            info!("adaptive controller stopped");
        }
    }
}

impl Drop for AdaptiveController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn compose_snapshot(
    profiles: &ProfileTable,
    viewport: &ViewportMonitor,
    perf: &PerformanceMonitor,
    network: &NetworkMonitor,
) -> ControllerSnapshot {
    let viewport_state = viewport.state();
    let network_state = network.state();
    ControllerSnapshot {
        device_profile: *profiles.classify(viewport_state.width),
        viewport: viewport_state,
        performance: perf.state(),
        network: network_state,
        sync_mode: network_state.sync_mode(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ControllerConfig::default().validate().is_ok());
    }

    #[test]
    fn config_rejects_zero_timers() {
        let config = ControllerConfig {
            debounce_ms: 0,
            ..ControllerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ControllerError::InvalidConfig(_))
        ));

        let config = ControllerConfig {
            batch_interval_ms: 0,
            ..ControllerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ControllerConfig {
            fallback_window: WindowMetrics {
                width: 0,
                height: 900,
                pixel_ratio: 1.0,
            },
            ..ControllerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn metrics_snapshot_reads_counters() {
        let metrics = ControllerMetrics::default();
        metrics.cycles_started.fetch_add(3, Ordering::Relaxed);
        metrics.entities_decimated.fetch_add(120, Ordering::Relaxed);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cycles_started, 3);
        assert_eq!(snapshot.entities_decimated, 120);
        assert_eq!(snapshot.cycles_failed, 0);
    }
}
