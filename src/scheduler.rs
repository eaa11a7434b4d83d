//! Adaptive fetch scheduling: cadence resolution, concurrent endpoint pulls,
//! uniform decimation, and generation-based staleness handling.
//!
//! A new cycle fires on its own schedule regardless of whether the previous
//! one has completed. Overlapping cycles are tolerated by stamping each with
//! an increasing generation and applying only results newer than the newest
//! already applied.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, instrument, warn};

use crate::capabilities::{Clock, DataFetcher, FetchError, ScenarioActivation};
use crate::controller::{ControllerEvent, ControllerMetrics, ControllerSnapshot};
use crate::network::SyncMode;
use crate::throttle::ErrorThrottle;

/// Uniform, content-agnostic reduction of an oversized collection.
///
/// Keeps indices `0, stride, 2*stride, …` with `stride = ceil(len / cap)`,
/// preserving relative order. Severity and recency are deliberately ignored;
/// callers needing guaranteed inclusion of critical items must pre-filter.
/// A zero cap is treated as uncapped.
#[must_use]
pub fn decimate<T>(items: Vec<T>, max_points: usize) -> Vec<T> {
    if max_points == 0 || items.len() <= max_points {
        return items;
    }
    let stride = items.len().div_ceil(max_points);
    items.into_iter().step_by(stride).collect()
}

/// Raw and post-decimation sizes for one applied cycle, so presentation can
/// show "N of M" without re-counting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionCounts {
    pub emitters_total: usize,
    pub emitters_shown: usize,
    pub threats_total: usize,
    pub threats_shown: usize,
}

/// The decimated battlefield data handed to presentation. Collections stay
/// opaque JSON in server order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BattlefieldPicture {
    pub generation: u64,
    pub fetched_at: crate::UnixTimeMs,
    pub emitters: Vec<Value>,
    pub threats: Vec<Value>,
    pub system_metrics: Value,
    pub counts: CollectionCounts,
}

/// Per-cycle outcome signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum CycleOutcome {
    Applied {
        generation: u64,
        counts: CollectionCounts,
    },
    DiscardedStale {
        generation: u64,
        newest_applied: u64,
    },
    Failed {
        generation: u64,
        error: String,
    },
    SkippedHidden,
}

/// Refresh-interval precedence: offline suspends polling entirely; poor and
/// moderate links pin fixed cadences; otherwise the performance-derived
/// interval applies, falling back to the profile's base interval until the
/// first frame-rate sample exists.
#[must_use]
pub fn resolve_refresh_interval(
    snapshot: &ControllerSnapshot,
    batch_interval_ms: u64,
    throttled_interval_ms: u64,
) -> Option<u64> {
    match snapshot.sync_mode {
        SyncMode::Offline => None,
        SyncMode::Batch => Some(batch_interval_ms),
        SyncMode::Throttled => Some(throttled_interval_ms),
        SyncMode::Realtime => Some(if snapshot.performance.fps.is_some() {
            snapshot.performance.settings().refresh_interval_ms
        } else {
            snapshot.device_profile.base_refresh_interval_ms
        }),
    }
}

#[derive(Debug)]
pub(crate) enum SchedulerCommand {
    PollNow,
    ActivateScenario { scenario_id: String },
    Shutdown,
}

struct RawBundle {
    emitters: Vec<Value>,
    threats: Vec<Value>,
    system_metrics: Value,
    activation: Option<ScenarioActivation>,
}

struct CycleResult {
    generation: u64,
    payload: Result<RawBundle, FetchError>,
}

#[instrument(skip(fetcher), fields(scenario = scenario.unwrap_or("-")))]
async fn run_cycle(
    fetcher: &dyn DataFetcher,
    scenario: Option<&str>,
) -> Result<RawBundle, FetchError> {
    let activation = match scenario {
        Some(id) => Some(fetcher.activate_scenario(id).await?),
        None => None,
    };
    // The three pulls run concurrently; one failure fails the whole cycle and
    // its data is discarded rather than partially applied.
    let (emitters, threats, system_metrics) = tokio::try_join!(
        fetcher.fetch_emitters(),
        fetcher.fetch_threats(),
        fetcher.fetch_metrics(),
    )?;
    Ok(RawBundle {
        emitters,
        threats,
        system_metrics,
        activation,
    })
}

/// The scheduler half of the controller: runs as one task, owns the error
/// throttle, and is the single writer of [`BattlefieldPicture`].
pub(crate) struct SchedulerTask {
    pub(crate) fetcher: Arc<dyn DataFetcher>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) batch_interval_ms: u64,
    pub(crate) throttled_interval_ms: u64,
    pub(crate) snapshot_rx: watch::Receiver<ControllerSnapshot>,
    pub(crate) visibility_rx: watch::Receiver<bool>,
    pub(crate) picture_tx: watch::Sender<BattlefieldPicture>,
    pub(crate) events_tx: mpsc::UnboundedSender<ControllerEvent>,
    pub(crate) cmd_rx: mpsc::Receiver<SchedulerCommand>,
    pub(crate) throttle: ErrorThrottle,
    pub(crate) metrics: Arc<ControllerMetrics>,
}

impl SchedulerTask {
    pub(crate) async fn run(mut self) {
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();
        let mut next_generation: u64 = 0;
        let mut highest_applied: u64 = 0;

        let mut interval_ms = resolve_refresh_interval(
            &self.snapshot_rx.borrow().clone(),
            self.batch_interval_ms,
            self.throttled_interval_ms,
        );
        let mut next_fire = arm(interval_ms);
        info!(interval_ms = ?interval_ms, "fetch scheduler started");

        loop {
            let tick = async move {
                match next_fire {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                () = tick => {
                    if *self.visibility_rx.borrow() {
                        self.start_cycle(&results_tx, &mut next_generation, None);
                    } else {
                        self.metrics.cycles_skipped_hidden.fetch_add(1, Ordering::Relaxed);
                        debug!("document hidden, skipping poll tick");
                        let _ = self
                            .events_tx
                            .send(ControllerEvent::Cycle(CycleOutcome::SkippedHidden));
                    }
                    next_fire = arm(interval_ms);
                }
                changed = self.snapshot_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = self.snapshot_rx.borrow_and_update().clone();
                    let resolved = resolve_refresh_interval(
                        &snapshot,
                        self.batch_interval_ms,
                        self.throttled_interval_ms,
                    );
                    if resolved != interval_ms {
                        info!(
                            sync_mode = snapshot.sync_mode.as_str(),
                            interval_ms = ?resolved,
                            "poll cadence changed"
                        );
                        interval_ms = resolved;
                        next_fire = arm(interval_ms);
                    }
                }
                command = self.cmd_rx.recv() => {
                    match command {
                        Some(SchedulerCommand::PollNow) => {
                            self.start_cycle(&results_tx, &mut next_generation, None);
                        }
                        Some(SchedulerCommand::ActivateScenario { scenario_id }) => {
                            self.start_cycle(&results_tx, &mut next_generation, Some(scenario_id));
                        }
                        Some(SchedulerCommand::Shutdown) | None => break,
                    }
                }
                Some(result) = results_rx.recv() => {
                    self.apply(result, &mut highest_applied);
                }
            }
        }
        debug!("fetch scheduler stopped");
    }

    fn start_cycle(
        &self,
        results_tx: &mpsc::UnboundedSender<CycleResult>,
        next_generation: &mut u64,
        scenario: Option<String>,
    ) {
        *next_generation += 1;
        let generation = *next_generation;
        self.metrics.cycles_started.fetch_add(1, Ordering::Relaxed);
        debug!(generation, scenario = scenario.as_deref(), "poll cycle started");

        let fetcher = Arc::clone(&self.fetcher);
        let results_tx = results_tx.clone();
        tokio::spawn(async move {
            let payload = run_cycle(&*fetcher, scenario.as_deref()).await;
            let _ = results_tx.send(CycleResult {
                generation,
                payload,
            });
        });
    }

    fn apply(&mut self, result: CycleResult, highest_applied: &mut u64) {
        let CycleResult {
            generation,
            payload,
        } = result;
        let now = self.clock.now();

        let bundle = match payload {
            Err(error) => {
                self.metrics.cycles_failed.fetch_add(1, Ordering::Relaxed);
                warn!(generation, error = %error, "poll cycle failed");
                let is_online = self.snapshot_rx.borrow().network.is_online;
                match self.throttle.on_failure(is_online, now) {
                    Some(notification) => {
                        self.metrics
                            .notifications_shown
                            .fetch_add(1, Ordering::Relaxed);
                        let _ = self
                            .events_tx
                            .send(ControllerEvent::Notification(notification));
                    }
                    None => {
                        self.metrics
                            .notifications_suppressed
                            .fetch_add(1, Ordering::Relaxed);
                    }
                }
                let _ = self
                    .events_tx
                    .send(ControllerEvent::Cycle(CycleOutcome::Failed {
                        generation,
                        error: error.to_string(),
                    }));
                return;
            }
            Ok(bundle) => bundle,
        };

        // A stale success still proves the link works.
        if let Some(notification) = self.throttle.on_success(now) {
            self.metrics
                .notifications_shown
                .fetch_add(1, Ordering::Relaxed);
            let _ = self
                .events_tx
                .send(ControllerEvent::Notification(notification));
        }

        if generation <= *highest_applied {
            self.metrics
                .cycles_discarded_stale
                .fetch_add(1, Ordering::Relaxed);
            debug!(
                generation,
                newest_applied = *highest_applied,
                "discarding stale poll result"
            );
            let _ = self
                .events_tx
                .send(ControllerEvent::Cycle(CycleOutcome::DiscardedStale {
                    generation,
                    newest_applied: *highest_applied,
                }));
            return;
        }
        *highest_applied = generation;

        let snapshot = self.snapshot_rx.borrow().clone();
        let cap = snapshot
            .device_profile
            .max_data_points
            .min(snapshot.performance.settings().max_data_points);

        let emitters_total = bundle.emitters.len();
        let threats_total = bundle.threats.len();
        let emitters = decimate(bundle.emitters, cap);
        let threats = decimate(bundle.threats, cap);
        let counts = CollectionCounts {
            emitters_total,
            emitters_shown: emitters.len(),
            threats_total,
            threats_shown: threats.len(),
        };
        let dropped =
            (emitters_total - counts.emitters_shown) + (threats_total - counts.threats_shown);
        if dropped > 0 {
            self.metrics
                .entities_decimated
                .fetch_add(dropped as u64, Ordering::Relaxed);
        }

        if let Some(activation) = bundle.activation {
            self.metrics
                .scenario_activations
                .fetch_add(1, Ordering::Relaxed);
            let _ = self
                .events_tx
                .send(ControllerEvent::ScenarioActivated(activation));
        }

        self.metrics.cycles_applied.fetch_add(1, Ordering::Relaxed);
        info!(
            generation,
            emitters = counts.emitters_shown,
            threats = counts.threats_shown,
            "picture updated"
        );
        let _ = self.picture_tx.send_replace(BattlefieldPicture {
            generation,
            fetched_at: now,
            emitters,
            threats,
            system_metrics: bundle.system_metrics,
            counts: counts.clone(),
        });
        let _ = self
            .events_tx
            .send(ControllerEvent::Cycle(CycleOutcome::Applied {
                generation,
                counts,
            }));
    }
}

fn arm(interval_ms: Option<u64>) -> Option<Instant> {
    interval_ms.map(|ms| Instant::now() + Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{ConnectionQuality, ConnectionType, NetworkState};
    use crate::perf::{PerformanceState, PerformanceTier};
    use crate::profile::ProfileTable;
    use crate::viewport::{ViewportState, WindowMetrics};
    use proptest::prelude::*;

    fn snapshot_at(width: u32, quality: ConnectionQuality, fps: Option<u32>) -> ControllerSnapshot {
        let table = ProfileTable::builtin();
        let viewport = ViewportState::from_metrics(WindowMetrics {
            width,
            height: 768,
            pixel_ratio: 1.0,
        });
        let network = NetworkState {
            is_online: true,
            quality,
        };
        ControllerSnapshot {
            device_profile: *table.classify(width),
            viewport,
            performance: PerformanceState {
                tier: fps.map_or(PerformanceTier::High, PerformanceTier::from_fps),
                fps,
                battery_level: 100,
                is_low_battery: false,
                connection_type: ConnectionType::Wifi,
            },
            network,
            sync_mode: network.sync_mode(),
        }
    }

    #[test]
    fn decimation_no_op_when_under_cap() {
        let items: Vec<u32> = (0..10).collect();
        assert_eq!(decimate(items.clone(), 10), items);
        assert_eq!(decimate(items.clone(), 100), items);
    }

    #[test]
    fn decimation_handles_empty_and_zero_cap() {
        assert_eq!(decimate(Vec::<u32>::new(), 100), Vec::<u32>::new());
        let items: Vec<u32> = (0..10).collect();
        assert_eq!(decimate(items.clone(), 0), items);
    }

    #[test]
    fn decimation_keeps_stride_indices() {
        let items: Vec<u32> = (0..10).collect();
        // stride = ceil(10/4) = 3 -> indices 0, 3, 6, 9
        assert_eq!(decimate(items, 4), vec![0, 3, 6, 9]);
    }

    proptest! {
        #[test]
        fn decimation_size_law(len in 0usize..3_000, cap in 1usize..400) {
            let items: Vec<usize> = (0..len).collect();
            let kept = decimate(items, cap);
            if len <= cap {
                prop_assert_eq!(kept.len(), len);
            } else {
                let stride = len.div_ceil(cap);
                prop_assert_eq!(kept.len(), len.div_ceil(stride));
                prop_assert!(kept.len() <= cap);
            }
        }

        #[test]
        fn decimation_preserves_order(len in 0usize..2_000, cap in 1usize..200) {
            let items: Vec<usize> = (0..len).collect();
            let kept = decimate(items, cap);
            prop_assert!(kept.windows(2).all(|pair| pair[0] < pair[1]));
            // First element always survives.
            if len > 0 {
                prop_assert_eq!(kept.first().copied(), Some(0));
            }
        }
    }

    #[test]
    fn interval_precedence() {
        // Offline suspends polling regardless of everything else.
        let mut snapshot = snapshot_at(1_024, ConnectionQuality::Good, Some(60));
        snapshot.network.is_online = false;
        snapshot.sync_mode = snapshot.network.sync_mode();
        assert_eq!(resolve_refresh_interval(&snapshot, 30_000, 10_000), None);

        // Poor and moderate links pin fixed cadences.
        let snapshot = snapshot_at(1_024, ConnectionQuality::Poor, Some(60));
        assert_eq!(
            resolve_refresh_interval(&snapshot, 30_000, 10_000),
            Some(30_000)
        );
        let snapshot = snapshot_at(1_024, ConnectionQuality::Moderate, Some(60));
        assert_eq!(
            resolve_refresh_interval(&snapshot, 30_000, 10_000),
            Some(10_000)
        );

        // Realtime follows the performance-derived interval.
        let snapshot = snapshot_at(1_024, ConnectionQuality::Good, Some(60));
        assert_eq!(
            resolve_refresh_interval(&snapshot, 30_000, 10_000),
            Some(2_000)
        );
        let snapshot = snapshot_at(1_024, ConnectionQuality::Good, Some(25));
        assert_eq!(
            resolve_refresh_interval(&snapshot, 30_000, 10_000),
            Some(5_000)
        );
    }

    #[test]
    fn realtime_without_sample_uses_profile_base() {
        let snapshot = snapshot_at(1_024, ConnectionQuality::Good, None);
        assert_eq!(
            resolve_refresh_interval(&snapshot, 30_000, 10_000),
            Some(snapshot.device_profile.base_refresh_interval_ms)
        );
    }
}
