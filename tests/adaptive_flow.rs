//! End-to-end flows through the controller: classification, cadence,
//! decimation, visibility, and scenario activation, all under a paused
//! runtime so every timer is deterministic.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::time::{sleep, timeout};

use aegis_adaptive::capabilities::{InMemoryFeed, MonotonicClock, StaticProbe};
use aegis_adaptive::{
    AdaptiveController, ConnectionInfo, ConnectionType, ControllerConfig, ControllerEvent,
    CycleOutcome, DeviceClass, Orientation, PerformanceTier, PointerSurface, SyncMode,
    UnixTimeMs, WindowMetrics,
};

fn entities(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| json!({ "id": i, "name": format!("emitter-{i}") }))
        .collect()
}

fn tablet_probe() -> StaticProbe {
    StaticProbe {
        window: Some(WindowMetrics {
            width: 1_024,
            height: 768,
            pixel_ratio: 2.0,
        }),
        pointer: PointerSurface {
            has_touch_start: true,
            max_touch_points: 5,
        },
        battery: Some(80),
        link: Some(ConnectionInfo {
            connection_type: ConnectionType::Wifi,
            downlink_mbps: Some(20.0),
            rtt_ms: Some(40),
        }),
        online: Some(true),
        visible: Some(true),
    }
}

fn start_tablet(feed: &Arc<InMemoryFeed>) -> AdaptiveController {
    AdaptiveController::start(
        ControllerConfig::default(),
        feed.clone(),
        &tablet_probe(),
        Arc::new(MonotonicClock::new()),
    )
    .expect("controller starts")
}

#[tokio::test(start_paused = true)]
async fn tablet_on_a_good_link_polls_in_realtime() {
    let feed = Arc::new(InMemoryFeed::new());
    feed.set_emitters(entities(20));
    feed.set_threats(entities(5));
    feed.set_system_metrics(json!({ "emitters_tracked": 20 }));

    let mut controller = start_tablet(&feed);
    let mut events = controller.take_events().expect("first take");
    assert!(controller.take_events().is_none());

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.device_profile.name, DeviceClass::Tablet);
    assert_eq!(snapshot.sync_mode, SyncMode::Realtime);
    assert_eq!(snapshot.viewport.orientation, Orientation::Landscape);
    assert_eq!(snapshot.performance.tier, PerformanceTier::High);
    assert_eq!(snapshot.performance.fps, None);
    assert!(controller.touch().is_touch_device());

    // The long-press tracker carries the configured hold duration.
    let mut long_press = controller.long_press_tracker();
    long_press.pointer_down(UnixTimeMs(10_000));
    assert!(!long_press.poll(UnixTimeMs(10_799)));
    assert!(long_press.poll(UnixTimeMs(10_800)));

    // No frame-rate sample yet, so the first tick lands after the tablet's
    // base interval.
    let event = events.recv().await.expect("first cycle");
    match event {
        ControllerEvent::Cycle(CycleOutcome::Applied { generation, counts }) => {
            assert_eq!(generation, 1);
            assert_eq!(counts.emitters_total, 20);
            assert_eq!(counts.emitters_shown, 20);
            assert_eq!(counts.threats_total, 5);
            assert_eq!(counts.threats_shown, 5);
        }
        other => panic!("expected applied cycle, got {other:?}"),
    }

    let picture = controller.latest_picture();
    assert_eq!(picture.generation, 1);
    assert_eq!(picture.emitters.len(), 20);
    assert_eq!(picture.system_metrics["emitters_tracked"], json!(20));

    let metrics = controller.metrics();
    assert_eq!(metrics.cycles_applied, 1);
    assert_eq!(metrics.cycles_failed, 0);

    controller.shutdown();
}

#[tokio::test(start_paused = true)]
async fn oversized_collections_are_uniformly_decimated() {
    let feed = Arc::new(InMemoryFeed::new());
    // 1200 emitters against the tablet cap of 500: stride 3 keeps 400.
    feed.set_emitters(entities(1_200));
    feed.set_threats(entities(3));

    let mut controller = start_tablet(&feed);
    let mut events = controller.take_events().expect("events");

    let event = events.recv().await.expect("cycle");
    match event {
        ControllerEvent::Cycle(CycleOutcome::Applied { counts, .. }) => {
            assert_eq!(counts.emitters_total, 1_200);
            assert_eq!(counts.emitters_shown, 400);
            assert_eq!(counts.threats_shown, 3);
        }
        other => panic!("expected applied cycle, got {other:?}"),
    }

    let picture = controller.latest_picture();
    assert_eq!(picture.emitters.len(), 400);
    // Uniform stride keeps the head and preserves order.
    assert_eq!(picture.emitters[0]["id"], json!(0));
    assert_eq!(picture.emitters[1]["id"], json!(3));
    assert_eq!(controller.metrics().entities_decimated, 800);

    controller.shutdown();
}

#[tokio::test(start_paused = true)]
async fn resize_burst_reclassifies_once_after_debounce() {
    let feed = Arc::new(InMemoryFeed::new());
    let mut controller = start_tablet(&feed);
    assert_eq!(controller.snapshot().device_profile.name, DeviceClass::Tablet);

    // A drag from tablet to desktop width, one event every few millis.
    for width in (1_024..=1_920).step_by(64) {
        controller.on_resize(WindowMetrics {
            width,
            height: 1_080,
            pixel_ratio: 1.0,
        });
        sleep(Duration::from_millis(5)).await;
    }
    // Still mid-debounce: the profile has not flipped.
    assert_eq!(controller.snapshot().device_profile.name, DeviceClass::Tablet);

    sleep(Duration::from_millis(120)).await;
    controller.pump();

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.device_profile.name, DeviceClass::Desktop);
    assert_eq!(snapshot.viewport.width, 1_920);
    // Connectivity was untouched by the resize.
    assert_eq!(snapshot.sync_mode, SyncMode::Realtime);

    controller.shutdown();
}

#[tokio::test(start_paused = true)]
async fn hidden_document_skips_timer_ticks() {
    let feed = Arc::new(InMemoryFeed::new());
    feed.set_emitters(entities(4));

    let mut controller = start_tablet(&feed);
    let mut events = controller.take_events().expect("events");

    controller.on_visibility(false);
    let event = events.recv().await.expect("tick while hidden");
    assert_eq!(event, ControllerEvent::Cycle(CycleOutcome::SkippedHidden));
    assert_eq!(controller.metrics().cycles_applied, 0);

    controller.on_visibility(true);
    let event = events.recv().await.expect("tick after visible");
    assert!(matches!(
        event,
        ControllerEvent::Cycle(CycleOutcome::Applied { .. })
    ));

    controller.shutdown();
}

#[tokio::test(start_paused = true)]
async fn scenario_activation_forces_a_fresh_cycle() {
    let feed = Arc::new(InMemoryFeed::new());
    feed.set_emitters(entities(7));

    let mut controller = start_tablet(&feed);
    let mut events = controller.take_events().expect("events");

    controller.activate_scenario("scenario_1").expect("queued");

    let event = events.recv().await.expect("activation record");
    match event {
        ControllerEvent::ScenarioActivated(record) => {
            assert_eq!(record.scenario_id, "scenario_1");
            assert_eq!(record.emitters_loaded, 7);
        }
        other => panic!("expected activation record, got {other:?}"),
    }

    let event = events.recv().await.expect("out-of-band cycle");
    assert!(matches!(
        event,
        ControllerEvent::Cycle(CycleOutcome::Applied { generation: 1, .. })
    ));
    assert_eq!(controller.metrics().scenario_activations, 1);

    controller.shutdown();
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_polling() {
    let feed = Arc::new(InMemoryFeed::new());
    let mut controller = start_tablet(&feed);
    let mut events = controller.take_events().expect("events");

    controller.shutdown();
    assert!(controller.request_poll().is_err());

    // With the scheduler gone the event stream drains and closes.
    let outcome = timeout(Duration::from_secs(60), async {
        while events.recv().await.is_some() {}
    })
    .await;
    assert!(outcome.is_ok(), "event stream should close after shutdown");
}
