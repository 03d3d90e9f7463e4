use std::sync::atomic::Ordering;

use doomtcha_engine::{
    Phase,
    test_support::{
        ScriptedSource, drain_count_errors, fast_config, recv_until, test_controller, wait_phase,
        wait_until,
    },
};
use doomtcha_protocol::{CheckboxVisual, MsgToUI, NotifyKind};
use tokio::time::{Duration, Instant};

/// A structurally valid asset: the IWAD magic plus a zero-filled tail.
fn valid_wad() -> Vec<u8> {
    let mut bytes = b"IWAD".to_vec();
    bytes.extend(std::iter::repeat_n(0u8, 1000));
    bytes
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_asset_resets_to_idle_with_one_alert() {
    // Scenario: the fetch returns a 2-byte buffer.
    let src = ScriptedSource::ok(vec![0x49, 0x57]);
    let (ctl, mut rx, rt) = test_controller(src, fast_config()).await;

    ctl.trigger();
    assert!(wait_phase(&ctl, Phase::Idle, 1000).await);
    assert!(!rt.started(), "an invalid asset must never reach the runtime");

    assert!(
        recv_until(&mut rx, 500, |m| matches!(
            m,
            MsgToUI::Notify {
                kind: NotifyKind::Error,
                ..
            }
        ))
        .await,
        "expected one alert notification"
    );
    assert_eq!(drain_count_errors(&mut rx), 0, "exactly one alert");
}

#[tokio::test(flavor = "multi_thread")]
async fn transport_failure_resets_to_idle_with_one_alert() {
    let src = ScriptedSource::err("connection refused");
    let (ctl, mut rx, rt) = test_controller(src, fast_config()).await;

    ctl.trigger();
    assert!(wait_phase(&ctl, Phase::Idle, 1000).await);
    assert!(!rt.started());
    assert!(
        recv_until(&mut rx, 500, |m| matches!(
            m,
            MsgToUI::Notify {
                kind: NotifyKind::Error,
                ..
            }
        ))
        .await
    );
    assert_eq!(drain_count_errors(&mut rx), 0);
}

#[tokio::test(start_paused = true)]
async fn feedback_floor_holds_for_instant_fetch() {
    // Scenario: 0-latency fetch, min feedback 1500ms. The runtime must not
    // start before the floor has elapsed.
    let src = ScriptedSource::ok(valid_wad());
    let cfg = doomtcha_engine::ControllerConfig {
        min_feedback: Duration::from_millis(1500),
        confirm_delay: Duration::from_millis(10),
        ..doomtcha_engine::ControllerConfig::default()
    };
    let (ctl, _rx, rt) = test_controller(src, cfg).await;

    let start = Instant::now();
    ctl.trigger();
    assert!(wait_until(10_000, || rt.started()).await);
    assert!(
        start.elapsed() >= Duration::from_millis(1500),
        "runtime started {:?} after trigger, before the feedback floor",
        start.elapsed()
    );
    assert!(wait_phase(&ctl, Phase::Verifying, 1000).await);
}

#[tokio::test(flavor = "multi_thread")]
async fn trigger_while_in_flight_is_a_noop() {
    let src = ScriptedSource::ok(valid_wad()).with_latency(Duration::from_millis(100));
    let (ctl, _rx, _rt) = test_controller(src.clone(), fast_config()).await;

    ctl.trigger();
    assert_eq!(ctl.phase(), Phase::Loading);
    ctl.trigger();
    ctl.trigger();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(src.fetches.load(Ordering::SeqCst), 1, "no second fetch");
    assert_eq!(ctl.phase(), Phase::Loading, "no state mutation");
}

#[tokio::test(flavor = "multi_thread")]
async fn win_signal_confirms_pauses_and_navigates() {
    // Scenario: during Verifying the runtime fires its end signal.
    let src = ScriptedSource::ok(valid_wad());
    let (ctl, mut rx, rt) = test_controller(src, fast_config()).await;

    ctl.trigger();
    assert!(wait_phase(&ctl, Phase::Verifying, 1000).await);
    rt.fire_end();

    assert!(recv_until(&mut rx, 1000, |m| matches!(m, MsgToUI::Navigate(_))).await);
    assert_eq!(rt.pauses.load(Ordering::SeqCst), 1, "pause was attempted");
    assert!(wait_phase(&ctl, Phase::Idle, 1000).await);
}

#[tokio::test(flavor = "multi_thread")]
async fn pause_failure_does_not_block_navigation() {
    let src = ScriptedSource::ok(valid_wad());
    let (ctl, mut rx, rt) = test_controller(src, fast_config()).await;
    rt.fail_pause.store(true, Ordering::SeqCst);

    ctl.trigger();
    assert!(wait_phase(&ctl, Phase::Verifying, 1000).await);
    rt.fire_end();

    assert!(recv_until(&mut rx, 1000, |m| matches!(m, MsgToUI::Navigate(_))).await);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_during_loading_discards_late_fetch() {
    // Scenario: fullscreen exits while the fetch is still in flight.
    let src = ScriptedSource::ok(valid_wad()).with_latency(Duration::from_millis(50));
    let (ctl, mut rx, rt) = test_controller(src, fast_config()).await;

    ctl.trigger();
    assert_eq!(ctl.phase(), Phase::Loading);
    ctl.cancel();
    assert_eq!(ctl.phase(), Phase::Idle);

    // Let the abandoned fetch resolve; nothing may change.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(ctl.phase(), Phase::Idle);
    assert!(!rt.started());

    let mut saw_checked = false;
    let mut errors = 0;
    while let Ok(msg) = rx.try_recv() {
        match msg {
            MsgToUI::Checkbox(CheckboxVisual::Checked) => saw_checked = true,
            MsgToUI::Notify {
                kind: NotifyKind::Error,
                ..
            } => errors += 1,
            _ => {}
        }
    }
    assert!(!saw_checked, "stale fetch must not drive visuals");
    assert_eq!(errors, 0, "stale fetch must not alert");
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_during_verifying_disarms_the_end_signal() {
    let src = ScriptedSource::ok(valid_wad());
    let (ctl, mut rx, rt) = test_controller(src, fast_config()).await;

    ctl.trigger();
    assert!(wait_phase(&ctl, Phase::Verifying, 1000).await);
    ctl.cancel();
    assert_eq!(ctl.phase(), Phase::Idle);
    assert!(recv_until(&mut rx, 500, |m| matches!(m, MsgToUI::HideGame)).await);

    // A win arriving after cancellation is dropped on the floor.
    rt.fire_end();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(ctl.phase(), Phase::Idle);
    while let Ok(msg) = rx.try_recv() {
        assert!(!matches!(msg, MsgToUI::Navigate(_)), "no navigation");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn runtime_start_failure_resets_to_idle() {
    let src = ScriptedSource::ok(valid_wad());
    let (ctl, mut rx, rt) = test_controller(src, fast_config()).await;
    rt.fail_start.store(true, Ordering::SeqCst);

    ctl.trigger();
    assert!(wait_phase(&ctl, Phase::Idle, 1000).await);
    assert!(
        recv_until(&mut rx, 500, |m| matches!(
            m,
            MsgToUI::Notify {
                kind: NotifyKind::Error,
                ..
            }
        ))
        .await
    );

    // The failed launch left the bridge disarmed.
    rt.fire_end();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(ctl.phase(), Phase::Idle);
}

#[tokio::test(flavor = "multi_thread")]
async fn surface_loss_poisons_the_controller() {
    let src = ScriptedSource::ok(valid_wad()).with_latency(Duration::from_millis(50));
    let (ctl, mut rx, _rt) = test_controller(src.clone(), fast_config()).await;

    ctl.trigger();
    ctl.surface_lost();
    assert!(
        recv_until(&mut rx, 500, |m| matches!(
            m,
            MsgToUI::Notify {
                kind: NotifyKind::Error,
                ..
            }
        ))
        .await,
        "user is told to reload"
    );

    // No reset to Idle is attempted, and triggers are refused for good.
    ctl.trigger();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(src.fetches.load(Ordering::SeqCst), 1);
    assert_ne!(ctl.phase(), Phase::Verifying);
}

#[tokio::test(start_paused = true)]
async fn encore_counts_down_and_relaunches_without_args() {
    let src = ScriptedSource::ok(valid_wad());
    let (ctl, mut rx, rt) = test_controller(src, fast_config()).await;

    // Refused before anything has verified.
    ctl.confirm_encore();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!rt.started());

    // Full verified session first.
    ctl.trigger();
    assert!(wait_until(10_000, || rt.started()).await);
    rt.fire_end();
    assert!(wait_phase(&ctl, Phase::Idle, 10_000).await);
    while rx.try_recv().is_ok() {}

    ctl.confirm_encore();
    assert!(wait_until(10_000, || rt.starts.lock().len() == 2).await);
    let starts = rt.starts.lock().clone();
    assert!(starts[1].is_empty(), "encore launch takes no auto-start args");

    let mut ticks = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        if let MsgToUI::Countdown(n) = msg {
            ticks.push(n);
        }
    }
    assert_eq!(ticks, vec![3, 2, 1, 0]);

    // Free play: a win changes nothing because the bridge is disarmed.
    rt.fire_end();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(ctl.phase(), Phase::Encore);
}

#[tokio::test(start_paused = true)]
async fn trigger_during_encore_countdown_is_refused() {
    let src = ScriptedSource::ok(valid_wad());
    let (ctl, mut rx, rt) = test_controller(src.clone(), fast_config()).await;

    // Full verified session first.
    ctl.trigger();
    assert!(wait_until(10_000, || rt.started()).await);
    rt.fire_end();
    assert!(wait_phase(&ctl, Phase::Idle, 10_000).await);
    let fetches_before = src.fetches.load(Ordering::SeqCst);
    while rx.try_recv().is_ok() {}

    ctl.confirm_encore();
    assert_eq!(ctl.phase(), Phase::Encore);

    // Mid-countdown the checkbox fires again, plus a second encore click.
    // Both must bounce off the in-flight encore session.
    ctl.trigger();
    ctl.confirm_encore();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(ctl.phase(), Phase::Encore, "no verification admitted");
    assert_eq!(src.fetches.load(Ordering::SeqCst), fetches_before);

    // The encore completes as the only outstanding launch.
    assert!(wait_until(10_000, || rt.starts.lock().len() == 2).await);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(rt.starts.lock().len(), 2, "exactly one launch per encore");
    assert_eq!(ctl.phase(), Phase::Encore);
}

#[tokio::test(start_paused = true)]
async fn surface_loss_during_encore_countdown_stops_the_relaunch() {
    let src = ScriptedSource::ok(valid_wad());
    let (ctl, mut rx, rt) = test_controller(src, fast_config()).await;

    ctl.trigger();
    assert!(wait_until(10_000, || rt.started()).await);
    rt.fire_end();
    assert!(wait_phase(&ctl, Phase::Idle, 10_000).await);
    while rx.try_recv().is_ok() {}

    ctl.confirm_encore();
    assert_eq!(ctl.phase(), Phase::Encore);
    ctl.surface_lost();

    // Let the countdown window pass; the corrupted runtime must not be
    // touched again.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(rt.starts.lock().len(), 1, "no relaunch after surface loss");
    assert!(
        recv_until(&mut rx, 500, |m| matches!(
            m,
            MsgToUI::Notify {
                kind: NotifyKind::Error,
                ..
            }
        ))
        .await,
        "user is told to reload"
    );
}
