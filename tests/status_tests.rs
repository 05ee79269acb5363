use chrono::{Duration, Utc};

use lanwake::model::{
    ConnectionResult, DeviceState, DeviceStatus, PendingAction, ProbeResult,
};
use lanwake::probe::status::StatusResolver;
use test_utils::make_device;


fn probe_with(result: ConnectionResult) -> ProbeResult {
    ProbeResult {
        ip: "192.168.1.10".to_string(),
        port: 7748,
        mac: None,
        result,
        duration_ms: 12,
        device: None,
    }
}

fn online_status(last_seen: chrono::DateTime<Utc>) -> DeviceStatus {
    DeviceStatus {
        state: DeviceState::Online,
        tray_reachable: true,
        last_seen,
        pending_action: PendingAction::None,
    }
}

#[test]
fn ok_yields_online_with_tray() {
    let resolver = StatusResolver::default();
    let now = Utc::now();
    let previous = DeviceStatus::unknown(now - Duration::seconds(60));

    let status = resolver.compute(&previous, &probe_with(ConnectionResult::Ok), 15, now);
    assert_eq!(status.state, DeviceState::Online);
    assert!(status.tray_reachable);
    assert_eq!(status.last_seen, now);
}

#[test]
fn fallback_and_refusal_mean_up_without_tray() {
    let resolver = StatusResolver::default();
    let now = Utc::now();
    let previous = DeviceStatus::unknown(now);

    for result in [ConnectionResult::OkFallback, ConnectionResult::ConnectError] {
        let status = resolver.compute(&previous, &probe_with(result), 15, now);
        assert_eq!(status.state, DeviceState::Online);
        assert!(!status.tray_reachable);
    }
}

#[test]
fn host_unreachable_is_offline_regardless_of_history() {
    let resolver = StatusResolver::default();
    let now = Utc::now();

    // Even a freshly-seen online device drops immediately.
    let previous = online_status(now);
    let status = resolver.compute(
        &previous,
        &probe_with(ConnectionResult::HostUnreachable),
        15,
        now,
    );
    assert_eq!(status.state, DeviceState::Offline);
    assert!(!status.tray_reachable);
}

#[test]
fn timeout_within_window_retains_previous_state() {
    let resolver = StatusResolver::default();
    let now = Utc::now();

    // 15s interval -> 1.5x multiplier -> 22500ms window, boundary inclusive.
    let previous = online_status(now - Duration::milliseconds(22_500));
    let status = resolver.compute(&previous, &probe_with(ConnectionResult::TimeoutError), 15, now);
    assert_eq!(status.state, DeviceState::Online);
    assert!(status.tray_reachable);

    let previous = online_status(now - Duration::milliseconds(22_501));
    let status = resolver.compute(&previous, &probe_with(ConnectionResult::TimeoutError), 15, now);
    assert_eq!(status.state, DeviceState::Offline);
}

#[test]
fn multiplier_bands() {
    let resolver = StatusResolver::default();
    assert_eq!(resolver.confidence_multiplier(10), 1.5);
    assert_eq!(resolver.confidence_multiplier(15), 1.5);
    assert_eq!(resolver.confidence_multiplier(16), 1.0);
    assert_eq!(resolver.confidence_multiplier(30), 1.0);
    assert_eq!(resolver.confidence_multiplier(31), 0.5);
    assert_eq!(resolver.confidence_multiplier(300), 0.5);
}

#[test]
fn slow_interval_shrinks_the_window() {
    let resolver = StatusResolver::default();
    let now = Utc::now();

    // 60s interval -> 0.5x -> 30s window.
    let previous = online_status(now - Duration::seconds(29));
    let status = resolver.compute(&previous, &probe_with(ConnectionResult::UnknownError), 60, now);
    assert_eq!(status.state, DeviceState::Online);

    let previous = online_status(now - Duration::seconds(31));
    let status = resolver.compute(&previous, &probe_with(ConnectionResult::UnknownError), 60, now);
    assert_eq!(status.state, DeviceState::Offline);
}

#[test]
fn pending_action_is_cleared_when_not_online() {
    let resolver = StatusResolver::default();
    let now = Utc::now();
    let mut previous = online_status(now);
    previous.pending_action = PendingAction::ShutdownScheduled {
        scheduled_at: now,
        execute_at: now + Duration::seconds(30),
        cancellable: true,
    };

    // Staying online carries the action over.
    let status = resolver.compute(&previous, &probe_with(ConnectionResult::Ok), 15, now);
    assert!(matches!(
        status.pending_action,
        PendingAction::ShutdownScheduled { .. }
    ));

    // Going offline forces it back to None.
    let status = resolver.compute(
        &previous,
        &probe_with(ConnectionResult::HostUnreachable),
        15,
        now,
    );
    assert_eq!(status.pending_action, PendingAction::None);
}

#[test]
fn status_predicates_end_to_end() {
    let now = Utc::now();
    let device = make_device("d1", "desk", Some("192.168.1.5"), Some("AA:BB:CC:DD:EE:FF"));

    // Online with tray, nothing pending: shutdown allowed.
    let status = online_status(now);
    assert!(status.can_shutdown());
    assert!(!status.can_cancel_shutdown());
    assert!(!status.can_wakeup(&device));

    // Non-cancellable scheduled shutdown blocks both actions.
    let mut scheduled = online_status(now);
    scheduled.pending_action = PendingAction::ShutdownScheduled {
        scheduled_at: now,
        execute_at: now + Duration::seconds(30),
        cancellable: false,
    };
    assert!(!scheduled.can_shutdown());
    assert!(!scheduled.can_cancel_shutdown());

    // Offline with a MAC: wake allowed.
    let offline = DeviceStatus {
        state: DeviceState::Offline,
        tray_reachable: false,
        last_seen: now,
        pending_action: PendingAction::None,
    };
    assert!(offline.can_wakeup(&device));
    let macless = make_device("d2", "other", Some("192.168.1.6"), None);
    assert!(!offline.can_wakeup(&macless));
}
