use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use lanwake::model::{ConnectionResult, Device, InterfaceType};
use lanwake::probe::device::DeviceProbe;
use lanwake::ProbeConfig;
use test_utils::{make_device, make_iface, with_info, MockProber};


fn windows(device: Device) -> Device {
    with_info(device, Some("Windows 11"), None, None)
}

#[tokio::test]
async fn interfaces_outside_the_subnet_are_skipped() {
    let prober = Arc::new(
        MockProber::new().with_outcome("10.1.1.5:7748", ConnectionResult::Ok),
    );
    let mut device = make_device("d1", "desk", Some("10.1.1.5"), None);
    device.interfaces.push(make_iface(Some("192.168.1.5"), None, Some(7748)));

    let probe = DeviceProbe::new(prober.clone(), ProbeConfig::default());
    let result = probe
        .probe_best(&device, "192.168.1.", &CancellationToken::new())
        .await;

    // Only the in-subnet interface was attempted, and it timed out.
    assert_eq!(prober.call_count(), 1);
    assert_eq!(
        prober.calls.lock().unwrap()[0].0,
        "192.168.1.5:7748".parse().unwrap()
    );
    assert_eq!(result.result, ConnectionResult::TimeoutError);
}

#[tokio::test]
async fn no_reachable_interface_is_host_unreachable() {
    let prober = Arc::new(MockProber::new());
    let device = make_device("d1", "desk", Some("10.1.1.5"), Some("AA:BB:CC:DD:EE:FF"));

    let probe = DeviceProbe::new(prober.clone(), ProbeConfig::default());
    let result = probe
        .probe_best(&device, "192.168.1.", &CancellationToken::new())
        .await;

    assert_eq!(prober.call_count(), 0);
    assert_eq!(result.result, ConnectionResult::HostUnreachable);
}

#[tokio::test]
async fn windows_refusal_triggers_the_fallback_port() {
    let prober = Arc::new(
        MockProber::new()
            .with_outcome("192.168.1.5:7748", ConnectionResult::ConnectError)
            .with_outcome("192.168.1.5:135", ConnectionResult::Ok),
    );
    let device = windows(make_device("d1", "desk", Some("192.168.1.5"), None));

    let probe = DeviceProbe::new(prober.clone(), ProbeConfig::default());
    let result = probe
        .probe_best(&device, "192.168.1.", &CancellationToken::new())
        .await;

    assert_eq!(result.result, ConnectionResult::OkFallback);
    let calls = prober.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].0, "192.168.1.5:135".parse().unwrap());
    assert!(calls[1].1, "second attempt must be marked as fallback");
}

#[tokio::test]
async fn non_windows_refusal_stays_a_connect_error() {
    let prober = Arc::new(
        MockProber::new().with_outcome("192.168.1.5:7748", ConnectionResult::ConnectError),
    );
    let device = make_device("d1", "desk", Some("192.168.1.5"), None);

    let probe = DeviceProbe::new(prober.clone(), ProbeConfig::default());
    let result = probe
        .probe_best(&device, "192.168.1.", &CancellationToken::new())
        .await;

    assert_eq!(prober.call_count(), 1);
    assert_eq!(result.result, ConnectionResult::ConnectError);
}

#[tokio::test]
async fn first_ok_interface_short_circuits() {
    let prober = Arc::new(
        MockProber::new()
            .with_outcome("192.168.1.5:7748", ConnectionResult::Ok)
            .with_outcome("192.168.1.6:7748", ConnectionResult::Ok),
    );
    let mut device = make_device("d1", "desk", Some("192.168.1.5"), None);
    device.interfaces.push(make_iface(Some("192.168.1.6"), None, Some(7748)));

    let probe = DeviceProbe::new(prober.clone(), ProbeConfig::default());
    let result = probe
        .probe_best(&device, "192.168.1.", &CancellationToken::new())
        .await;

    assert_eq!(result.result, ConnectionResult::Ok);
    assert_eq!(result.ip, "192.168.1.5");
    assert_eq!(prober.call_count(), 1);
}

#[tokio::test]
async fn best_ranked_result_wins_across_interfaces() {
    // First interface times out, second refuses (host up). The refusal ranks
    // the same numerically, so the first result is kept; a fallback success
    // on a later interface must win instead.
    let prober = Arc::new(
        MockProber::new()
            .with_outcome("192.168.1.5:7748", ConnectionResult::TimeoutError)
            .with_outcome("192.168.1.6:7748", ConnectionResult::ConnectError)
            .with_outcome("192.168.1.6:135", ConnectionResult::Ok),
    );
    let mut device = windows(make_device("d1", "desk", Some("192.168.1.5"), None));
    device.interfaces.push(make_iface(Some("192.168.1.6"), None, Some(7748)));

    let probe = DeviceProbe::new(prober.clone(), ProbeConfig::default());
    let result = probe
        .probe_best(&device, "192.168.1.", &CancellationToken::new())
        .await;

    assert_eq!(result.result, ConnectionResult::OkFallback);
    assert_eq!(result.ip, "192.168.1.6");
}

#[tokio::test]
async fn info_payload_refreshes_the_device_record() {
    let prober = Arc::new(
        MockProber::new()
            .with_outcome("192.168.1.5:7748", ConnectionResult::Ok)
            .with_info("192.168.1.5:7748", "renamed-desk", Some("AA:BB:CC:DD:EE:FF")),
    );
    let device = make_device("d1", "desk", Some("192.168.1.5"), None);

    let probe = DeviceProbe::new(prober, ProbeConfig::default());
    let result = probe
        .probe_best(&device, "192.168.1.", &CancellationToken::new())
        .await;

    let refreshed = result.device.expect("INFO payload expected");
    assert_eq!(refreshed.id, "d1");
    assert_eq!(refreshed.hostname, "renamed-desk");
    assert_eq!(
        refreshed.interfaces[0].mac.as_deref(),
        Some("AA:BB:CC:DD:EE:FF")
    );
    assert_eq!(refreshed.interfaces[0].kind, InterfaceType::Ethernet);
}

#[tokio::test]
async fn cancellation_stops_before_any_connect() {
    let prober = Arc::new(
        MockProber::new().with_outcome("192.168.1.5:7748", ConnectionResult::Ok),
    );
    let device = make_device("d1", "desk", Some("192.168.1.5"), None);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let probe = DeviceProbe::new(prober.clone(), ProbeConfig::default());
    let _ = probe.probe_best(&device, "192.168.1.", &cancel).await;

    assert_eq!(prober.call_count(), 0);
}
