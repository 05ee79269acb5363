use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::TcpProber;
use crate::config::ProbeConfig;
use crate::model::{non_empty, ConnectionResult, Device, ProbeResult};
use crate::tray::TrayInfo;

/// Probes one device across its subnet-local interfaces and keeps the
/// best-ranked outcome.
pub struct DeviceProbe {
    prober: Arc<dyn TcpProber>,
    config: ProbeConfig,
}

impl DeviceProbe {
    pub fn new(prober: Arc<dyn TcpProber>, config: ProbeConfig) -> Self {
        Self { prober, config }
    }

    /// Try every interface whose IP lies in the current subnet, primary port
    /// first, Windows fallback port on an active refusal. Stops at the first
    /// `Ok`; otherwise keeps the best-ranked result seen. The cancellation
    /// token is honored before every connect attempt.
    pub async fn probe_best(
        &self,
        device: &Device,
        subnet_prefix: &str,
        cancel: &CancellationToken,
    ) -> ProbeResult {
        let mut best: Option<ProbeResult> = None;

        for iface in &device.interfaces {
            let Some(ip) = non_empty(&iface.ip) else {
                continue;
            };
            // Interfaces outside the phone's subnet are out of reach.
            if !ip.starts_with(subnet_prefix) {
                continue;
            }
            let Ok(parsed_ip) = ip.parse::<IpAddr>() else {
                continue;
            };
            if cancel.is_cancelled() {
                break;
            }

            let port = iface.port.unwrap_or(self.config.default_tray_port);
            let addr = SocketAddr::new(parsed_ip, port);
            let started = Instant::now();

            let (mut result, info) = self
                .prober
                .probe_with_info(addr, Duration::from_millis(self.config.primary_timeout_ms))
                .await;

            // A refusal proves the host is up. Windows machines expose the
            // RPC endpoint mapper, so one extra short attempt there upgrades
            // the outcome to "host alive, tray missing".
            if result == ConnectionResult::ConnectError && device.looks_like_windows() {
                if cancel.is_cancelled() {
                    break;
                }
                let fallback_addr = SocketAddr::new(parsed_ip, self.config.fallback_port);
                let fallback = self
                    .prober
                    .probe(
                        fallback_addr,
                        Duration::from_millis(self.config.fallback_timeout_ms),
                        true,
                    )
                    .await;
                if fallback.rank() > result.rank() {
                    result = fallback;
                }
            }

            let attempt = ProbeResult {
                ip: ip.to_string(),
                port,
                mac: iface.mac.clone(),
                result,
                duration_ms: started.elapsed().as_millis() as u64,
                device: info.map(|i| Self::refreshed_device(device, ip, i)),
            };
            debug!(
                device_id = %device.id,
                ip = %attempt.ip,
                result = ?attempt.result,
                "interface probed"
            );

            if attempt.result == ConnectionResult::Ok {
                return attempt;
            }
            match best {
                Some(ref current) if current.result.rank() >= attempt.result.rank() => {}
                _ => best = Some(attempt),
            }
        }

        best.unwrap_or_else(|| Self::out_of_reach(device))
    }

    /// Apply an `INFO` reply onto a copy of the device record
    fn refreshed_device(device: &Device, probed_ip: &str, info: TrayInfo) -> Device {
        let mut updated = device.clone();
        updated.hostname = info.hostname;
        if let Some(mac) = info.mac {
            if let Some(iface) = updated
                .interfaces
                .iter_mut()
                .find(|i| i.ip.as_deref() == Some(probed_ip))
            {
                iface.mac = Some(mac);
            }
        }
        updated
    }

    /// No interface lies in the current subnet: the device cannot be routed
    /// from here, which is the definitive-offline outcome.
    fn out_of_reach(device: &Device) -> ProbeResult {
        ProbeResult {
            ip: device
                .ips()
                .first()
                .map(ToString::to_string)
                .unwrap_or_default(),
            port: 0,
            mac: device.macs().first().map(ToString::to_string),
            result: ConnectionResult::HostUnreachable,
            duration_ms: 0,
            device: None,
        }
    }
}
