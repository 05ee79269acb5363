//! Facade tying the store, scheduler and network operations together.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ProbeConfig, Settings};
use crate::errors::LanWakeError;
use crate::model::{
    non_empty, Device, DeviceState, DeviceStatus, DiscoveredServiceEntry, PendingAction,
};
use crate::net::{broadcast, wol};
use crate::probe::TcpProber;
use crate::reconcile::discovery::{self, DeviceTransformResult};
use crate::reconcile::matcher;
use crate::scheduler::{ProbeScheduler, StatusUpdate};
use crate::store::DeviceStore;
use crate::tray;

/// Outcome of folding one discovery batch into the store
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub added: usize,
    pub updated: usize,
    pub rejected: usize,
}

/// Central facade for managing the device fleet
pub struct DeviceEngine {
    store: Arc<dyn DeviceStore>,
    scheduler: ProbeScheduler,
    settings: Settings,
    statuses: Mutex<HashMap<String, DeviceStatus>>,
}

impl DeviceEngine {
    pub fn new(
        store: Arc<dyn DeviceStore>,
        prober: Arc<dyn TcpProber>,
        config: ProbeConfig,
        settings: Settings,
    ) -> (Self, mpsc::Receiver<StatusUpdate>) {
        let (scheduler, updates) = ProbeScheduler::new(prober, config);
        (
            Self {
                store,
                scheduler,
                settings,
                statuses: Mutex::new(HashMap::new()),
            },
            updates,
        )
    }

    /// Current status of a device, `UNKNOWN` if it was never probed
    pub fn status_of(&self, device_id: &str) -> DeviceStatus {
        self.statuses
            .lock()
            .expect("status map poisoned")
            .get(device_id)
            .cloned()
            .unwrap_or_else(|| DeviceStatus::unknown(Utc::now()))
    }

    /// Record a published update and fold any refreshed identity payload
    /// back into the store (in place, keyed by id).
    pub async fn apply_update(&self, update: StatusUpdate) -> Result<(), LanWakeError> {
        self.statuses
            .lock()
            .expect("status map poisoned")
            .insert(update.device_id.clone(), update.status);

        if let Some(refreshed) = update.refreshed {
            let mut devices = self.store.load().await?;
            if let Some(existing) = devices.iter_mut().find(|d| d.id == refreshed.id) {
                existing.absorb(&refreshed);
                self.store.save(&devices).await?;
            }
        }
        Ok(())
    }

    /// Snapshot of the stored device list
    pub async fn find_all(&self) -> Result<Vec<Device>, LanWakeError> {
        self.store.load().await
    }

    /// Look a device up by id or (case-insensitive) hostname
    pub async fn find_device(&self, key: &str) -> Result<Device, LanWakeError> {
        self.store
            .load()
            .await?
            .into_iter()
            .find(|d| d.id == key || d.hostname.eq_ignore_ascii_case(key))
            .ok_or_else(|| LanWakeError::UnknownDevice(key.to_string()))
    }

    /// Schedule a probe for every stored device. Publication is incremental;
    /// callers drain the update receiver.
    pub async fn refresh_all(&self) -> Result<(), LanWakeError> {
        let devices = self.store.load().await?;
        let prefix = self.subnet_prefix()?;
        debug!(count = devices.len(), prefix = %prefix, "refreshing all devices");
        let batch: Vec<_> = devices
            .into_iter()
            .map(|d| {
                let previous = self.status_of(&d.id);
                (d, previous)
            })
            .collect();
        self.scheduler
            .schedule_batch(batch, &prefix, self.settings.auto_refresh_interval_secs);
        Ok(())
    }

    /// Schedule a probe for one device, replacing any in-flight job for it
    pub async fn refresh_device(&self, key: &str) -> Result<(), LanWakeError> {
        let device = self.find_device(key).await?;
        let prefix = self.subnet_prefix()?;
        let previous = self.status_of(&device.id);
        self.scheduler.schedule(
            device,
            previous,
            prefix,
            self.settings.auto_refresh_interval_secs,
        );
        Ok(())
    }

    /// Periodic refresh loop: sleep, trigger a batch, repeat. Runs until
    /// cancelled or auto-refresh is disabled.
    pub async fn auto_refresh_loop(&self, cancel: CancellationToken) {
        while self.settings.auto_refresh_enabled {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(Duration::from_secs(
                    self.settings.auto_refresh_interval_secs,
                )) => {}
            }
            if cancel.is_cancelled() {
                break;
            }
            if let Err(err) = self.refresh_all().await {
                warn!(%err, "auto refresh failed");
            }
        }
        self.scheduler.cancel_all();
    }

    /// Send a Wake-on-LAN packet for the device. Requires the device to be
    /// offline and to carry at least one MAC.
    pub async fn wake(&self, key: &str) -> Result<(), LanWakeError> {
        let device = self.find_device(key).await?;
        let status = self.status_of(&device.id);
        if !status.can_wakeup(&device) {
            return Err(LanWakeError::Other(format!(
                "'{}' is not in a wakeable state",
                device.hostname
            )));
        }
        let mac_str = device
            .macs()
            .first()
            .map(ToString::to_string)
            .ok_or_else(|| LanWakeError::NoMacAddress(device.hostname.clone()))?;
        let mac = wol::parse_mac(&mac_str)
            .ok_or_else(|| LanWakeError::NoMacAddress(device.hostname.clone()))?;
        let target = broadcast::resolve_broadcast_address()?;
        wol::send_magic_packet(mac, target).await?;
        info!(hostname = %device.hostname, %target, "wake-on-lan sent");
        Ok(())
    }

    /// Ask the tray to schedule a shutdown with the configured delay.
    /// `true` iff the tray acknowledged; no automatic retry.
    pub async fn shutdown(&self, key: &str) -> Result<bool, LanWakeError> {
        let device = self.find_device(key).await?;
        let status = self.status_of(&device.id);
        if !status.can_shutdown() {
            return Ok(false);
        }
        let addr = self.tray_addr(&device)?;
        let acked = tray::send_shutdown(
            addr,
            self.settings.shutdown_delay_amount,
            self.settings.shutdown_delay_unit,
            Duration::from_millis(self.settings.socket_timeout_ms),
        )
        .await?;
        if acked {
            let now = Utc::now();
            let delay = self
                .settings
                .shutdown_delay_unit
                .to_seconds(self.settings.shutdown_delay_amount);
            let mut statuses = self.statuses.lock().expect("status map poisoned");
            if let Some(entry) = statuses.get_mut(&device.id) {
                entry.pending_action = PendingAction::ShutdownScheduled {
                    scheduled_at: now,
                    execute_at: now + chrono::Duration::seconds(delay as i64),
                    cancellable: true,
                };
            }
            info!(hostname = %device.hostname, delay_secs = delay, "shutdown scheduled");
        }
        Ok(acked)
    }

    /// Cancel a pending shutdown. `true` iff the tray acknowledged.
    pub async fn cancel_shutdown(&self, key: &str) -> Result<bool, LanWakeError> {
        let device = self.find_device(key).await?;
        let status = self.status_of(&device.id);
        if !status.can_cancel_shutdown() {
            return Ok(false);
        }
        let addr = self.tray_addr(&device)?;
        let acked =
            tray::send_cancel(addr, Duration::from_millis(self.settings.socket_timeout_ms))
                .await?;
        if acked {
            let mut statuses = self.statuses.lock().expect("status map poisoned");
            if let Some(entry) = statuses.get_mut(&device.id) {
                entry.pending_action = PendingAction::None;
            }
            info!(hostname = %device.hostname, "shutdown cancelled");
        }
        Ok(acked)
    }

    /// Fold a batch of raw discovery records into the store: matched devices
    /// are updated in place (never duplicated), unmatched valid ones are
    /// inserted, rejected ones are counted.
    pub async fn ingest_discovered(
        &self,
        entries: &[DiscoveredServiceEntry],
    ) -> Result<ReconcileSummary, LanWakeError> {
        let mut devices = self.store.load().await?;
        let mut summary = ReconcileSummary::default();

        for result in discovery::reconcile(entries) {
            match result {
                DeviceTransformResult::Ok(incoming) => {
                    let matched_id =
                        matcher::find_match(&incoming, &devices).map(|d| d.id.clone());
                    match matched_id {
                        Some(id) => {
                            if let Some(existing) = devices.iter_mut().find(|d| d.id == id) {
                                existing.absorb(&incoming);
                                summary.updated += 1;
                            }
                        }
                        None => {
                            debug!(hostname = %incoming.hostname, "new device discovered");
                            devices.push(incoming);
                            summary.added += 1;
                        }
                    }
                }
                DeviceTransformResult::Outdated { reason, raw }
                | DeviceTransformResult::Invalid { reason, raw } => {
                    warn!(device_id = %raw.device_id, ?reason, "discovery record rejected");
                    summary.rejected += 1;
                }
            }
        }

        self.store.save(&devices).await?;
        Ok(summary)
    }

    /// Whether the device is currently believed online
    pub fn is_online(&self, device_id: &str) -> bool {
        self.status_of(device_id).state == DeviceState::Online
    }

    fn subnet_prefix(&self) -> Result<String, LanWakeError> {
        broadcast::local_network()?
            .map(|net| net.subnet_prefix())
            .ok_or(LanWakeError::NoNetworkInterface)
    }

    /// Address of the tray service: prefer a subnet-local interface, fall
    /// back to the first one with an address.
    fn tray_addr(&self, device: &Device) -> Result<SocketAddr, LanWakeError> {
        let prefix = self.subnet_prefix().unwrap_or_default();
        let iface = device
            .interfaces
            .iter()
            .find(|i| non_empty(&i.ip).is_some_and(|ip| ip.starts_with(&prefix)))
            .or_else(|| {
                device
                    .interfaces
                    .iter()
                    .find(|i| non_empty(&i.ip).is_some())
            })
            .ok_or_else(|| {
                LanWakeError::Other(format!("'{}' has no usable interface", device.hostname))
            })?;
        let ip: IpAddr = non_empty(&iface.ip)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                LanWakeError::Other(format!("'{}' has no parsable address", device.hostname))
            })?;
        Ok(SocketAddr::new(
            ip,
            iface.port.unwrap_or(crate::config::DEFAULT_TRAY_PORT),
        ))
    }
}
