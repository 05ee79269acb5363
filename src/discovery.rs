//! Passive service discovery: an mDNS-SD browse of the tray service type,
//! yielding raw advertisement records. Validation and merging happen in
//! [`crate::reconcile::discovery`]; this module only produces input for it.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use mdns_sd::{ServiceDaemon, ServiceEvent};
use tokio::time::{timeout, Instant};
use tracing::debug;

use crate::errors::LanWakeError;
use crate::model::DiscoveredServiceEntry;
use crate::reconcile::discovery::entry_device_id;

/// Service type advertised by tray instances
pub const TRAY_SERVICE_TYPE: &str = "_rpcctl._tcp.local.";

/// Seam over the discovery transport so the engine can run against scripted
/// records in tests
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    /// Collect raw advertisements for up to `window`
    async fn collect(
        &self,
        window: Duration,
    ) -> Result<Vec<DiscoveredServiceEntry>, LanWakeError>;
}

/// Production source backed by an mDNS-SD daemon
#[derive(Debug, Default)]
pub struct MdnsDiscovery;

impl MdnsDiscovery {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DiscoverySource for MdnsDiscovery {
    async fn collect(
        &self,
        window: Duration,
    ) -> Result<Vec<DiscoveredServiceEntry>, LanWakeError> {
        let daemon = ServiceDaemon::new()
            .map_err(|e| LanWakeError::DiscoveryError(e.to_string()))?;
        let receiver = daemon
            .browse(TRAY_SERVICE_TYPE)
            .map_err(|e| LanWakeError::DiscoveryError(e.to_string()))?;

        let deadline = Instant::now() + window;
        let mut entries = Vec::new();

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match timeout(deadline - now, receiver.recv_async()).await {
                Ok(Ok(ServiceEvent::ServiceResolved(info))) => {
                    let mut txt_records = HashMap::new();
                    for property in info.get_properties().iter() {
                        txt_records
                            .insert(property.key().to_string(), property.val_str().to_string());
                    }
                    for scoped_ip in info.get_addresses() {
                        let entry = DiscoveredServiceEntry {
                            device_id: String::new(),
                            name: info.get_fullname().to_string(),
                            service_type: info.get_type().to_string(),
                            ip: scoped_ip.to_string(),
                            port: info.get_port(),
                            txt_records: txt_records.clone(),
                        };
                        // The id lives in the TXT records; entries without
                        // one keep an empty id and fail validation later.
                        let device_id = entry_device_id(&entry).unwrap_or_default();
                        debug!(name = %entry.name, ip = %entry.ip, %device_id, "service resolved");
                        entries.push(DiscoveredServiceEntry { device_id, ..entry });
                    }
                }
                Ok(Ok(_)) => continue,
                Ok(Err(_)) | Err(_) => break,
            }
        }

        daemon.stop_browse(TRAY_SERVICE_TYPE).ok();
        daemon.shutdown().ok();
        Ok(entries)
    }
}
