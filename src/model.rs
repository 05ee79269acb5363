use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Physical medium of a device interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InterfaceType {
    Ethernet,
    Wifi,
    Unknown,
}

impl InterfaceType {
    /// Parse the `interface-type` TXT record value
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "ETHERNET" => Some(InterfaceType::Ethernet),
            "WIFI" => Some(InterfaceType::Wifi),
            "UNKNOWN" => Some(InterfaceType::Unknown),
            _ => None,
        }
    }
}

/// One network attachment of a managed device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInterface {
    pub ip: Option<String>,
    pub mac: Option<String>,
    pub port: Option<u16>,
    #[serde(rename = "type")]
    pub kind: InterfaceType,
}

impl DeviceInterface {
    /// Two interfaces describe the same attachment iff their MACs are equal
    /// case-insensitively (when both present), else iff (ip, port) are equal.
    pub fn same_interface(&self, other: &DeviceInterface) -> bool {
        match (non_empty(&self.mac), non_empty(&other.mac)) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => self.ip == other.ip && self.port == other.port,
        }
    }
}

/// Extended identity metadata reported by the tray service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub tray_version: Option<String>,
}

/// Durable identity record for one managed PC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Opaque stable identifier; assigned once, never regenerated on update
    pub id: String,
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
    pub interfaces: Vec<DeviceInterface>,
}

impl Device {
    /// All non-empty MAC addresses across interfaces
    pub fn macs(&self) -> Vec<&str> {
        self.interfaces
            .iter()
            .filter_map(|i| non_empty(&i.mac))
            .collect()
    }

    /// All non-empty IP addresses across interfaces
    pub fn ips(&self) -> Vec<&str> {
        self.interfaces
            .iter()
            .filter_map(|i| non_empty(&i.ip))
            .collect()
    }

    /// Whether the device reports a Windows operating system
    pub fn looks_like_windows(&self) -> bool {
        self.device_info
            .as_ref()
            .and_then(|info| info.os_name.as_deref())
            .is_some_and(|os| os.to_ascii_lowercase().starts_with("windows"))
    }

    /// Fold a fresher record for the same device into this one. Identity is
    /// kept (`id` never changes); non-empty incoming fields win, empty ones
    /// never erase existing data. Interfaces are merged by attachment
    /// identity so the list gains new attachments without duplicating known
    /// ones.
    pub fn absorb(&mut self, incoming: &Device) {
        if !incoming.hostname.is_empty() {
            self.hostname = incoming.hostname.clone();
        }
        if let Some(ref info) = incoming.device_info {
            let merged = self.device_info.get_or_insert_with(DeviceInfo::default);
            if info.os_name.is_some() {
                merged.os_name = info.os_name.clone();
            }
            if info.os_version.is_some() {
                merged.os_version = info.os_version.clone();
            }
            if info.tray_version.is_some() {
                merged.tray_version = info.tray_version.clone();
            }
        }
        for iface in &incoming.interfaces {
            match self
                .interfaces
                .iter_mut()
                .find(|known| known.same_interface(iface))
            {
                Some(known) => {
                    if non_empty(&iface.ip).is_some() {
                        known.ip = iface.ip.clone();
                    }
                    if non_empty(&iface.mac).is_some() {
                        known.mac = iface.mac.clone();
                    }
                    if iface.port.is_some() {
                        known.port = iface.port;
                    }
                    if iface.kind != InterfaceType::Unknown {
                        known.kind = iface.kind;
                    }
                }
                None => self.interfaces.push(iface.clone()),
            }
        }
    }
}

/// Liveness classification of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceState {
    Unknown,
    Online,
    Offline,
}

/// Action scheduled against a device, serialized with an explicit tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PendingAction {
    None,
    ShutdownScheduled {
        scheduled_at: DateTime<Utc>,
        execute_at: DateTime<Utc>,
        cancellable: bool,
    },
}

impl PendingAction {
    pub fn is_none(&self) -> bool {
        matches!(self, PendingAction::None)
    }
}

/// Ephemeral per-device status, recomputed on every probe cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub state: DeviceState,
    pub tray_reachable: bool,
    pub last_seen: DateTime<Utc>,
    pub pending_action: PendingAction,
}

impl DeviceStatus {
    /// Starting status for a device that has never been probed
    pub fn unknown(now: DateTime<Utc>) -> Self {
        Self {
            state: DeviceState::Unknown,
            tray_reachable: false,
            last_seen: now,
            pending_action: PendingAction::None,
        }
    }

    pub fn can_shutdown(&self) -> bool {
        self.state == DeviceState::Online
            && self.tray_reachable
            && self.pending_action.is_none()
    }

    pub fn can_cancel_shutdown(&self) -> bool {
        self.state == DeviceState::Online
            && self.tray_reachable
            && matches!(
                self.pending_action,
                PendingAction::ShutdownScheduled { cancellable: true, .. }
            )
    }

    pub fn can_wakeup(&self, device: &Device) -> bool {
        self.state == DeviceState::Offline && !device.macs().is_empty()
    }
}

/// Closed classification of a single TCP connect attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionResult {
    /// Tray port answered
    Ok,
    /// Fallback port answered; host up, tray not listening
    OkFallback,
    /// Connection actively refused; host up, nothing listening
    ConnectError,
    /// Definitive: host is off or unrouted
    HostUnreachable,
    /// Ambiguous: nothing answered within the timeout
    TimeoutError,
    UnknownError,
}

impl ConnectionResult {
    /// Strict total rank used to pick the best outcome across interfaces
    pub fn rank(&self) -> u8 {
        match self {
            ConnectionResult::Ok => 100,
            ConnectionResult::OkFallback => 50,
            ConnectionResult::ConnectError
            | ConnectionResult::HostUnreachable
            | ConnectionResult::TimeoutError
            | ConnectionResult::UnknownError => 0,
        }
    }
}

/// Outcome of probing one device
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub ip: String,
    pub port: u16,
    pub mac: Option<String>,
    pub result: ConnectionResult,
    pub duration_ms: u64,
    /// Refreshed identity payload when the INFO exchange succeeded
    pub device: Option<Device>,
}

/// One raw service advertisement as received from passive discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredServiceEntry {
    pub device_id: String,
    pub name: String,
    pub service_type: String,
    pub ip: String,
    pub port: u16,
    pub txt_records: HashMap<String, String>,
}

/// One advertised network endpoint of a discovered device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredEndpoint {
    pub ip: String,
    pub port: u16,
    pub mac: Option<String>,
    pub kind: Option<InterfaceType>,
}

/// All advertisements sharing a device id, grouped into one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub device_id: String,
    pub endpoints: Vec<DiscoveredEndpoint>,
    pub txt_records: HashMap<String, String>,
}

/// Treat whitespace-only strings the same as absent ones
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
