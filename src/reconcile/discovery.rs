//! Validation and merging of raw passive-discovery records.
//!
//! Advertisements are untrusted input: entries are grouped by device id into
//! one record per device, and transformation into a usable [`Device`] is a
//! total function whose failures are typed variants carrying the raw record
//! for diagnostic display.

use std::collections::HashMap;

use uuid::Uuid;

use crate::model::{
    Device, DeviceInfo, DeviceInterface, DiscoveredDevice, DiscoveredEndpoint,
    DiscoveredServiceEntry, InterfaceType,
};

// TXT keys, current and legacy spellings.
const KEYS_DEVICE_ID: &[&str] = &["device-id", "id"];
const KEYS_HOSTNAME: &[&str] = &["host-name", "hostname"];
const KEYS_OS_NAME: &[&str] = &["os-name", "os"];
const KEYS_OS_VERSION: &[&str] = &["os-version"];
const KEYS_TRAY_VERSION: &[&str] = &["tray-version", "version"];
const KEYS_MAC: &[&str] = &["host-mac-address", "mac"];
const KEYS_INTERFACE_TYPE: &[&str] = &["interface-type"];

/// Why a discovered record could not be turned into a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformReason {
    InvalidId,
    NoHostname,
    NoMacAddress,
    NoInterfaces,
}

/// Total outcome of transforming one discovered record
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceTransformResult {
    Ok(Device),
    /// The advertising tray predates a required field; an upgrade would fix it
    Outdated {
        reason: TransformReason,
        raw: DiscoveredDevice,
    },
    /// The record can never become a usable device
    Invalid {
        reason: TransformReason,
        raw: DiscoveredDevice,
    },
}

fn txt_lookup<'a>(records: &'a HashMap<String, String>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| records.get(*key))
        .map(String::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Group raw advertisements by their device id. Endpoints become the union
/// of each entry's (ip, port, mac, type); TXT records merge with the first
/// seen value winning.
pub fn group_entries(entries: &[DiscoveredServiceEntry]) -> Vec<DiscoveredDevice> {
    let mut grouped: Vec<DiscoveredDevice> = Vec::new();
    for entry in entries {
        let endpoint = DiscoveredEndpoint {
            ip: entry.ip.clone(),
            port: entry.port,
            mac: txt_lookup(&entry.txt_records, KEYS_MAC).map(str::to_string),
            kind: txt_lookup(&entry.txt_records, KEYS_INTERFACE_TYPE)
                .and_then(InterfaceType::parse),
        };
        match grouped
            .iter_mut()
            .find(|d| d.device_id == entry.device_id)
        {
            Some(device) => {
                if !device.endpoints.contains(&endpoint) {
                    device.endpoints.push(endpoint);
                }
                for (key, value) in &entry.txt_records {
                    device
                        .txt_records
                        .entry(key.clone())
                        .or_insert_with(|| value.clone());
                }
            }
            None => grouped.push(DiscoveredDevice {
                device_id: entry.device_id.clone(),
                endpoints: vec![endpoint],
                txt_records: entry.txt_records.clone(),
            }),
        }
    }
    grouped
}

/// Read the device id off a raw advertisement, preferring the TXT record
/// over the grouping key
pub fn entry_device_id(entry: &DiscoveredServiceEntry) -> Option<String> {
    txt_lookup(&entry.txt_records, KEYS_DEVICE_ID)
        .map(str::to_string)
        .or_else(|| (!entry.device_id.is_empty()).then(|| entry.device_id.clone()))
}

/// Transform one grouped record into a device. Never fails: every malformed
/// input maps to a typed variant.
pub fn transform(discovered: &DiscoveredDevice) -> DeviceTransformResult {
    if Uuid::parse_str(&discovered.device_id).is_err() {
        return DeviceTransformResult::Invalid {
            reason: TransformReason::InvalidId,
            raw: discovered.clone(),
        };
    }

    let Some(hostname) = txt_lookup(&discovered.txt_records, KEYS_HOSTNAME) else {
        return DeviceTransformResult::Outdated {
            reason: TransformReason::NoHostname,
            raw: discovered.clone(),
        };
    };

    let mut interfaces = Vec::new();
    for endpoint in &discovered.endpoints {
        // An endpoint that does not even declare its medium is useless.
        let Some(kind) = endpoint.kind else {
            continue;
        };
        // A typed endpoint without a MAC means the whole advertisement comes
        // from a tray too old to be wake-capable.
        let Some(mac) = endpoint.mac.as_deref().map(str::trim).filter(|m| !m.is_empty())
        else {
            return DeviceTransformResult::Outdated {
                reason: TransformReason::NoMacAddress,
                raw: discovered.clone(),
            };
        };
        interfaces.push(DeviceInterface {
            ip: Some(endpoint.ip.clone()),
            mac: Some(mac.to_string()),
            port: Some(endpoint.port),
            kind,
        });
    }

    if interfaces.is_empty() {
        return DeviceTransformResult::Invalid {
            reason: TransformReason::NoInterfaces,
            raw: discovered.clone(),
        };
    }

    let device_info = DeviceInfo {
        os_name: txt_lookup(&discovered.txt_records, KEYS_OS_NAME).map(str::to_string),
        os_version: txt_lookup(&discovered.txt_records, KEYS_OS_VERSION).map(str::to_string),
        tray_version: txt_lookup(&discovered.txt_records, KEYS_TRAY_VERSION).map(str::to_string),
    };
    let device_info = (device_info != DeviceInfo::default()).then_some(device_info);

    DeviceTransformResult::Ok(Device {
        id: discovered.device_id.clone(),
        hostname: hostname.to_string(),
        device_info,
        interfaces,
    })
}

/// Group then transform a batch of raw advertisements
pub fn reconcile(entries: &[DiscoveredServiceEntry]) -> Vec<DeviceTransformResult> {
    group_entries(entries).iter().map(transform).collect()
}
