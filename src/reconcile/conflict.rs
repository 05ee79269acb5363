//! Pure validation of user-entered form data against the stored device list,
//! used to warn before saving a device that collides with an existing one.

use serde::Serialize;

use crate::model::{non_empty, Device, DeviceInterface};

/// Collision verdict for a set of form interfaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ConflictResult {
    None,
    /// Another stored device already owns one of the entered MACs
    MacConflict(Device),
    /// Another stored device already owns one of the entered IPs
    IpConflict(Device),
    /// One stored device shares both a MAC and an IP with the form
    PossibleDuplicate(Device),
}

/// Check the form interfaces against every stored device except the one
/// being edited. Total function; never fails.
pub fn check(
    form_interfaces: &[DeviceInterface],
    stored_devices: &[Device],
    current_id: Option<&str>,
) -> ConflictResult {
    let form_macs: Vec<&str> = form_interfaces
        .iter()
        .filter_map(|i| non_empty(&i.mac))
        .collect();
    let form_ips: Vec<&str> = form_interfaces
        .iter()
        .filter_map(|i| non_empty(&i.ip))
        .collect();

    let others = stored_devices
        .iter()
        .filter(|d| current_id != Some(d.id.as_str()));

    let mut mac_match: Option<&Device> = None;
    let mut ip_match: Option<&Device> = None;
    for device in others {
        if mac_match.is_none()
            && device
                .macs()
                .iter()
                .any(|m| form_macs.iter().any(|f| f.eq_ignore_ascii_case(m)))
        {
            mac_match = Some(device);
        }
        if ip_match.is_none() && device.ips().iter().any(|ip| form_ips.contains(ip)) {
            ip_match = Some(device);
        }
    }

    match (mac_match, ip_match) {
        (Some(a), Some(b)) if a.id == b.id => ConflictResult::PossibleDuplicate(a.clone()),
        (Some(device), _) => ConflictResult::MacConflict(device.clone()),
        (None, Some(device)) => ConflictResult::IpConflict(device.clone()),
        (None, None) => ConflictResult::None,
    }
}
