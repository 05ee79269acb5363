//! Probabilistic identity resolution across untrusted sources.
//!
//! A candidate device (user entry, probe refresh, passive discovery) is
//! scored against every stored device with weighted signals; the best match
//! above a threshold wins, otherwise the candidate is treated as new.

use tracing::debug;

use crate::model::Device;

// Signal weights.
pub const SCORE_ID_MATCH: i32 = 100;
pub const SCORE_SHARED_MAC: i32 = 60;
pub const SCORE_SHARED_IP: i32 = 10;
pub const PENALTY_MAC_CONFLICT: i32 = -40;
pub const SCORE_HOSTNAME_EXACT: i32 = 30;
pub const SCORE_HOSTNAME_STRONG: i32 = 20;
pub const SCORE_HOSTNAME_WEAK: i32 = 10;
pub const SCORE_OS_NAME_PREFIX: i32 = 10;
pub const SCORE_OS_VERSION: i32 = 5;
pub const SCORE_INTERFACE_COUNT: i32 = 5;

// Fuzzy hostname similarity bands (longest common substring length).
pub const HOSTNAME_STRONG_SIMILARITY: usize = 8;
pub const HOSTNAME_WEAK_SIMILARITY: usize = 5;

/// Acceptance threshold when the incoming record strengthens the stored
/// identity (supplies a MAC or tray version the stored record lacks).
pub const THRESHOLD_IDENTITY_UPGRADE: i32 = 30;
/// Acceptance threshold for an ordinary match.
pub const THRESHOLD_DEFAULT: i32 = 55;

/// Find the stored device the incoming record most plausibly is, or `None`
/// when nothing reaches its acceptance threshold.
pub fn find_match<'a>(incoming: &Device, stored: &'a [Device]) -> Option<&'a Device> {
    let mut best: Option<(&Device, i32)> = None;
    for candidate in stored {
        let score = score_match(incoming, candidate);
        if best.is_none_or(|(_, current)| score > current) {
            best = Some((candidate, score));
        }
    }
    let (candidate, score) = best?;
    let threshold = if is_identity_upgrade(incoming, candidate) {
        THRESHOLD_IDENTITY_UPGRADE
    } else {
        THRESHOLD_DEFAULT
    };
    debug!(
        incoming = %incoming.hostname,
        candidate = %candidate.hostname,
        score,
        threshold,
        "best match"
    );
    (score >= threshold).then_some(candidate)
}

/// Weighted similarity score between two device records. Identical ids are
/// an absolute match and short-circuit further scoring.
pub fn score_match(incoming: &Device, stored: &Device) -> i32 {
    if incoming.id == stored.id {
        return SCORE_ID_MATCH;
    }

    let mut score = 0;

    let incoming_macs = incoming.macs();
    let stored_macs = stored.macs();
    let shared_mac = incoming_macs
        .iter()
        .any(|a| stored_macs.iter().any(|b| a.eq_ignore_ascii_case(b)));

    let shared_ip = incoming
        .ips()
        .iter()
        .any(|a| stored.ips().contains(a));

    if shared_mac {
        score += SCORE_SHARED_MAC;
    }
    if shared_ip {
        score += SCORE_SHARED_IP;
    }
    // Both sides know their MACs and they disagree, yet the IP overlaps:
    // likely a reassigned address, not the same machine.
    if !shared_mac && !incoming_macs.is_empty() && !stored_macs.is_empty() && shared_ip {
        score += PENALTY_MAC_CONFLICT;
    }

    let a = normalize_hostname(&incoming.hostname);
    let b = normalize_hostname(&stored.hostname);
    if !a.is_empty() && a == b {
        score += SCORE_HOSTNAME_EXACT;
    } else {
        let similarity = longest_common_substring(&a, &b);
        if similarity >= HOSTNAME_STRONG_SIMILARITY {
            score += SCORE_HOSTNAME_STRONG;
        } else if similarity >= HOSTNAME_WEAK_SIMILARITY {
            score += SCORE_HOSTNAME_WEAK;
        }
    }

    let incoming_info = incoming.device_info.as_ref();
    let stored_info = stored.device_info.as_ref();
    if let (Some(a), Some(b)) = (
        incoming_info.and_then(|i| i.os_name.as_deref()),
        stored_info.and_then(|i| i.os_name.as_deref()),
    ) {
        let a = a.to_ascii_lowercase();
        let b = b.to_ascii_lowercase();
        if !a.is_empty() && !b.is_empty() && (a.starts_with(&b) || b.starts_with(&a)) {
            score += SCORE_OS_NAME_PREFIX;
        }
    }
    if let (Some(a), Some(b)) = (
        incoming_info.and_then(|i| i.os_version.as_deref()),
        stored_info.and_then(|i| i.os_version.as_deref()),
    ) {
        if a == b {
            score += SCORE_OS_VERSION;
        }
    }
    if incoming.interfaces.len() == stored.interfaces.len() {
        score += SCORE_INTERFACE_COUNT;
    }

    score
}

/// The incoming record supplies identity-strengthening data the stored
/// record lacks, which justifies a lower acceptance bar.
pub fn is_identity_upgrade(incoming: &Device, stored: &Device) -> bool {
    let supplies_mac = stored.macs().is_empty() && !incoming.macs().is_empty();
    let stored_tray = stored
        .device_info
        .as_ref()
        .and_then(|i| i.tray_version.as_deref())
        .is_some();
    let incoming_tray = incoming
        .device_info
        .as_ref()
        .and_then(|i| i.tray_version.as_deref())
        .is_some();
    supplies_mac || (!stored_tray && incoming_tray)
}

/// Lowercase and strip `_` and `.` so cosmetic renames still compare equal
pub fn normalize_hostname(hostname: &str) -> String {
    hostname
        .to_ascii_lowercase()
        .chars()
        .filter(|c| *c != '_' && *c != '.')
        .collect()
}

/// Length of the longest common substring, the fuzzy similarity measure for
/// hostnames
pub fn longest_common_substring(a: &str, b: &str) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut previous = vec![0usize; b.len() + 1];
    let mut longest = 0;
    for ca in &a {
        let mut current = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                current[j + 1] = previous[j] + 1;
                longest = longest.max(current[j + 1]);
            }
        }
        previous = current;
    }
    longest
}
