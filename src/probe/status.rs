use chrono::{DateTime, Utc};

use crate::model::{
    ConnectionResult, DeviceState, DeviceStatus, PendingAction, ProbeResult,
};

// Hysteresis tuning. A fast refresh cadence tolerates a proportionally wider
// miss window; a slow one trusts each probe more. Carried over from the
// original tuning, not derived from anything.
pub const FAST_REFRESH_MAX_SECS: u64 = 15;
pub const NORMAL_REFRESH_MAX_SECS: u64 = 30;
pub const FAST_REFRESH_MULTIPLIER: f64 = 1.5;
pub const NORMAL_REFRESH_MULTIPLIER: f64 = 1.0;
pub const SLOW_REFRESH_MULTIPLIER: f64 = 0.5;

/// Turns a connect outcome plus prior status into a new status. Pure state
/// machine; ambiguous outcomes keep the previous state inside a confidence
/// window so a single missed probe never flaps the device offline.
#[derive(Debug, Clone)]
pub struct StatusResolver {
    pub fast_multiplier: f64,
    pub normal_multiplier: f64,
    pub slow_multiplier: f64,
}

impl Default for StatusResolver {
    fn default() -> Self {
        Self {
            fast_multiplier: FAST_REFRESH_MULTIPLIER,
            normal_multiplier: NORMAL_REFRESH_MULTIPLIER,
            slow_multiplier: SLOW_REFRESH_MULTIPLIER,
        }
    }
}

impl StatusResolver {
    pub fn confidence_multiplier(&self, refresh_interval_secs: u64) -> f64 {
        if refresh_interval_secs <= FAST_REFRESH_MAX_SECS {
            self.fast_multiplier
        } else if refresh_interval_secs <= NORMAL_REFRESH_MAX_SECS {
            self.normal_multiplier
        } else {
            self.slow_multiplier
        }
    }

    pub fn compute(
        &self,
        previous: &DeviceStatus,
        probe: &ProbeResult,
        refresh_interval_secs: u64,
        now: DateTime<Utc>,
    ) -> DeviceStatus {
        let (state, tray_reachable, last_seen) = match probe.result {
            ConnectionResult::Ok => (DeviceState::Online, true, now),
            // Host confirmed up, tray service not answering.
            ConnectionResult::OkFallback | ConnectionResult::ConnectError => {
                (DeviceState::Online, false, now)
            }
            // Certain outcome: no grace period.
            ConnectionResult::HostUnreachable => {
                (DeviceState::Offline, false, previous.last_seen)
            }
            ConnectionResult::TimeoutError | ConnectionResult::UnknownError => {
                let window_ms = (self.confidence_multiplier(refresh_interval_secs)
                    * refresh_interval_secs as f64
                    * 1000.0) as i64;
                let elapsed_ms = (now - previous.last_seen).num_milliseconds();
                if elapsed_ms <= window_ms {
                    (previous.state, previous.tray_reachable, previous.last_seen)
                } else {
                    (DeviceState::Offline, false, previous.last_seen)
                }
            }
        };

        // A pending shutdown only survives while the device stays online.
        let pending_action = if state == DeviceState::Online {
            previous.pending_action.clone()
        } else {
            PendingAction::None
        };

        DeviceStatus {
            state,
            tray_reachable,
            last_seen,
            pending_action,
        }
    }
}
