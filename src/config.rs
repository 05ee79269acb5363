use serde::{Deserialize, Serialize};

/// TCP port the tray companion service listens on by default.
pub const DEFAULT_TRAY_PORT: u16 = 7748;

/// Windows machines answer on the RPC endpoint mapper even when the tray
/// is not running, which lets us tell "host up" apart from "host down".
pub const WINDOWS_FALLBACK_PORT: u16 = 135;

/// UDP port Wake-on-LAN magic packets are sent to.
pub const WOL_PORT: u16 = 9;

/// Configuration for liveness probing operations
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Timeout in milliseconds for the primary TCP connect attempt
    pub primary_timeout_ms: u64,

    /// Timeout in milliseconds for the fallback-port connect attempt
    pub fallback_timeout_ms: u64,

    /// Fallback port probed when the tray port is refused on a Windows host
    pub fallback_port: u16,

    /// Tray port assumed when an interface does not declare one
    pub default_tray_port: u16,

    /// Maximum number of concurrent in-flight connect attempts
    pub max_concurrent_probes: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            primary_timeout_ms: 800,
            fallback_timeout_ms: 300,
            fallback_port: WINDOWS_FALLBACK_PORT,
            default_tray_port: DEFAULT_TRAY_PORT,
            max_concurrent_probes: 8,
        }
    }
}

/// Unit for the shutdown delay forwarded to the tray service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayUnit {
    Seconds,
    Minutes,
}

impl DelayUnit {
    /// Keyword used on the wire (`SHUTDOWN <amount> <unit>`)
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            DelayUnit::Seconds => "seconds",
            DelayUnit::Minutes => "minutes",
        }
    }

    pub fn to_seconds(&self, amount: u32) -> u64 {
        match self {
            DelayUnit::Seconds => u64::from(amount),
            DelayUnit::Minutes => u64::from(amount) * 60,
        }
    }
}

/// User-facing settings consumed by the engine as plain current values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Delay passed to the tray `SHUTDOWN` command
    pub shutdown_delay_amount: u32,
    pub shutdown_delay_unit: DelayUnit,

    /// Periodic background refresh of device statuses
    pub auto_refresh_enabled: bool,
    pub auto_refresh_interval_secs: u64,

    /// Timeout in milliseconds for tray protocol sockets
    pub socket_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            shutdown_delay_amount: 30,
            shutdown_delay_unit: DelayUnit::Seconds,
            auto_refresh_enabled: true,
            auto_refresh_interval_secs: 15,
            socket_timeout_ms: 2000,
        }
    }
}
