use thiserror::Error;

/// Error types for device management operations
#[derive(Error, Debug)]
pub enum LanWakeError {
    #[error("I/O Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Network Interface Error: {0}")]
    NetworkInterfaceWrapped(#[from] network_interface::Error),

    #[error("No usable network interface found")]
    NoNetworkInterface,

    #[error("Device '{0}' has no interface with a MAC address")]
    NoMacAddress(String),

    #[error("Device Store Error: {0}")]
    StoreError(String),

    #[error("Serialization Error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Discovery Error: {0}")]
    DiscoveryError(String),

    #[error("Tray Protocol Error: {0}")]
    TrayError(String),

    #[error("Unknown Device: {0}")]
    UnknownDevice(String),

    #[error("Error: {0}")]
    Other(String),
}
