//! lanwake: wake, shut down and keep track of the PCs on your LAN
//!
//! The crate is a device reconciliation and liveness probing engine:
//! - TCP liveness probing with a closed outcome taxonomy and hysteresis
//! - probabilistic identity matching across untrusted sources
//! - Wake-on-LAN packet construction and broadcast resolution
//! - validation and merging of passive mDNS discovery records
//! - bounded, cancellable per-device probe scheduling

pub mod config;
pub mod discovery;
pub mod engine;
pub mod errors;
pub mod model;
pub mod net;
pub mod probe;
pub mod reconcile;
pub mod scheduler;
pub mod store;
pub mod tray;

// Re-exports for public API
pub use config::{ProbeConfig, Settings};
pub use engine::{DeviceEngine, ReconcileSummary};
pub use errors::LanWakeError;
pub use model::{
    ConnectionResult, Device, DeviceInfo, DeviceInterface, DeviceState, DeviceStatus,
    DiscoveredDevice, DiscoveredServiceEntry, InterfaceType, PendingAction, ProbeResult,
};
pub use probe::device::DeviceProbe;
pub use probe::status::StatusResolver;
pub use probe::tcp::TokioTcpProber;
pub use probe::TcpProber;
pub use reconcile::conflict::ConflictResult;
pub use reconcile::discovery::{DeviceTransformResult, TransformReason};
pub use scheduler::{ProbeScheduler, StatusUpdate};
pub use store::{DeviceStore, JsonFileStore, MemoryStore};
