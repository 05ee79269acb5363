//! Persistence seam for the device list. The engine only ever loads and
//! saves whole lists; anything smarter lives behind this trait.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::LanWakeError;
use crate::model::Device;

#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn load(&self) -> Result<Vec<Device>, LanWakeError>;
    async fn save(&self, devices: &[Device]) -> Result<(), LanWakeError>;
}

/// JSON file store; a missing file reads as an empty list
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DeviceStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<Device>, LanWakeError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, devices: &[Device]) -> Result<(), LanWakeError> {
        let json = serde_json::to_vec_pretty(devices)?;
        // Write-then-rename so a crash mid-save never truncates the list.
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), count = devices.len(), "device list saved");
        Ok(())
    }
}

/// In-memory store for tests and ephemeral use
#[derive(Default)]
pub struct MemoryStore {
    devices: Mutex<Vec<Device>>,
}

impl MemoryStore {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            devices: Mutex::new(devices),
        }
    }
}

#[async_trait]
impl DeviceStore for MemoryStore {
    async fn load(&self) -> Result<Vec<Device>, LanWakeError> {
        Ok(self.devices.lock().expect("memory store poisoned").clone())
    }

    async fn save(&self, devices: &[Device]) -> Result<(), LanWakeError> {
        *self.devices.lock().expect("memory store poisoned") = devices.to_vec();
        Ok(())
    }
}
