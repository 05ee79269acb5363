//! Orchestration of per-device probe jobs.
//!
//! Concurrency is bounded by one semaphore across all devices, at most one
//! job is in flight per device id, and starting a new probe for a device
//! replaces (cancels) the running one, so a manual refresh never stacks
//! behind the periodic one. Results are published incrementally per device;
//! a superseded or cancelled job never publishes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ProbeConfig;
use crate::model::{Device, DeviceStatus};
use crate::probe::device::DeviceProbe;
use crate::probe::status::StatusResolver;
use crate::probe::TcpProber;

/// Incremental status publication for one device
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub device_id: String,
    pub status: DeviceStatus,
    /// Identity payload refreshed by the INFO exchange, when one happened
    pub refreshed: Option<Device>,
}

struct JobEntry {
    generation: u64,
    cancel: CancellationToken,
}

/// Registry enforcing "at most one probe job per device" in one place
#[derive(Default)]
struct JobRegistry {
    jobs: Mutex<HashMap<String, JobEntry>>,
}

impl JobRegistry {
    /// Register a job for a device, cancelling any job already in flight
    fn register_replacing(&self, device_id: &str, generation: u64) -> CancellationToken {
        let cancel = CancellationToken::new();
        let mut jobs = self.jobs.lock().expect("job registry poisoned");
        if let Some(old) = jobs.insert(
            device_id.to_string(),
            JobEntry {
                generation,
                cancel: cancel.clone(),
            },
        ) {
            debug!(device_id, "replacing in-flight probe job");
            old.cancel.cancel();
        }
        cancel
    }

    /// Remove the entry iff it still belongs to `generation`. Returns whether
    /// the completing job is the current one and may publish its result.
    fn complete_if_current(&self, device_id: &str, generation: u64) -> bool {
        let mut jobs = self.jobs.lock().expect("job registry poisoned");
        match jobs.get(device_id) {
            Some(entry) if entry.generation == generation => {
                jobs.remove(device_id);
                true
            }
            _ => false,
        }
    }

    fn cancel(&self, device_id: &str) {
        let mut jobs = self.jobs.lock().expect("job registry poisoned");
        if let Some(entry) = jobs.remove(device_id) {
            entry.cancel.cancel();
        }
    }

    fn cancel_all(&self) {
        let mut jobs = self.jobs.lock().expect("job registry poisoned");
        for (_, entry) in jobs.drain() {
            entry.cancel.cancel();
        }
    }
}

/// Schedules bounded, cancellable probe jobs and publishes their statuses
pub struct ProbeScheduler {
    prober: Arc<dyn TcpProber>,
    config: ProbeConfig,
    resolver: StatusResolver,
    limiter: Arc<Semaphore>,
    registry: Arc<JobRegistry>,
    next_generation: AtomicU64,
    updates: mpsc::Sender<StatusUpdate>,
}

impl ProbeScheduler {
    pub fn new(
        prober: Arc<dyn TcpProber>,
        config: ProbeConfig,
    ) -> (Self, mpsc::Receiver<StatusUpdate>) {
        let (updates, receiver) = mpsc::channel(64);
        let limiter = Arc::new(Semaphore::new(config.max_concurrent_probes));
        (
            Self {
                prober,
                config,
                resolver: StatusResolver::default(),
                limiter,
                registry: Arc::new(JobRegistry::default()),
                next_generation: AtomicU64::new(1),
                updates,
            },
            receiver,
        )
    }

    /// Start (or restart) the probe job for one device
    pub fn schedule(
        &self,
        device: Device,
        previous: DeviceStatus,
        subnet_prefix: String,
        refresh_interval_secs: u64,
    ) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = self.registry.register_replacing(&device.id, generation);

        let probe = DeviceProbe::new(self.prober.clone(), self.config.clone());
        let resolver = self.resolver.clone();
        let limiter = self.limiter.clone();
        let registry = self.registry.clone();
        let updates = self.updates.clone();

        tokio::spawn(async move {
            let permit = tokio::select! {
                permit = limiter.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
                () = cancel.cancelled() => return,
            };

            let result = probe.probe_best(&device, &subnet_prefix, &cancel).await;
            drop(permit);

            if cancel.is_cancelled() {
                return;
            }
            let status =
                resolver.compute(&previous, &result, refresh_interval_secs, Utc::now());

            // The generation token ties the result to its originating job so
            // a stale job cannot clobber a fresher one.
            if registry.complete_if_current(&device.id, generation) {
                let _ = updates
                    .send(StatusUpdate {
                        device_id: device.id.clone(),
                        status,
                        refreshed: result.device,
                    })
                    .await;
            }
        });
    }

    /// Schedule a probe batch over many devices; each publishes on its own
    pub fn schedule_batch(
        &self,
        devices: impl IntoIterator<Item = (Device, DeviceStatus)>,
        subnet_prefix: &str,
        refresh_interval_secs: u64,
    ) {
        for (device, previous) in devices {
            self.schedule(
                device,
                previous,
                subnet_prefix.to_string(),
                refresh_interval_secs,
            );
        }
    }

    /// Cancel the in-flight job for one device, if any
    pub fn cancel_device(&self, device_id: &str) {
        self.registry.cancel(device_id);
    }

    /// Cancel every in-flight job
    pub fn cancel_all(&self) {
        self.registry.cancel_all();
    }
}
