//! Keyed cache of opened logical devices.
//!
//! The registry guarantees at most one [`LogicalDevice`] per [`DeviceKey`],
//! even under concurrent open requests: every lookup-or-create runs inside a
//! single mutex, including the factory call.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use antpulse_types::DeviceKey;

use crate::device::{LogicalDevice, SharedDevice};
use crate::error::Result;

/// Registry of logical devices keyed by sensor identity.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Mutex<HashMap<DeviceKey, SharedDevice>>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the device for `key`, creating it with `factory` if absent.
    ///
    /// If `factory` fails, nothing is inserted, the error is logged and
    /// `None` is returned. `factory` is never called when `key` is present.
    pub async fn get_or_create<F>(&self, key: DeviceKey, factory: F) -> Option<SharedDevice>
    where
        F: FnOnce() -> Result<LogicalDevice>,
    {
        let mut devices = self.devices.lock().await;

        if let Some(existing) = devices.get(&key) {
            debug!("Found existing heart-rate device {}", key);
            return Some(Arc::clone(existing));
        }

        match factory() {
            Ok(device) => {
                let device = Arc::new(device);
                devices.insert(key, Arc::clone(&device));
                info!("Registered heart-rate device {}", key);
                Some(device)
            }
            Err(e) => {
                warn!("Unable to open heart-rate device {}: {}", key, e);
                None
            }
        }
    }

    /// Get the device for `key` without creating it.
    pub async fn get(&self, key: DeviceKey) -> Option<SharedDevice> {
        self.devices.lock().await.get(&key).cloned()
    }

    /// Whether a device is registered for `key`.
    pub async fn contains(&self, key: DeviceKey) -> bool {
        self.devices.lock().await.contains_key(&key)
    }

    /// Number of registered devices.
    pub async fn len(&self) -> usize {
        self.devices.lock().await.len()
    }

    /// Whether the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.devices.lock().await.is_empty()
    }

    /// Keys of all registered devices, sorted.
    pub async fn keys(&self) -> Vec<DeviceKey> {
        let mut keys: Vec<_> = self.devices.lock().await.keys().copied().collect();
        keys.sort();
        keys
    }

    /// Remove every device, returning how many were removed.
    ///
    /// Devices still referenced by callers stay alive until those references
    /// are dropped.
    pub async fn clear(&self) -> usize {
        let mut devices = self.devices.lock().await;
        let count = devices.len();
        devices.clear();
        count
    }

    /// Remove and return every device, sorted by key.
    pub async fn drain(&self) -> Vec<SharedDevice> {
        let mut devices: Vec<_> = self.devices.lock().await.drain().collect();
        devices.sort_by_key(|(key, _)| *key);
        devices.into_iter().map(|(_, device)| device).collect()
    }
}
