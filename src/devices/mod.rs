//! Device enumeration
//!
//! Lists attached cameras and microphones and re-enumerates when the
//! platform reports a hardware change. Enumeration is advisory: failures
//! are logged and degrade to empty lists rather than propagating.

use crate::media::{DeviceInfo, DeviceKind, MediaBackend};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Cameras and microphones currently visible to the platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceLists {
    pub cameras: Vec<DeviceInfo>,
    pub microphones: Vec<DeviceInfo>,
}

/// Pre-permission enumeration may withhold labels; fall back to a
/// truncated identifier so the UI still has something to show.
fn label_or_fallback(device: &DeviceInfo) -> String {
    if !device.label.is_empty() {
        return device.label.clone();
    }
    let short: String = device.device_id.chars().take(4).collect();
    match device.kind {
        DeviceKind::Camera => format!("Camera {short}"),
        DeviceKind::Microphone => format!("Microphone {short}"),
    }
}

fn split_devices(devices: Vec<DeviceInfo>) -> DeviceLists {
    let mut lists = DeviceLists::default();
    for mut device in devices {
        device.label = label_or_fallback(&device);
        match device.kind {
            DeviceKind::Camera => lists.cameras.push(device),
            DeviceKind::Microphone => lists.microphones.push(device),
        }
    }
    lists
}

/// Lists capture hardware through the platform backend.
pub struct DeviceEnumerator {
    backend: Arc<dyn MediaBackend>,
}

impl DeviceEnumerator {
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self { backend }
    }

    /// Enumerate once. Errors degrade to empty lists.
    pub async fn list(&self) -> DeviceLists {
        match self.backend.enumerate_devices().await {
            Ok(devices) => split_devices(devices),
            Err(err) => {
                tracing::warn!("failed to enumerate devices: {err:#}");
                DeviceLists::default()
            }
        }
    }

    /// Enumerate now and re-enumerate on every hot-plug notification.
    /// The watcher unsubscribes when dropped.
    pub async fn watch(&self) -> DeviceWatcher {
        let (tx, rx) = watch::channel(self.list().await);
        let backend = Arc::clone(&self.backend);
        let mut changes = backend.device_changes();

        let task = tokio::spawn(async move {
            let enumerator = DeviceEnumerator::new(backend);
            loop {
                match changes.recv().await {
                    Ok(()) | Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                        tracing::debug!("device change reported, re-enumerating");
                        if tx.send(enumerator.list().await).is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        DeviceWatcher { rx, task }
    }
}

/// Live view of the device lists, refreshed on hot-plug.
pub struct DeviceWatcher {
    rx: watch::Receiver<DeviceLists>,
    task: JoinHandle<()>,
}

impl DeviceWatcher {
    /// Current device lists.
    pub fn lists(&self) -> DeviceLists {
        self.rx.borrow().clone()
    }

    /// Wait until the lists have been refreshed.
    pub async fn changed(&mut self) {
        let _ = self.rx.changed().await;
    }
}

impl Drop for DeviceWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, label: &str, kind: DeviceKind) -> DeviceInfo {
        DeviceInfo {
            device_id: id.to_string(),
            label: label.to_string(),
            kind,
        }
    }

    #[test]
    fn test_split_devices_by_kind() {
        let lists = split_devices(vec![
            device("cam-1", "FaceTime HD", DeviceKind::Camera),
            device("mic-1", "Built-in Mic", DeviceKind::Microphone),
            device("mic-2", "USB Mic", DeviceKind::Microphone),
        ]);
        assert_eq!(lists.cameras.len(), 1);
        assert_eq!(lists.microphones.len(), 2);
    }

    #[test]
    fn test_label_falls_back_to_truncated_id() {
        let lists = split_devices(vec![
            device("abcdef123", "", DeviceKind::Camera),
            device("xy", "", DeviceKind::Microphone),
        ]);
        assert_eq!(lists.cameras[0].label, "Camera abcd");
        assert_eq!(lists.microphones[0].label, "Microphone xy");
    }
}
