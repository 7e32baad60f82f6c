//! Connectivity signal and best-effort network quality.
//!
//! Only the online/offline flag affects behaviour (it gates starting a
//! session). The richer [`NetworkInfo`] is informational and may be absent on
//! platforms without a network information API.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Optional details about the current connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct NetworkInfo {
    /// Platform classification such as "4g" or "wifi"
    pub effective_type: Option<String>,
    /// Estimated downlink bandwidth in Mbit/s
    pub downlink_mbps: Option<f64>,
    /// Estimated round-trip time in milliseconds
    pub rtt_ms: Option<u32>,
    /// User asked for reduced data usage
    pub save_data: Option<bool>,
}

impl NetworkInfo {
    pub fn quality(&self) -> ConnectionQuality {
        ConnectionQuality::from_downlink(self.downlink_mbps)
    }
}

/// Coarse connection quality derived from downlink bandwidth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum ConnectionQuality {
    Excellent,
    Good,
    Fair,
    Poor,
    Unknown,
}

impl ConnectionQuality {
    /// ≥10 Mbit/s excellent, ≥5 good, ≥1 fair, otherwise poor; missing or zero is unknown.
    pub fn from_downlink(downlink_mbps: Option<f64>) -> Self {
        match downlink_mbps {
            Some(d) if d >= 10.0 => ConnectionQuality::Excellent,
            Some(d) if d >= 5.0 => ConnectionQuality::Good,
            Some(d) if d >= 1.0 => ConnectionQuality::Fair,
            Some(d) if d > 0.0 => ConnectionQuality::Poor,
            _ => ConnectionQuality::Unknown,
        }
    }

    /// Score out of 100 for display.
    pub fn score(&self) -> u8 {
        match self {
            ConnectionQuality::Excellent => 100,
            ConnectionQuality::Good => 75,
            ConnectionQuality::Fair => 50,
            ConnectionQuality::Poor => 25,
            ConnectionQuality::Unknown => 0,
        }
    }
}

/// Reports whether the device is online.
pub trait ConnectivitySignal: Send {
    fn is_online(&self) -> bool;

    /// Richer connection details, when the platform exposes them.
    fn network_info(&self) -> Option<NetworkInfo> {
        None
    }
}

#[derive(Debug, Default)]
struct ConnectivityState {
    online: bool,
    info: Option<NetworkInfo>,
}

/// Connectivity state pushed in by the host on change notifications.
#[derive(Debug, Clone, Default)]
pub struct HostConnectivity {
    state: Arc<Mutex<ConnectivityState>>,
}

impl HostConnectivity {
    pub fn new(online: bool) -> Self {
        let connectivity = Self::default();
        connectivity.set_online(online);
        connectivity
    }

    pub fn online() -> Self {
        Self::new(true)
    }

    pub fn offline() -> Self {
        Self::new(false)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ConnectivityState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_online(&self, online: bool) {
        let mut state = self.lock();
        if state.online != online {
            log::debug!(
                "[Connectivity] {}",
                if online { "Online" } else { "Offline" }
            );
        }
        state.online = online;
    }

    pub fn set_network_info(&self, info: Option<NetworkInfo>) {
        self.lock().info = info;
    }
}

impl ConnectivitySignal for HostConnectivity {
    fn is_online(&self) -> bool {
        self.lock().online
    }

    fn network_info(&self) -> Option<NetworkInfo> {
        self.lock().info.clone()
    }
}
