//! Device capability tiering from ambient host signals

use std::fmt;

use serde::Serialize;

const DEFAULT_CORES: u32 = 4;
const DEFAULT_MEMORY_GB: f64 = 4.0;
const SLOW_CONNECTIONS: &[&str] = &["slow-2g", "2g", "3g"];

/// Coarse device capability class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceTier {
    Low,
    Mid,
    High,
}

impl DeviceTier {
    /// Classify signals; low conditions are checked before high
    pub fn classify(signals: &DeviceSignals) -> Self {
        let cores = signals.cores();
        let memory_gb = signals.memory_gb();
        let constrained_network = signals
            .network
            .as_ref()
            .is_some_and(|n| n.save_data || n.is_slow());

        if constrained_network || cores <= 3 || memory_gb <= 2.0 {
            DeviceTier::Low
        } else if cores >= 8 && memory_gb >= 6.0 {
            DeviceTier::High
        } else {
            DeviceTier::Mid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceTier::Low => "low",
            DeviceTier::Mid => "mid",
            DeviceTier::High => "high",
        }
    }
}

impl fmt::Display for DeviceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network information, when the host exposes it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkInfo {
    pub save_data: bool,
    pub effective_type: Option<String>,
}

impl NetworkInfo {
    pub fn is_slow(&self) -> bool {
        self.effective_type
            .as_deref()
            .map(|t| t.trim().to_ascii_lowercase())
            .is_some_and(|t| SLOW_CONNECTIONS.contains(&t.as_str()))
    }
}

/// Raw capability hints; `None` means the host does not report it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceSignals {
    pub cores: Option<u32>,
    pub memory_gb: Option<f64>,
    pub network: Option<NetworkInfo>,
}

impl DeviceSignals {
    /// Logical cores, 4 when unknown
    pub fn cores(&self) -> u32 {
        self.cores.filter(|c| *c > 0).unwrap_or(DEFAULT_CORES)
    }

    /// Device memory in GB, 4 when unknown
    pub fn memory_gb(&self) -> f64 {
        self.memory_gb
            .filter(|m| m.is_finite() && *m > 0.0)
            .unwrap_or(DEFAULT_MEMORY_GB)
    }
}

/// Source of device signals
pub trait SignalsProvider {
    fn signals(&self) -> DeviceSignals;
}

/// Fixed signals
impl SignalsProvider for DeviceSignals {
    fn signals(&self) -> DeviceSignals {
        self.clone()
    }
}

/// Host introspection with optional configured overrides
#[derive(Debug, Clone, Default)]
pub struct HostSignals {
    pub cores: Option<u32>,
    pub memory_gb: Option<f64>,
    pub save_data: Option<bool>,
    pub effective_type: Option<String>,
}

impl SignalsProvider for HostSignals {
    fn signals(&self) -> DeviceSignals {
        let cores = self.cores.or_else(|| {
            std::thread::available_parallelism()
                .ok()
                .and_then(|n| u32::try_from(n.get()).ok())
        });

        // Network information only exists when something was configured
        let network = if self.save_data.is_some() || self.effective_type.is_some() {
            Some(NetworkInfo {
                save_data: self.save_data.unwrap_or(false),
                effective_type: self.effective_type.clone(),
            })
        } else {
            None
        };

        DeviceSignals {
            cores,
            memory_gb: self.memory_gb,
            network,
        }
    }
}

/// Estimate the tier from whatever the provider currently reports
pub fn estimate_device_tier<P: SignalsProvider + ?Sized>(provider: &P) -> DeviceTier {
    DeviceTier::classify(&provider.signals())
}
