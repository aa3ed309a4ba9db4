//! Adaptive render window for the virtualized journal list
//!
//! The initial and incremental item counts start from a device-tier baseline
//! and are nudged by the p75 of recently recorded render durations.

pub mod device;
pub mod metrics;

pub use device::{estimate_device_tier, DeviceSignals, DeviceTier, HostSignals, NetworkInfo, SignalsProvider};
pub use metrics::{RenderSample, METRIC_CAPACITY};

use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

use crate::store::KeyValueStore;

/// Storage key of the persisted render metric log
pub const METRICS_KEY: &str = "vitalita.journal.render-metrics";

/// Fewer valid samples than this keeps the tier baseline
pub const MIN_SAMPLES: usize = 5;

const MIN_INITIAL: usize = 8;
const MIN_STEP: usize = 8;
const MAX_INITIAL: usize = 28;
const MAX_STEP: usize = 24;

/// Virtualization parameters: items shown first, items added per load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowConfig {
    pub initial: usize,
    pub step: usize,
}

impl WindowConfig {
    pub fn baseline(tier: DeviceTier) -> Self {
        match tier {
            DeviceTier::Low => Self { initial: 10, step: 10 },
            DeviceTier::Mid => Self { initial: 16, step: 14 },
            DeviceTier::High => Self { initial: 24, step: 20 },
        }
    }

    /// Apply the p75 bands; first matching band wins
    pub fn adjusted(self, p75_ms: f64) -> Self {
        if p75_ms >= 70.0 {
            Self {
                initial: self.initial.saturating_sub(8).max(MIN_INITIAL),
                step: self.step.saturating_sub(6).max(MIN_STEP),
            }
        } else if p75_ms >= 45.0 {
            Self {
                initial: self.initial.saturating_sub(4).max(MIN_INITIAL),
                step: self.step.saturating_sub(4).max(MIN_STEP),
            }
        } else if p75_ms <= 20.0 {
            Self {
                initial: (self.initial + 4).min(MAX_INITIAL),
                step: (self.step + 4).min(MAX_STEP),
            }
        } else {
            self
        }
    }
}

/// Records render durations and recommends window sizes
pub struct WindowTuner<S, P> {
    store: S,
    signals: P,
}

impl<S: KeyValueStore, P: SignalsProvider> WindowTuner<S, P> {
    pub fn new(store: S, signals: P) -> Self {
        Self { store, signals }
    }

    pub fn device_tier(&self) -> DeviceTier {
        estimate_device_tier(&self.signals)
    }

    /// Append a render duration to the persisted log.
    ///
    /// Durations that are non-finite or not positive after rounding are ignored. Storage failures are
    /// logged and swallowed.
    pub fn record_render_metric(&self, duration_ms: f64) {
        let sample = RenderSample::new(duration_ms, Utc::now().timestamp_millis());
        // Durations that round to zero would be dropped on the next read
        if !sample.is_valid() {
            return;
        }

        let raw = match self.store.read(METRICS_KEY) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("render metric not recorded, store unreadable: {:#}", e);
                return;
            }
        };

        let mut log = raw.as_deref().map(metrics::parse_log).unwrap_or_default();
        metrics::push_sample(&mut log, sample);

        let encoded = match serde_json::to_string(&log) {
            Ok(encoded) => encoded,
            Err(e) => {
                debug!("render metric log not encodable: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.write(METRICS_KEY, &encoded) {
            warn!("render metric not persisted: {:#}", e);
        }
    }

    /// Valid persisted samples, oldest first
    pub fn samples(&self) -> Vec<RenderSample> {
        match self.store.read(METRICS_KEY) {
            Ok(Some(raw)) => metrics::parse_log(&raw),
            Ok(None) => Vec::new(),
            Err(e) => {
                debug!("render metric log unavailable: {:#}", e);
                Vec::new()
            }
        }
    }

    /// Recommended window for the current device and recent render times
    pub fn window_config(&self) -> WindowConfig {
        let tier = self.device_tier();
        let base = WindowConfig::baseline(tier);

        let samples = self.samples();
        if samples.len() < MIN_SAMPLES {
            debug!(%tier, samples = samples.len(), "window baseline, not enough samples");
            return base;
        }

        match metrics::p75(&samples) {
            Some(p75) => {
                let config = base.adjusted(p75);
                debug!(%tier, p75, initial = config.initial, step = config.step, "window tuned");
                config
            }
            None => base,
        }
    }

    /// Start timing a render pass
    pub fn start_timer(&self) -> RenderTimer<'_, S, P> {
        RenderTimer {
            tuner: self,
            started: Instant::now(),
            recorded: false,
        }
    }
}

/// Records the elapsed time of a render pass when finished or dropped
pub struct RenderTimer<'a, S: KeyValueStore, P: SignalsProvider> {
    tuner: &'a WindowTuner<S, P>,
    started: Instant,
    recorded: bool,
}

impl<S: KeyValueStore, P: SignalsProvider> RenderTimer<'_, S, P> {
    /// Record now and return the elapsed milliseconds
    pub fn finish(mut self) -> f64 {
        self.record()
    }

    fn record(&mut self) -> f64 {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        if !self.recorded {
            self.recorded = true;
            self.tuner.record_render_metric(elapsed_ms);
        }
        elapsed_ms
    }
}

impl<S: KeyValueStore, P: SignalsProvider> Drop for RenderTimer<'_, S, P> {
    fn drop(&mut self) {
        self.record();
    }
}

/// Visible item count of a virtualized list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderWindow {
    config: WindowConfig,
    visible: usize,
}

impl RenderWindow {
    pub fn new(config: WindowConfig, total: usize) -> Self {
        Self {
            config,
            visible: config.initial.min(total),
        }
    }

    pub fn visible(&self) -> usize {
        self.visible
    }

    pub fn has_more(&self, total: usize) -> bool {
        self.visible < total
    }

    /// Reveal one more step; returns how many items were added
    pub fn load_more(&mut self, total: usize) -> usize {
        let before = self.visible;
        self.visible = (self.visible + self.config.step).min(total).max(before);
        self.visible - before
    }

    /// Back to the initial window, e.g. after the filter changed
    pub fn reset(&mut self, total: usize) {
        self.visible = self.config.initial.min(total);
    }
}
