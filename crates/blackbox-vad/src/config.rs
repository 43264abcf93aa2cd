use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_SILENCE_DURATION_MS, DEFAULT_SILENCE_THRESHOLD};
use crate::energy::EnergyMetric;

/// Tuning for the silence tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SilenceConfig {
    /// Amplitude below which a frame counts as silent, in raw sample
    /// units. Calibrate per microphone/room; there is no universal value.
    pub threshold: u16,
    /// Continuous sub-threshold time required to end a recording.
    pub silence_duration_ms: u32,
    /// Which energy estimator drives the threshold comparison.
    pub energy_metric: EnergyMetric,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SILENCE_THRESHOLD,
            silence_duration_ms: DEFAULT_SILENCE_DURATION_MS,
            energy_metric: EnergyMetric::default(),
        }
    }
}

impl SilenceConfig {
    pub fn silence_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.silence_duration_ms as u64)
    }
}
