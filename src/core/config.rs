//! Runtime configuration for the monitor

use serde::{Deserialize, Serialize};

use crate::{
    CALIBRATION_SAMPLES, CALIBRATION_SPACING_MS, GRACE_MS, HISTORY_LENGTH, SAMPLE_INTERVAL_MS,
    SMOOTHING_ALPHA, WARNING_COOLDOWN_MS,
};

/// Operator-tunable settings; defaults come from the crate constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Tick period (milliseconds)
    pub sample_interval_ms: u64,
    /// Grace period before a streak breaks (milliseconds)
    pub grace_ms: u64,
    /// History ring capacity
    pub history_length: usize,
    /// Smoothing factor for the displayed level
    pub smoothing_alpha: f64,
    /// Emit warning events while over threshold
    pub chime_enabled: bool,
    /// Minimum spacing between warnings (milliseconds)
    pub warning_cooldown_ms: u64,
    /// Samples collected by one calibration run
    pub calibration_samples: usize,
    /// Spacing between calibration samples (milliseconds)
    pub calibration_spacing_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: SAMPLE_INTERVAL_MS,
            grace_ms: GRACE_MS,
            history_length: HISTORY_LENGTH,
            smoothing_alpha: SMOOTHING_ALPHA,
            chime_enabled: false,
            warning_cooldown_ms: WARNING_COOLDOWN_MS,
            calibration_samples: CALIBRATION_SAMPLES,
            calibration_spacing_ms: CALIBRATION_SPACING_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: MonitorConfig = serde_json::from_str(r#"{"grace_ms": 2000}"#).unwrap();
        assert_eq!(config.grace_ms, 2000);
        assert_eq!(config.sample_interval_ms, 500);
        assert_eq!(config.history_length, 120);
        assert!(!config.chime_enabled);
    }
}
