//! Ambient-noise calibration
//!
//! The room is sampled while quiet; 90% of the mean raw energy becomes the
//! offset and the uncalibrated ambient level anchors suggested thresholds.

use chrono::Local;

use crate::core::converter::to_level;
use crate::types::{BaseThresholds, CalibrationRecord, ReasonCode};
use crate::{
    CALIBRATION_DISCUSSION_MARGIN, CALIBRATION_LECTURE_MARGIN, CALIBRATION_OFFSET_FACTOR,
    CALIBRATION_QUIET_MARGIN, LEVEL_MAX,
};

/// Build a calibration record from collected raw energies
pub fn compute_calibration(samples: &[f64], date: impl Into<String>) -> Result<CalibrationRecord, ReasonCode> {
    let valid: Vec<f64> = samples
        .iter()
        .copied()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .collect();
    if valid.is_empty() {
        return Err(ReasonCode::M401_CALIBRATION_CANCELLED);
    }

    let mean = valid.iter().sum::<f64>() / valid.len() as f64;
    let ambient = to_level(mean, 0.0);
    let suggest = |margin: f64| (ambient + margin).clamp(0.0, LEVEL_MAX);

    Ok(CalibrationRecord {
        offset: mean * CALIBRATION_OFFSET_FACTOR,
        date: date.into(),
        thresholds: BaseThresholds {
            quiet: suggest(CALIBRATION_QUIET_MARGIN),
            lecture: Some(suggest(CALIBRATION_LECTURE_MARGIN)),
            discussion: suggest(CALIBRATION_DISCUSSION_MARGIN),
        },
    })
}

/// Local calendar date, `YYYY-MM-DD`
pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}
