//! Persisted calibration record

use serde::{Deserialize, Serialize};

use crate::types::BaseThresholds;

/// Outcome of the ambient-noise calibration procedure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    /// Subtracted from raw energy before dB conversion
    pub offset: f64,
    /// Local date of calibration (YYYY-MM-DD)
    pub date: String,
    /// Suggested per-phase base thresholds
    pub thresholds: BaseThresholds,
}

impl CalibrationRecord {
    /// Reject records that cannot have come from a calibration run
    pub fn is_valid(&self) -> bool {
        let in_scale = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
        self.offset.is_finite()
            && self.offset >= 0.0
            && in_scale(self.thresholds.quiet)
            && in_scale(self.thresholds.discussion)
            && self.thresholds.lecture.map_or(true, in_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_roundtrip() {
        let record = CalibrationRecord {
            offset: 0.0009,
            date: "2026-10-16".to_string(),
            thresholds: BaseThresholds { quiet: 30.0, lecture: Some(45.0), discussion: 55.0 },
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: CalibrationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert!(back.is_valid());
    }

    #[test]
    fn test_record_without_lecture() {
        let back: CalibrationRecord = serde_json::from_str(
            r#"{"offset":0.001,"date":"2026-01-01","thresholds":{"quiet":30,"discussion":55}}"#,
        )
        .unwrap();
        assert_eq!(back.thresholds.lecture, None);
    }

    #[test]
    fn test_negative_offset_is_invalid() {
        let record = CalibrationRecord {
            offset: -1.0,
            date: String::new(),
            thresholds: BaseThresholds::default(),
        };
        assert!(!record.is_valid());
    }
}
