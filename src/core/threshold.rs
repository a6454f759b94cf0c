//! Phase/threshold resolver
//!
//! A phase with an enforced base threshold (quiet, discussion) uses
//! `base + adjustment`; every other phase uses the manual slider value.

use crate::types::{BaseThresholds, Phase, PhaseAdjustments, ReasonCode};
use crate::{DEFAULT_MANUAL_THRESHOLD, LEVEL_MAX};

/// Effective threshold for a phase
pub fn effective_threshold(
    phase: Phase,
    manual_threshold: f64,
    base: &BaseThresholds,
    adjustments: &PhaseAdjustments,
) -> f64 {
    match base.get(phase) {
        Some(b) => b + adjustments.get(phase) as f64,
        None => manual_threshold,
    }
}

/// Phase and threshold configuration written by user commands
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSettings {
    phase: Phase,
    manual: f64,
    base: BaseThresholds,
    adjustments: PhaseAdjustments,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self::new(BaseThresholds::default(), PhaseAdjustments::default())
    }
}

impl ThresholdSettings {
    pub fn new(base: BaseThresholds, adjustments: PhaseAdjustments) -> Self {
        Self {
            phase: Phase::None,
            manual: DEFAULT_MANUAL_THRESHOLD,
            base,
            adjustments,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn manual(&self) -> f64 {
        self.manual
    }

    pub fn base(&self) -> &BaseThresholds {
        &self.base
    }

    pub fn adjustments(&self) -> &PhaseAdjustments {
        &self.adjustments
    }

    pub fn effective(&self) -> f64 {
        effective_threshold(self.phase, self.manual, &self.base, &self.adjustments)
    }

    /// Switch phase. Entering a phase with a base overwrites the manual
    /// slider with that base (phase → manual only).
    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        if let Some(b) = self.base.get(phase) {
            self.manual = b;
        }
    }

    /// Move the manual slider. While a based phase is active the effective
    /// threshold does not follow.
    pub fn set_manual(&mut self, value: f64) -> Result<(), ReasonCode> {
        if !value.is_finite() || !(0.0..=LEVEL_MAX).contains(&value) {
            return Err(ReasonCode::M301_INVALID_THRESHOLD);
        }
        self.manual = value;
        Ok(())
    }

    pub fn set_adjustment(&mut self, phase: Phase, offset: i32) -> Result<(), ReasonCode> {
        self.adjustments.set(phase, offset)
    }

    /// Replace base thresholds (after calibration); re-syncs the slider if
    /// the active phase has a base
    pub fn set_base(&mut self, base: BaseThresholds) {
        self.base = base;
        if let Some(b) = self.base.get(self.phase) {
            self.manual = b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolver_rules() {
        let base = BaseThresholds::default();
        let adj = PhaseAdjustments { quiet: 3, lecture: 9, discussion: -5 };
        assert_eq!(effective_threshold(Phase::Quiet, 70.0, &base, &adj), 38.0);
        assert_eq!(effective_threshold(Phase::Discussion, 70.0, &base, &adj), 60.0);
        assert_eq!(effective_threshold(Phase::Lecture, 70.0, &base, &adj), 70.0);
        assert_eq!(effective_threshold(Phase::None, 70.0, &base, &adj), 70.0);
    }

    #[test]
    fn test_phase_switch_overwrites_manual() {
        let mut s = ThresholdSettings::default();
        s.set_manual(50.0).unwrap();
        s.set_phase(Phase::Quiet);
        assert_eq!(s.manual(), 35.0);

        // Lecture keeps whatever the slider last held
        s.set_phase(Phase::Lecture);
        assert_eq!(s.effective(), 35.0);
    }

    #[test]
    fn test_manual_does_not_override_phase() {
        let mut s = ThresholdSettings::default();
        s.set_phase(Phase::Discussion);
        s.set_manual(20.0).unwrap();
        assert_eq!(s.effective(), 65.0);

        s.set_phase(Phase::None);
        s.set_manual(20.0).unwrap();
        assert_eq!(s.effective(), 20.0);
    }

    #[test]
    fn test_manual_rejects_out_of_scale() {
        let mut s = ThresholdSettings::default();
        assert_eq!(s.set_manual(101.0), Err(ReasonCode::M301_INVALID_THRESHOLD));
        assert_eq!(s.set_manual(f64::NAN), Err(ReasonCode::M301_INVALID_THRESHOLD));
        assert_eq!(s.manual(), DEFAULT_MANUAL_THRESHOLD);
    }

    #[test]
    fn test_new_base_resyncs_active_phase() {
        let mut s = ThresholdSettings::default();
        s.set_phase(Phase::Quiet);
        s.set_base(BaseThresholds { quiet: 28.0, lecture: Some(43.0), discussion: 53.0 });
        assert_eq!(s.effective(), 28.0);
        assert_eq!(s.manual(), 28.0);
    }
}
