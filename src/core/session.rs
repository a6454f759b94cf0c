//! Recording session: phase log, running totals and the final summary

use chrono::{TimeZone, Utc};

use crate::core::stats::StatsAccumulator;
use crate::types::{HistorySample, Phase, PhaseDuration, PhaseInterval, SessionSummary};
use crate::MIN_SESSION_SAMPLES;

/// One recording run
#[derive(Debug, Clone)]
pub struct Session {
    start_ms: u64,
    phases: Vec<PhaseInterval>,
    stats: StatsAccumulator,
}

impl Session {
    /// Open a session; a phase other than `none` opens the first interval
    pub fn new(start_ms: u64, phase: Phase) -> Self {
        let mut session = Self {
            start_ms,
            phases: Vec::new(),
            stats: StatsAccumulator::new(),
        };
        session.open_phase(phase, start_ms);
        session
    }

    pub fn stats(&self) -> &StatsAccumulator {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut StatsAccumulator {
        &mut self.stats
    }

    pub fn phases(&self) -> &[PhaseInterval] {
        &self.phases
    }

    /// Close the open interval and open one for the new phase
    pub fn switch_phase(&mut self, phase: Phase, now_ms: u64) {
        self.close_open(now_ms);
        self.open_phase(phase, now_ms);
    }

    /// Close every interval and build the report.
    ///
    /// Returns `None` when the session is too short to report on.
    pub fn finalize(
        mut self,
        now_ms: u64,
        threshold: f64,
        best_streak_ms: u64,
        history: Vec<HistorySample>,
    ) -> Option<SessionSummary> {
        self.close_open(now_ms);
        if self.stats.samples() <= MIN_SESSION_SAMPLES {
            return None;
        }

        let date = Utc
            .timestamp_millis_opt(self.start_ms as i64)
            .single()
            .map(|d| d.to_rfc3339())
            .unwrap_or_default();

        let phases = self
            .phases
            .iter()
            .map(|p| PhaseDuration {
                phase: p.phase,
                label: p.phase.label().to_string(),
                duration_ms: p.duration_ms(now_ms),
            })
            .collect();

        Some(SessionSummary {
            date,
            duration_ms: now_ms.saturating_sub(self.start_ms),
            avg_level: round1(self.stats.average()),
            peak_level: round1(self.stats.peak()),
            over_percent: self.stats.over_percent().round(),
            best_streak_ms,
            threshold,
            total_samples: self.stats.samples(),
            phases,
            history,
            reflection: None,
        })
    }

    fn open_phase(&mut self, phase: Phase, now_ms: u64) {
        if phase != Phase::None {
            self.phases.push(PhaseInterval {
                phase,
                start_ms: now_ms,
                end_ms: None,
            });
        }
    }

    fn close_open(&mut self, now_ms: u64) {
        if let Some(last) = self.phases.last_mut() {
            if last.end_ms.is_none() {
                last.end_ms = Some(now_ms);
            }
        }
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_samples(session: &mut Session, n: usize, level: f64) {
        for _ in 0..n {
            session.stats_mut().record(level, 65.0);
        }
    }

    #[test]
    fn test_phase_log_intervals() {
        let mut s = Session::new(0, Phase::Lecture);
        s.switch_phase(Phase::None, 1000);
        s.switch_phase(Phase::Quiet, 3000);
        s.switch_phase(Phase::Discussion, 6000);
        let phases = s.phases();
        assert_eq!(phases.len(), 3);
        assert_eq!(phases[0].end_ms, Some(1000));
        assert_eq!(phases[1], PhaseInterval { phase: Phase::Quiet, start_ms: 3000, end_ms: Some(6000) });
        assert_eq!(phases[2].end_ms, None);
    }

    #[test]
    fn test_premature_stop_has_no_summary() {
        let mut s = Session::new(0, Phase::None);
        with_samples(&mut s, 5, 30.0);
        assert!(s.finalize(2500, 65.0, 0, Vec::new()).is_none());
    }

    #[test]
    fn test_summary_closes_open_phase() {
        let mut s = Session::new(1_700_000_000_000, Phase::Quiet);
        with_samples(&mut s, 6, 30.0);
        s.stats_mut().record(70.0, 65.0);
        let summary = s
            .finalize(1_700_000_010_000, 35.0, 4000, Vec::new())
            .unwrap();
        assert_eq!(summary.duration_ms, 10_000);
        assert_eq!(summary.total_samples, 7);
        assert_eq!(summary.peak_level, 70.0);
        assert_eq!(summary.over_percent, 14.0);
        assert_eq!(summary.best_streak_ms, 4000);
        assert_eq!(summary.phases.len(), 1);
        assert_eq!(summary.phases[0].duration_ms, 10_000);
        assert_eq!(summary.phases[0].label, "Quiet work");
        assert!(summary.date.starts_with("2023-11-14"));
    }
}
