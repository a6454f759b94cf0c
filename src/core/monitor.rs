//! Sampling orchestrator: the single owner of all mutable monitor state
//!
//! Each tick runs the fixed pipeline
//! convert → smooth → history → threshold → stats → danger → streak → warning.
//! The raw level feeds comparisons and statistics; the smoothed level feeds
//! the display and the history ring.
//!
//! Time is passed in as unix milliseconds, so the engine itself never reads
//! a clock and can be driven deterministically.

use log::{debug, info, warn};

use crate::core::config::MonitorConfig;
use crate::core::converter::to_level;
use crate::core::danger::DangerModel;
use crate::core::history::HistoryBuffer;
use crate::core::session::Session;
use crate::core::smoothing::LevelSmoother;
use crate::core::store::UserSettings;
use crate::core::streak::{GraceTimer, StreakMachine};
use crate::core::threshold::ThresholdSettings;
use crate::core::warning::WarningGate;
use crate::types::{
    BaseThresholds, CalibrationRecord, HistorySample, MonitorEvent, Phase, PhaseAdjustments,
    ReasonCode, SessionSummary, StreakStatus, TickOutput,
};

/// Result of one sampling step
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub output: TickOutput,
    pub events: Vec<MonitorEvent>,
}

/// What a stop produced
#[derive(Debug, Clone, PartialEq)]
pub struct StopOutcome {
    /// `None` when the recording was too short to summarize
    pub summary: Option<SessionSummary>,
    /// All-time best after committing the final streak
    pub best_streak_ms: u64,
}

#[derive(Debug)]
pub struct Monitor {
    config: MonitorConfig,
    thresholds: ThresholdSettings,
    calibration: Option<CalibrationRecord>,
    offset: f64,
    smoother: LevelSmoother,
    history: HistoryBuffer,
    danger: DangerModel,
    streak: StreakMachine,
    warning: WarningGate,
    session: Option<Session>,
    last: Option<TickOutput>,
    acquisition_failing: bool,
    recording_epoch: u64,
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default(), UserSettings::default())
    }
}

impl Monitor {
    /// Build an idle monitor from configuration and persisted settings.
    ///
    /// A persisted calibration that fails validation is discarded.
    pub fn new(config: MonitorConfig, settings: UserSettings) -> Self {
        let calibration = match settings.calibration {
            Some(record) if record.is_valid() => Some(record),
            Some(_) => {
                warn!("{}", ReasonCode::M300_INVALID_CONFIGURATION);
                None
            }
            None => None,
        };
        let (offset, base) = match &calibration {
            Some(record) => (record.offset, record.thresholds),
            None => (0.0, BaseThresholds::default()),
        };

        Self {
            thresholds: ThresholdSettings::new(base, settings.adjustments),
            calibration,
            offset,
            smoother: LevelSmoother::new(config.smoothing_alpha),
            history: HistoryBuffer::new(config.history_length),
            danger: DangerModel::new(),
            streak: StreakMachine::new(config.grace_ms, settings.best_streak_ms),
            warning: WarningGate::new(config.chime_enabled, config.warning_cooldown_ms),
            session: None,
            last: None,
            acquisition_failing: false,
            recording_epoch: 0,
            config,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Bumped on every start and stop; work tied to one recording compares it
    pub fn recording_epoch(&self) -> u64 {
        self.recording_epoch
    }

    // =========================================================================
    // Recording lifecycle
    // =========================================================================

    /// Begin a recording: fresh session, cleared history, streak clock at `now_ms`
    pub fn start_recording(&mut self, now_ms: u64) -> Result<Vec<MonitorEvent>, ReasonCode> {
        if self.is_recording() {
            return Err(ReasonCode::M102_ALREADY_RECORDING);
        }
        self.session = Some(Session::new(now_ms, self.thresholds.phase()));
        self.recording_epoch += 1;
        self.clear_signal();
        self.acquisition_failing = false;
        info!("{}", ReasonCode::M100_RECORDING_STARTED);
        Ok(vec![self.streak.start(now_ms)])
    }

    /// End the recording. Any pending grace timer becomes stale.
    pub fn stop_recording(&mut self, now_ms: u64) -> Result<StopOutcome, ReasonCode> {
        let session = self.session.take().ok_or(ReasonCode::M103_NOT_RECORDING)?;
        self.recording_epoch += 1;
        let session_best = self.streak.stop(now_ms);
        let summary = session.finalize(
            now_ms,
            self.thresholds.effective(),
            session_best,
            self.history.snapshot(),
        );
        if summary.is_none() {
            info!("{}", ReasonCode::M104_PREMATURE_STOP);
        }
        self.danger.reset();
        self.last = None;
        info!("{}", ReasonCode::M101_RECORDING_STOPPED);
        Ok(StopOutcome {
            summary,
            best_streak_ms: self.streak.best_ms(),
        })
    }

    // =========================================================================
    // Sampling
    // =========================================================================

    /// One sampling tick. Acquisition failures count as a zero sample.
    ///
    /// Returns `None` while not recording.
    pub fn tick(&mut self, now_ms: u64, raw: Result<f64, ReasonCode>) -> Option<TickReport> {
        if !self.is_recording() {
            return None;
        }
        let raw = self.accept_raw(raw);

        let level = to_level(raw, self.offset);
        let smoothed = self.smoother.update(level);
        let phase = self.thresholds.phase();
        self.history.push(smoothed, phase, now_ms);

        let threshold = self.thresholds.effective();
        if let Some(session) = self.session.as_mut() {
            session.stats_mut().record(level, threshold);
        }
        let over = level > threshold;
        let danger_level = self.danger.update(over);

        let mut events = Vec::new();
        if let Some((event, timer)) = self.streak.on_sample(now_ms, over) {
            debug!("grace timer armed, due {}", timer.due_ms);
            events.push(event);
        }
        if over && self.warning.try_fire(now_ms) {
            events.push(MonitorEvent::Warning { at_ms: now_ms, level, threshold });
        }

        let output = TickOutput {
            level,
            smoothed_level: smoothed,
            effective_threshold: threshold,
            danger_level,
            phase,
            streak: self.streak.view(now_ms),
        };
        self.last = Some(output);
        Some(TickReport { output, events })
    }

    /// Resolve a grace timer against the level measured at fire time.
    ///
    /// Stale timers (from a stopped or reset streak) are ignored.
    pub fn fire_grace(
        &mut self,
        timer: GraceTimer,
        now_ms: u64,
        raw: Result<f64, ReasonCode>,
    ) -> Option<MonitorEvent> {
        if !self.is_recording() {
            debug!("grace timer fired while idle");
            return None;
        }
        let raw = self.accept_raw(raw);
        let still_over = to_level(raw, self.offset) > self.thresholds.effective();
        let event = self.streak.on_grace_expired(timer, now_ms, still_over)?;
        if let MonitorEvent::StreakBroken { duration_ms, .. } = event {
            info!("streak broken after {} ms", duration_ms);
        }
        Some(event)
    }

    /// Fire any due grace timer, then sample, using one measurement for both
    pub fn step(&mut self, now_ms: u64, raw: Result<f64, ReasonCode>) -> Option<TickReport> {
        let mut fired = None;
        if let Some(timer) = self.streak.due(now_ms) {
            fired = self.fire_grace(timer, now_ms, raw);
        }
        let mut report = self.tick(now_ms, raw)?;
        if let Some(event) = fired {
            report.events.insert(0, event);
        }
        Some(report)
    }

    /// Pending grace timer, if the streak is in grace
    pub fn pending_grace(&self) -> Option<GraceTimer> {
        self.streak.pending()
    }

    fn accept_raw(&mut self, raw: Result<f64, ReasonCode>) -> f64 {
        match raw {
            Ok(value) => {
                if self.acquisition_failing {
                    info!("level acquisition recovered");
                    self.acquisition_failing = false;
                }
                value
            }
            Err(reason) => {
                if !self.acquisition_failing {
                    warn!("{}; sampling zero until it recovers", reason);
                    self.acquisition_failing = true;
                }
                0.0
            }
        }
    }

    // =========================================================================
    // Phase and threshold commands
    // =========================================================================

    /// Switch phase; the session phase log records the change
    pub fn set_phase(&mut self, phase: Phase, now_ms: u64) -> MonitorEvent {
        self.thresholds.set_phase(phase);
        if let Some(session) = self.session.as_mut() {
            session.switch_phase(phase, now_ms);
        }
        let threshold = self.thresholds.effective();
        info!("phase {} (threshold {:.0})", phase.id(), threshold);
        MonitorEvent::PhaseChanged { phase, threshold }
    }

    pub fn set_manual_threshold(&mut self, value: f64) -> Result<f64, ReasonCode> {
        self.thresholds.set_manual(value)?;
        Ok(self.thresholds.effective())
    }

    pub fn set_adjustment(&mut self, phase: Phase, offset: i32) -> Result<PhaseAdjustments, ReasonCode> {
        self.thresholds.set_adjustment(phase, offset)?;
        Ok(*self.thresholds.adjustments())
    }

    pub fn set_chime_enabled(&mut self, enabled: bool) {
        self.warning.set_enabled(enabled);
    }

    pub fn phase(&self) -> Phase {
        self.thresholds.phase()
    }

    pub fn effective_threshold(&self) -> f64 {
        self.thresholds.effective()
    }

    pub fn thresholds(&self) -> &ThresholdSettings {
        &self.thresholds
    }

    // =========================================================================
    // Calibration
    // =========================================================================

    /// Install a calibration: new offset and base thresholds, then a stats reset
    pub fn apply_calibration(&mut self, record: CalibrationRecord, now_ms: u64) -> Result<Vec<MonitorEvent>, ReasonCode> {
        self.install_calibration(record)?;
        Ok(self.reset_stats(now_ms))
    }

    /// Swap in offset and base thresholds without touching the running session
    pub fn install_calibration(&mut self, record: CalibrationRecord) -> Result<(), ReasonCode> {
        if !record.is_valid() {
            return Err(ReasonCode::M300_INVALID_CONFIGURATION);
        }
        self.offset = record.offset;
        self.thresholds.set_base(record.thresholds);
        self.calibration = Some(record);
        info!("{} (offset {:.6})", ReasonCode::M400_CALIBRATION_SAVED, self.offset);
        Ok(())
    }

    pub fn calibration(&self) -> Option<&CalibrationRecord> {
        self.calibration.as_ref()
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Clear history and totals and restart the streak clock; best marks stay
    pub fn reset_stats(&mut self, now_ms: u64) -> Vec<MonitorEvent> {
        self.clear_signal();
        if let Some(session) = self.session.as_mut() {
            session.stats_mut().reset();
        }
        self.last = None;
        self.streak.reset(now_ms).into_iter().collect()
    }

    fn clear_signal(&mut self) {
        self.history.clear();
        self.smoother.reset();
        self.danger.reset();
    }

    // =========================================================================
    // Read side
    // =========================================================================

    /// Latest tick output with the streak clock advanced to `now_ms`
    pub fn snapshot(&self, now_ms: u64) -> Option<TickOutput> {
        self.last.map(|mut out| {
            out.streak = self.streak.view(now_ms);
            out.effective_threshold = self.thresholds.effective();
            out.phase = self.thresholds.phase();
            out
        })
    }

    /// History, oldest first
    pub fn history(&self) -> Vec<HistorySample> {
        self.history.snapshot()
    }

    pub fn streak_status(&self) -> StreakStatus {
        self.streak.status()
    }

    pub fn streak_broken(&self) -> bool {
        self.streak.is_broken()
    }

    pub fn best_streak_ms(&self) -> u64 {
        self.streak.best_ms()
    }

    pub fn danger_level(&self) -> f64 {
        self.danger.level()
    }

    /// Samples recorded in the current session
    pub fn sample_count(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.stats().samples())
    }
}

// =============================================================================
// TESTS
// =============================================================================
