//! Streak state machine with grace period
//!
//! State transitions:
//! - IDLE → RUNNING: recording starts
//! - RUNNING → GRACE: sample over threshold (one grace timer scheduled)
//! - GRACE → RUNNING: timer fires, level recovered (streak kept, start unchanged)
//! - GRACE → (broken) → RUNNING: timer fires, still loud; best committed, clock restarts
//! - any → IDLE: recording stops; best finalized
//!
//! Grace timers are tagged with the machine's epoch. Every reset or stop bumps
//! the epoch, so a timer that fires afterwards is a silent no-op.

use log::debug;

use crate::types::{MonitorEvent, StreakStatus, StreakView};

/// Handle for a scheduled grace check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraceTimer {
    epoch: u64,
    seq: u64,
    /// When the check is due (unix ms)
    pub due_ms: u64,
}

/// Streak state machine
#[derive(Debug, Clone)]
pub struct StreakMachine {
    status: StreakStatus,
    /// Start of the current streak
    start_ms: u64,
    /// All-time high-water mark
    best_ms: u64,
    /// Best within the current recording
    session_best_ms: u64,
    /// A break happened since the last sample
    broken: bool,
    grace_ms: u64,
    epoch: u64,
    seq: u64,
    pending: Option<GraceTimer>,
}

impl StreakMachine {
    /// Create an idle machine seeded with a persisted best streak
    pub fn new(grace_ms: u64, best_ms: u64) -> Self {
        Self {
            status: StreakStatus::Idle,
            start_ms: 0,
            best_ms,
            session_best_ms: 0,
            broken: false,
            grace_ms,
            epoch: 0,
            seq: 0,
            pending: None,
        }
    }

    /// Recording started: open a fresh streak
    pub fn start(&mut self, now_ms: u64) -> MonitorEvent {
        self.invalidate();
        self.status = StreakStatus::Running;
        self.start_ms = now_ms;
        self.session_best_ms = 0;
        self.broken = false;
        MonitorEvent::StreakStarted { at_ms: now_ms }
    }

    /// Restart the streak clock (statistics reset); best marks are kept
    pub fn reset(&mut self, now_ms: u64) -> Option<MonitorEvent> {
        if self.status == StreakStatus::Idle {
            return None;
        }
        self.invalidate();
        self.status = StreakStatus::Running;
        self.start_ms = now_ms;
        self.broken = false;
        Some(MonitorEvent::StreakStarted { at_ms: now_ms })
    }

    /// Recording stopped: commit the running streak and go idle.
    /// Returns the best streak of the finished recording.
    pub fn stop(&mut self, now_ms: u64) -> u64 {
        if self.status != StreakStatus::Idle {
            self.commit(now_ms.saturating_sub(self.start_ms));
        }
        self.invalidate();
        self.status = StreakStatus::Idle;
        self.broken = false;
        self.session_best_ms
    }

    /// Feed one sample's threshold comparison.
    ///
    /// Returns a timer to schedule when the machine enters grace.
    pub fn on_sample(&mut self, now_ms: u64, over_threshold: bool) -> Option<(MonitorEvent, GraceTimer)> {
        self.broken = false;
        match (self.status, over_threshold) {
            (StreakStatus::Running, true) => {
                self.seq += 1;
                let timer = GraceTimer {
                    epoch: self.epoch,
                    seq: self.seq,
                    due_ms: now_ms.saturating_add(self.grace_ms),
                };
                self.pending = Some(timer);
                self.status = StreakStatus::Grace;
                Some((MonitorEvent::GraceStarted { at_ms: now_ms, due_ms: timer.due_ms }, timer))
            }
            // Idle ignores samples; a second loud sample in grace is a no-op;
            // a quiet sample in grace waits for the timer to decide.
            _ => None,
        }
    }

    /// Grace timer fired. `still_over` must reflect the level at fire time.
    pub fn on_grace_expired(&mut self, timer: GraceTimer, now_ms: u64, still_over: bool) -> Option<MonitorEvent> {
        if self.pending != Some(timer) {
            debug!("ignoring stale grace timer (epoch {} vs {})", timer.epoch, self.epoch);
            return None;
        }
        self.pending = None;
        self.status = StreakStatus::Running;

        if !still_over {
            return Some(MonitorEvent::StreakRecovered { at_ms: now_ms });
        }

        let duration_ms = now_ms.saturating_sub(self.start_ms);
        self.commit(duration_ms);
        self.broken = true;
        self.start_ms = now_ms;
        Some(MonitorEvent::StreakBroken {
            at_ms: now_ms,
            duration_ms,
            best_ms: self.best_ms,
        })
    }

    /// Pending grace timer, if any
    pub fn pending(&self) -> Option<GraceTimer> {
        self.pending
    }

    /// Pending grace timer if it is due at `now_ms`
    pub fn due(&self, now_ms: u64) -> Option<GraceTimer> {
        self.pending.filter(|t| t.due_ms <= now_ms)
    }

    pub fn status(&self) -> StreakStatus {
        self.status
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn best_ms(&self) -> u64 {
        self.best_ms
    }

    pub fn session_best_ms(&self) -> u64 {
        self.session_best_ms
    }

    /// Length of the current streak
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        match self.status {
            StreakStatus::Idle => 0,
            _ => now_ms.saturating_sub(self.start_ms),
        }
    }

    pub fn view(&self, now_ms: u64) -> StreakView {
        StreakView {
            active: self.status != StreakStatus::Idle,
            elapsed_ms: self.elapsed_ms(now_ms),
            best_ms: self.best_ms,
        }
    }

    fn commit(&mut self, duration_ms: u64) {
        self.best_ms = self.best_ms.max(duration_ms);
        self.session_best_ms = self.session_best_ms.max(duration_ms);
    }

    fn invalidate(&mut self) {
        self.epoch += 1;
        self.pending = None;
    }
}

// =============================================================================
// TESTS
// =============================================================================
