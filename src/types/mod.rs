//! Core types for Ljudmonitor

mod calibration;
mod event;
mod history;
mod output;
mod phase;
mod reason;
mod session;
mod state;

pub use calibration::CalibrationRecord;
pub use event::MonitorEvent;
pub use history::HistorySample;
pub use output::{format_duration, LevelBand, StreakView, TickOutput};
pub use phase::{BaseThresholds, Phase, PhaseAdjustments};
pub use reason::ReasonCode;
pub use session::{PhaseDuration, PhaseInterval, SessionSummary};
pub use state::StreakStatus;
