//! Core modules for Ljudmonitor

pub mod acquisition;
pub mod api;
pub mod calibration;
pub mod command;
pub mod config;
pub mod converter;
pub mod danger;
pub mod history;
pub mod messages;
pub mod monitor;
pub mod runtime;
pub mod session;
pub mod smoothing;
pub mod stats;
pub mod store;
pub mod streak;
pub mod threshold;
pub mod warning;

pub use acquisition::{LevelSource, PushSource, ScriptedSource, SimulatedSource};
pub use api::{create_router, run_server};
pub use calibration::{compute_calibration, today};
pub use command::Command;
pub use config::MonitorConfig;
pub use converter::{rms, to_level};
pub use danger::DangerModel;
pub use history::HistoryBuffer;
pub use messages::{pick_message, FeedbackMood, MessageContext};
pub use monitor::{Monitor, StopOutcome, TickReport};
pub use runtime::{now_ms, LiveUpdate, MonitorHandle, MonitorStatus};
pub use session::Session;
pub use smoothing::LevelSmoother;
pub use stats::StatsAccumulator;
pub use store::{SessionStore, SettingsStore, UserSettings, SESSIONS_FILE, SETTINGS_FILE};
pub use streak::{GraceTimer, StreakMachine};
pub use threshold::{effective_threshold, ThresholdSettings};
pub use warning::WarningGate;
