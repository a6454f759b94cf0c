//! Streak state definitions

use serde::{Deserialize, Serialize};

/// Where the streak machine currently is.
///
/// `Broken` is not a resting state: a break commits the best duration and
/// immediately restarts in `Running`, so callers observe it as a
/// [`MonitorEvent::StreakBroken`](crate::types::MonitorEvent) instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreakStatus {
    /// No recording
    #[default]
    Idle,
    /// Below threshold, accumulating
    Running,
    /// Over threshold, waiting for the grace check
    Grace,
}

impl StreakStatus {
    /// Get ANSI color code for terminal display
    pub fn color_code(&self) -> &'static str {
        match self {
            StreakStatus::Idle => "\x1b[90m",    // Gray
            StreakStatus::Running => "\x1b[32m", // Green
            StreakStatus::Grace => "\x1b[33m",   // Orange/Yellow
        }
    }

    /// Reset ANSI color
    pub fn color_reset() -> &'static str {
        "\x1b[0m"
    }

    /// Get emoji for state
    pub fn emoji(&self) -> &'static str {
        match self {
            StreakStatus::Idle => "⏸",
            StreakStatus::Running => "🔥",
            StreakStatus::Grace => "⏳",
        }
    }
}

impl std::fmt::Display for StreakStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StreakStatus::Idle => "IDLE",
            StreakStatus::Running => "RUNNING",
            StreakStatus::Grace => "GRACE",
        };
        write!(f, "{}", name)
    }
}
