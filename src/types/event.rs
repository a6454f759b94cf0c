//! Events raised by the engine during ticks and timer firings

use serde::{Deserialize, Serialize};

use crate::types::Phase;

/// Something noteworthy that happened inside the engine.
///
/// Consumers (chime player, console, websocket) react to these; the engine
/// itself never depends on them being handled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum MonitorEvent {
    /// A new streak clock started
    StreakStarted { at_ms: u64 },
    /// Over threshold while running; grace check scheduled
    GraceStarted { at_ms: u64, due_ms: u64 },
    /// Grace elapsed while still loud; streak committed and restarted
    StreakBroken { at_ms: u64, duration_ms: u64, best_ms: u64 },
    /// Grace elapsed but the level had recovered
    StreakRecovered { at_ms: u64 },
    /// Over threshold with the chime enabled and cooldown elapsed
    Warning { at_ms: u64, level: f64, threshold: f64 },
    /// Phase switched
    PhaseChanged { phase: Phase, threshold: f64 },
}
