//! Session summary produced when recording stops

use serde::{Deserialize, Serialize};

use crate::types::{HistorySample, Phase};

/// One entry of the phase log; `end_ms` is open while the phase is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseInterval {
    pub phase: Phase,
    pub start_ms: u64,
    pub end_ms: Option<u64>,
}

impl PhaseInterval {
    pub fn duration_ms(&self, now_ms: u64) -> u64 {
        self.end_ms.unwrap_or(now_ms).saturating_sub(self.start_ms)
    }
}

/// Phase duration as shown in the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseDuration {
    pub phase: Phase,
    pub label: String,
    pub duration_ms: u64,
}

/// Report handed to the session store at recording stop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Session start (RFC 3339)
    pub date: String,
    pub duration_ms: u64,
    pub avg_level: f64,
    pub peak_level: f64,
    pub over_percent: f64,
    pub best_streak_ms: u64,
    pub threshold: f64,
    pub total_samples: u64,
    pub phases: Vec<PhaseDuration>,
    pub history: Vec<HistorySample>,
    /// Free-text note added after the session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection: Option<String>,
}
