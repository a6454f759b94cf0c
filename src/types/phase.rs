//! Classroom phases and their per-phase threshold settings

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::types::ReasonCode;
use crate::{DEFAULT_DISCUSSION_THRESHOLD, DEFAULT_QUIET_THRESHOLD};

/// The activity mode the classroom is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No phase selected; the manual slider decides
    #[default]
    None,
    /// Teacher speaking; never enforced
    Lecture,
    /// Individual quiet work
    Quiet,
    /// Group discussion
    Discussion,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::None, Phase::Lecture, Phase::Quiet, Phase::Discussion];

    /// Stable identifier used on the wire and in persisted data
    pub fn id(&self) -> &'static str {
        match self {
            Phase::None => "none",
            Phase::Lecture => "lecture",
            Phase::Quiet => "quiet",
            Phase::Discussion => "discussion",
        }
    }

    /// Human label used in session summaries
    pub fn label(&self) -> &'static str {
        match self {
            Phase::None => "No phase",
            Phase::Lecture => "Lecture",
            Phase::Quiet => "Quiet work",
            Phase::Discussion => "Discussion",
        }
    }

    /// Compact index for the history ring
    pub(crate) fn index(&self) -> u8 {
        match self {
            Phase::None => 0,
            Phase::Lecture => 1,
            Phase::Quiet => 2,
            Phase::Discussion => 3,
        }
    }

    pub(crate) fn from_index(index: u8) -> Phase {
        match index {
            1 => Phase::Lecture,
            2 => Phase::Quiet,
            3 => Phase::Discussion,
            _ => Phase::None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Phase {
    type Err = ReasonCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|p| p.id().eq_ignore_ascii_case(s.trim()))
            .ok_or(ReasonCode::M302_UNKNOWN_PHASE)
    }
}

/// Base thresholds per phase (fixed defaults or calibration-derived).
///
/// Only `quiet` and `discussion` are enforced. `lecture` is kept for display
/// when a calibration suggested one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseThresholds {
    pub quiet: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lecture: Option<f64>,
    pub discussion: f64,
}

impl Default for BaseThresholds {
    fn default() -> Self {
        Self {
            quiet: DEFAULT_QUIET_THRESHOLD,
            lecture: None,
            discussion: DEFAULT_DISCUSSION_THRESHOLD,
        }
    }
}

impl BaseThresholds {
    /// Enforced base for a phase, if any
    pub fn get(&self, phase: Phase) -> Option<f64> {
        match phase {
            Phase::Quiet => Some(self.quiet),
            Phase::Discussion => Some(self.discussion),
            Phase::Lecture | Phase::None => None,
        }
    }
}

/// User fine-tune offsets per phase, independent of calibration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseAdjustments {
    #[serde(default)]
    pub quiet: i32,
    #[serde(default)]
    pub lecture: i32,
    #[serde(default)]
    pub discussion: i32,
}

impl PhaseAdjustments {
    pub fn get(&self, phase: Phase) -> i32 {
        match phase {
            Phase::Quiet => self.quiet,
            Phase::Lecture => self.lecture,
            Phase::Discussion => self.discussion,
            Phase::None => 0,
        }
    }

    /// Set the offset for a phase; `none` carries no adjustment
    pub fn set(&mut self, phase: Phase, offset: i32) -> Result<(), ReasonCode> {
        match phase {
            Phase::Quiet => self.quiet = offset,
            Phase::Lecture => self.lecture = offset,
            Phase::Discussion => self.discussion = offset,
            Phase::None => return Err(ReasonCode::M303_PHASE_NOT_ADJUSTABLE),
        }
        Ok(())
    }
}
