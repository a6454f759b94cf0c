//! Reason codes for commands, recoverable failures and lifecycle outcomes

use serde::{Deserialize, Serialize};

/// Reason codes for everything the monitor reports back to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // M100: Recording lifecycle
    // =========================================================================
    /// Recording started, new session opened
    M100_RECORDING_STARTED,
    /// Recording stopped, session summary produced
    M101_RECORDING_STOPPED,
    /// Start requested while already recording
    M102_ALREADY_RECORDING,
    /// Command requires an active recording
    M103_NOT_RECORDING,
    /// Recording stopped with too few samples for a summary
    M104_PREMATURE_STOP,

    // =========================================================================
    // M200: Acquisition
    // =========================================================================
    /// No input available; the tick falls back to a zero sample
    M200_ACQUISITION_UNAVAILABLE,

    // =========================================================================
    // M300: Configuration
    // =========================================================================
    /// Persisted configuration was malformed and has been discarded
    M300_INVALID_CONFIGURATION,
    /// Threshold outside the level scale
    M301_INVALID_THRESHOLD,
    /// Unknown phase identifier
    M302_UNKNOWN_PHASE,
    /// Phase carries no fine-tune adjustment
    M303_PHASE_NOT_ADJUSTABLE,
    /// Failed to read or write persisted data
    M304_STORAGE_ERROR,
    /// Console input did not match any command
    M305_INVALID_COMMAND,

    // =========================================================================
    // M400: Calibration
    // =========================================================================
    /// Calibration finished and was applied
    M400_CALIBRATION_SAVED,
    /// Recording stopped before any calibration sample was taken
    M401_CALIBRATION_CANCELLED,
    /// A calibration is already running
    M402_CALIBRATION_IN_PROGRESS,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::M100_RECORDING_STARTED => "M100_RECORDING_STARTED",
            Self::M101_RECORDING_STOPPED => "M101_RECORDING_STOPPED",
            Self::M102_ALREADY_RECORDING => "M102_ALREADY_RECORDING",
            Self::M103_NOT_RECORDING => "M103_NOT_RECORDING",
            Self::M104_PREMATURE_STOP => "M104_PREMATURE_STOP",
            Self::M200_ACQUISITION_UNAVAILABLE => "M200_ACQUISITION_UNAVAILABLE",
            Self::M300_INVALID_CONFIGURATION => "M300_INVALID_CONFIGURATION",
            Self::M301_INVALID_THRESHOLD => "M301_INVALID_THRESHOLD",
            Self::M302_UNKNOWN_PHASE => "M302_UNKNOWN_PHASE",
            Self::M303_PHASE_NOT_ADJUSTABLE => "M303_PHASE_NOT_ADJUSTABLE",
            Self::M304_STORAGE_ERROR => "M304_STORAGE_ERROR",
            Self::M305_INVALID_COMMAND => "M305_INVALID_COMMAND",
            Self::M400_CALIBRATION_SAVED => "M400_CALIBRATION_SAVED",
            Self::M401_CALIBRATION_CANCELLED => "M401_CALIBRATION_CANCELLED",
            Self::M402_CALIBRATION_IN_PROGRESS => "M402_CALIBRATION_IN_PROGRESS",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::M100_RECORDING_STARTED => "Recording started",
            Self::M101_RECORDING_STOPPED => "Recording stopped",
            Self::M102_ALREADY_RECORDING => "Already recording",
            Self::M103_NOT_RECORDING => "Not recording",
            Self::M104_PREMATURE_STOP => "Too few samples for a session summary",
            Self::M200_ACQUISITION_UNAVAILABLE => "No audio input available",
            Self::M300_INVALID_CONFIGURATION => "Persisted configuration is invalid",
            Self::M301_INVALID_THRESHOLD => "Threshold must be within 0-100",
            Self::M302_UNKNOWN_PHASE => "Unknown phase",
            Self::M303_PHASE_NOT_ADJUSTABLE => "Phase has no adjustment",
            Self::M304_STORAGE_ERROR => "Failed to access storage",
            Self::M305_INVALID_COMMAND => "Unrecognized command",
            Self::M400_CALIBRATION_SAVED => "Calibration saved",
            Self::M401_CALIBRATION_CANCELLED => "Calibration cancelled",
            Self::M402_CALIBRATION_IN_PROGRESS => "Calibration already running",
        }
    }

    /// True for codes that describe a failed command
    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            Self::M100_RECORDING_STARTED | Self::M101_RECORDING_STOPPED | Self::M400_CALIBRATION_SAVED
        )
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}

impl std::error::Error for ReasonCode {}
