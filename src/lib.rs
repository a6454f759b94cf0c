//! Ljudmonitor: classroom noise monitor
//!
//! Core sampling and state engine: level acquisition → decibel conversion →
//! smoothing → history / danger / streak / stats → per-tick snapshot.

pub mod core;
pub mod types;

// =============================================================================
// SAMPLING
// =============================================================================

/// Interval between sampling ticks (milliseconds)
pub const SAMPLE_INTERVAL_MS: u64 = 500;

/// Capacity of the history ring (samples)
/// 120 samples at 500 ms = one minute of graph
pub const HISTORY_LENGTH: usize = 120;

/// Exponential smoothing factor for the displayed level
pub const SMOOTHING_ALPHA: f64 = 0.3;

// =============================================================================
// DECIBEL CONVERSION
// =============================================================================

/// Energy floor; adjusted energy below this maps to 0 dB
pub const ENERGY_FLOOR: f64 = 1e-4;

/// Upper bound of the level scale
pub const LEVEL_MAX: f64 = 100.0;

// =============================================================================
// THRESHOLDS
// =============================================================================

/// Manual slider value before any phase or calibration is applied
pub const DEFAULT_MANUAL_THRESHOLD: f64 = 65.0;

/// Base threshold for quiet work until calibrated
pub const DEFAULT_QUIET_THRESHOLD: f64 = 35.0;

/// Base threshold for discussion until calibrated
pub const DEFAULT_DISCUSSION_THRESHOLD: f64 = 65.0;

/// Levels above this fraction of the threshold are shown as "orange"
pub const WARNING_BAND_RATIO: f64 = 0.8;

// =============================================================================
// STREAK & DANGER
// =============================================================================

/// Grace period before an over-threshold sample breaks the streak (milliseconds)
pub const GRACE_MS: u64 = 5000;

/// Danger level added per over-threshold tick
pub const DANGER_RISE: f64 = 0.4;

/// Danger level removed per under-threshold tick
pub const DANGER_FALL: f64 = 0.15;

/// Danger levels below this snap to zero while decaying
pub const DANGER_SNAP: f64 = 0.05;

/// Streak length at which the streak is "on fire" (milliseconds)
pub const ON_FIRE_MS: u64 = 10_000;

/// Additional streak time needed for full aurora intensity (milliseconds)
pub const AURORA_RAMP_MS: u64 = 120_000;

/// Minimum spacing between warning chimes (milliseconds)
pub const WARNING_COOLDOWN_MS: u64 = 5000;

// =============================================================================
// CALIBRATION
// =============================================================================

/// Number of raw samples collected during calibration
pub const CALIBRATION_SAMPLES: usize = 30;

/// Spacing between calibration samples (milliseconds)
pub const CALIBRATION_SPACING_MS: u64 = 100;

/// Fraction of the mean ambient energy kept as the calibration offset
pub const CALIBRATION_OFFSET_FACTOR: f64 = 0.9;

/// Suggested phase thresholds relative to the ambient level (dB)
pub const CALIBRATION_QUIET_MARGIN: f64 = 10.0;
pub const CALIBRATION_LECTURE_MARGIN: f64 = 25.0;
pub const CALIBRATION_DISCUSSION_MARGIN: f64 = 35.0;

// =============================================================================
// SESSIONS
// =============================================================================

/// Sessions with this many samples or fewer produce no summary
pub const MIN_SESSION_SAMPLES: u64 = 5;

/// Number of session summaries kept by the session store
pub const MAX_STORED_SESSIONS: usize = 20;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "2.0.0";
