//! History sample stored in the ring buffer

use serde::{Deserialize, Serialize};

use crate::types::Phase;

/// One smoothed level reading with the phase active when it was taken
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    /// Smoothed level, 0-100
    pub level: f64,
    /// Phase active at sample time
    pub phase: Phase,
    /// Unix timestamp (milliseconds)
    pub timestamp: u64,
}
