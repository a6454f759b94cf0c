//! Danger gradient: rises fast while loud, decays slowly when quiet

use crate::{DANGER_FALL, DANGER_RISE, DANGER_SNAP};

/// One tick of the danger model
pub fn update(danger_level: f64, over_threshold: bool) -> f64 {
    if over_threshold {
        (danger_level + DANGER_RISE).min(1.0)
    } else {
        let next = (danger_level - DANGER_FALL).max(0.0);
        if next < DANGER_SNAP {
            0.0
        } else {
            next
        }
    }
}

/// Danger level holder, recomputed every tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DangerModel {
    level: f64,
}

impl DangerModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn update(&mut self, over_threshold: bool) -> f64 {
        self.level = update(self.level, over_threshold);
        self.level
    }

    pub fn reset(&mut self) {
        self.level = 0.0;
    }
}
