//! Exponential moving average for the displayed level
//!
//! The smoothed value is for display and history only. Threshold checks and
//! statistics always use the raw level.

/// `alpha * raw + (1 - alpha) * prev`
pub fn smooth(prev: f64, raw: f64, alpha: f64) -> f64 {
    alpha * raw + (1.0 - alpha) * prev
}

/// Stateful smoother holding the previous output
#[derive(Debug, Clone)]
pub struct LevelSmoother {
    alpha: f64,
    value: Option<f64>,
}

impl LevelSmoother {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            value: None,
        }
    }

    /// Feed one raw level; the first sample seeds the filter
    pub fn update(&mut self, raw: f64) -> f64 {
        let next = match self.value {
            Some(prev) => smooth(prev, raw, self.alpha),
            None => raw,
        };
        self.value = Some(next);
        next
    }

    pub fn value(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}
