//! Running statistics over raw levels

/// Sum, count, peak and over-threshold count for one session
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsAccumulator {
    samples: u64,
    sum: f64,
    peak: f64,
    over: u64,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, level: f64, threshold: f64) {
        self.samples += 1;
        self.sum += level;
        self.peak = self.peak.max(level);
        if level > threshold {
            self.over += 1;
        }
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn peak(&self) -> f64 {
        self.peak
    }

    pub fn over_count(&self) -> u64 {
        self.over
    }

    pub fn average(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.sum / self.samples as f64
        }
    }

    /// Share of samples over threshold, 0-100
    pub fn over_percent(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.over as f64 / self.samples as f64 * 100.0
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats() {
        let s = StatsAccumulator::new();
        assert_eq!(s.average(), 0.0);
        assert_eq!(s.over_percent(), 0.0);
        assert_eq!(s.peak(), 0.0);
    }

    #[test]
    fn test_accumulates() {
        let mut s = StatsAccumulator::new();
        for level in [20.0, 40.0, 70.0, 90.0] {
            s.record(level, 65.0);
        }
        assert_eq!(s.samples(), 4);
        assert_eq!(s.average(), 55.0);
        assert_eq!(s.peak(), 90.0);
        assert_eq!(s.over_count(), 2);
        assert_eq!(s.over_percent(), 50.0);
    }

    #[test]
    fn test_equal_to_threshold_is_not_over() {
        let mut s = StatsAccumulator::new();
        s.record(65.0, 65.0);
        assert_eq!(s.over_count(), 0);
    }
}
