//! Per-tick snapshot handed to renderers, plus terminal formatting

use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};

use crate::types::Phase;
use crate::{AURORA_RAMP_MS, ON_FIRE_MS, WARNING_BAND_RATIO};

/// Streak part of the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakView {
    pub active: bool,
    pub elapsed_ms: u64,
    pub best_ms: u64,
}

impl StreakView {
    /// Streak has lasted long enough to celebrate
    pub fn on_fire(&self) -> bool {
        self.active && self.elapsed_ms >= ON_FIRE_MS
    }

    /// Aurora intensity in [0,1]; ramps from 0 at 10 s to 1 at 130 s
    pub fn aurora_intensity(&self) -> f64 {
        if !self.on_fire() {
            return 0.0;
        }
        let over = (self.elapsed_ms - ON_FIRE_MS) as f64;
        (over / AURORA_RAMP_MS as f64).clamp(0.0, 1.0)
    }
}

/// Immutable snapshot emitted once per tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickOutput {
    /// Raw (unsmoothed) level used for every comparison
    pub level: f64,
    /// Smoothed level for display
    pub smoothed_level: f64,
    pub effective_threshold: f64,
    pub danger_level: f64,
    pub phase: Phase,
    pub streak: StreakView,
}

impl TickOutput {
    pub fn band(&self) -> LevelBand {
        LevelBand::classify(self.smoothed_level, self.effective_threshold)
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let level = self.band().paint(&format!("{:>3.0} dB", self.smoothed_level));
        let streak = if self.streak.on_fire() {
            format!("🔥 {}", format_duration(self.streak.elapsed_ms)).bright_yellow()
        } else {
            format_duration(self.streak.elapsed_ms).normal()
        };
        format!(
            "{} | threshold={:.0} | phase={} | streak={} | best={} | danger={:.2}",
            level,
            self.effective_threshold,
            self.phase,
            streak,
            format_duration(self.streak.best_ms),
            self.danger_level
        )
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "level={:.1} | smoothed={:.1} | threshold={:.0} | phase={} | streak={}ms | best={}ms | danger={:.2}",
            self.level,
            self.smoothed_level,
            self.effective_threshold,
            self.phase,
            self.streak.elapsed_ms,
            self.streak.best_ms,
            self.danger_level
        )
    }
}

/// Traffic-light band of a level relative to the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelBand {
    Green,
    Orange,
    Red,
}

impl LevelBand {
    pub fn classify(level: f64, threshold: f64) -> Self {
        if level > threshold {
            LevelBand::Red
        } else if level > threshold * WARNING_BAND_RATIO {
            LevelBand::Orange
        } else {
            LevelBand::Green
        }
    }

    fn paint(&self, text: &str) -> ColoredString {
        match self {
            LevelBand::Green => text.green(),
            LevelBand::Orange => text.yellow(),
            LevelBand::Red => text.red().bold(),
        }
    }
}

/// `m:ss`
pub fn format_duration(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(LevelBand::classify(66.0, 65.0), LevelBand::Red);
        assert_eq!(LevelBand::classify(65.0, 65.0), LevelBand::Orange);
        assert_eq!(LevelBand::classify(52.0, 65.0), LevelBand::Green);
        assert_eq!(LevelBand::classify(53.0, 65.0), LevelBand::Orange);
    }

    #[test]
    fn test_aurora_ramp() {
        let mut view = StreakView { active: true, elapsed_ms: 9_999, best_ms: 0 };
        assert!(!view.on_fire());
        assert_eq!(view.aurora_intensity(), 0.0);

        view.elapsed_ms = 70_000;
        assert!(view.on_fire());
        assert!((view.aurora_intensity() - 0.5).abs() < 1e-9);

        view.elapsed_ms = 500_000;
        assert_eq!(view.aurora_intensity(), 1.0);

        view.active = false;
        assert_eq!(view.aurora_intensity(), 0.0);
    }

    #[test]
    fn test_snapshot_wire_shape() {
        let out = TickOutput {
            level: 40.0,
            smoothed_level: 38.5,
            effective_threshold: 35.0,
            danger_level: 0.4,
            phase: Phase::Quiet,
            streak: StreakView { active: true, elapsed_ms: 1500, best_ms: 9000 },
        };
        let json = serde_json::to_value(out).unwrap();
        assert_eq!(json["smoothedLevel"], 38.5);
        assert_eq!(json["effectiveThreshold"], 35.0);
        assert_eq!(json["dangerLevel"], 0.4);
        assert_eq!(json["phase"], "quiet");
        assert_eq!(json["streak"]["elapsedMs"], 1500);
        assert_eq!(json["streak"]["bestMs"], 9000);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(65_999), "1:05");
    }
}
