//! Decibel converter: raw energy + calibration offset → level in [0,100]
//!
//! `level = clamp(20 * log10(adjusted / ε), 0, 100)` with
//! `adjusted = max(0, raw - offset)` and ε = 1e-4.

use crate::{ENERGY_FLOOR, LEVEL_MAX};

/// Convert raw energy to a bounded decibel-like level.
///
/// NaN and negative adjusted energies fall to the floor and map to 0.
pub fn to_level(raw_energy: f64, calibration_offset: f64) -> f64 {
    let adjusted = (raw_energy - calibration_offset).max(0.0);
    // NaN compares false, so it lands here too
    if !(adjusted >= ENERGY_FLOOR) {
        return 0.0;
    }
    (20.0 * (adjusted / ENERGY_FLOOR).log10()).clamp(0.0, LEVEL_MAX)
}

/// Root-mean-square of one time-domain frame
pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_bounds() {
        for raw in [0.0, 1e-5, 1e-4, 0.001, 0.01, 0.5, 1.0, 10.0, 1e9] {
            for offset in [0.0, 0.0005, 0.01, 2.0, -1.0] {
                let level = to_level(raw, offset);
                assert!((0.0..=100.0).contains(&level), "raw={raw} offset={offset} → {level}");
            }
        }
    }

    #[test]
    fn test_level_monotonic_in_energy() {
        let offset = 0.0009;
        let mut prev = 0.0;
        for i in 0..2000 {
            let raw = i as f64 * 0.0005;
            let level = to_level(raw, offset);
            assert!(level >= prev);
            prev = level;
        }
    }

    #[test]
    fn test_offset_cancels_to_zero() {
        for o in [0.0, 0.0001, 0.0009, 0.3, 5.0] {
            assert_eq!(to_level(o, o), 0.0);
        }
    }

    #[test]
    fn test_known_values() {
        // 0.001 / 1e-4 = 10 → 20 dB
        assert!((to_level(0.001, 0.0) - 20.0).abs() < 1e-9);
        // 1.0 / 1e-4 = 1e4 → 80 dB
        assert!((to_level(1.0, 0.0) - 80.0).abs() < 1e-9);
        // saturates
        assert_eq!(to_level(100.0, 0.0), 100.0);
    }

    #[test]
    fn test_garbage_inputs_coerced() {
        assert_eq!(to_level(f64::NAN, 0.0), 0.0);
        assert_eq!(to_level(-3.0, 0.0), 0.0);
        assert_eq!(to_level(0.00005, 0.0), 0.0);
    }

    #[test]
    fn test_rms() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-9);
    }
}
