//! Level acquisition adapters
//!
//! The engine asks a [`LevelSource`] for one raw energy value per tick. Device
//! capture lives outside this crate; these adapters cover pushed values,
//! scripted replays and a simulated classroom.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::ReasonCode;

/// Something that yields raw energy (RMS, ≥ 0) on request
pub trait LevelSource: Send {
    fn raw_energy(&mut self) -> Result<f64, ReasonCode>;
}

// NaN bit pattern; `push` only ever stores finite values
const NO_VALUE: u64 = u64::MAX;

/// Latest-value source fed by an external producer.
///
/// Clones share the same slot, so one clone can live in the engine while
/// another is handed to the capture thread or HTTP handler.
#[derive(Debug, Clone)]
pub struct PushSource {
    slot: Arc<AtomicU64>,
}

impl Default for PushSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PushSource {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(AtomicU64::new(NO_VALUE)),
        }
    }

    /// Publish the newest raw energy; negatives and NaN are stored as 0
    pub fn push(&self, raw_energy: f64) {
        let value = if raw_energy.is_finite() { raw_energy.max(0.0) } else { 0.0 };
        self.slot.store(value.to_bits(), Ordering::Release);
    }

    /// Mark the input as gone (device unplugged)
    pub fn disconnect(&self) {
        self.slot.store(NO_VALUE, Ordering::Release);
    }
}

impl LevelSource for PushSource {
    fn raw_energy(&mut self) -> Result<f64, ReasonCode> {
        match self.slot.load(Ordering::Acquire) {
            NO_VALUE => Err(ReasonCode::M200_ACQUISITION_UNAVAILABLE),
            bits => Ok(f64::from_bits(bits)),
        }
    }
}

/// Replays a fixed sequence, then reports unavailable
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    values: VecDeque<f64>,
}

impl ScriptedSource {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl LevelSource for ScriptedSource {
    fn raw_energy(&mut self) -> Result<f64, ReasonCode> {
        self.values
            .pop_front()
            .ok_or(ReasonCode::M200_ACQUISITION_UNAVAILABLE)
    }
}

/// Random classroom noise: a wandering ambient floor with occasional bursts
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    rng: StdRng,
    ambient: f64,
    burst_ticks: u32,
}

impl SimulatedSource {
    /// Ambient energy roughly 0.002 (≈26 dB uncalibrated)
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ambient: 0.002,
            burst_ticks: 0,
        }
    }
}

impl LevelSource for SimulatedSource {
    fn raw_energy(&mut self) -> Result<f64, ReasonCode> {
        // Random walk of the ambient floor, kept within a plausible band
        let drift: f64 = self.rng.gen_range(-0.0003..0.0003);
        self.ambient = (self.ambient + drift).clamp(0.0005, 0.02);

        if self.burst_ticks == 0 && self.rng.gen_bool(0.04) {
            self.burst_ticks = self.rng.gen_range(1..12);
        }

        let jitter: f64 = self.rng.gen_range(0.7..1.3);
        if self.burst_ticks > 0 {
            self.burst_ticks -= 1;
            let burst: f64 = self.rng.gen_range(0.05..0.4);
            Ok(burst * jitter)
        } else {
            Ok(self.ambient * jitter)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_source_unavailable_until_pushed() {
        let mut source = PushSource::new();
        assert_eq!(source.raw_energy(), Err(ReasonCode::M200_ACQUISITION_UNAVAILABLE));

        let producer = source.clone();
        producer.push(0.25);
        assert_eq!(source.raw_energy(), Ok(0.25));
        // Latest value persists until replaced
        assert_eq!(source.raw_energy(), Ok(0.25));

        producer.push(-1.0);
        assert_eq!(source.raw_energy(), Ok(0.0));

        producer.disconnect();
        assert!(source.raw_energy().is_err());
    }

    #[test]
    fn test_scripted_source_drains() {
        let mut source = ScriptedSource::new([0.1, 0.2]);
        assert_eq!(source.raw_energy(), Ok(0.1));
        assert_eq!(source.raw_energy(), Ok(0.2));
        assert_eq!(source.remaining(), 0);
        assert!(source.raw_energy().is_err());
    }

    #[test]
    fn test_simulated_source_is_seeded() {
        let mut a = SimulatedSource::new(7);
        let mut b = SimulatedSource::new(7);
        for _ in 0..200 {
            let x = a.raw_energy().unwrap();
            assert_eq!(Ok(x), b.raw_energy());
            assert!(x >= 0.0);
        }
    }
}
