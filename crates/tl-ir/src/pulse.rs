//! Click waveforms for pulse voices.
//!
//! A click is a 4 ms sine burst with an exponential decay. Two pitch
//! classes exist so that two voices of a polyrhythm stay distinguishable.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::f64::consts::TAU;

/// Length of every click, in seconds.
pub const CLICK_DURATION_SECS: f64 = 0.004;

/// Peak amplitude of the click before the gain node.
pub const CLICK_AMPLITUDE: f64 = 0.35;

/// Decay time constant as a fraction of the click duration.
const DECAY_FRACTION: f64 = 0.3;

/// Timbre of a pulse voice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PitchClass {
    /// Accent click, 1500 Hz.
    High,
    /// Plain click, 1000 Hz.
    Low,
}

impl PitchClass {
    /// Map the `is_high` flag used by lesson pages.
    pub const fn from_accent(is_high: bool) -> Self {
        if is_high {
            PitchClass::High
        } else {
            PitchClass::Low
        }
    }

    /// Carrier frequency of the burst in Hz.
    pub const fn frequency(self) -> f64 {
        match self {
            PitchClass::High => 1500.0,
            PitchClass::Low => 1000.0,
        }
    }
}

/// An immutable mono click waveform.
///
/// Cloning is cheap and shares the sample data, so a voice can hand the
/// same buffer to every playback it schedules.
#[derive(Clone, Debug)]
pub struct PulseBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
    pitch: PitchClass,
}

impl PulseBuffer {
    /// Sample data.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample at `index`, or silence past the end.
    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        self.samples.get(index).copied().unwrap_or(0.0)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the buffer holds no samples (sample rate too low).
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample rate the buffer was synthesized for.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Pitch class the buffer was synthesized for.
    pub fn pitch(&self) -> PitchClass {
        self.pitch
    }

    /// True if both handles point at the same synthesized data.
    pub fn ptr_eq(&self, other: &PulseBuffer) -> bool {
        Arc::ptr_eq(&self.samples, &other.samples)
    }
}

/// Synthesize the click for `pitch` at `sample_rate`.
///
/// `x[i] = sin(2π f t) · exp(-t / (0.3 · 4 ms)) · 0.35` with `t = i / sample_rate`.
pub fn synthesize(sample_rate: u32, pitch: PitchClass) -> PulseBuffer {
    let rate = sample_rate as f64;
    let len = libm::floor(rate * CLICK_DURATION_SECS) as usize;
    let freq = pitch.frequency();
    let tau = CLICK_DURATION_SECS * DECAY_FRACTION;

    let samples: Vec<f32> = (0..len)
        .map(|i| {
            let t = i as f64 / rate;
            (libm::sin(TAU * freq * t) * libm::exp(-t / tau) * CLICK_AMPLITUDE) as f32
        })
        .collect();

    PulseBuffer {
        samples: samples.into(),
        sample_rate,
        pitch,
    }
}
