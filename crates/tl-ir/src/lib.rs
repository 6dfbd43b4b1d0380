//! Core value types for the tonelab click-train engine.
//!
//! Everything here is plain data and pure functions: positions on the
//! audio clock, click waveforms, and the small pieces of music theory the
//! lesson pages hand to the engine (pitch names, note durations, slider
//! scales, polyrhythm ratios).
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod clock_time;
mod duration;
mod pitch;
mod polyrhythm;
mod pulse;
mod rate_scale;

pub use clock_time::ClockTime;
pub use duration::{Modifier, NoteDuration, ParseDurationError};
pub use pitch::{NoteName, ParsePitchError, Pitch, A4_HZ};
pub use polyrhythm::{ParseRatioError, Polyrhythm};
pub use pulse::{synthesize, PitchClass, PulseBuffer, CLICK_AMPLITUDE, CLICK_DURATION_SECS};
pub use rate_scale::RateScale;
