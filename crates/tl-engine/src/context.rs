//! The audio context: shared output clock and destination.
//!
//! Everything that touches the hardware timeline goes through
//! [`AudioContext`]. Contexts are opened lazily through a
//! [`ContextProvider`], because platforms may refuse to produce sound
//! until the user has interacted with the application.

use thiserror::Error;
use tl_ir::{ClockTime, PulseBuffer};

/// Error opening or using an audio context.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The platform refuses to start audio before a user gesture.
    #[error("audio is locked until the user interacts")]
    Locked,
    /// No output device, or the stream could not be built.
    #[error("audio output unavailable: {0}")]
    Unavailable(String),
    /// A fixed-size table or queue is full.
    #[error("{what} capacity exhausted (max {max})")]
    Capacity { what: &'static str, max: usize },
}

/// Handle to a gain node connected to the context's destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GainId(pub usize);

/// Handle to a sine oscillator owned by the context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OscillatorId(pub usize);

/// The shared hardware clock plus the node operations the engine needs.
///
/// Scheduling calls only register work with the output; none of them
/// block. Nodes are never destroyed, matching the lifetime of voices.
pub trait AudioContext {
    /// Output sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Current position of the output timeline. Monotonic.
    fn now(&self) -> ClockTime;

    /// Create a gain node wired to the destination.
    fn create_gain(&mut self, gain: f32) -> Result<GainId, ContextError>;

    /// Play `buffer` once through `gain`, starting at `at`.
    ///
    /// Times at or before [`now`](Self::now) play as soon as possible.
    /// Fails with [`ContextError::Capacity`] if the playback cannot be
    /// queued; nothing is played in that case.
    fn play_buffer(
        &mut self,
        buffer: &PulseBuffer,
        gain: GainId,
        at: ClockTime,
    ) -> Result<(), ContextError>;

    /// Create a stopped sine oscillator feeding `gain`.
    fn create_oscillator(
        &mut self,
        frequency: f64,
        gain: GainId,
    ) -> Result<OscillatorId, ContextError>;

    fn start_oscillator(&mut self, osc: OscillatorId);

    fn stop_oscillator(&mut self, osc: OscillatorId);

    /// Change frequency without restarting; phase stays continuous.
    fn set_oscillator_frequency(&mut self, osc: OscillatorId, frequency: f64);
}

/// Opens the audio context on first use.
pub trait ContextProvider {
    type Context: AudioContext;

    /// Try to open the context. Failing with [`ContextError::Locked`] is
    /// expected until the user has interacted; callers must not retry on
    /// their own.
    fn open(&mut self) -> Result<Self::Context, ContextError>;
}
