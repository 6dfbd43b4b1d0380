//! ClickVoice: scheduling state of one pulse stream.

use tl_ir::{ClockTime, PitchClass, PulseBuffer};

use crate::context::GainId;
use crate::timer::TimerHandle;

slotmap::new_key_type! {
    /// Registry slot of a click voice.
    pub struct VoiceKey;
}

/// Voice lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VoiceState {
    /// Registered but not scheduling.
    #[default]
    Idle,
    /// Scheduling pulses and holding a re-arm timer.
    Running,
}

/// A named, independently controllable pulse stream.
///
/// The buffer and gain node are fixed at creation; everything else is
/// mutated in place by the scheduler.
#[derive(Clone, Debug)]
pub struct ClickVoice {
    id: String,
    pub(crate) state: VoiceState,
    /// Pulses per second, read fresh on every scheduled pulse.
    pub(crate) rate: f64,
    /// Clock time of the next pulse not yet handed to the context.
    pub(crate) next_fire: ClockTime,
    /// Pending re-arm timer, if any.
    pub(crate) rearm: Option<TimerHandle>,
    buffer: PulseBuffer,
    gain: GainId,
    /// Pulses handed to the context since creation.
    pub(crate) pulses: u64,
}

impl ClickVoice {
    pub(crate) fn new(id: &str, buffer: PulseBuffer, gain: GainId) -> Self {
        Self {
            id: id.to_owned(),
            state: VoiceState::Idle,
            rate: 0.0,
            next_fire: ClockTime::ZERO,
            rearm: None,
            buffer,
            gain,
            pulses: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == VoiceState::Running
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn next_fire(&self) -> ClockTime {
        self.next_fire
    }

    pub fn rearm(&self) -> Option<TimerHandle> {
        self.rearm
    }

    pub fn buffer(&self) -> &PulseBuffer {
        &self.buffer
    }

    pub fn pitch(&self) -> PitchClass {
        self.buffer.pitch()
    }

    pub fn gain(&self) -> GainId {
        self.gain
    }

    pub fn pulses(&self) -> u64 {
        self.pulses
    }
}
