//! Sample-accurate mixing of pulse playbacks and sine oscillators.
//!
//! The renderer is driven one frame at a time by whoever owns the output:
//! the offline context directly, or the realtime audio callback. Nothing
//! here allocates after construction; the tables are sized so that every
//! gain can run a click train at [`MAX_RATE_HZ`] with a lookahead of
//! [`MAX_LOOKAHEAD_MS`].

use heapless::Vec;
use std::f64::consts::TAU;
use tl_ir::PulseBuffer;

use crate::context::{ContextError, GainId, OscillatorId};
use crate::playback_queue::{Playback, PlaybackQueue};

/// Fastest click train the tables are sized for, in pulses per second.
pub const MAX_RATE_HZ: usize = 500;
/// Longest lookahead a scheduler may use, in milliseconds.
pub const MAX_LOOKAHEAD_MS: usize = 250;

/// One per click voice plus the tone bus.
pub const MAX_GAINS: usize = 32;
pub const MAX_OSCILLATORS: usize = 32;
/// Pulses one voice can have waiting: a full lookahead window at the
/// fastest rate, plus the pulse already queued from the previous pass.
const PENDING_PER_GAIN: usize = MAX_RATE_HZ * MAX_LOOKAHEAD_MS / 1000 + 3;
/// Playbacks waiting for their start frame.
pub const MAX_PENDING: usize = MAX_GAINS * PENDING_PER_GAIN;
/// Playbacks currently sounding. A 4 ms click at the fastest rate
/// overlaps at most two later ones.
pub const MAX_ACTIVE: usize = MAX_GAINS * 4;

/// Work sent from the control side to the renderer.
#[derive(Clone, Debug)]
pub enum Command {
    CreateGain { gain: f32 },
    Play {
        buffer: PulseBuffer,
        gain: GainId,
        start: u64,
    },
    CreateOscillator { frequency: f64, gain: GainId },
    StartOscillator(OscillatorId),
    StopOscillator(OscillatorId),
    SetFrequency(OscillatorId, f64),
}

/// Hands out node ids in the order the renderer creates the nodes.
///
/// The control side allocates ids before the matching command reaches
/// the renderer, so capacity is checked here rather than on the audio
/// thread.
#[derive(Clone, Debug, Default)]
pub struct NodeAllocator {
    gains: usize,
    oscillators: usize,
}

impl NodeAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gain(&mut self) -> Result<GainId, ContextError> {
        if self.gains >= MAX_GAINS {
            return Err(ContextError::Capacity {
                what: "gain",
                max: MAX_GAINS,
            });
        }
        self.gains += 1;
        Ok(GainId(self.gains - 1))
    }

    pub fn oscillator(&mut self) -> Result<OscillatorId, ContextError> {
        if self.oscillators >= MAX_OSCILLATORS {
            return Err(ContextError::Capacity {
                what: "oscillator",
                max: MAX_OSCILLATORS,
            });
        }
        self.oscillators += 1;
        Ok(OscillatorId(self.oscillators - 1))
    }

    pub fn gains(&self) -> usize {
        self.gains
    }

    pub fn oscillators(&self) -> usize {
        self.oscillators
    }
}

#[derive(Clone, Debug)]
struct Active {
    buffer: PulseBuffer,
    gain: GainId,
    pos: usize,
}

#[derive(Clone, Debug)]
struct Oscillator {
    /// Instantaneous frequency, gliding toward `target`.
    frequency: f64,
    target: f64,
    /// Phase in cycles, kept in [0, 1).
    phase: f64,
    gain: GainId,
    running: bool,
}

/// Mono mixer for one output stream.
#[derive(Clone, Debug)]
pub struct Renderer {
    sample_rate: u32,
    /// Per-frame smoothing coefficient for frequency changes.
    glide: f64,
    frame: u64,
    gains: Vec<f32, MAX_GAINS>,
    oscillators: Vec<Oscillator, MAX_OSCILLATORS>,
    pending: Box<PlaybackQueue<MAX_PENDING>>,
    active: Vec<Active, MAX_ACTIVE>,
    dropped: u64,
}

impl Renderer {
    /// `glide_secs` is the time constant of frequency changes; zero jumps
    /// straight to the new frequency.
    pub fn new(sample_rate: u32, glide_secs: f64) -> Self {
        let frames = glide_secs * sample_rate as f64;
        let glide = if frames > 0.0 {
            1.0 - (-1.0 / frames).exp()
        } else {
            1.0
        };
        Self {
            sample_rate,
            glide,
            frame: 0,
            gains: Vec::new(),
            oscillators: Vec::new(),
            pending: Box::default(),
            active: Vec::new(),
            dropped: 0,
        }
    }

    /// Apply one command. Returns false, and counts it in
    /// [`dropped`](Self::dropped), if it does not fit the fixed tables or
    /// names an unknown node.
    pub fn apply(&mut self, command: Command) -> bool {
        let accepted = match command {
            Command::CreateGain { gain } => self.gains.push(gain).is_ok(),
            Command::Play { buffer, gain, start } => self
                .pending
                .push(Playback { buffer, gain, start })
                .is_ok(),
            Command::CreateOscillator { frequency, gain } => self
                .oscillators
                .push(Oscillator {
                    frequency,
                    target: frequency,
                    phase: 0.0,
                    gain,
                    running: false,
                })
                .is_ok(),
            Command::StartOscillator(id) => match self.oscillators.get_mut(id.0) {
                Some(osc) => {
                    if !osc.running {
                        osc.frequency = osc.target;
                        osc.phase = 0.0;
                        osc.running = true;
                    }
                    true
                }
                None => false,
            },
            Command::StopOscillator(id) => match self.oscillators.get_mut(id.0) {
                Some(osc) => {
                    osc.running = false;
                    true
                }
                None => false,
            },
            Command::SetFrequency(id, frequency) => match self.oscillators.get_mut(id.0) {
                Some(osc) => {
                    osc.target = frequency;
                    true
                }
                None => false,
            },
        };
        if !accepted {
            self.dropped += 1;
        }
        accepted
    }

    /// Produce the next output sample and advance the clock by one frame.
    pub fn render_frame(&mut self) -> f32 {
        while let Some(playback) = self.pending.pop_due(self.frame) {
            let active = Active {
                buffer: playback.buffer,
                gain: playback.gain,
                pos: 0,
            };
            if self.active.push(active).is_err() {
                self.dropped += 1;
            }
        }

        let gains = &self.gains;
        let gain_of = |id: GainId| gains.get(id.0).copied().unwrap_or(0.0);
        let mut out = 0.0f32;

        self.active.retain_mut(|a| {
            out += a.buffer.get(a.pos) * gain_of(a.gain);
            a.pos += 1;
            a.pos < a.buffer.len()
        });

        let sr = self.sample_rate as f64;
        for osc in self.oscillators.iter_mut().filter(|o| o.running) {
            osc.frequency += (osc.target - osc.frequency) * self.glide;
            out += ((TAU * osc.phase).sin() as f32) * gain_of(osc.gain);
            osc.phase += osc.frequency / sr;
            osc.phase -= osc.phase.floor();
        }

        self.frame += 1;
        out.clamp(-1.0, 1.0)
    }

    /// Fill `out` with consecutive frames.
    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.render_frame();
        }
    }

    /// Frames rendered so far; the output clock.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Commands or playbacks discarded because a table was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Playbacks queued or sounding.
    pub fn in_flight(&self) -> usize {
        self.pending.len() + self.active.len()
    }

    /// Current instantaneous frequency of an oscillator.
    pub fn oscillator_frequency(&self, id: OscillatorId) -> Option<f64> {
        self.oscillators.get(id.0).map(|o| o.frequency)
    }

    pub fn oscillator_running(&self, id: OscillatorId) -> bool {
        self.oscillators.get(id.0).is_some_and(|o| o.running)
    }
}
