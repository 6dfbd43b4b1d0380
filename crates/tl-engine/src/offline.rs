//! Offline audio context: the clock only moves when frames are rendered.
//!
//! Used for bouncing to disk and for every timing test. Besides rendering
//! audio it keeps a log of each pulse handed to it, so onset times can be
//! checked without inspecting samples.

use tl_ir::{ClockTime, PitchClass, PulseBuffer};

use crate::config::SchedulerConfig;
use crate::context::{AudioContext, ContextError, ContextProvider, GainId, OscillatorId};
use crate::renderer::{Command, NodeAllocator, Renderer, MAX_PENDING};

/// One pulse as requested by the scheduler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduledPulse {
    pub gain: GainId,
    /// Requested onset on the context clock.
    pub at: ClockTime,
    pub pitch: PitchClass,
}

#[derive(Clone, Debug)]
pub struct OfflineContext {
    renderer: Renderer,
    nodes: NodeAllocator,
    scheduled: Vec<ScheduledPulse>,
}

impl OfflineContext {
    pub fn new(sample_rate: u32) -> Self {
        Self::with_glide(sample_rate, SchedulerConfig::default().glide_secs)
    }

    pub fn with_glide(sample_rate: u32, glide_secs: f64) -> Self {
        Self {
            renderer: Renderer::new(sample_rate, glide_secs),
            nodes: NodeAllocator::new(),
            scheduled: Vec::new(),
        }
    }

    /// Render `frames` frames and return them.
    pub fn render_frames(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        self.renderer.render(&mut out);
        out
    }

    pub fn render_into(&mut self, out: &mut [f32]) {
        self.renderer.render(out);
    }

    /// Render and discard audio until the clock reaches `time`.
    pub fn advance_to(&mut self, time: ClockTime) {
        let target = time.to_frames(self.renderer.sample_rate());
        let mut scratch = [0.0f32; 1024];
        while self.renderer.frame() < target {
            let n = ((target - self.renderer.frame()) as usize).min(scratch.len());
            self.renderer.render(&mut scratch[..n]);
        }
    }

    /// Every pulse the renderer accepted, in call order.
    pub fn scheduled(&self) -> &[ScheduledPulse] {
        &self.scheduled
    }

    /// Pulses handed over through `gain`.
    pub fn scheduled_on(&self, gain: GainId) -> impl Iterator<Item = &ScheduledPulse> {
        self.scheduled.iter().filter(move |p| p.gain == gain)
    }

    pub fn frame(&self) -> u64 {
        self.renderer.frame()
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn gain_count(&self) -> usize {
        self.nodes.gains()
    }

    pub fn oscillator_count(&self) -> usize {
        self.nodes.oscillators()
    }
}

impl AudioContext for OfflineContext {
    fn sample_rate(&self) -> u32 {
        self.renderer.sample_rate()
    }

    fn now(&self) -> ClockTime {
        ClockTime::from_frames(self.renderer.frame(), self.renderer.sample_rate())
    }

    fn create_gain(&mut self, gain: f32) -> Result<GainId, ContextError> {
        let id = self.nodes.gain()?;
        self.renderer.apply(Command::CreateGain { gain });
        Ok(id)
    }

    fn play_buffer(
        &mut self,
        buffer: &PulseBuffer,
        gain: GainId,
        at: ClockTime,
    ) -> Result<(), ContextError> {
        let at = at.max(self.now());
        let accepted = self.renderer.apply(Command::Play {
            buffer: buffer.clone(),
            gain,
            start: at.to_frames(self.renderer.sample_rate()),
        });
        if !accepted {
            return Err(ContextError::Capacity {
                what: "pending playback",
                max: MAX_PENDING,
            });
        }
        self.scheduled.push(ScheduledPulse {
            gain,
            at,
            pitch: buffer.pitch(),
        });
        Ok(())
    }

    fn create_oscillator(
        &mut self,
        frequency: f64,
        gain: GainId,
    ) -> Result<OscillatorId, ContextError> {
        let id = self.nodes.oscillator()?;
        self.renderer
            .apply(Command::CreateOscillator { frequency, gain });
        Ok(id)
    }

    fn start_oscillator(&mut self, osc: OscillatorId) {
        self.renderer.apply(Command::StartOscillator(osc));
    }

    fn stop_oscillator(&mut self, osc: OscillatorId) {
        self.renderer.apply(Command::StopOscillator(osc));
    }

    fn set_oscillator_frequency(&mut self, osc: OscillatorId, frequency: f64) {
        self.renderer.apply(Command::SetFrequency(osc, frequency));
    }
}

/// Opens offline contexts, optionally refusing until unlocked.
#[derive(Clone, Debug)]
pub struct OfflineProvider {
    sample_rate: u32,
    glide_secs: f64,
    locked: bool,
    opened: usize,
}

impl OfflineProvider {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            glide_secs: SchedulerConfig::default().glide_secs,
            locked: false,
            opened: 0,
        }
    }

    /// A provider that fails with [`ContextError::Locked`] until
    /// [`unlock`](Self::unlock) is called, like a platform that waits for
    /// a user gesture.
    pub fn locked(sample_rate: u32) -> Self {
        Self {
            locked: true,
            ..Self::new(sample_rate)
        }
    }

    pub fn with_glide(mut self, glide_secs: f64) -> Self {
        self.glide_secs = glide_secs;
        self
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// Number of contexts opened so far.
    pub fn opened(&self) -> usize {
        self.opened
    }
}

impl ContextProvider for OfflineProvider {
    type Context = OfflineContext;

    fn open(&mut self) -> Result<OfflineContext, ContextError> {
        if self.locked {
            return Err(ContextError::Locked);
        }
        self.opened += 1;
        Ok(OfflineContext::with_glide(self.sample_rate, self.glide_secs))
    }
}
