//! CPAL-based audio context.
//!
//! The output callback owns a [`Renderer`]. The control thread reaches it
//! only through a lock-free command ring, and reads the clock from a frame
//! counter the callback publishes after every buffer.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tl_engine::{
    AudioContext, Command, ContextError, ContextProvider, GainId, NodeAllocator, OscillatorId,
    Renderer, SchedulerConfig,
};
use tl_ir::{ClockTime, PulseBuffer};

use crate::error::AudioError;

/// Commands in flight between the control thread and the callback.
const COMMAND_CAPACITY: usize = 4096;

/// Ring slots pulses may not take, kept free for node and oscillator
/// commands.
const CONTROL_RESERVE: usize = 64;

/// Opens the default output device.
#[derive(Clone, Debug)]
pub struct CpalProvider {
    glide_secs: f64,
}

impl CpalProvider {
    pub fn new(glide_secs: f64) -> Self {
        Self { glide_secs }
    }

    fn open_stream(&self) -> Result<CpalContext, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let config: StreamConfig = device.default_output_config()?.into();
        let sample_rate = config.sample_rate.0;
        let channels = config.channels as usize;

        let (producer, mut consumer) = HeapRb::<Command>::new(COMMAND_CAPACITY).split();
        let shared = Arc::new(Shared::default());
        let mut renderer = Renderer::new(sample_rate, self.glide_secs);
        let published = shared.clone();

        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                #[cfg(feature = "alloc_check")]
                assert_no_alloc::assert_no_alloc(|| {
                    fill(&mut renderer, &mut consumer, &published, data, channels)
                });
                #[cfg(not(feature = "alloc_check"))]
                fill(&mut renderer, &mut consumer, &published, data, channels);
            },
            |err| log::error!("audio stream error: {err}"),
            None,
        )?;
        stream.play()?;

        log::info!("audio output open: {sample_rate} Hz, {channels} channels");
        Ok(CpalContext {
            _stream: stream,
            sender: CommandSender::new(producer, CONTROL_RESERVE),
            shared,
            sample_rate,
            overruns_seen: 0,
        })
    }
}

impl Default for CpalProvider {
    fn default() -> Self {
        Self::new(SchedulerConfig::default().glide_secs)
    }
}

impl ContextProvider for CpalProvider {
    type Context = CpalContext;

    fn open(&mut self) -> Result<CpalContext, ContextError> {
        Ok(self.open_stream()?)
    }
}

/// State the callback publishes for the control thread.
#[derive(Debug, Default)]
struct Shared {
    /// Frames rendered so far.
    frames: AtomicU64,
    /// Commands the renderer discarded.
    overruns: AtomicU64,
}

/// Audio callback body: drain commands, render, publish the clock.
///
/// The mono mix is copied to every channel of the device.
fn fill(
    renderer: &mut Renderer,
    commands: &mut HeapCons<Command>,
    shared: &Shared,
    data: &mut [f32],
    channels: usize,
) {
    while let Some(command) = commands.try_pop() {
        renderer.apply(command);
    }
    for frame in data.chunks_mut(channels.max(1)) {
        frame.fill(renderer.render_frame());
    }
    shared.overruns.store(renderer.dropped(), Ordering::Relaxed);
    shared.frames.store(renderer.frame(), Ordering::Release);
}

/// Control-side end of the command ring.
///
/// Node ids are handed out in the order the renderer creates the nodes,
/// so a create command is never dropped: the id is allocated only once
/// the command is certain to fit. Pulses leave the last `reserve` slots
/// free so oscillator commands still get through a busy ring.
struct CommandSender {
    producer: HeapProd<Command>,
    nodes: NodeAllocator,
    reserve: usize,
    dropped: u64,
}

impl CommandSender {
    fn new(producer: HeapProd<Command>, reserve: usize) -> Self {
        Self {
            producer,
            nodes: NodeAllocator::new(),
            reserve,
            dropped: 0,
        }
    }

    fn ring_full(&self) -> ContextError {
        ContextError::Capacity {
            what: "audio command",
            max: self.producer.capacity().get(),
        }
    }

    fn create<T>(
        &mut self,
        allocate: impl FnOnce(&mut NodeAllocator) -> Result<T, ContextError>,
        command: Command,
    ) -> Result<T, ContextError> {
        // sole producer: free slots only grow until the push below
        if self.producer.is_full() {
            return Err(self.ring_full());
        }
        let id = allocate(&mut self.nodes)?;
        let pushed = self.producer.try_push(command);
        debug_assert!(pushed.is_ok());
        Ok(id)
    }

    fn create_gain(&mut self, gain: f32) -> Result<GainId, ContextError> {
        self.create(NodeAllocator::gain, Command::CreateGain { gain })
    }

    fn create_oscillator(
        &mut self,
        frequency: f64,
        gain: GainId,
    ) -> Result<OscillatorId, ContextError> {
        self.create(
            NodeAllocator::oscillator,
            Command::CreateOscillator { frequency, gain },
        )
    }

    fn play(&mut self, command: Command) -> Result<(), ContextError> {
        if self.producer.vacant_len() <= self.reserve {
            self.lost();
            return Err(self.ring_full());
        }
        if self.producer.try_push(command).is_err() {
            self.lost();
            return Err(self.ring_full());
        }
        Ok(())
    }

    fn control(&mut self, command: Command) {
        if self.producer.try_push(command).is_err() {
            self.lost();
        }
    }

    fn lost(&mut self) {
        self.dropped += 1;
        log::warn!("audio command ring full; {} commands dropped", self.dropped);
    }
}

/// Audio context backed by a live output stream.
pub struct CpalContext {
    _stream: Stream,
    sender: CommandSender,
    shared: Arc<Shared>,
    sample_rate: u32,
    overruns_seen: u64,
}

impl CpalContext {
    /// Commands lost because the ring was full.
    pub fn dropped(&self) -> u64 {
        self.sender.dropped
    }

    /// Commands the audio thread discarded because a renderer table was
    /// full.
    pub fn renderer_dropped(&self) -> u64 {
        self.shared.overruns.load(Ordering::Relaxed)
    }

    fn report_overruns(&mut self) {
        let overruns = self.renderer_dropped();
        if overruns > self.overruns_seen {
            log::warn!(
                "audio thread discarded {} commands ({overruns} total)",
                overruns - self.overruns_seen
            );
            self.overruns_seen = overruns;
        }
    }
}

impl AudioContext for CpalContext {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn now(&self) -> ClockTime {
        ClockTime::from_frames(self.shared.frames.load(Ordering::Acquire), self.sample_rate)
    }

    fn create_gain(&mut self, gain: f32) -> Result<GainId, ContextError> {
        self.sender.create_gain(gain)
    }

    fn play_buffer(
        &mut self,
        buffer: &PulseBuffer,
        gain: GainId,
        at: ClockTime,
    ) -> Result<(), ContextError> {
        self.report_overruns();
        let start = at.max(self.now()).to_frames(self.sample_rate);
        self.sender.play(Command::Play {
            buffer: buffer.clone(),
            gain,
            start,
        })
    }

    fn create_oscillator(
        &mut self,
        frequency: f64,
        gain: GainId,
    ) -> Result<OscillatorId, ContextError> {
        self.sender.create_oscillator(frequency, gain)
    }

    fn start_oscillator(&mut self, osc: OscillatorId) {
        self.sender.control(Command::StartOscillator(osc));
    }

    fn stop_oscillator(&mut self, osc: OscillatorId) {
        self.sender.control(Command::StopOscillator(osc));
    }

    fn set_oscillator_frequency(&mut self, osc: OscillatorId, frequency: f64) {
        self.sender.control(Command::SetFrequency(osc, frequency));
    }
}
