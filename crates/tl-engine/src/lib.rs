//! Click-train engine for tonelab.
//!
//! Schedules pulse voices ahead of an audio clock, holds continuous tones,
//! and renders both into a mono stream.

mod config;
mod context;
mod oscillator;
mod playback_queue;
mod registry;
mod renderer;
pub mod offline;
pub mod scheduler;
pub mod timer;
mod voice;

pub use config::{ConfigError, SchedulerConfig};
pub use context::{AudioContext, ContextError, ContextProvider, GainId, OscillatorId};
pub use offline::{OfflineContext, OfflineProvider, ScheduledPulse};
pub use oscillator::{OscillatorBank, Tone, DEFAULT_TONE};
pub use playback_queue::{Playback, PlaybackQueue};
pub use registry::VoiceRegistry;
pub use renderer::{
    Command, NodeAllocator, Renderer, MAX_ACTIVE, MAX_GAINS, MAX_LOOKAHEAD_MS, MAX_OSCILLATORS,
    MAX_PENDING, MAX_RATE_HZ,
};
pub use scheduler::{schedule_pass, ClickScheduler};
pub use timer::{HostClock, ManualClock, MonotonicClock, TimerHandle, TimerQueue};
pub use voice::{ClickVoice, VoiceKey, VoiceState};
