//! Lookahead scheduling of click voices.
//!
//! Pulse onsets are derived from the audio clock, never from the moment a
//! timer happens to fire. Each pass queues every pulse that falls inside
//! the lookahead window, then the voice re-arms a coarse host timer. As
//! long as the lookahead exceeds the timer period, one late or skipped
//! tick leaves the output untouched.

use std::time::Duration;
use tl_ir::PitchClass;

use crate::config::{ConfigError, SchedulerConfig};
use crate::context::{AudioContext, ContextError};
use crate::registry::VoiceRegistry;
use crate::timer::TimerQueue;
use crate::voice::{ClickVoice, VoiceKey, VoiceState};

/// Queue every pulse of `voice` that starts before `now + lookahead_secs`.
///
/// Each pulse plays at `max(next_fire, now)`; `next_fire` then advances by
/// one period of the rate current at that iteration. A pulse the context
/// refuses is skipped with a warning, so the grid never shifts. Does
/// nothing for a voice that is not running. Returns the number of pulses
/// queued.
pub fn schedule_pass<C: AudioContext + ?Sized>(
    voice: &mut ClickVoice,
    ctx: &mut C,
    lookahead_secs: f64,
) -> usize {
    if !voice.is_running() {
        return 0;
    }
    if !(voice.rate.is_finite() && voice.rate > 0.0) {
        log::warn!("voice '{}' has unusable rate {}; nothing scheduled", voice.id(), voice.rate);
        return 0;
    }

    let now = ctx.now();
    let horizon = now.add_secs(lookahead_secs);
    let mut queued = 0;
    let mut rejected = None;

    while voice.next_fire < horizon {
        match ctx.play_buffer(voice.buffer(), voice.gain(), voice.next_fire.max(now)) {
            Ok(()) => queued += 1,
            Err(err) => {
                let (count, _) = rejected.get_or_insert((0usize, err));
                *count += 1;
            }
        }
        voice.next_fire = voice.next_fire.add_secs(1.0 / voice.rate);
    }

    if let Some((count, err)) = rejected {
        log::warn!("voice '{}': {count} pulses not queued: {err}", voice.id());
    }
    voice.pulses += queued as u64;
    log::trace!(
        "pass '{}': {} pulses queued, next at {:.4}s",
        voice.id(),
        queued,
        voice.next_fire.as_secs()
    );
    queued
}

/// Owns the click voices and their re-arm timers.
#[derive(Clone, Debug)]
pub struct ClickScheduler {
    voices: VoiceRegistry,
    timers: TimerQueue<VoiceKey>,
    config: SchedulerConfig,
}

impl ClickScheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            voices: VoiceRegistry::new(),
            timers: TimerQueue::new(),
            config,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Start voice `id` at `rate` pulses per second.
    ///
    /// Creates the voice on first use. A voice that is already running
    /// only takes the new rate; its timing and timer are left alone.
    /// Otherwise the first pulse lands at the current audio time, a pass
    /// runs immediately and the re-arm timer is set.
    pub fn start<C: AudioContext>(
        &mut self,
        ctx: &mut C,
        host_now: Duration,
        id: &str,
        rate: f64,
        pitch: PitchClass,
    ) -> Result<VoiceKey, ContextError> {
        let key = self
            .voices
            .get_or_create(id, pitch, ctx, self.config.voice_gain)?;
        let voice = &mut self.voices[key];
        voice.rate = rate;

        if voice.is_running() {
            log::debug!("click '{id}' already running; rate now {rate}");
            return Ok(key);
        }

        voice.state = VoiceState::Running;
        voice.next_fire = ctx.now();
        schedule_pass(voice, ctx, self.config.lookahead_secs);
        voice.rearm = Some(self.timers.schedule(host_now + self.config.timer_period(), key));
        log::debug!("click '{id}' started at {rate} Hz");
        Ok(key)
    }

    /// Change the rate of `id`. The new period applies from the next pulse
    /// not yet queued. Returns false for an unknown id.
    pub fn set_rate(&mut self, id: &str, rate: f64) -> bool {
        match self.voices.by_id_mut(id) {
            Some(voice) => {
                voice.rate = rate;
                true
            }
            None => false,
        }
    }

    /// Stop `id` and revoke its timer. Pulses already queued still play.
    /// Returns whether the voice was running.
    pub fn stop(&mut self, id: &str) -> bool {
        let Some(voice) = self.voices.by_id_mut(id) else {
            return false;
        };
        let was_running = Self::halt(voice, &mut self.timers);
        if was_running {
            log::debug!("click '{id}' stopped");
        }
        was_running
    }

    /// Stop every voice. Returns how many were running.
    pub fn stop_all(&mut self) -> usize {
        let mut stopped = 0;
        for (_, voice) in self.voices.iter_mut() {
            if Self::halt(voice, &mut self.timers) {
                stopped += 1;
            }
        }
        if stopped > 0 {
            log::debug!("stopped {stopped} click voices");
        }
        stopped
    }

    fn halt(voice: &mut ClickVoice, timers: &mut TimerQueue<VoiceKey>) -> bool {
        if let Some(handle) = voice.rearm.take() {
            timers.cancel(handle);
        }
        let was_running = voice.is_running();
        voice.state = VoiceState::Idle;
        was_running
    }

    /// Fire every re-arm timer due at `host_now`.
    ///
    /// Each firing runs one pass for its voice and re-arms one timer
    /// period after `host_now`, whether or not the pass queued anything.
    /// Returns the number of pulses queued.
    pub fn run_due<C: AudioContext>(&mut self, ctx: &mut C, host_now: Duration) -> usize {
        let period = self.config.timer_period();
        let mut queued = 0;

        while let Some((handle, key)) = self.timers.pop_due(host_now) {
            let Some(voice) = self.voices.get_mut(key) else {
                continue;
            };
            if voice.rearm == Some(handle) {
                voice.rearm = None;
            }
            if !voice.is_running() {
                continue;
            }
            queued += schedule_pass(voice, ctx, self.config.lookahead_secs);
            voice.rearm = Some(self.timers.schedule(host_now + period, key));
        }
        queued
    }

    /// Host time of the earliest pending timer.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    pub fn voice(&self, id: &str) -> Option<&ClickVoice> {
        self.voices.by_id(id)
    }

    pub fn voices(&self) -> &VoiceRegistry {
        &self.voices
    }

    /// Number of pending timers that belong to `id`.
    pub fn pending_timers(&self, id: &str) -> usize {
        match self.voices.key(id) {
            Some(key) => self.timers.tasks().filter(|&k| k == key).count(),
            None => 0,
        }
    }

    pub fn timers(&self) -> &TimerQueue<VoiceKey> {
        &self.timers
    }
}

impl Default for ClickScheduler {
    fn default() -> Self {
        Self {
            voices: VoiceRegistry::new(),
            timers: TimerQueue::new(),
            config: SchedulerConfig::default(),
        }
    }
}
