//! Headless controller for tonelab.
//!
//! [`Controller`] is the surface lesson pages and the CLI talk to: click
//! trains and continuous tones, keyed by caller-chosen ids, on one lazily
//! opened audio context. It owns all scheduling state, so there is no
//! global registry; a host event loop drives it by calling
//! [`Controller::run_timers`] whenever [`Controller::next_deadline`] has
//! passed.

mod bounce;
mod wav;

use std::time::Duration;
use thiserror::Error;
use tl_engine::{
    AudioContext, ClickScheduler, ConfigError, ContextError, ContextProvider, HostClock,
    MonotonicClock, OscillatorBank, SchedulerConfig, DEFAULT_TONE,
};

pub use bounce::{bounce, Action, Bounce, Cue};
pub use tl_audio::{CpalContext, CpalProvider};
pub use tl_engine::{GainId, ManualClock, OfflineContext, OfflineProvider, ScheduledPulse};
pub use tl_ir::{ClockTime, PitchClass, Polyrhythm};
pub use wav::{samples_to_wav, write_wav};

/// Voice ids used by [`Controller::start_polyrhythm`].
pub const POLY_HIGH: &str = "poly-1";
pub const POLY_LOW: &str = "poly-2";

#[derive(Debug, Error)]
pub enum ControlError {
    /// The audio context could not be opened. Not retried automatically.
    #[error("sound unavailable until you interact with the page ({0})")]
    SoundUnavailable(ContextError),
    #[error("audio engine error: {0}")]
    Engine(ContextError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Point-in-time view of a click voice.
#[derive(Clone, Debug, PartialEq)]
pub struct VoiceSnapshot {
    pub id: String,
    pub running: bool,
    pub rate: f64,
    pub next_fire: ClockTime,
    pub pitch: PitchClass,
    /// Gain node the voice plays through.
    pub gain: GainId,
    pub timer_pending: bool,
    pub pulses: u64,
}

/// Point-in-time view of a continuous tone.
#[derive(Clone, Debug, PartialEq)]
pub struct ToneSnapshot {
    pub id: String,
    pub frequency: f64,
    pub started: bool,
}

/// Owns the audio context, click voices, tones and host clock.
pub struct Controller<P: ContextProvider, H: HostClock = MonotonicClock> {
    provider: P,
    context: Option<P::Context>,
    host: H,
    clicks: ClickScheduler,
    tones: OscillatorBank,
}

impl<P: ContextProvider> Controller<P> {
    /// Controller with default settings on the wall clock.
    pub fn new(provider: P) -> Self {
        let config = SchedulerConfig::default();
        Self {
            provider,
            context: None,
            host: MonotonicClock::new(),
            tones: OscillatorBank::new(config.tone_gain()),
            clicks: ClickScheduler::default(),
        }
    }
}

impl<P: ContextProvider, H: HostClock> Controller<P, H> {
    pub fn with_parts(provider: P, host: H, config: SchedulerConfig) -> Result<Self, ConfigError> {
        let tones = OscillatorBank::new(config.tone_gain());
        Ok(Self {
            provider,
            context: None,
            host,
            clicks: ClickScheduler::new(config)?,
            tones,
        })
    }

    /// Open the audio context if it is not open yet.
    ///
    /// Must first be reached from a user gesture on platforms that lock
    /// audio. A refusal is returned as [`ControlError::SoundUnavailable`]
    /// and leaves the controller unchanged, so a later call may succeed.
    pub fn ensure_started(&mut self) -> Result<(), ControlError> {
        self.with_audio(|_, _, _, _| ())
    }

    pub fn is_started(&self) -> bool {
        self.context.is_some()
    }

    /// Run `f` against the open context, opening it first if needed.
    fn with_audio<R>(
        &mut self,
        f: impl FnOnce(&mut P::Context, &mut ClickScheduler, &mut OscillatorBank, Duration) -> R,
    ) -> Result<R, ControlError> {
        let ctx = match self.context.take() {
            Some(ctx) => ctx,
            None => self.open_context()?,
        };
        let ctx = self.context.insert(ctx);
        let now = self.host.now();
        Ok(f(ctx, &mut self.clicks, &mut self.tones, now))
    }

    fn open_context(&mut self) -> Result<P::Context, ControlError> {
        match self.provider.open() {
            Ok(ctx) => {
                log::info!("audio context started at {} Hz", ctx.sample_rate());
                Ok(ctx)
            }
            Err(err) => {
                log::warn!("audio context refused: {err}");
                Err(ControlError::SoundUnavailable(err))
            }
        }
    }

    /// Run `f` with the open context, opening it first if needed.
    pub fn with_context<R>(&mut self, f: impl FnOnce(&mut P::Context) -> R) -> Result<R, ControlError> {
        self.with_audio(|ctx, _, _, _| f(ctx))
    }

    pub fn context(&self) -> Option<&P::Context> {
        self.context.as_ref()
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &SchedulerConfig {
        self.clicks.config()
    }

    // --- Click trains ---

    /// Start click train `id` at `rate` pulses per second.
    ///
    /// `is_high` picks the accent click, but only the first start of an id
    /// decides its pitch class. Starting a running id only changes its rate.
    pub fn start_click_train(&mut self, id: &str, rate: f64, is_high: bool) -> Result<(), ControlError> {
        let pitch = PitchClass::from_accent(is_high);
        self.with_audio(|ctx, clicks, _, now| clicks.start(ctx, now, id, rate, pitch))?
            .map(|_| ())
            .map_err(ControlError::Engine)
    }

    /// Change the rate of a click train from its next unqueued pulse.
    /// Unknown ids are ignored.
    pub fn set_click_train_rate(&mut self, id: &str, rate: f64) -> bool {
        self.clicks.set_rate(id, rate)
    }

    /// Stop one click train. Already queued pulses still sound.
    pub fn stop_click_train(&mut self, id: &str) -> bool {
        self.clicks.stop(id)
    }

    /// Stop every click train. Safe before the context has been opened.
    pub fn stop_all_click_trains(&mut self) -> usize {
        self.clicks.stop_all()
    }

    /// Start two click trains forming `ratio` over `base` cycles per second:
    /// [`POLY_HIGH`] plays the numerator, [`POLY_LOW`] the denominator.
    pub fn start_polyrhythm(&mut self, ratio: Polyrhythm, base: f64) -> Result<(), ControlError> {
        let (high, low) = ratio.rates(base);
        self.start_click_train(POLY_HIGH, high, true)?;
        self.start_click_train(POLY_LOW, low, false)
    }

    /// Move both polyrhythm voices to a new base rate.
    pub fn set_polyrhythm_base(&mut self, ratio: Polyrhythm, base: f64) {
        let (high, low) = ratio.rates(base);
        self.clicks.set_rate(POLY_HIGH, high);
        self.clicks.set_rate(POLY_LOW, low);
    }

    // --- Tones ---

    /// Sound tone `id` (or the default tone) at `frequency`.
    pub fn start_tone(&mut self, frequency: f64, id: Option<&str>) -> Result<(), ControlError> {
        let id = id.unwrap_or(DEFAULT_TONE);
        self.with_audio(|ctx, _, tones, _| tones.start(ctx, id, frequency))?
            .map_err(ControlError::Engine)
    }

    pub fn stop_tone(&mut self, id: Option<&str>) -> bool {
        let id = id.unwrap_or(DEFAULT_TONE);
        match self.context.as_mut() {
            Some(ctx) => self.tones.stop(ctx, id),
            None => false,
        }
    }

    /// Retune a sounding or stopped tone without retriggering it.
    pub fn set_frequency(&mut self, frequency: f64, id: Option<&str>) -> bool {
        let id = id.unwrap_or(DEFAULT_TONE);
        match self.context.as_mut() {
            Some(ctx) => self.tones.set_frequency(ctx, id, frequency),
            None => false,
        }
    }

    /// Silence everything: every tone and every click train.
    pub fn stop_all_tones(&mut self) -> usize {
        let tones = match self.context.as_mut() {
            Some(ctx) => self.tones.stop_all(ctx),
            None => 0,
        };
        tones + self.clicks.stop_all()
    }

    // --- Event loop ---

    /// Fire every re-arm timer that is due on the host clock. Returns the
    /// number of pulses queued.
    pub fn run_timers(&mut self) -> usize {
        let now = self.host.now();
        match self.context.as_mut() {
            Some(ctx) => self.clicks.run_due(ctx, now),
            None => 0,
        }
    }

    /// Host time at which [`run_timers`](Self::run_timers) next has work.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.clicks.next_deadline()
    }

    // --- Introspection ---

    pub fn voice(&self, id: &str) -> Option<VoiceSnapshot> {
        let voice = self.clicks.voice(id)?;
        Some(VoiceSnapshot {
            id: voice.id().to_owned(),
            running: voice.is_running(),
            rate: voice.rate(),
            next_fire: voice.next_fire(),
            pitch: voice.pitch(),
            gain: voice.gain(),
            timer_pending: voice
                .rearm()
                .is_some_and(|h| self.clicks.timers().is_pending(h)),
            pulses: voice.pulses(),
        })
    }

    /// Every click voice, ordered by id.
    pub fn voices(&self) -> Vec<VoiceSnapshot> {
        let mut voices: Vec<_> = self
            .clicks
            .voices()
            .iter()
            .filter_map(|(_, v)| self.voice(v.id()))
            .collect();
        voices.sort_by(|a, b| a.id.cmp(&b.id));
        voices
    }

    /// Pending re-arm timers of click train `id`.
    pub fn pending_timers(&self, id: &str) -> usize {
        self.clicks.pending_timers(id)
    }

    pub fn tone(&self, id: Option<&str>) -> Option<ToneSnapshot> {
        let id = id.unwrap_or(DEFAULT_TONE);
        self.tones.tone(id).map(|tone| ToneSnapshot {
            id: id.to_owned(),
            frequency: tone.frequency(),
            started: tone.is_started(),
        })
    }

    /// Every tone, ordered by id.
    pub fn tones(&self) -> Vec<ToneSnapshot> {
        self.tones
            .iter()
            .map(|(id, tone)| ToneSnapshot {
                id: id.to_owned(),
                frequency: tone.frequency(),
                started: tone.is_started(),
            })
            .collect()
    }

    /// Whether anything is sounding or scheduled to sound.
    pub fn is_active(&self) -> bool {
        self.clicks.voices().iter().any(|(_, v)| v.is_running())
            || self.tones.iter().any(|(_, t)| t.is_started())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> (Controller<OfflineProvider, ManualClock>, ManualClock) {
        let host = ManualClock::new();
        let ctl =
            Controller::with_parts(OfflineProvider::new(48000), host.clone(), SchedulerConfig::default())
                .unwrap();
        (ctl, host)
    }

    #[test]
    fn context_opens_once_on_first_use() {
        let (mut ctl, _) = controller();
        assert!(!ctl.is_started());
        ctl.start_click_train("a", 5.0, true).unwrap();
        ctl.start_tone(440.0, None).unwrap();
        ctl.ensure_started().unwrap();
        assert!(ctl.is_started());
        assert_eq!(ctl.provider.opened(), 1);
    }

    #[test]
    fn stop_calls_before_start_are_noops() {
        let (mut ctl, _) = controller();
        assert_eq!(ctl.stop_all_click_trains(), 0);
        assert_eq!(ctl.stop_all_tones(), 0);
        assert!(!ctl.stop_tone(None));
        assert!(!ctl.set_frequency(300.0, None));
        assert!(!ctl.stop_click_train("nope"));
        assert_eq!(ctl.run_timers(), 0);
        assert!(!ctl.is_started());
    }

    #[test]
    fn default_tone_id() {
        let (mut ctl, _) = controller();
        ctl.start_tone(330.0, None).unwrap();
        let tone = ctl.tone(Some(DEFAULT_TONE)).unwrap();
        assert_eq!(tone.frequency, 330.0);
        assert!(tone.started);
        assert!(ctl.set_frequency(331.0, None));
        assert!(ctl.stop_tone(None));
        assert!(!ctl.tone(None).unwrap().started);
    }

    #[test]
    fn polyrhythm_voices() {
        let (mut ctl, _) = controller();
        ctl.start_polyrhythm(Polyrhythm::new(5, 4).unwrap(), 2.0).unwrap();
        let high = ctl.voice(POLY_HIGH).unwrap();
        let low = ctl.voice(POLY_LOW).unwrap();
        assert_eq!((high.rate, high.pitch), (10.0, PitchClass::High));
        assert_eq!((low.rate, low.pitch), (8.0, PitchClass::Low));

        ctl.set_polyrhythm_base(Polyrhythm::new(5, 4).unwrap(), 100.0);
        assert_eq!(ctl.voice(POLY_HIGH).unwrap().rate, 500.0);
        assert_eq!(ctl.voice(POLY_LOW).unwrap().rate, 400.0);
    }

    #[test]
    fn unavailable_message_is_user_facing() {
        let err = ControlError::SoundUnavailable(ContextError::Locked);
        assert!(err.to_string().starts_with("sound unavailable until you interact"));
    }
}
