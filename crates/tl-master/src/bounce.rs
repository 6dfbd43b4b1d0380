//! Offline rendering of a cue list.
//!
//! A bounce drives a [`Controller`] on an offline context with a manual
//! host clock that tracks the audio clock. Between events (cues and timer
//! deadlines) it renders straight through, so the result is exactly what
//! a live session with a perfectly punctual event loop would play.

use std::time::Duration;
use tl_engine::{HostClock, ManualClock, OfflineProvider, ScheduledPulse, SchedulerConfig};
use tl_ir::ClockTime;

use crate::{samples_to_wav, ControlError, Controller};

/// Something the controller should do during a bounce.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    StartClick { id: String, rate: f64, is_high: bool },
    SetRate { id: String, rate: f64 },
    StopClick { id: String },
    StartTone { id: String, frequency: f64 },
    SetFrequency { id: String, frequency: f64 },
    StopTone { id: String },
    /// Every tone and click train.
    StopAll,
}

/// An action at a point on the timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct Cue {
    pub at: Duration,
    pub action: Action,
}

impl Cue {
    pub fn new(at: Duration, action: Action) -> Self {
        Self { at, action }
    }
}

/// Rendered audio plus the pulses that produced it.
#[derive(Clone, Debug)]
pub struct Bounce {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub pulses: Vec<ScheduledPulse>,
}

impl Bounce {
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    pub fn to_wav(&self) -> Result<Vec<u8>, ControlError> {
        Ok(samples_to_wav(&self.samples, self.sample_rate)?)
    }
}

/// Render `cues` for `length` at `sample_rate`.
///
/// Cues fire in time order; cues sharing a time fire in list order.
pub fn bounce(
    cues: &[Cue],
    length: Duration,
    sample_rate: u32,
    config: SchedulerConfig,
) -> Result<Bounce, ControlError> {
    let host = ManualClock::new();
    let provider = OfflineProvider::new(sample_rate).with_glide(config.glide_secs);
    let mut ctl = Controller::with_parts(provider, host.clone(), config)?;
    ctl.ensure_started()?;

    let mut cues = cues.to_vec();
    cues.sort_by_key(|c| c.at);
    let mut cues = cues.into_iter().peekable();

    let total = ClockTime::from_secs(length.as_secs_f64()).to_frames(sample_rate) as usize;
    let mut samples = Vec::with_capacity(total);

    loop {
        let now = host.now();
        while let Some(cue) = cues.next_if(|c| c.at <= now) {
            perform(&mut ctl, &cue.action)?;
        }
        ctl.run_timers();
        if now >= length {
            break;
        }

        let next = [cues.peek().map(|c| c.at), ctl.next_deadline()]
            .into_iter()
            .flatten()
            .fold(length, Duration::min);
        let target = ClockTime::from_secs(next.as_secs_f64()).to_frames(sample_rate) as usize;
        let start = samples.len();
        if target > start {
            samples.resize(target, 0.0);
            ctl.with_context(|ctx| ctx.render_into(&mut samples[start..]))?;
        }
        host.set(next);
    }

    let pulses = ctl.with_context(|ctx| ctx.scheduled().to_vec())?;
    log::debug!(
        "bounced {} frames, {} pulses",
        samples.len(),
        pulses.len()
    );
    Ok(Bounce {
        samples,
        sample_rate,
        pulses,
    })
}

fn perform(
    ctl: &mut Controller<OfflineProvider, ManualClock>,
    action: &Action,
) -> Result<(), ControlError> {
    match action {
        Action::StartClick { id, rate, is_high } => ctl.start_click_train(id, *rate, *is_high)?,
        Action::SetRate { id, rate } => {
            ctl.set_click_train_rate(id, *rate);
        }
        Action::StopClick { id } => {
            ctl.stop_click_train(id);
        }
        Action::StartTone { id, frequency } => ctl.start_tone(*frequency, Some(id.as_str()))?,
        Action::SetFrequency { id, frequency } => {
            ctl.set_frequency(*frequency, Some(id.as_str()));
        }
        Action::StopTone { id } => {
            ctl.stop_tone(Some(id.as_str()));
        }
        Action::StopAll => {
            ctl.stop_all_tones();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tl_ir::PitchClass;

    fn secs(v: f64) -> Duration {
        Duration::from_secs_f64(v)
    }

    fn click(id: &str, rate: f64, is_high: bool) -> Action {
        Action::StartClick {
            id: id.into(),
            rate,
            is_high,
        }
    }

    #[test]
    fn renders_the_requested_length() {
        let out = bounce(&[], secs(0.5), 8000, SchedulerConfig::default()).unwrap();
        assert_eq!(out.samples.len(), 4000);
        assert!(out.samples.iter().all(|&s| s == 0.0));
        assert!(out.pulses.is_empty());
    }

    #[test]
    fn click_train_pulses_land_on_the_grid() {
        let cues = [
            Cue::new(secs(0.0), click("c", 10.0, true)),
            Cue::new(secs(1.0), Action::StopClick { id: "c".into() }),
        ];
        let out = bounce(&cues, secs(1.5), 48000, SchedulerConfig::default()).unwrap();

        let onsets: Vec<f64> = out.pulses.iter().map(|p| p.at.as_secs()).collect();
        // 0.0 .. 1.0 queued while running, plus the pulses already inside
        // the lookahead window when the stop arrived
        assert!(onsets.len() >= 10 && onsets.len() <= 12, "{onsets:?}");
        for (i, t) in onsets.iter().enumerate() {
            assert!((t - i as f64 * 0.1).abs() < 1e-9);
        }
        assert!(out.pulses.iter().all(|p| p.pitch == PitchClass::High));

        // first pulse is audible within its 4 ms
        assert!(out.samples[..192].iter().any(|s| s.abs() > 0.05));
        // nothing after the last pulse has decayed
        let tail = ((onsets[onsets.len() - 1] + 0.01) * 48000.0) as usize;
        assert!(out.samples[tail..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn tone_cues_produce_sound() {
        let cues = [
            Cue::new(
                secs(0.1),
                Action::StartTone {
                    id: "t".into(),
                    frequency: 440.0,
                },
            ),
            Cue::new(secs(0.2), Action::StopAll),
        ];
        let out = bounce(&cues, secs(0.3), 48000, SchedulerConfig::default()).unwrap();
        assert!(out.samples[..4800].iter().all(|&s| s == 0.0));
        assert!(out.samples[4800..9600].iter().any(|s| s.abs() > 0.2));
        assert!(out.samples[9601..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn wav_export_has_header() {
        let out = bounce(&[], secs(0.01), 8000, SchedulerConfig::default()).unwrap();
        let wav = out.to_wav().unwrap();
        assert_eq!(wav.len(), 44 + 80 * 2);
        assert_eq!(&wav[..4], b"RIFF");
    }
}
