//! Integration test: lesson-style cue lists → offline bounce → verify the
//! pulse log and the rendered audio.

use pretty_assertions::assert_eq;
use std::time::Duration;
use tl_engine::SchedulerConfig;
use tl_ir::{PitchClass, Polyrhythm, RateScale};
use tl_master::{bounce, Action, Bounce, Cue, POLY_HIGH, POLY_LOW};

const SR: u32 = 44100;

fn secs(v: f64) -> Duration {
    Duration::from_secs_f64(v)
}

fn start_click(at: f64, id: &str, rate: f64, is_high: bool) -> Cue {
    Cue::new(
        secs(at),
        Action::StartClick {
            id: id.into(),
            rate,
            is_high,
        },
    )
}

fn onsets(out: &Bounce, pitch: PitchClass) -> Vec<f64> {
    out.pulses
        .iter()
        .filter(|p| p.pitch == pitch)
        .map(|p| p.at.as_secs())
        .collect()
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

#[test]
fn two_voices_joined_then_stopped() {
    let cues = [
        start_click(0.0, "v1", 5.0, true),
        start_click(1.0, "v2", 4.0, false),
        Cue::new(secs(2.0), Action::StopAll),
    ];
    let out = bounce(&cues, secs(3.0), SR, SchedulerConfig::default()).unwrap();

    let high = onsets(&out, PitchClass::High);
    let low = onsets(&out, PitchClass::Low);
    let high_before_stop = high.iter().filter(|&&t| t < 2.0).count();
    let low_before_stop = low.iter().filter(|&&t| t < 2.0).count();
    assert!((9..=11).contains(&high_before_stop), "{high:?}");
    assert!((3..=5).contains(&low_before_stop), "{low:?}");
    assert!(high.iter().filter(|&&t| t >= 2.0).count() <= 1);
    assert!(low.iter().filter(|&&t| t >= 2.0).count() <= 1);

    // the last second is silent once the in-flight pulses have decayed
    let quiet_from = (2.1 * SR as f64) as usize;
    assert_eq!(peak(&out.samples[quiet_from..]), 0.0);
    assert!(peak(&out.samples[..quiet_from]) > 0.05);
}

#[test]
fn polyrhythm_fills_the_cycle() {
    let ratio: Polyrhythm = "3:2".parse().unwrap();
    let (high, low) = ratio.rates(1.0);
    let cues = [
        start_click(0.0, POLY_HIGH, high, true),
        start_click(0.0, POLY_LOW, low, false),
        Cue::new(secs(4.0), Action::StopAll),
    ];
    let out = bounce(&cues, secs(4.0), SR, SchedulerConfig::default()).unwrap();

    let high = onsets(&out, PitchClass::High);
    let low = onsets(&out, PitchClass::Low);
    assert_eq!(high.iter().filter(|&&t| t < 3.99).count(), 12);
    assert_eq!(low.iter().filter(|&&t| t < 3.99).count(), 8);
    // downbeats coincide every cycle
    for cycle in 0..4 {
        let t = cycle as f64;
        assert!(high.iter().any(|&h| (h - t).abs() < 1e-9));
        assert!(low.iter().any(|&l| (l - t).abs() < 1e-9));
    }
}

#[test]
fn slider_sweep_changes_spacing() {
    let scale = RateScale::CLICK_TRAIN;
    let slow = scale.rate_at(0.3);
    let fast = scale.rate_at(0.6);
    let cues = [
        start_click(0.0, "sweep", slow, true),
        Cue::new(
            secs(1.0),
            Action::SetRate {
                id: "sweep".into(),
                rate: fast,
            },
        ),
        Cue::new(
            secs(2.0),
            Action::StopClick {
                id: "sweep".into(),
            },
        ),
    ];
    let out = bounce(&cues, secs(2.5), SR, SchedulerConfig::default()).unwrap();
    let times = onsets(&out, PitchClass::High);
    let gaps: Vec<f64> = times.windows(2).map(|w| w[1] - w[0]).collect();

    let first = gaps[0];
    let last = gaps[gaps.len() - 1];
    assert!((first - 1.0 / slow).abs() < 1e-9);
    assert!((last - 1.0 / fast).abs() < 1e-9);
    // once the new period starts it never goes back
    let switch = gaps.iter().position(|g| (g - 1.0 / fast).abs() < 1e-9).unwrap();
    assert!(gaps[switch..].iter().all(|g| (g - 1.0 / fast).abs() < 1e-9));
}

#[test]
fn tone_and_click_mix_and_export() {
    let cues = [
        Cue::new(
            secs(0.0),
            Action::StartTone {
                id: "drone".into(),
                frequency: 110.0,
            },
        ),
        start_click(0.0, "beat", 2.0, true),
        Cue::new(
            secs(0.5),
            Action::SetFrequency {
                id: "drone".into(),
                frequency: 220.0,
            },
        ),
        Cue::new(
            secs(1.0),
            Action::StopTone {
                id: "drone".into(),
            },
        ),
    ];
    let out = bounce(&cues, secs(1.2), SR, SchedulerConfig::default()).unwrap();

    assert!(peak(&out.samples[..SR as usize]) > 0.2);
    assert!(peak(&out.samples) <= 1.0);
    let wav = out.to_wav().unwrap();
    assert_eq!(wav.len(), 44 + out.samples.len() * 2);
    assert_eq!(out.duration(), Duration::from_secs_f64(out.samples.len() as f64 / SR as f64));
}
