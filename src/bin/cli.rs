//! tonelab CLI: click trains, polyrhythms and tones on the default output
//! device, or bounced to WAV.
//!
//! Usage:
//!   tl-cli click --rate 220
//!   tl-cli poly --ratio 5:4 --base 2 --seconds 8
//!   tl-cli tone --freq 440 --wav a4.wav
//!   tl-cli click --rate 2 --note 1n --count 4 --bpm 90

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use thiserror::Error;
use tl_engine::{ConfigError, ContextProvider, HostClock, SchedulerConfig};
use tl_ir::{NoteDuration, ParseRatioError, Pitch, Polyrhythm, RateScale};
use tl_master::{bounce, Action, ControlError, Controller, CpalProvider, Cue, POLY_HIGH, POLY_LOW};

/// Let queued pulses and the tone release ring out before exiting.
const TAIL: Duration = Duration::from_millis(200);

/// tonelab - click trains that turn into pitch
#[derive(Parser)]
#[command(name = "tl-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON file with scheduler settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Lookahead window in seconds
    #[arg(long, global = true)]
    lookahead: Option<f64>,

    /// Scheduling timer period in milliseconds
    #[arg(long, global = true)]
    timer_ms: Option<u64>,

    /// Sample rate for WAV output
    #[arg(long, global = true, default_value_t = 48000)]
    sample_rate: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single click train
    Click {
        /// Clicks per second (0.5 - 500)
        #[arg(long)]
        rate: f64,

        /// Use the low click instead of the accent
        #[arg(long)]
        low: bool,

        #[command(flatten)]
        output: Output,
    },

    /// Play two click trains in a ratio
    Poly {
        /// Ratio of the two voices, e.g. 5:4
        #[arg(long, default_value = "3:2")]
        ratio: String,

        /// Cycles per second (0.5 - 150)
        #[arg(long, default_value_t = 1.0)]
        base: f64,

        #[command(flatten)]
        output: Output,
    },

    /// Play a continuous sine tone
    Tone {
        /// Frequency in Hz (20 - 2000)
        #[arg(long)]
        freq: f64,

        #[command(flatten)]
        output: Output,
    },
}

#[derive(clap::Args)]
struct Output {
    /// How long to play [default: 5]
    #[arg(long, conflicts_with = "note")]
    seconds: Option<f64>,

    /// Play for a note length instead, e.g. 1n, 4n. or 8t
    #[arg(long)]
    note: Option<NoteDuration>,

    /// How many of --note to play
    #[arg(long, default_value_t = 1, requires = "note")]
    count: u32,

    /// Tempo for --note, in quarter notes per minute
    #[arg(long, default_value_t = 120.0)]
    bpm: f64,

    /// Render to this WAV file instead of the audio device
    #[arg(long)]
    wav: Option<PathBuf>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("cannot read config {path}: {source}")]
    ReadConfig {
        path: String,
        source: std::io::Error,
    },
    #[error("bad config {path}: {source}")]
    ParseConfig {
        path: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Ratio(#[from] ParseRatioError),
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error("cannot write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("--seconds must be a positive number")]
    Seconds,
    #[error("--bpm must be a positive number")]
    Bpm,
}

impl Output {
    const DEFAULT_SECS: f64 = 5.0;

    fn length(&self) -> Result<Duration, CliError> {
        let secs = match self.note {
            Some(note) => {
                if !(self.bpm.is_finite() && self.bpm > 0.0) {
                    return Err(CliError::Bpm);
                }
                note.secs(self.bpm) * f64::from(self.count)
            }
            None => self.seconds.unwrap_or(Self::DEFAULT_SECS),
        };
        if !(secs.is_finite() && secs > 0.0) {
            return Err(CliError::Seconds);
        }
        Ok(Duration::from_secs_f64(secs))
    }
}

fn main() -> ExitCode {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli)?;

    let (cues, output) = match &cli.command {
        Commands::Click { rate, low, output } => {
            let rate = checked(RateScale::CLICK_TRAIN, *rate, "rate");
            describe_rate(rate);
            let start = Action::StartClick {
                id: "click".into(),
                rate,
                is_high: !low,
            };
            (vec![Cue::new(Duration::ZERO, start)], output)
        }
        Commands::Poly { ratio, base, output } => {
            let ratio: Polyrhythm = ratio.parse()?;
            let base = checked(RateScale::POLYRHYTHM_BASE, *base, "base");
            let (high, low) = ratio.rates(base);
            println!(
                "{ratio} at {base} cycles/s: {high} Hz against {low} Hz ({})",
                ratio.interval_name().unwrap_or("no named interval")
            );
            let cues = vec![
                Cue::new(
                    Duration::ZERO,
                    Action::StartClick {
                        id: POLY_HIGH.into(),
                        rate: high,
                        is_high: true,
                    },
                ),
                Cue::new(
                    Duration::ZERO,
                    Action::StartClick {
                        id: POLY_LOW.into(),
                        rate: low,
                        is_high: false,
                    },
                ),
            ];
            (cues, output)
        }
        Commands::Tone { freq, output } => {
            let freq = checked(RateScale::TONE, *freq, "frequency");
            match Pitch::nearest(freq) {
                Some((pitch, cents)) => println!("{freq:.1} Hz ~ {pitch} {cents:+} cents"),
                None => println!("{freq:.1} Hz"),
            }
            let start = Action::StartTone {
                id: "tone".into(),
                frequency: freq,
            };
            (vec![Cue::new(Duration::ZERO, start)], output)
        }
    };

    let length = output.length()?;

    match &output.wav {
        Some(path) => render_to_wav(cues, length, cli.sample_rate, config, path),
        None => {
            let provider = CpalProvider::new(config.glide_secs);
            let mut ctl = Controller::with_parts(provider, tl_engine::MonotonicClock::new(), config)?;
            play_live(&mut ctl, &cues, length)
        }
    }
}

fn load_config(cli: &Cli) -> Result<SchedulerConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
                path: path.display().to_string(),
                source,
            })?;
            serde_json::from_str(&text).map_err(|source| CliError::ParseConfig {
                path: path.display().to_string(),
                source,
            })?
        }
        None => SchedulerConfig::default(),
    };
    if let Some(lookahead) = cli.lookahead {
        config.lookahead_secs = lookahead;
    }
    if let Some(timer_ms) = cli.timer_ms {
        config.timer_period_ms = timer_ms;
    }
    config.validate()?;
    log::debug!("scheduler config: {config:?}");
    Ok(config)
}

/// Keep `value` inside the lesson's slider range.
fn checked(scale: RateScale, value: f64, what: &str) -> f64 {
    let clamped = scale.clamp(value);
    if clamped != value {
        log::warn!(
            "{what} {value} outside {}..{}; using {clamped}",
            scale.min(),
            scale.max()
        );
    }
    clamped
}

fn describe_rate(rate: f64) {
    match Pitch::nearest(rate) {
        Some((pitch, cents)) if rate >= RateScale::PITCH_THRESHOLD => {
            println!("{rate} clicks/s, heard as {pitch} {cents:+} cents")
        }
        _ => println!("{rate} clicks/s, heard as rhythm"),
    }
}

fn play_live<P: ContextProvider, H: HostClock>(
    ctl: &mut Controller<P, H>,
    cues: &[Cue],
    length: Duration,
) -> Result<(), CliError> {
    for cue in cues {
        match &cue.action {
            Action::StartClick { id, rate, is_high } => ctl.start_click_train(id, *rate, *is_high)?,
            Action::StartTone { id, frequency } => ctl.start_tone(*frequency, Some(id.as_str()))?,
            other => log::warn!("ignoring {other:?} in live mode"),
        }
    }
    println!("Playing for {:.1}s...", length.as_secs_f64());

    let end = ctl.host().now() + length;
    loop {
        let now = ctl.host().now();
        if now >= end {
            break;
        }
        let wake = ctl.next_deadline().map_or(end, |d| d.min(end));
        if wake > now {
            std::thread::sleep(wake - now);
        }
        ctl.run_timers();
    }

    ctl.stop_all_tones();
    std::thread::sleep(TAIL);
    println!("Done.");
    Ok(())
}

fn render_to_wav(
    mut cues: Vec<Cue>,
    length: Duration,
    sample_rate: u32,
    config: SchedulerConfig,
    path: &Path,
) -> Result<(), CliError> {
    println!("Rendering to {} at {} Hz...", path.display(), sample_rate);
    cues.push(Cue::new(length, Action::StopAll));

    let out = bounce(&cues, length + TAIL, sample_rate, config)?;
    let wav = out.to_wav()?;
    std::fs::write(path, &wav).map_err(|source| CliError::Write {
        path: path.display().to_string(),
        source,
    })?;

    println!(
        "Rendered {:.2}s, {} pulses, {} bytes",
        out.duration().as_secs_f64(),
        out.pulses.len(),
        wav.len()
    );
    Ok(())
}
