//! Scheduler tuning.

use std::time::Duration;
use thiserror::Error;

use crate::renderer::MAX_LOOKAHEAD_MS;

/// Error returned by [`SchedulerConfig::validate`].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    #[error("timer period must be non-zero")]
    ZeroTimerPeriod,
    #[error("lookahead ({lookahead_secs} s) must exceed the timer period ({timer_period_ms} ms)")]
    LookaheadTooShort {
        lookahead_secs: f64,
        timer_period_ms: u64,
    },
    #[error("lookahead ({lookahead_secs} s) exceeds the {max_ms} ms the renderer can hold")]
    LookaheadTooLong { lookahead_secs: f64, max_ms: usize },
    #[error("{field} must be a finite, non-negative number")]
    Invalid { field: &'static str },
}

/// Timing and level settings shared by the click scheduler and the tone bank.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchedulerConfig {
    /// How far ahead of the audio clock pulses are queued, in seconds.
    pub lookahead_secs: f64,
    /// Delay between scheduling passes of one voice, in milliseconds.
    pub timer_period_ms: u64,
    /// Linear gain of each click voice's gain node.
    pub voice_gain: f32,
    /// Level of the shared tone bus, in dB.
    pub tone_gain_db: f32,
    /// Time constant of the oscillator frequency glide, in seconds.
    pub glide_secs: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lookahead_secs: 0.12,
            timer_period_ms: 50,
            voice_gain: 0.5,
            tone_gain_db: -12.0,
            glide_secs: 0.005,
        }
    }
}

impl SchedulerConfig {
    /// Timer period as a `Duration`.
    pub fn timer_period(&self) -> Duration {
        Duration::from_millis(self.timer_period_ms)
    }

    /// Linear gain of the tone bus.
    pub fn tone_gain(&self) -> f32 {
        10f32.powf(self.tone_gain_db / 20.0)
    }

    /// Check that a late or skipped timer tick cannot open a gap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timer_period_ms == 0 {
            return Err(ConfigError::ZeroTimerPeriod);
        }
        let finite = |v: f64| v.is_finite() && v >= 0.0;
        if !finite(self.lookahead_secs) {
            return Err(ConfigError::Invalid {
                field: "lookahead_secs",
            });
        }
        if !finite(self.glide_secs) {
            return Err(ConfigError::Invalid { field: "glide_secs" });
        }
        if !finite(self.voice_gain as f64) {
            return Err(ConfigError::Invalid { field: "voice_gain" });
        }
        if !self.tone_gain_db.is_finite() {
            return Err(ConfigError::Invalid {
                field: "tone_gain_db",
            });
        }
        if self.lookahead_secs <= self.timer_period().as_secs_f64() {
            return Err(ConfigError::LookaheadTooShort {
                lookahead_secs: self.lookahead_secs,
                timer_period_ms: self.timer_period_ms,
            });
        }
        if self.lookahead_secs * 1000.0 > MAX_LOOKAHEAD_MS as f64 {
            return Err(ConfigError::LookaheadTooLong {
                lookahead_secs: self.lookahead_secs,
                max_ms: MAX_LOOKAHEAD_MS,
            });
        }
        Ok(())
    }
}
