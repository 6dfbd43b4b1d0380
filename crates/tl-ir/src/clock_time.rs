//! Positions on the audio output timeline.

/// An absolute position on the audio clock, in seconds since the clock
/// was opened.
///
/// The audio clock is the only time base pulses are scheduled against;
/// wall-clock timers merely decide *when* to look ahead.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct ClockTime(f64);

impl ClockTime {
    /// The moment the clock was opened.
    pub const ZERO: Self = Self(0.0);

    /// Create a clock time from seconds.
    pub const fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    /// Seconds since the clock was opened.
    pub const fn as_secs(self) -> f64 {
        self.0
    }

    /// The clock time at which frame `frame` is emitted.
    pub fn from_frames(frame: u64, sample_rate: u32) -> Self {
        if sample_rate == 0 {
            return Self::ZERO;
        }
        Self(frame as f64 / sample_rate as f64)
    }

    /// The nearest output frame for this time. Negative times map to frame 0.
    pub fn to_frames(self, sample_rate: u32) -> u64 {
        if self.0 <= 0.0 {
            return 0;
        }
        libm::round(self.0 * sample_rate as f64) as u64
    }

    /// Advance by `secs` seconds.
    pub fn add_secs(self, secs: f64) -> Self {
        Self(self.0 + secs)
    }

    /// Seconds elapsed since `earlier` (negative if `earlier` is later).
    pub fn secs_since(self, earlier: ClockTime) -> f64 {
        self.0 - earlier.0
    }

    /// The later of two times.
    pub fn max(self, other: ClockTime) -> Self {
        if other.0 > self.0 {
            other
        } else {
            self
        }
    }
}
