//! Polyrhythm ratios.
//!
//! Two click trains at `base × numerator` and `base × denominator` form a
//! polyrhythm; sped into the audible range the same ratio is heard as a
//! just interval.

use core::fmt;
use core::num::NonZeroU32;
use core::str::FromStr;
use thiserror::Error;

/// Error parsing an `"n:d"` ratio.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseRatioError {
    #[error("ratio must look like \"5:4\"")]
    Malformed,
    #[error("ratio terms must be non-zero")]
    Zero,
}

/// Two pulse counts sharing one cycle, e.g. 5 against 4.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Polyrhythm {
    numerator: NonZeroU32,
    denominator: NonZeroU32,
}

impl Polyrhythm {
    /// `None` if either term is zero.
    pub const fn new(numerator: u32, denominator: u32) -> Option<Self> {
        match (NonZeroU32::new(numerator), NonZeroU32::new(denominator)) {
            (Some(numerator), Some(denominator)) => Some(Self {
                numerator,
                denominator,
            }),
            _ => None,
        }
    }

    pub const fn numerator(self) -> u32 {
        self.numerator.get()
    }

    pub const fn denominator(self) -> u32 {
        self.denominator.get()
    }

    /// Rates of the two voices for a base cycle rate.
    pub fn rates(self, base_rate: f64) -> (f64, f64) {
        (
            base_rate * self.numerator() as f64,
            base_rate * self.denominator() as f64,
        )
    }

    /// Name of the just interval this ratio sounds like at audio rates.
    pub fn interval_name(self) -> Option<&'static str> {
        match (self.numerator(), self.denominator()) {
            (2, 1) => Some("Octave"),
            (3, 2) => Some("Perfect Fifth"),
            (4, 3) => Some("Perfect Fourth"),
            (5, 4) => Some("Major Third"),
            (5, 3) => Some("Major Sixth"),
            (6, 5) => Some("Minor Third"),
            (7, 4) => Some("Harmonic Seventh"),
            (8, 5) => Some("Minor Sixth"),
            _ => None,
        }
    }

    /// Beat indices of each voice within the shared cycle after `elapsed`
    /// seconds, for driving a visual beat display.
    pub fn beat_positions(self, base_rate: f64, elapsed: f64) -> (u32, u32) {
        let (r1, r2) = self.rates(base_rate);
        (
            libm::floor(elapsed * r1) as u32 % self.numerator,
            libm::floor(elapsed * r2) as u32 % self.denominator,
        )
    }
}

impl fmt::Display for Polyrhythm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.numerator, self.denominator)
    }
}

impl FromStr for Polyrhythm {
    type Err = ParseRatioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (n, d) = s.trim().split_once(':').ok_or(ParseRatioError::Malformed)?;
        let numerator: u32 = n.trim().parse().map_err(|_| ParseRatioError::Malformed)?;
        let denominator: u32 = d.trim().parse().map_err(|_| ParseRatioError::Malformed)?;
        Self::new(numerator, denominator).ok_or(ParseRatioError::Zero)
    }
}
