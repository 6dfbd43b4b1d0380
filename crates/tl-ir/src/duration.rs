//! Note-duration tokens relative to a tempo.
//!
//! Tokens follow the `"<n>n"` convention (`"4n"` = quarter note), with an
//! optional dot (`"4n."`) or a triplet form (`"8t"`).

use core::fmt;
use core::str::FromStr;
use thiserror::Error;

/// Error parsing a duration token.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseDurationError {
    #[error("duration token must look like \"4n\", \"8t\" or \"4n.\"")]
    Malformed,
    #[error("note division must be a power of two between 1 and 64, got {0}")]
    Division(u32),
}

/// How a base division is modified.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Modifier {
    #[default]
    Plain,
    Dotted,
    Triplet,
}

/// A note value such as an eighth note or a dotted quarter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NoteDuration {
    /// 1 = whole, 2 = half, 4 = quarter, ...
    pub division: u32,
    pub modifier: Modifier,
}

impl NoteDuration {
    pub const WHOLE: Self = Self::plain(1);
    pub const HALF: Self = Self::plain(2);
    pub const QUARTER: Self = Self::plain(4);
    pub const EIGHTH: Self = Self::plain(8);

    pub const fn plain(division: u32) -> Self {
        Self {
            division,
            modifier: Modifier::Plain,
        }
    }

    /// Length in quarter-note beats.
    pub fn beats(self) -> f64 {
        let base = 4.0 / self.division as f64;
        match self.modifier {
            Modifier::Plain => base,
            Modifier::Dotted => base * 1.5,
            Modifier::Triplet => base * 2.0 / 3.0,
        }
    }

    /// Length in seconds at `bpm` quarter notes per minute.
    pub fn secs(self, bpm: f64) -> f64 {
        self.beats() * 60.0 / bpm
    }
}

impl fmt::Display for NoteDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.modifier {
            Modifier::Plain => write!(f, "{}n", self.division),
            Modifier::Dotted => write!(f, "{}n.", self.division),
            Modifier::Triplet => write!(f, "{}t", self.division),
        }
    }
}

impl FromStr for NoteDuration {
    type Err = ParseDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or(ParseDurationError::Malformed)?;
        let (digits, suffix) = s.split_at(split);
        let division: u32 = digits.parse().map_err(|_| ParseDurationError::Malformed)?;

        let modifier = match suffix {
            "n" => Modifier::Plain,
            "n." => Modifier::Dotted,
            "t" => Modifier::Triplet,
            _ => return Err(ParseDurationError::Malformed),
        };
        if !division.is_power_of_two() || division > 64 {
            return Err(ParseDurationError::Division(division));
        }

        Ok(Self { division, modifier })
    }
}
