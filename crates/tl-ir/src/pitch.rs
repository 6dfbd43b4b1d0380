//! Pitch names and equal-temperament frequencies.
//!
//! Pitches are written the way lesson pages hand them to the note player:
//! a note name, an optional accidental, and an octave (`"C#4"`, `"Bb3"`).

use core::fmt;
use core::str::FromStr;
use thiserror::Error;

/// Concert A (A4) in Hz.
pub const A4_HZ: f64 = 440.0;

/// MIDI number of A4.
const A4_MIDI: i32 = 69;

/// The twelve pitch classes, spelled with sharps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NoteName {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl NoteName {
    /// All note names in chromatic order from C.
    pub const ALL: [NoteName; 12] = [
        NoteName::C,
        NoteName::CSharp,
        NoteName::D,
        NoteName::DSharp,
        NoteName::E,
        NoteName::F,
        NoteName::FSharp,
        NoteName::G,
        NoteName::GSharp,
        NoteName::A,
        NoteName::ASharp,
        NoteName::B,
    ];

    /// Semitones above C.
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Note name `index` semitones above C (wraps modulo 12).
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.rem_euclid(12) as usize]
    }

    /// Shift by `semitones`, wrapping within the octave.
    pub fn transpose(self, semitones: i32) -> Self {
        Self::from_index(self.index() as i32 + semitones.rem_euclid(12))
    }

    /// Sharp spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            NoteName::C => "C",
            NoteName::CSharp => "C#",
            NoteName::D => "D",
            NoteName::DSharp => "D#",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::FSharp => "F#",
            NoteName::G => "G",
            NoteName::GSharp => "G#",
            NoteName::A => "A",
            NoteName::ASharp => "A#",
            NoteName::B => "B",
        }
    }

    /// Flat spelling for the black keys (`None` for naturals).
    pub const fn flat_name(self) -> Option<&'static str> {
        match self {
            NoteName::CSharp => Some("Db"),
            NoteName::DSharp => Some("Eb"),
            NoteName::FSharp => Some("Gb"),
            NoteName::GSharp => Some("Ab"),
            NoteName::ASharp => Some("Bb"),
            _ => None,
        }
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a pitch string.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParsePitchError {
    #[error("empty pitch string")]
    Empty,
    #[error("unknown note letter '{0}'")]
    Letter(char),
    #[error("missing or invalid octave in pitch string")]
    Octave,
}

/// A note name in a specific octave (scientific pitch notation).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pitch {
    pub note: NoteName,
    pub octave: i8,
}

impl Pitch {
    pub const fn new(note: NoteName, octave: i8) -> Self {
        Self { note, octave }
    }

    /// MIDI note number (C4 = 60).
    pub fn midi(self) -> i32 {
        (self.octave as i32 + 1) * 12 + self.note.index() as i32
    }

    /// Equal-temperament frequency in Hz, A4 = 440.
    pub fn frequency(self) -> f64 {
        A4_HZ * libm::exp2((self.midi() - A4_MIDI) as f64 / 12.0)
    }

    /// Shift by `semitones`, carrying into the octave. `None` if the
    /// octave leaves the `i8` range.
    pub fn transpose(self, semitones: i32) -> Option<Self> {
        let midi = self.midi().checked_add(semitones)?;
        let octave = i8::try_from(midi.div_euclid(12) - 1).ok()?;
        Some(Self {
            note: NoteName::from_index(midi),
            octave,
        })
    }

    /// Nearest pitch to `freq` and the deviation from it in whole cents.
    ///
    /// `None` unless `freq` is positive and finite and within the octaves
    /// a `Pitch` can name.
    pub fn nearest(freq: f64) -> Option<(Pitch, i32)> {
        if !(freq.is_finite() && freq > 0.0) {
            return None;
        }
        // |semitones| < 13_000 for any positive finite f64
        let semitones = 12.0 * libm::log2(freq / A4_HZ);
        let rounded = libm::round(semitones);
        let cents = libm::round((semitones - rounded) * 100.0) as i32;
        let pitch = Pitch::new(NoteName::A, 4).transpose(rounded as i32)?;
        Some((pitch, cents))
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.note, self.octave)
    }
}

impl FromStr for Pitch {
    type Err = ParsePitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let letter = s.chars().next().ok_or(ParsePitchError::Empty)?;
        let natural = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            other => return Err(ParsePitchError::Letter(other)),
        };

        let mut rest = &s[letter.len_utf8()..];
        let accidental = if let Some(r) = rest.strip_prefix('#') {
            rest = r;
            1
        } else if let Some(r) = rest.strip_prefix('b') {
            rest = r;
            -1
        } else {
            0
        };
        let octave: i8 = rest.parse().map_err(|_| ParsePitchError::Octave)?;

        // Cb and B# cross the octave boundary
        Pitch::new(NoteName::C, octave)
            .transpose(natural + accidental)
            .ok_or(ParsePitchError::Octave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_naturals_sharps_and_flats() {
        assert_eq!("C4".parse::<Pitch>().unwrap(), Pitch::new(NoteName::C, 4));
        assert_eq!("C#4".parse::<Pitch>().unwrap(), Pitch::new(NoteName::CSharp, 4));
        assert_eq!("Bb3".parse::<Pitch>().unwrap(), Pitch::new(NoteName::ASharp, 3));
        assert_eq!("Cb4".parse::<Pitch>().unwrap(), Pitch::new(NoteName::B, 3));
        assert_eq!("A-1".parse::<Pitch>().unwrap(), Pitch::new(NoteName::A, -1));
    }

    #[test]
    fn rejects_malformed_pitches() {
        assert_eq!("".parse::<Pitch>(), Err(ParsePitchError::Empty));
        assert_eq!("H4".parse::<Pitch>(), Err(ParsePitchError::Letter('H')));
        assert_eq!("C#".parse::<Pitch>(), Err(ParsePitchError::Octave));
        assert_eq!("Dx4".parse::<Pitch>(), Err(ParsePitchError::Octave));
    }

    #[test]
    fn display_round_trips_sharp_spelling() {
        let p: Pitch = "F#2".parse().unwrap();
        assert_eq!(p.to_string(), "F#2");
    }

    #[test]
    fn reference_frequencies() {
        assert!((Pitch::new(NoteName::A, 4).frequency() - 440.0).abs() < 1e-9);
        assert!((Pitch::new(NoteName::A, 3).frequency() - 220.0).abs() < 1e-9);
        assert!((Pitch::new(NoteName::C, 4).frequency() - 261.6256).abs() < 1e-3);
        assert_eq!(Pitch::new(NoteName::C, 4).midi(), 60);
    }

    #[test]
    fn nearest_note_and_cents() {
        assert_eq!(Pitch::nearest(440.0), Some((Pitch::new(NoteName::A, 4), 0)));
        assert_eq!(Pitch::nearest(261.63).unwrap().0, Pitch::new(NoteName::C, 4));
        // a 5 Hz click train sits far below the keyboard
        assert_eq!(Pitch::nearest(5.0).unwrap().0.octave, -2);

        let (p, cents) = Pitch::nearest(450.0).unwrap();
        assert_eq!(p, Pitch::new(NoteName::A, 4));
        assert_eq!(cents, 39);
    }

    #[test]
    fn transpose_wraps_into_next_octave() {
        let b3 = Pitch::new(NoteName::B, 3);
        assert_eq!(b3.transpose(1), Some(Pitch::new(NoteName::C, 4)));
        assert_eq!(NoteName::C.transpose(-1), NoteName::B);
        assert_eq!(NoteName::D.transpose(i32::MIN), NoteName::FSharp);
        assert_eq!(NoteName::A.flat_name(), None);
        assert_eq!(NoteName::GSharp.flat_name(), Some("Ab"));
    }

    #[test]
    fn nearest_rejects_unnameable_frequencies() {
        for freq in [f64::INFINITY, f64::NAN, 0.0, -440.0, 1e-100, 1e300] {
            assert_eq!(Pitch::nearest(freq), None, "{freq}");
        }
        // far outside hearing but still nameable
        assert!(Pitch::nearest(1e-3).is_some());
        assert!(Pitch::nearest(1e6).is_some());
    }

    #[test]
    fn transpose_stops_at_the_octave_range() {
        assert_eq!(Pitch::new(NoteName::B, 127).transpose(1), None);
        assert_eq!(Pitch::new(NoteName::C, 4).transpose(i32::MAX), None);
        assert_eq!(Pitch::new(NoteName::C, -128).transpose(-1), None);
        assert_eq!("B#127".parse::<Pitch>(), Err(ParsePitchError::Octave));
        assert_eq!("Cb-127".parse::<Pitch>().unwrap(), Pitch::new(NoteName::B, -128));
    }
}
