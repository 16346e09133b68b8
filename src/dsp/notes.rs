//! Frequency ↔ scientific pitch notation.
//!
//! Notes are numbered one per semitone with A4 = 440 Hz = 69 (the MIDI
//! convention), so C4 = 60 and the octave number changes at each C.

use std::fmt;

use serde::Serialize;

pub const A4_FREQUENCY: f32 = 440.0;
pub const A4_NOTE_NUMBER: i32 = 69;

/// Label used wherever a frequency is absent or not positive.
pub const SILENT: &str = "Silent";

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A note in equal temperament plus how far the measured pitch sits from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Note {
    pub number: i32,
    /// Deviation from the tempered note in cents, within ±50.
    pub cents: f32,
}

impl Note {
    /// Nearest note to `frequency`, or `None` for non-positive or
    /// non-finite input.
    pub fn from_frequency(frequency: f32) -> Option<Note> {
        let exact = fractional_note_number(frequency)?;
        let number = exact.round();
        Some(Note {
            number: number as i32,
            cents: (exact - number) * 100.0,
        })
    }

    pub fn from_number(number: i32) -> Note {
        Note { number, cents: 0.0 }
    }

    /// Pitch class name, e.g. "C#".
    pub fn pitch_class(&self) -> &'static str {
        NOTE_NAMES[self.number.rem_euclid(12) as usize]
    }

    /// Octave number; C4 is middle C and C-1 is note 0.
    pub fn octave(&self) -> i32 {
        (self.number - 12).div_euclid(12)
    }

    /// The measured frequency this note was built from, cents included.
    pub fn frequency(&self) -> f32 {
        let semitones = (self.number - A4_NOTE_NUMBER) as f32 + self.cents / 100.0;
        A4_FREQUENCY * (semitones / 12.0).exp2()
    }

    /// Equal-tempered frequency of the note itself.
    pub fn nominal_frequency(&self) -> f32 {
        note_to_frequency(self.number)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class(), self.octave())
    }
}

/// 12 * log2(f / 440) + 69, unrounded.
fn fractional_note_number(frequency: f32) -> Option<f32> {
    if !frequency.is_finite() || frequency <= 0.0 {
        return None;
    }
    Some(12.0 * (frequency / A4_FREQUENCY).log2() + A4_NOTE_NUMBER as f32)
}

/// Nearest note number for a frequency.
pub fn note_number(frequency: f32) -> Option<i32> {
    Note::from_frequency(frequency).map(|n| n.number)
}

/// Equal-tempered frequency of a note number: 440 * 2^((n - 69) / 12).
pub fn note_to_frequency(number: i32) -> f32 {
    A4_FREQUENCY * ((number - A4_NOTE_NUMBER) as f32 / 12.0).exp2()
}

/// Scientific pitch notation for a frequency ("A4", "C#5"), or "Silent".
pub fn note_name(frequency: f32) -> String {
    match Note::from_frequency(frequency) {
        Some(note) => note.to_string(),
        None => SILENT.to_string(),
    }
}

/// Signed distance in semitones from `reference` to `frequency`.
pub fn semitones_between(frequency: f32, reference: f32) -> Option<f32> {
    if !(frequency > 0.0 && reference > 0.0) || !frequency.is_finite() || !reference.is_finite() {
        return None;
    }
    Some(12.0 * (frequency / reference).log2())
}

/// Parse a note name such as "A4", "C#3", "Bb2" or "C-1" into a note number.
pub fn parse_note(name: &str) -> Option<i32> {
    let name = name.trim();
    let mut chars = name.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let base = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (accidental, octave) = if let Some(r) = rest.strip_prefix('#') {
        (1, r)
    } else if let Some(r) = rest.strip_prefix('b') {
        (-1, r)
    } else {
        (0, rest)
    };

    let octave: i32 = octave.parse().ok()?;
    Some((octave + 1) * 12 + base + accidental)
}
