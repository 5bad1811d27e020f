//! Pitch names and percussion elements.
//!
//! Pitch names accept both letter (`C`, `F#`) and solfège (`Do`, `Fa#`)
//! spellings. Drum elements map onto General MIDI percussion keys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the twelve chromatic pitch names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchName {
    #[serde(rename = "C", alias = "Do")]
    C,
    #[serde(rename = "C#", alias = "Do#")]
    CSharp,
    #[serde(rename = "D", alias = "Re")]
    D,
    #[serde(rename = "D#", alias = "Re#")]
    DSharp,
    #[serde(rename = "E", alias = "Mi")]
    E,
    #[serde(rename = "F", alias = "Fa")]
    F,
    #[serde(rename = "F#", alias = "Fa#")]
    FSharp,
    #[serde(rename = "G", alias = "Sol")]
    G,
    #[serde(rename = "G#", alias = "Sol#")]
    GSharp,
    #[serde(rename = "A", alias = "La")]
    A,
    #[serde(rename = "A#", alias = "La#")]
    ASharp,
    #[serde(rename = "B", alias = "Si")]
    B,
}

impl PitchName {
    /// Semitone offset from C.
    pub fn semitone(self) -> u8 {
        match self {
            PitchName::C => 0,
            PitchName::CSharp => 1,
            PitchName::D => 2,
            PitchName::DSharp => 3,
            PitchName::E => 4,
            PitchName::F => 5,
            PitchName::FSharp => 6,
            PitchName::G => 7,
            PitchName::GSharp => 8,
            PitchName::A => 9,
            PitchName::ASharp => 10,
            PitchName::B => 11,
        }
    }

    /// MIDI key number for this pitch in the given octave (C4 = 60), or
    /// `None` when it falls outside 0..=127.
    pub fn checked_midi_key(self, octave: i8) -> Option<u8> {
        let key = (i16::from(octave) + 1) * 12 + i16::from(self.semitone());
        u8::try_from(key).ok().filter(|key| *key <= 127)
    }

    /// MIDI key number for this pitch in the given octave (C4 = 60).
    ///
    /// Keys above G9 are clamped to 127; `validate` rejects them.
    pub fn midi_key(self, octave: i8) -> u8 {
        let key = (i16::from(octave) + 1) * 12 + i16::from(self.semitone());
        key.clamp(0, 127) as u8
    }

    fn letter_name(self) -> &'static str {
        match self {
            PitchName::C => "C",
            PitchName::CSharp => "C#",
            PitchName::D => "D",
            PitchName::DSharp => "D#",
            PitchName::E => "E",
            PitchName::F => "F",
            PitchName::FSharp => "F#",
            PitchName::G => "G",
            PitchName::GSharp => "G#",
            PitchName::A => "A",
            PitchName::ASharp => "A#",
            PitchName::B => "B",
        }
    }
}

impl fmt::Display for PitchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter_name())
    }
}

/// Percussion element of a drum note.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrumElement {
    #[serde(rename = "kd")]
    Kick,
    #[serde(rename = "bd")]
    BassDrum,
    #[serde(rename = "sd")]
    Snare,
    #[serde(rename = "hh")]
    HiHat,
    #[serde(rename = "ch")]
    ClosedHiHat,
    #[serde(rename = "oh")]
    OpenHiHat,
    #[serde(rename = "rc")]
    Ride,
    #[serde(rename = "cc")]
    Crash,
}

impl DrumElement {
    /// General MIDI percussion key (channel 10).
    pub fn gm_key(self) -> u8 {
        match self {
            DrumElement::Kick | DrumElement::BassDrum => 35,
            DrumElement::Snare => 38,
            DrumElement::HiHat | DrumElement::ClosedHiHat => 42,
            DrumElement::OpenHiHat => 46,
            DrumElement::Ride => 53,
            DrumElement::Crash => 49,
        }
    }

    /// Short code used in model files.
    pub fn code(self) -> &'static str {
        match self {
            DrumElement::Kick => "kd",
            DrumElement::BassDrum => "bd",
            DrumElement::Snare => "sd",
            DrumElement::HiHat => "hh",
            DrumElement::ClosedHiHat => "ch",
            DrumElement::OpenHiHat => "oh",
            DrumElement::Ride => "rc",
            DrumElement::Crash => "cc",
        }
    }
}

impl fmt::Display for DrumElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midi_key() {
        assert_eq!(PitchName::C.midi_key(4), 60);
        assert_eq!(PitchName::A.midi_key(4), 69);
        assert_eq!(PitchName::C.midi_key(-1), 0);
        assert_eq!(PitchName::B.midi_key(9), 127);
    }

    #[test]
    fn test_checked_midi_key_stops_at_g9() {
        assert_eq!(PitchName::G.checked_midi_key(9), Some(127));
        assert_eq!(PitchName::GSharp.checked_midi_key(9), None);
        assert_eq!(PitchName::B.checked_midi_key(9), None);
        assert_eq!(PitchName::C.checked_midi_key(-1), Some(0));
        assert_eq!(PitchName::C.checked_midi_key(-2), None);
    }

    #[test]
    fn test_solfege_alias() {
        #[derive(Deserialize)]
        struct Wrapper {
            pitch: PitchName,
        }
        let parsed: Wrapper = serde_json::from_str(r#"{"pitch": "Sol#"}"#).unwrap();
        assert_eq!(parsed.pitch, PitchName::GSharp);
        let parsed: Wrapper = serde_json::from_str(r#"{"pitch": "G#"}"#).unwrap();
        assert_eq!(parsed.pitch, PitchName::GSharp);
    }

    #[test]
    fn test_drum_keys() {
        assert_eq!(DrumElement::Kick.gm_key(), DrumElement::BassDrum.gm_key());
        assert_eq!(DrumElement::HiHat.gm_key(), 42);
        assert_eq!(DrumElement::Crash.gm_key(), 49);
        assert_eq!(DrumElement::OpenHiHat.to_string(), "oh");
    }
}
