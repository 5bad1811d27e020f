//! Default octave and note type resolution.

use crate::duration::DurationToken;
use crate::model::{ClassicNote, Music};
use crate::pitch::PitchName;

/// Octave and note type substituted into notes that omit them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Defaults {
    pub octave: i8,
    pub note_type: DurationToken,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            octave: 5,
            note_type: DurationToken::QUARTER,
        }
    }
}

impl Defaults {
    pub fn new(octave: i8, note_type: DurationToken) -> Self {
        Self { octave, note_type }
    }

    /// Model defaults, each falling back to `fallback` when the model has none.
    pub fn for_music(music: &Music, fallback: Defaults) -> Self {
        Self {
            octave: music.default_octave.unwrap_or(fallback.octave),
            note_type: music.default_note_type.unwrap_or(fallback.note_type),
        }
    }

    /// Produce a fully specified copy of `note`; the note itself is untouched.
    pub fn resolve(&self, note: &ClassicNote) -> ResolvedNote {
        ResolvedNote {
            pitch: note.pitch,
            octave: note.octave.unwrap_or(self.octave),
            note_type: note.note_type.unwrap_or(self.note_type),
            velocity: note.velocity,
            delay: note.delay.clone(),
            pause: note.pause.clone(),
        }
    }
}

/// A classic note with octave and note type filled in.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedNote {
    pub pitch: PitchName,
    pub octave: i8,
    pub note_type: DurationToken,
    pub velocity: u8,
    pub delay: Vec<DurationToken>,
    pub pause: Vec<DurationToken>,
}

impl ResolvedNote {
    pub fn midi_key(&self) -> u8 {
        self.pitch.midi_key(self.octave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::Resolution;

    #[test]
    fn test_resolve_fills_missing_fields_only() {
        let defaults = Defaults::new(3, DurationToken::HALF);

        let bare = ClassicNote::new(PitchName::A);
        let resolved = defaults.resolve(&bare);
        assert_eq!(resolved.octave, 3);
        assert_eq!(resolved.note_type, DurationToken::HALF);
        assert_eq!(bare.octave, None);

        let explicit = ClassicNote::new(PitchName::A)
            .with_octave(6)
            .with_note_type(DurationToken::EIGHTH);
        let resolved = defaults.resolve(&explicit);
        assert_eq!(resolved.octave, 6);
        assert_eq!(resolved.note_type, DurationToken::EIGHTH);
        assert_eq!(resolved.midi_key(), 93);
    }

    #[test]
    fn test_fallback_per_field() {
        let mut music = Music::new("m", Resolution::new(4).unwrap());
        music.default_octave = Some(2);
        let defaults = Defaults::for_music(&music, Defaults::default());
        assert_eq!(defaults.octave, 2);
        assert_eq!(defaults.note_type, DurationToken::QUARTER);
    }
}
