//! The music model handed to the engine.
//!
//! The model is built once (deserialized from TOML by the CLI, or produced by
//! any other front end) and is read-only to the engine. Patterns are shared
//! by every track that references them; the engine only ever clones notes
//! out of them.
//!
//! # Example
//!
//! ```toml
//! name = "demo"
//! tempo = 120.0
//! numerator = 4
//! denominator = 4
//! resolution = 4
//! default_octave = 4
//! default_note_type = "quarter"
//!
//! [[patterns]]
//! name = "groove"
//! notes = [
//!     { kind = "drum", element = "kd" },
//!     { kind = "drum", element = "hh", delay = ["chord"] },
//! ]
//!
//! [[tracks]]
//! name = "lead"
//! instrument = { program = 0 }
//! entries = [
//!     { kind = "note", pitch = "C" },
//!     { kind = "note", pitch = "E", pause = ["quarter"] },
//! ]
//! ```

use crate::duration::{starts_with_chord_marker, DurationToken, Resolution};
use crate::pitch::{DrumElement, PitchName};
use serde::{Deserialize, Serialize};

/// Velocity used when a note does not specify one.
pub const DEFAULT_VELOCITY: u8 = 100;

fn default_velocity() -> u8 {
    DEFAULT_VELOCITY
}

fn default_repeat_count() -> i64 {
    1
}

/// Top-level music model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Music {
    /// Name of the piece.
    pub name: String,
    /// Initial tempo in beats per minute.
    pub tempo: f64,
    /// Initial time signature numerator.
    pub numerator: u8,
    /// Initial time signature denominator.
    pub denominator: u8,
    /// Ticks per quarter note.
    pub resolution: Resolution,
    /// Octave for notes that omit one.
    #[serde(default)]
    pub default_octave: Option<i8>,
    /// Note type for notes that omit one.
    #[serde(default)]
    pub default_note_type: Option<DurationToken>,
    /// Reusable note sequences.
    #[serde(default)]
    pub patterns: Vec<PatternDeclaration>,
    /// Tracks in output order.
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Music {
    /// Create an empty model in 4/4 at 120 BPM.
    pub fn new(name: impl Into<String>, resolution: Resolution) -> Self {
        Self {
            name: name.into(),
            tempo: 120.0,
            numerator: 4,
            denominator: 4,
            resolution,
            default_octave: None,
            default_note_type: None,
            patterns: Vec::new(),
            tracks: Vec::new(),
        }
    }

    /// Look up a pattern declaration by name.
    pub fn pattern(&self, name: &str) -> Option<&PatternDeclaration> {
        self.patterns.iter().find(|p| p.name == name)
    }

    /// Set the model defaults.
    pub fn with_defaults(mut self, octave: i8, note_type: DurationToken) -> Self {
        self.default_octave = Some(octave);
        self.default_note_type = Some(note_type);
        self
    }

    /// Add a pattern declaration.
    pub fn with_pattern(mut self, pattern: PatternDeclaration) -> Self {
        self.patterns.push(pattern);
        self
    }

    /// Add a track.
    pub fn with_track(mut self, track: Track) -> Self {
        self.tracks.push(track);
        self
    }
}

/// Instrument a track plays on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instrument {
    /// Percussion kit; notes are drum hits.
    Drums,
    /// Melodic instrument selected by General MIDI program number.
    Program(u8),
}

/// Whether a track carries drum hits or pitched notes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Melodic,
    Percussive,
}

/// A named sequence of entries played on one instrument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub instrument: Instrument,
    #[serde(default)]
    pub entries: Vec<TrackEntry>,
}

impl Track {
    /// Create an empty track.
    pub fn new(name: impl Into<String>, instrument: Instrument) -> Self {
        Self {
            name: name.into(),
            instrument,
            entries: Vec::new(),
        }
    }

    /// Add an entry.
    pub fn with_entry(mut self, entry: impl Into<TrackEntry>) -> Self {
        self.entries.push(entry.into());
        self
    }

    /// Kind implied by the instrument.
    pub fn kind(&self) -> TrackKind {
        match self.instrument {
            Instrument::Drums => TrackKind::Percussive,
            Instrument::Program(_) => TrackKind::Melodic,
        }
    }
}

/// One entry of a track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackEntry {
    Note(ClassicNote),
    Drum(DrumNote),
    Pattern(PatternReference),
    TimeSignature(TimeSignatureChange),
    Tempo(TempoChange),
    PitchBend(PitchBend),
}

impl From<ClassicNote> for TrackEntry {
    fn from(value: ClassicNote) -> Self {
        TrackEntry::Note(value)
    }
}

impl From<DrumNote> for TrackEntry {
    fn from(value: DrumNote) -> Self {
        TrackEntry::Drum(value)
    }
}

impl From<PatternReference> for TrackEntry {
    fn from(value: PatternReference) -> Self {
        TrackEntry::Pattern(value)
    }
}

impl From<TimeSignatureChange> for TrackEntry {
    fn from(value: TimeSignatureChange) -> Self {
        TrackEntry::TimeSignature(value)
    }
}

impl From<TempoChange> for TrackEntry {
    fn from(value: TempoChange) -> Self {
        TrackEntry::Tempo(value)
    }
}

impl From<PitchBend> for TrackEntry {
    fn from(value: PitchBend) -> Self {
        TrackEntry::PitchBend(value)
    }
}

/// A pitched note.
///
/// `delay` positions the note relative to the start of the previous event,
/// `pause` relative to its end. At most one of them is non-empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassicNote {
    pub pitch: PitchName,
    #[serde(default)]
    pub octave: Option<i8>,
    #[serde(default)]
    pub note_type: Option<DurationToken>,
    #[serde(default = "default_velocity")]
    pub velocity: u8,
    #[serde(default)]
    pub delay: Vec<DurationToken>,
    #[serde(default)]
    pub pause: Vec<DurationToken>,
}

impl ClassicNote {
    /// Create a note that relies on the model defaults.
    pub fn new(pitch: PitchName) -> Self {
        Self {
            pitch,
            octave: None,
            note_type: None,
            velocity: DEFAULT_VELOCITY,
            delay: Vec::new(),
            pause: Vec::new(),
        }
    }

    pub fn with_octave(mut self, octave: i8) -> Self {
        self.octave = Some(octave);
        self
    }

    pub fn with_note_type(mut self, note_type: DurationToken) -> Self {
        self.note_type = Some(note_type);
        self
    }

    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_delay(mut self, delay: Vec<DurationToken>) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_pause(mut self, pause: Vec<DurationToken>) -> Self {
        self.pause = pause;
        self
    }
}

/// A single percussion hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrumNote {
    pub element: DrumElement,
    #[serde(default = "default_velocity")]
    pub velocity: u8,
    #[serde(default)]
    pub delay: Vec<DurationToken>,
    #[serde(default)]
    pub pause: Vec<DurationToken>,
}

impl DrumNote {
    pub fn new(element: DrumElement) -> Self {
        Self {
            element,
            velocity: DEFAULT_VELOCITY,
            delay: Vec::new(),
            pause: Vec::new(),
        }
    }

    /// Mark this hit as struck together with the previous one.
    pub fn chorded(mut self) -> Self {
        self.delay = vec![DurationToken::CHORD];
        self
    }

    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_delay(mut self, delay: Vec<DurationToken>) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_pause(mut self, pause: Vec<DurationToken>) -> Self {
        self.pause = pause;
        self
    }

    /// Check if the delay starts with the chord marker.
    pub fn is_chord_marked(&self) -> bool {
        starts_with_chord_marker(&self.delay)
    }
}

/// Use of a declared pattern inside a track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternReference {
    /// Name of the referenced pattern.
    pub pattern: String,
    /// How many times the pattern is played back to back.
    #[serde(default = "default_repeat_count")]
    pub repeat_count: i64,
    /// Replaces the pause of the very first expanded note.
    #[serde(default)]
    pub pause: Vec<DurationToken>,
}

impl PatternReference {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            repeat_count: 1,
            pause: Vec::new(),
        }
    }

    pub fn repeated(mut self, count: i64) -> Self {
        self.repeat_count = count;
        self
    }

    pub fn with_pause(mut self, pause: Vec<DurationToken>) -> Self {
        self.pause = pause;
        self
    }
}

/// A note stored in a pattern declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternNote {
    Note(ClassicNote),
    Drum(DrumNote),
}

impl From<ClassicNote> for PatternNote {
    fn from(value: ClassicNote) -> Self {
        PatternNote::Note(value)
    }
}

impl From<DrumNote> for PatternNote {
    fn from(value: DrumNote) -> Self {
        PatternNote::Drum(value)
    }
}

/// A named, reusable, homogeneous sequence of notes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternDeclaration {
    pub name: String,
    pub notes: Vec<PatternNote>,
}

impl PatternDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<PatternNote>) -> Self {
        self.notes.push(note.into());
        self
    }
}

/// Change of time signature at the current position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignatureChange {
    pub numerator: u8,
    pub denominator: u8,
}

/// Change of tempo at the current position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TempoChange {
    pub bpm: f64,
}

/// Temporary pitch bend that returns to centre after its duration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PitchBend {
    /// Bend amount in `-1.0..=1.0`.
    pub bend: f32,
    /// Active length; the token lengths are summed.
    pub duration: Vec<DurationToken>,
    #[serde(default)]
    pub delay: Vec<DurationToken>,
}

impl PitchBend {
    pub fn new(bend: f32, duration: Vec<DurationToken>) -> Self {
        Self {
            bend,
            duration,
            delay: Vec::new(),
        }
    }

    pub fn with_delay(mut self, delay: Vec<DurationToken>) -> Self {
        self.delay = delay;
        self
    }
}
