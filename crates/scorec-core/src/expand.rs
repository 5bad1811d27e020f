//! Pattern expansion.
//!
//! Turns the entries of one track into a flat list of concrete entries:
//! pattern references are unrolled, classic notes are resolved against the
//! defaults, and chord-marked drum hits are folded into the preceding hit's
//! group. Pattern declarations are only ever cloned from.

use crate::defaults::{Defaults, ResolvedNote};
use crate::duration::{starts_with_chord_marker, sum_ticks, DurationToken, Resolution, TickTime};
use crate::error::{EngineError, Result};
use crate::model::{
    DrumNote, Music, PatternNote, PatternReference, PitchBend, TempoChange, TimeSignatureChange,
    Track, TrackEntry,
};
use serde::Serialize;
use std::fmt;

/// Model-level identity of a flattened entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct EntryOrigin {
    /// Index of the entry within its track (0-based).
    pub entry: usize,
    /// Set when the entry was produced by a pattern reference.
    pub pattern: Option<PatternOrigin>,
}

/// Position inside an expanded pattern reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct PatternOrigin {
    pub name: String,
    /// Repetition number (0-based).
    pub repetition: usize,
    /// Note index within the pattern (0-based).
    pub note: usize,
}

impl EntryOrigin {
    /// Origin of an entry written directly in the track.
    pub fn direct(entry: usize) -> Self {
        Self {
            entry,
            pattern: None,
        }
    }

    /// Origin of a note expanded from a pattern.
    pub fn in_pattern(entry: usize, name: &str, repetition: usize, note: usize) -> Self {
        Self {
            entry,
            pattern: Some(PatternOrigin {
                name: name.to_string(),
                repetition,
                note,
            }),
        }
    }
}

impl fmt::Display for EntryOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Displayed 1-based.
        write!(f, "entry #{}", self.entry + 1)?;
        if let Some(pattern) = &self.pattern {
            write!(
                f,
                " (pattern '{}', repetition {}, note {})",
                pattern.name,
                pattern.repetition + 1,
                pattern.note + 1
            )?;
        }
        Ok(())
    }
}

/// Drum hits struck at the same instant.
///
/// The first hit leads: its delay, pause and velocity apply to the group.
#[derive(Clone, Debug, PartialEq)]
pub struct DrumGroup {
    hits: Vec<DrumNote>,
}

impl DrumGroup {
    pub fn new(leader: DrumNote) -> Self {
        Self { hits: vec![leader] }
    }

    pub fn push(&mut self, hit: DrumNote) {
        self.hits.push(hit);
    }

    pub fn leader(&self) -> &DrumNote {
        &self.hits[0]
    }

    /// General MIDI keys of every hit, in declaration order.
    pub fn keys(&self) -> Vec<u8> {
        self.hits.iter().map(|hit| hit.element.gm_key()).collect()
    }
}

/// Concrete content of a flattened entry.
#[derive(Clone, Debug, PartialEq)]
pub enum FlatItem {
    Note(ResolvedNote),
    Drums(DrumGroup),
    PitchBend(PitchBend),
    TimeSignature(TimeSignatureChange),
    Tempo(TempoChange),
}

/// How an entry occupies the timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timing {
    /// Single instant at the end of the previous event.
    Instant,
    /// Begin and end marks.
    Span {
        duration: TickTime,
        /// `Some` when the delay list is non-empty, even if it sums to zero.
        delay: Option<TickTime>,
        pause: TickTime,
    },
}

/// An entry of the flattened track, tagged with where it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatEntry {
    pub origin: EntryOrigin,
    pub item: FlatItem,
}

impl FlatEntry {
    pub fn new(origin: EntryOrigin, item: FlatItem) -> Self {
        Self { origin, item }
    }

    pub fn delay(&self) -> &[DurationToken] {
        match &self.item {
            FlatItem::Note(note) => &note.delay,
            FlatItem::Drums(group) => &group.leader().delay,
            FlatItem::PitchBend(bend) => &bend.delay,
            FlatItem::TimeSignature(_) | FlatItem::Tempo(_) => &[],
        }
    }

    pub fn pause(&self) -> &[DurationToken] {
        match &self.item {
            FlatItem::Note(note) => &note.pause,
            FlatItem::Drums(group) => &group.leader().pause,
            FlatItem::PitchBend(_) | FlatItem::TimeSignature(_) | FlatItem::Tempo(_) => &[],
        }
    }

    pub fn is_pitch_bend(&self) -> bool {
        matches!(self.item, FlatItem::PitchBend(_))
    }

    /// Check if the delay starts with the chord marker.
    pub fn is_chord_marked(&self) -> bool {
        starts_with_chord_marker(self.delay())
    }

    /// Length between the begin and end marks.
    pub fn duration(&self, resolution: Resolution) -> TickTime {
        match &self.item {
            FlatItem::Note(note) => note.note_type.ticks(resolution),
            FlatItem::Drums(_) => DurationToken::DRUM.ticks(resolution),
            FlatItem::PitchBend(bend) => sum_ticks(&bend.duration, resolution),
            FlatItem::TimeSignature(_) | FlatItem::Tempo(_) => TickTime::ZERO,
        }
    }

    pub fn timing(&self, resolution: Resolution) -> Timing {
        match &self.item {
            FlatItem::TimeSignature(_) | FlatItem::Tempo(_) => Timing::Instant,
            FlatItem::Note(_) | FlatItem::Drums(_) | FlatItem::PitchBend(_) => {
                let delay = self.delay();
                Timing::Span {
                    duration: self.duration(resolution),
                    delay: (!delay.is_empty()).then(|| sum_ticks(delay, resolution)),
                    pause: sum_ticks(self.pause(), resolution),
                }
            }
        }
    }
}

/// Flattens tracks of one music model.
pub struct Expander<'a> {
    music: &'a Music,
    defaults: Defaults,
}

impl<'a> Expander<'a> {
    pub fn new(music: &'a Music, defaults: Defaults) -> Self {
        Self { music, defaults }
    }

    /// Flatten one track.
    pub fn expand_track(&self, track: &Track) -> Result<Vec<FlatEntry>> {
        let mut out = Vec::with_capacity(track.entries.len());

        for (index, entry) in track.entries.iter().enumerate() {
            let origin = EntryOrigin::direct(index);
            match entry {
                TrackEntry::Note(note) => {
                    out.push(FlatEntry::new(origin, FlatItem::Note(self.defaults.resolve(note))));
                }
                TrackEntry::Drum(hit) => push_drum(&mut out, hit.clone(), origin),
                TrackEntry::Pattern(reference) => {
                    self.expand_reference(reference, index, &mut out)?;
                }
                TrackEntry::TimeSignature(change) => {
                    out.push(FlatEntry::new(origin, FlatItem::TimeSignature(*change)));
                }
                TrackEntry::Tempo(change) => {
                    out.push(FlatEntry::new(origin, FlatItem::Tempo(*change)));
                }
                TrackEntry::PitchBend(bend) => {
                    out.push(FlatEntry::new(origin, FlatItem::PitchBend(bend.clone())));
                }
            }
        }

        log::debug!(
            "Expanded track '{}': {} entries -> {} flat entries",
            track.name,
            track.entries.len(),
            out.len()
        );
        Ok(out)
    }

    fn expand_reference(
        &self,
        reference: &PatternReference,
        index: usize,
        out: &mut Vec<FlatEntry>,
    ) -> Result<()> {
        let pattern = self.music.pattern(&reference.pattern).ok_or_else(|| {
            EngineError::UnresolvedPatternReference {
                pattern: reference.pattern.clone(),
                origin: EntryOrigin::direct(index),
            }
        })?;

        if reference.repeat_count <= 0 {
            return Err(EngineError::InvalidRepeatCount {
                pattern: reference.pattern.clone(),
                count: reference.repeat_count,
                origin: EntryOrigin::direct(index),
            });
        }

        log::trace!(
            "Expanding pattern '{}' x{} (pause override: {:?})",
            pattern.name,
            reference.repeat_count,
            reference.pause
        );

        for repetition in 0..reference.repeat_count as usize {
            for (position, note) in pattern.notes.iter().enumerate() {
                let origin = EntryOrigin::in_pattern(index, &pattern.name, repetition, position);
                let override_pause =
                    repetition == 0 && position == 0 && !reference.pause.is_empty();

                match note {
                    PatternNote::Note(note) => {
                        let mut resolved = self.defaults.resolve(note);
                        if override_pause {
                            resolved.pause = reference.pause.clone();
                        }
                        out.push(FlatEntry::new(origin, FlatItem::Note(resolved)));
                    }
                    PatternNote::Drum(hit) => {
                        let mut hit = hit.clone();
                        if override_pause {
                            hit.pause = reference.pause.clone();
                        }
                        push_drum(out, hit, origin);
                    }
                }
            }
        }

        Ok(())
    }
}

/// Fold a chord-marked hit into the previous group, otherwise open a new one.
fn push_drum(out: &mut Vec<FlatEntry>, hit: DrumNote, origin: EntryOrigin) {
    if hit.is_chord_marked() {
        if let Some(FlatEntry {
            item: FlatItem::Drums(group),
            ..
        }) = out.last_mut()
        {
            group.push(hit);
            return;
        }
    }
    out.push(FlatEntry::new(origin, FlatItem::Drums(DrumGroup::new(hit))));
}
