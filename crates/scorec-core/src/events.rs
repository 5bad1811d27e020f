//! Output events of the engine.
//!
//! - [`Event`] - An abstract MIDI-level event
//! - [`TimedEvent`] - An event positioned on the track's tick grid

use serde::Serialize;

/// An event of a compiled track.
///
/// Begin-side events carry a `wait` (pre-roll ticks before the event),
/// end-side events a `delta` (ticks since the latest reference point).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Instrument selection for melodic tracks.
    ProgramChange { program: u8 },

    TimeSignature { numerator: u8, denominator: u8 },

    Tempo { bpm: f64 },

    /// Start of a note or of a simultaneous drum group.
    NoteOn {
        pitches: Vec<u8>,
        velocity: u8,
        wait: u32,
    },

    /// Release of the pitches started by the matching `NoteOn`.
    ///
    /// When `delta` is `None` the release falls `duration` ticks after the
    /// note's own start.
    NoteOff {
        pitches: Vec<u8>,
        duration: u32,
        delta: Option<u32>,
    },

    PitchBendBegin { amount: f32, wait: u32 },

    /// Return of the bend to centre. `delta` is `None` when the bend ends
    /// before the latest reference point.
    PitchBendEnd { delta: Option<u32> },
}

impl Event {

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Event::ProgramChange { .. } => "program_change",
            Event::TimeSignature { .. } => "time_signature",
            Event::Tempo { .. } => "tempo",
            Event::NoteOn { .. } => "note_on",
            Event::NoteOff { .. } => "note_off",
            Event::PitchBendBegin { .. } => "pitch_bend_begin",
            Event::PitchBendEnd { .. } => "pitch_bend_end",
        }
    }
}

/// An event with its absolute tick and the gap to the previous event.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimedEvent {
    /// Absolute position in whole ticks.
    pub tick: u32,
    /// Ticks since the previous event of the same track.
    pub delta_ticks: u32,
    #[serde(flatten)]
    pub event: Event,
}

impl TimedEvent {
    pub fn new(tick: u32, delta_ticks: u32, event: Event) -> Self {
        Self {
            tick,
            delta_ticks,
            event,
        }
    }
}
