//! Tick-ordered merge of begin and end marks into an event stream.
//!
//! Both mark lists are loaded into min-heaps keyed by
//! `(tick, tie_break_rank, sequence)`. The merge loop then repeatedly takes
//! the earlier of the two heads; on equal ticks the end side goes first, so
//! a note is released before the next one on the same tick is struck.

use crate::diagnostics::{Diagnostic, Quantity, Rounder};
use crate::duration::{sum_ticks, Resolution, TickTime};
use crate::events::{Event, TimedEvent};
use crate::expand::{FlatEntry, FlatItem};
use crate::timeline::{ScheduledMark, Timeline};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Ordering rank among marks on the same tick; lower goes first.
///
/// Entries carrying a pause go after every other entry on the same tick, so
/// pitch bends and chord-marked notes come before them. All other ties keep
/// creation order, which keeps a chord member behind its root.
pub fn tie_break_rank(entry: &FlatEntry) -> u8 {
    if entry.is_pitch_bend() || entry.is_chord_marked() || entry.pause().is_empty() {
        0
    } else {
        1
    }
}

/// Min-heap of marks.
#[derive(Debug)]
struct MarkQueue {
    /// Keyed by `(tick, rank, sequence, entry)`.
    heap: BinaryHeap<Reverse<(TickTime, u8, usize, usize)>>,
}

impl MarkQueue {
    fn new(marks: &[ScheduledMark], entries: &[FlatEntry]) -> Self {
        let heap = marks
            .iter()
            .map(|mark| {
                let rank = tie_break_rank(&entries[mark.entry]);
                Reverse((mark.tick, rank, mark.sequence, mark.entry))
            })
            .collect();
        Self { heap }
    }

    /// Tick of the head, or [`TickTime::MAX`] when empty.
    fn head_tick(&self) -> TickTime {
        self.heap
            .peek()
            .map(|Reverse((tick, ..))| *tick)
            .unwrap_or(TickTime::MAX)
    }

    fn pop(&mut self) -> Option<ScheduledMark> {
        self.heap
            .pop()
            .map(|Reverse((tick, _, sequence, entry))| ScheduledMark {
                tick,
                sequence,
                entry,
            })
    }

    fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

/// Events and diagnostics produced for one track.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScheduledTrack {
    /// Events in emission order.
    pub events: Vec<TimedEvent>,
    /// Rounding findings recorded while emitting.
    pub diagnostics: Vec<Diagnostic>,
}

/// Merges the marks of one track into an ordered event stream.
///
/// All state is local to one invocation.
pub struct EventScheduler<'a> {
    /// Flattened entries the marks point into.
    entries: &'a [FlatEntry],
    /// Ticks per quarter note.
    resolution: Resolution,
    /// Converts exact positions to whole ticks.
    rounder: Rounder,
    /// Exact tick of the last begin-side event.
    latest_begin: TickTime,
    /// Exact tick of the last end-side event.
    latest_end: TickTime,
    /// Whole tick of the last emitted event, for `delta_ticks`.
    last_tick: u32,
    /// Events emitted so far.
    events: Vec<TimedEvent>,
}

impl<'a> EventScheduler<'a> {
    pub fn new(entries: &'a [FlatEntry], resolution: Resolution) -> Self {
        Self {
            entries,
            resolution,
            rounder: Rounder::new(),
            latest_begin: TickTime::ZERO,
            latest_end: TickTime::ZERO,
            last_tick: 0,
            events: Vec::new(),
        }
    }

    /// Drain both queues of `timeline`.
    pub fn run(mut self, timeline: &Timeline) -> ScheduledTrack {
        let mut begins = MarkQueue::new(&timeline.begin_marks, self.entries);
        let mut ends = MarkQueue::new(&timeline.end_marks, self.entries);

        log::debug!(
            "Scheduling {} begin marks and {} end marks",
            begins.len(),
            ends.len()
        );

        while !(begins.is_empty() && ends.is_empty()) {
            let mark = if begins.head_tick() < ends.head_tick() {
                begins.pop().map(|mark| (mark, true))
            } else {
                ends.pop().map(|mark| (mark, false))
            };
            match mark {
                Some((mark, true)) => self.emit_begin(mark),
                Some((mark, false)) => self.emit_end(mark),
                None => break,
            }
        }

        ScheduledTrack {
            events: self.events,
            diagnostics: self.rounder.into_diagnostics(),
        }
    }

    fn emit_begin(&mut self, mark: ScheduledMark) {
        let entries = self.entries;
        let entry = &entries[mark.entry];
        let resolution = self.resolution;
        let origin = &entry.origin;

        let event = match &entry.item {
            FlatItem::TimeSignature(change) => Event::TimeSignature {
                numerator: change.numerator,
                denominator: change.denominator,
            },
            FlatItem::Tempo(change) => Event::Tempo { bpm: change.bpm },
            FlatItem::PitchBend(bend) => {
                let delay = sum_ticks(&bend.delay, resolution);
                Event::PitchBendBegin {
                    amount: bend.bend,
                    wait: self.rounder.unsigned(delay, Quantity::Wait, origin),
                }
            }
            FlatItem::Note(note) => {
                let wait = sum_ticks(&note.delay, resolution) + sum_ticks(&note.pause, resolution);
                Event::NoteOn {
                    pitches: vec![note.midi_key()],
                    velocity: note.velocity,
                    wait: self.rounder.unsigned(wait, Quantity::Wait, origin),
                }
            }
            FlatItem::Drums(group) => {
                let leader = group.leader();
                let wait =
                    sum_ticks(&leader.delay, resolution) + sum_ticks(&leader.pause, resolution);
                Event::NoteOn {
                    pitches: group.keys(),
                    velocity: leader.velocity,
                    wait: self.rounder.unsigned(wait, Quantity::Wait, origin),
                }
            }
        };

        self.latest_begin = mark.tick;
        self.push(mark, event);
    }

    fn emit_end(&mut self, mark: ScheduledMark) {
        let entries = self.entries;
        let entry = &entries[mark.entry];
        let origin = &entry.origin;
        let delta = mark.tick - self.latest_begin.max(self.latest_end);

        let event = match &entry.item {
            FlatItem::PitchBend(_) => Event::PitchBendEnd {
                delta: (!delta.is_negative())
                    .then(|| self.rounder.unsigned(delta, Quantity::Delta, origin)),
            },
            FlatItem::Note(_) | FlatItem::Drums(_) => {
                let duration = entry.duration(self.resolution);
                let start = mark.tick - duration;
                if duration > TickTime::ZERO && start.whole_ticks() == mark.tick.whole_ticks() {
                    self.rounder.collapsed(duration, origin);
                }

                let pitches = match &entry.item {
                    FlatItem::Note(note) => vec![note.midi_key()],
                    FlatItem::Drums(group) => group.keys(),
                    _ => Vec::new(),
                };

                if delta.is_negative() {
                    let duration = if entry.is_chord_marked() {
                        0
                    } else {
                        self.rounder.unsigned(duration, Quantity::Duration, origin)
                    };
                    Event::NoteOff {
                        pitches,
                        duration,
                        delta: None,
                    }
                } else {
                    Event::NoteOff {
                        pitches,
                        duration: 0,
                        delta: Some(self.rounder.unsigned(delta, Quantity::Delta, origin)),
                    }
                }
            }
            // Control entries never produce end marks.
            FlatItem::TimeSignature(_) | FlatItem::Tempo(_) => return,
        };

        self.latest_end = mark.tick;
        self.push(mark, event);
    }

    fn push(&mut self, mark: ScheduledMark, event: Event) {
        let entries = self.entries;
        let origin = &entries[mark.entry].origin;
        let tick = self.rounder.unsigned(mark.tick, Quantity::Tick, origin);
        let delta_ticks = tick.saturating_sub(self.last_tick);
        self.last_tick = tick;

        log::trace!("{} @{} (+{}) {}: {:?}", origin, tick, delta_ticks, event.name(), event);
        self.events.push(TimedEvent::new(tick, delta_ticks, event));
    }
}

/// Merge the marks of `timeline` into an ordered event stream.
pub fn schedule(entries: &[FlatEntry], timeline: &Timeline, resolution: Resolution) -> ScheduledTrack {
    EventScheduler::new(entries, resolution).run(timeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::Defaults;
    use crate::duration::DurationToken;
    use crate::expand::EntryOrigin;
    use crate::model::{ClassicNote, PitchBend, TempoChange};
    use crate::pitch::PitchName;
    use crate::timeline::build_timeline;

    fn res() -> Resolution {
        Resolution::new(4).unwrap()
    }

    fn note(index: usize, note: ClassicNote) -> FlatEntry {
        FlatEntry::new(
            EntryOrigin::direct(index),
            FlatItem::Note(Defaults::new(4, DurationToken::QUARTER).resolve(&note)),
        )
    }

    fn run(entries: &[FlatEntry]) -> ScheduledTrack {
        let timeline = build_timeline(entries, res()).unwrap();
        schedule(entries, &timeline, res())
    }

    #[test]
    fn test_rank() {
        let plain = note(0, ClassicNote::new(PitchName::C));
        let chord = note(1, ClassicNote::new(PitchName::E).with_delay(vec![DurationToken::CHORD]));
        let paused = note(2, ClassicNote::new(PitchName::G).with_pause(vec![DurationToken::EIGHTH]));
        let delayed = note(3, ClassicNote::new(PitchName::G).with_delay(vec![DurationToken::EIGHTH]));
        let bend = FlatEntry::new(
            EntryOrigin::direct(4),
            FlatItem::PitchBend(PitchBend::new(0.1, vec![DurationToken::QUARTER])),
        );
        assert_eq!(tie_break_rank(&plain), 0);
        assert_eq!(tie_break_rank(&chord), 0);
        assert_eq!(tie_break_rank(&paused), 1);
        assert_eq!(tie_break_rank(&delayed), 0);
        assert_eq!(tie_break_rank(&bend), 0);
    }

    #[test]
    fn test_queue_orders_by_tick_then_rank_then_sequence() {
        let entries = vec![
            note(0, ClassicNote::new(PitchName::C).with_pause(vec![DurationToken::EIGHTH])),
            note(1, ClassicNote::new(PitchName::D)),
            note(2, ClassicNote::new(PitchName::E).with_delay(vec![DurationToken::CHORD])),
            note(3, ClassicNote::new(PitchName::F)),
        ];
        let marks: Vec<ScheduledMark> = (0..4)
            .map(|i| ScheduledMark {
                tick: if i == 3 {
                    TickTime::from_ticks(1)
                } else {
                    TickTime::from_ticks(2)
                },
                sequence: i,
                entry: i,
            })
            .collect();
        let mut queue = MarkQueue::new(&marks, &entries);
        let order: Vec<usize> = std::iter::from_fn(|| queue.pop()).map(|m| m.entry).collect();
        assert_eq!(order, vec![3, 1, 2, 0]);
    }

    #[test]
    fn test_chord_member_follows_its_root() {
        let entries = vec![
            note(0, ClassicNote::new(PitchName::C)),
            note(1, ClassicNote::new(PitchName::E).with_delay(vec![DurationToken::CHORD])),
        ];
        let track = run(&entries);
        let events: Vec<(u32, &str, Vec<u8>)> = track
            .events
            .iter()
            .map(|e| {
                let pitches = match &e.event {
                    Event::NoteOn { pitches, .. } | Event::NoteOff { pitches, .. } => pitches.clone(),
                    _ => Vec::new(),
                };
                (e.tick, e.event.name(), pitches)
            })
            .collect();
        assert_eq!(
            events,
            vec![
                (0, "note_on", vec![60]),
                (0, "note_on", vec![64]),
                (4, "note_off", vec![60]),
                (4, "note_off", vec![64]),
            ]
        );
    }

    #[test]
    fn test_sequential_notes() {
        let entries = vec![
            note(0, ClassicNote::new(PitchName::C)),
            note(1, ClassicNote::new(PitchName::E).with_pause(vec![DurationToken::QUARTER])),
        ];
        let track = run(&entries);
        let events: Vec<(u32, Event)> = track
            .events
            .iter()
            .map(|e| (e.tick, e.event.clone()))
            .collect();
        assert_eq!(
            events,
            vec![
                (0, Event::NoteOn { pitches: vec![60], velocity: 100, wait: 0 }),
                (4, Event::NoteOff { pitches: vec![60], duration: 0, delta: Some(4) }),
                (8, Event::NoteOn { pitches: vec![64], velocity: 100, wait: 4 }),
                (12, Event::NoteOff { pitches: vec![64], duration: 0, delta: Some(4) }),
            ]
        );
        assert!(track.diagnostics.is_empty());
    }

    #[test]
    fn test_end_goes_first_on_equal_tick() {
        let entries = vec![
            note(0, ClassicNote::new(PitchName::C)),
            note(1, ClassicNote::new(PitchName::D)),
        ];
        let track = run(&entries);
        assert!(matches!(track.events[1].event, Event::NoteOff { .. }));
        assert!(matches!(track.events[2].event, Event::NoteOn { .. }));
        assert_eq!(track.events[2].tick, 4);
        assert_eq!(track.events[2].delta_ticks, 0);
    }

    #[test]
    fn test_control_events_are_begin_side() {
        let entries = vec![
            note(0, ClassicNote::new(PitchName::C)),
            FlatEntry::new(
                EntryOrigin::direct(1),
                FlatItem::Tempo(TempoChange { bpm: 90.0 }),
            ),
            note(2, ClassicNote::new(PitchName::D)),
        ];
        let track = run(&entries);
        let names: Vec<&str> = track.events.iter().map(|e| e.event.name()).collect();
        assert_eq!(names, vec!["note_on", "note_off", "tempo", "note_on", "note_off"]);
        // The tempo mark moves the begin reference.
        assert_eq!(
            track.events[4].event,
            Event::NoteOff { pitches: vec![62], duration: 0, delta: Some(4) }
        );
    }

    #[test]
    fn test_collapsed_note_is_emitted_and_reported() {
        let resolution = Resolution::new(1).unwrap();
        let entries = vec![FlatEntry::new(
            EntryOrigin::direct(0),
            FlatItem::Note(
                Defaults::new(4, DurationToken::SIXTEENTH).resolve(&ClassicNote::new(PitchName::C)),
            ),
        )];
        let timeline = build_timeline(&entries, resolution).unwrap();
        let track = schedule(&entries, &timeline, resolution);
        assert_eq!(track.events.len(), 2);
        assert_eq!(track.events[1].tick, 0);
        assert!(track
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::CollapsedNote { .. })));
    }
}
