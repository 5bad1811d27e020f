//! Absolute tick placement of flattened entries.
//!
//! Each sounding entry is placed relative to the previous one: a non-empty
//! `delay` measures from the previous start, otherwise `pause` measures from
//! the previous end. Control entries sit at the previous end and do not
//! move the reference point.

use crate::duration::{Resolution, TickTime};
use crate::error::{EngineError, Result};
use crate::expand::{FlatEntry, Timing};

/// A begin or end point of one flattened entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduledMark {
    /// Exact absolute position.
    pub tick: TickTime,
    /// Creation order within its queue.
    pub sequence: usize,
    /// Index into the flattened entries.
    pub entry: usize,
}

/// Begin and end marks of one track, in creation order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    /// One mark per entry, sounding or control.
    pub begin_marks: Vec<ScheduledMark>,
    /// One mark per sounding entry.
    pub end_marks: Vec<ScheduledMark>,
}

impl Timeline {
    fn push_begin(&mut self, tick: TickTime, entry: usize) {
        let sequence = self.begin_marks.len();
        self.begin_marks.push(ScheduledMark {
            tick,
            sequence,
            entry,
        });
    }

    fn push_end(&mut self, tick: TickTime, entry: usize) {
        let sequence = self.end_marks.len();
        self.end_marks.push(ScheduledMark {
            tick,
            sequence,
            entry,
        });
    }

    /// Latest end mark, or zero for a track without sounding entries.
    pub fn length(&self) -> TickTime {
        self.end_marks
            .iter()
            .map(|mark| mark.tick)
            .max()
            .unwrap_or(TickTime::ZERO)
    }
}

/// Placement of the latest sounding entry.
#[derive(Clone, Copy, Debug, Default)]
struct Span {
    /// Exact start tick.
    start: TickTime,
    /// Exact end tick.
    end: TickTime,
}

/// Place every entry of a flattened track on the tick grid.
pub fn build_timeline(entries: &[FlatEntry], resolution: Resolution) -> Result<Timeline> {
    let mut timeline = Timeline::default();
    let mut previous = Span::default();
    let mut seen_sounding = false;

    for (index, entry) in entries.iter().enumerate() {
        match entry.timing(resolution) {
            Timing::Instant => timeline.push_begin(previous.end, index),
            Timing::Span {
                duration,
                delay,
                pause,
            } => {
                let start = match delay {
                    Some(delay) => {
                        let available = previous.end - previous.start;
                        if seen_sounding && delay > available {
                            return Err(EngineError::DelayExceedsDuration {
                                origin: entry.origin.clone(),
                                delay,
                                available,
                            });
                        }
                        previous.start + delay
                    }
                    None => previous.end + pause,
                };
                let end = start + duration;

                log::trace!(
                    "{}: start {} end {} (delay {:?}, pause {})",
                    entry.origin,
                    start,
                    end,
                    delay,
                    pause
                );

                timeline.push_begin(start, index);
                timeline.push_end(end, index);
                previous = Span { start, end };
                seen_sounding = true;
            }
        }
    }

    Ok(timeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::Defaults;
    use crate::duration::DurationToken;
    use crate::expand::{EntryOrigin, FlatItem};
    use crate::model::{ClassicNote, PitchBend, TempoChange};
    use crate::pitch::PitchName;

    fn res() -> Resolution {
        Resolution::new(4).unwrap()
    }

    fn note(index: usize, note: ClassicNote) -> FlatEntry {
        FlatEntry::new(
            EntryOrigin::direct(index),
            FlatItem::Note(Defaults::default().resolve(&note)),
        )
    }

    fn ticks(marks: &[ScheduledMark]) -> Vec<i64> {
        marks.iter().map(|m| m.tick.whole_ticks()).collect()
    }

    #[test]
    fn test_pause_measures_from_previous_end() {
        let entries = vec![
            note(0, ClassicNote::new(PitchName::C)),
            note(1, ClassicNote::new(PitchName::D).with_pause(vec![DurationToken::QUARTER])),
        ];
        let timeline = build_timeline(&entries, res()).unwrap();
        assert_eq!(ticks(&timeline.begin_marks), vec![0, 8]);
        assert_eq!(ticks(&timeline.end_marks), vec![4, 12]);
        assert_eq!(timeline.length(), TickTime::from_ticks(12));
    }

    #[test]
    fn test_delay_measures_from_previous_start() {
        let entries = vec![
            note(0, ClassicNote::new(PitchName::C).with_note_type(DurationToken::HALF)),
            note(1, ClassicNote::new(PitchName::E).with_delay(vec![DurationToken::QUARTER])),
            note(2, ClassicNote::new(PitchName::G).with_delay(vec![DurationToken::CHORD])),
        ];
        let timeline = build_timeline(&entries, res()).unwrap();
        assert_eq!(ticks(&timeline.begin_marks), vec![0, 4, 4]);
        assert_eq!(ticks(&timeline.end_marks), vec![8, 8, 8]);
    }

    #[test]
    fn test_control_entries_do_not_move_reference() {
        let entries = vec![
            note(0, ClassicNote::new(PitchName::C)),
            FlatEntry::new(
                EntryOrigin::direct(1),
                FlatItem::Tempo(TempoChange { bpm: 90.0 }),
            ),
            note(2, ClassicNote::new(PitchName::D).with_delay(vec![DurationToken::SIXTEENTH])),
        ];
        let timeline = build_timeline(&entries, res()).unwrap();
        assert_eq!(ticks(&timeline.begin_marks), vec![0, 4, 1]);
        assert_eq!(timeline.begin_marks[1].entry, 1);
        assert_eq!(timeline.end_marks.len(), 2);
        assert_eq!(timeline.end_marks[1].entry, 2);
        assert_eq!(timeline.end_marks[1].sequence, 1);
    }

    #[test]
    fn test_pitch_bend_span() {
        let entries = vec![FlatEntry::new(
            EntryOrigin::direct(0),
            FlatItem::PitchBend(PitchBend::new(
                0.5,
                vec![DurationToken::QUARTER, DurationToken::EIGHTH],
            )),
        )];
        let timeline = build_timeline(&entries, res()).unwrap();
        assert_eq!(ticks(&timeline.begin_marks), vec![0]);
        assert_eq!(ticks(&timeline.end_marks), vec![6]);
    }

    #[test]
    fn test_delay_exceeding_previous_duration() {
        let entries = vec![
            note(0, ClassicNote::new(PitchName::C).with_note_type(DurationToken::EIGHTH)),
            note(1, ClassicNote::new(PitchName::E).with_delay(vec![DurationToken::QUARTER])),
        ];
        let err = build_timeline(&entries, res()).unwrap_err();
        assert_eq!(
            err,
            EngineError::DelayExceedsDuration {
                origin: EntryOrigin::direct(1),
                delay: TickTime::from_ticks(4),
                available: TickTime::from_ticks(2),
            }
        );
    }

    #[test]
    fn test_leading_delay_is_not_checked() {
        let entries = vec![note(
            0,
            ClassicNote::new(PitchName::C).with_delay(vec![DurationToken::WHOLE]),
        )];
        let timeline = build_timeline(&entries, res()).unwrap();
        assert_eq!(ticks(&timeline.begin_marks), vec![16]);
    }
}
