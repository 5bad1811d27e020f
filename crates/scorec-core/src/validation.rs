//! Precondition checks for music models.
//!
//! The engine assumes a well-formed model; [`validate`] reports every
//! violation at once so a front end can reject a model before compiling it.
//! Missing defaults are only warnings since the compile options supply
//! fallbacks.

use crate::model::{
    ClassicNote, DrumNote, Instrument, Music, PatternNote, PitchBend, Track, TrackEntry,
};
use serde::Serialize;
use std::fmt;

/// Lowest accepted octave.
pub const MIN_OCTAVE: i8 = -1;
/// Highest accepted octave.
pub const MAX_OCTAVE: i8 = 9;
/// Accepted time signature numerators.
pub const NUMERATORS: [u8; 5] = [1, 2, 4, 8, 16];
/// Highest accepted time signature denominator.
pub const MAX_DENOMINATOR: u8 = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// Where in the model an issue was found.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum IssueLocation {
    Music,
    Pattern { name: String, note: Option<usize> },
    Track { name: String, entry: Option<usize> },
}

impl fmt::Display for IssueLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueLocation::Music => write!(f, "music"),
            IssueLocation::Pattern { name, note: None } => write!(f, "pattern '{name}'"),
            IssueLocation::Pattern {
                name,
                note: Some(note),
            } => write!(f, "pattern '{name}', note #{}", note + 1),
            IssueLocation::Track { name, entry: None } => write!(f, "track '{name}'"),
            IssueLocation::Track {
                name,
                entry: Some(entry),
            } => write!(f, "track '{name}', entry #{}", entry + 1),
        }
    }
}

/// A single finding.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub location: IssueLocation,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{level}: {}: {}", self.location, self.message)
    }
}

/// All findings for one model.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Check if the model has no errors; warnings are allowed.
    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Warning)
    }

    fn error(&mut self, location: IssueLocation, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: Severity::Error,
            location,
            message: message.into(),
        });
    }

    fn warning(&mut self, location: IssueLocation, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: Severity::Warning,
            location,
            message: message.into(),
        });
    }
}

/// Note kinds a sequence can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NoteKind {
    Classic,
    Drum,
}

/// Check `music` against the preconditions of the engine.
pub fn validate(music: &Music) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_header(music, &mut report);

    for pattern in &music.patterns {
        let location = |note: Option<usize>| IssueLocation::Pattern {
            name: pattern.name.clone(),
            note,
        };

        if pattern.notes.is_empty() {
            report.error(location(None), "pattern has no notes");
        }
        if music.patterns.iter().filter(|p| p.name == pattern.name).count() > 1 {
            report.error(location(None), "pattern is declared more than once");
        }

        let mut kinds = Vec::new();
        for (index, note) in pattern.notes.iter().enumerate() {
            match note {
                PatternNote::Note(note) => {
                    kinds.push(NoteKind::Classic);
                    check_classic_note(music, note, location(Some(index)), &mut report);
                }
                PatternNote::Drum(hit) => {
                    kinds.push(NoteKind::Drum);
                    check_drum_note(hit, location(Some(index)), &mut report);
                }
            }
        }
        if kinds.contains(&NoteKind::Classic) && kinds.contains(&NoteKind::Drum) {
            report.error(
                location(None),
                "pattern contains both drum notes and classic notes",
            );
        }
    }

    for track in &music.tracks {
        check_track(music, track, &mut report);
    }

    log::debug!(
        "Validated '{}': {} errors, {} warnings",
        music.name,
        report.errors().count(),
        report.warnings().count()
    );
    report
}

fn check_header(music: &Music, report: &mut ValidationReport) {
    // Resolution is range-checked when the model is built.
    if !is_positive(music.tempo) {
        report.error(IssueLocation::Music, "tempo must be greater than 0");
    }
    check_time_signature(
        music.numerator,
        music.denominator,
        IssueLocation::Music,
        report,
    );
    if let Some(octave) = music.default_octave {
        if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&octave) {
            report.error(
                IssueLocation::Music,
                format!("default octave {octave} must be between -1 and 9"),
            );
        }
    }
}

fn is_positive(bpm: f64) -> bool {
    bpm > 0.0 && bpm.is_finite()
}

fn check_time_signature(
    numerator: u8,
    denominator: u8,
    location: IssueLocation,
    report: &mut ValidationReport,
) {
    if !NUMERATORS.contains(&numerator) {
        report.error(
            location.clone(),
            format!("numerator {numerator} must be 1, 2, 4, 8 or 16"),
        );
    }
    if !(1..=MAX_DENOMINATOR).contains(&denominator) {
        report.error(
            location,
            format!("denominator {denominator} must be between 1 and 12"),
        );
    }
}

fn check_track(music: &Music, track: &Track, report: &mut ValidationReport) {
    let location = |entry: Option<usize>| IssueLocation::Track {
        name: track.name.clone(),
        entry,
    };
    let expected = match track.instrument {
        Instrument::Drums => NoteKind::Drum,
        Instrument::Program(program) => {
            if program > 127 {
                report.error(
                    location(None),
                    format!("program {program} must be between 0 and 127"),
                );
            }
            NoteKind::Classic
        }
    };

    for (index, entry) in track.entries.iter().enumerate() {
        let kind = match entry {
            TrackEntry::Note(note) => {
                check_classic_note(music, note, location(Some(index)), report);
                Some(NoteKind::Classic)
            }
            TrackEntry::Drum(hit) => {
                check_drum_note(hit, location(Some(index)), report);
                Some(NoteKind::Drum)
            }
            TrackEntry::Pattern(reference) => {
                if reference.repeat_count <= 0 {
                    report.error(
                        location(Some(index)),
                        format!(
                            "repeat count {} of pattern '{}' must be greater than 0",
                            reference.repeat_count, reference.pattern
                        ),
                    );
                }
                match music.pattern(&reference.pattern) {
                    Some(pattern) => pattern.notes.first().map(|note| match note {
                        PatternNote::Note(_) => NoteKind::Classic,
                        PatternNote::Drum(_) => NoteKind::Drum,
                    }),
                    None => {
                        report.error(
                            location(Some(index)),
                            format!("pattern '{}' is not declared", reference.pattern),
                        );
                        None
                    }
                }
            }
            TrackEntry::TimeSignature(change) => {
                check_time_signature(
                    change.numerator,
                    change.denominator,
                    location(Some(index)),
                    report,
                );
                None
            }
            TrackEntry::Tempo(change) => {
                if !is_positive(change.bpm) {
                    report.error(location(Some(index)), "tempo must be greater than 0");
                }
                None
            }
            TrackEntry::PitchBend(bend) => {
                check_pitch_bend(bend, location(Some(index)), report);
                None
            }
        };

        if let Some(kind) = kind {
            if kind != expected {
                let message = match expected {
                    NoteKind::Drum => "drum track contains classic notes",
                    NoteKind::Classic => "melodic track contains drum notes",
                };
                report.error(location(Some(index)), message);
            }
        }
    }
}

fn check_classic_note(
    music: &Music,
    note: &ClassicNote,
    location: IssueLocation,
    report: &mut ValidationReport,
) {
    match note.octave {
        Some(octave) if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&octave) => {
            report.error(
                location.clone(),
                format!("octave {octave} must be between -1 and 9"),
            );
        }
        None if music.default_octave.is_none() => {
            report.warning(
                location.clone(),
                "note has no octave and the music declares no default octave",
            );
        }
        _ => {}
    }
    let octave = note
        .octave
        .or(music.default_octave)
        .filter(|octave| (MIN_OCTAVE..=MAX_OCTAVE).contains(octave));
    if let Some(octave) = octave {
        if note.pitch.checked_midi_key(octave).is_none() {
            report.error(
                location.clone(),
                format!("{}{octave} is above the highest MIDI key (G9)", note.pitch),
            );
        }
    }
    if note.note_type.is_none() && music.default_note_type.is_none() {
        report.warning(
            location.clone(),
            "note has no note type and the music declares no default note type",
        );
    }
    check_velocity(note.velocity, location.clone(), report);
    check_delay_and_pause(!note.delay.is_empty(), !note.pause.is_empty(), location, report);
}

fn check_drum_note(hit: &DrumNote, location: IssueLocation, report: &mut ValidationReport) {
    check_velocity(hit.velocity, location.clone(), report);
    check_delay_and_pause(!hit.delay.is_empty(), !hit.pause.is_empty(), location, report);
}

fn check_pitch_bend(bend: &PitchBend, location: IssueLocation, report: &mut ValidationReport) {
    if !(-1.0..=1.0).contains(&bend.bend) {
        report.error(
            location.clone(),
            format!("bend {} must be between -1.0 and 1.0", bend.bend),
        );
    }
    if bend.duration.is_empty() {
        report.error(location, "pitch bend has no duration");
    }
}

fn check_velocity(velocity: u8, location: IssueLocation, report: &mut ValidationReport) {
    if velocity > 127 {
        report.error(
            location,
            format!("velocity {velocity} must be between 0 and 127"),
        );
    }
}

fn check_delay_and_pause(
    has_delay: bool,
    has_pause: bool,
    location: IssueLocation,
    report: &mut ValidationReport,
) {
    if has_delay && has_pause {
        report.error(location, "note has both a delay and a pause");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::{DurationToken, Resolution};
    use crate::model::{PatternDeclaration, PatternReference, TempoChange};
    use crate::pitch::{DrumElement, PitchName};

    fn music() -> Music {
        Music::new("test", Resolution::new(4).unwrap()).with_defaults(4, DurationToken::QUARTER)
    }

    fn messages(report: &ValidationReport) -> Vec<String> {
        report.issues.iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_valid_model() {
        let music = music()
            .with_pattern(PatternDeclaration::new("beat").with_note(DrumNote::new(DrumElement::Kick)))
            .with_track(Track::new("kit", Instrument::Drums).with_entry(PatternReference::new("beat")))
            .with_track(
                Track::new("lead", Instrument::Program(0))
                    .with_entry(ClassicNote::new(PitchName::C))
                    .with_entry(PitchBend::new(-0.5, vec![DurationToken::EIGHTH])),
            );
        let report = validate(&music);
        assert!(report.is_ok(), "{:?}", messages(&report));
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_header_ranges() {
        let mut music = music();
        music.tempo = 0.0;
        music.numerator = 3;
        music.denominator = 13;
        music.default_octave = Some(10);
        let report = validate(&music);
        assert_eq!(report.errors().count(), 4);
        assert!(report
            .issues
            .iter()
            .all(|i| i.location == IssueLocation::Music));
    }

    #[test]
    fn test_mixed_pattern_and_empty_pattern() {
        let music = music()
            .with_pattern(
                PatternDeclaration::new("mixed")
                    .with_note(DrumNote::new(DrumElement::Snare))
                    .with_note(ClassicNote::new(PitchName::A)),
            )
            .with_pattern(PatternDeclaration::new("empty"));
        let report = validate(&music);
        let messages = messages(&report);
        assert!(messages.contains(
            &"error: pattern 'mixed': pattern contains both drum notes and classic notes".to_string()
        ));
        assert!(messages.contains(&"error: pattern 'empty': pattern has no notes".to_string()));
    }

    #[test]
    fn test_track_issues_name_the_entry() {
        let music = music()
            .with_pattern(PatternDeclaration::new("riff").with_note(ClassicNote::new(PitchName::C)))
            .with_track(
                Track::new("kit", Instrument::Drums)
                    .with_entry(DrumNote::new(DrumElement::Kick))
                    .with_entry(PatternReference::new("riff").repeated(0))
                    .with_entry(PatternReference::new("missing"))
                    .with_entry(TempoChange { bpm: -1.0 })
                    .with_entry(
                        DrumNote::new(DrumElement::Snare)
                            .with_delay(vec![DurationToken::EIGHTH])
                            .with_pause(vec![DurationToken::EIGHTH]),
                    ),
            );
        let report = validate(&music);
        let messages = messages(&report);
        assert_eq!(
            messages,
            vec![
                "error: track 'kit', entry #2: repeat count 0 of pattern 'riff' must be greater than 0",
                "error: track 'kit', entry #2: drum track contains classic notes",
                "error: track 'kit', entry #3: pattern 'missing' is not declared",
                "error: track 'kit', entry #4: tempo must be greater than 0",
                "error: track 'kit', entry #5: note has both a delay and a pause",
            ]
        );
    }

    #[test]
    fn test_missing_defaults_are_warnings() {
        let music = Music::new("m", Resolution::new(4).unwrap()).with_track(
            Track::new("lead", Instrument::Program(0))
                .with_entry(ClassicNote::new(PitchName::C))
                .with_entry(ClassicNote::new(PitchName::D).with_octave(12).with_velocity(200)),
        );
        let report = validate(&music);
        assert!(!report.is_ok());
        assert_eq!(report.warnings().count(), 3);
        assert_eq!(report.errors().count(), 2);
    }

    #[test]
    fn test_keys_above_g9_are_rejected() {
        let music = Music::new("m", Resolution::new(4).unwrap())
            .with_defaults(9, DurationToken::QUARTER)
            .with_track(
                Track::new("lead", Instrument::Program(0))
                    .with_entry(ClassicNote::new(PitchName::G))
                    .with_entry(ClassicNote::new(PitchName::B))
                    .with_entry(ClassicNote::new(PitchName::GSharp).with_octave(9))
                    .with_entry(ClassicNote::new(PitchName::B).with_octave(8)),
            );
        let report = validate(&music);
        assert_eq!(
            messages(&report),
            vec![
                "error: track 'lead', entry #2: B9 is above the highest MIDI key (G9)",
                "error: track 'lead', entry #3: G#9 is above the highest MIDI key (G9)",
            ]
        );
    }

    #[test]
    fn test_bend_out_of_range() {
        let music = music().with_track(
            Track::new("lead", Instrument::Program(0))
                .with_entry(PitchBend::new(1.5, vec![DurationToken::QUARTER]))
                .with_entry(PitchBend::new(0.0, vec![])),
        );
        let report = validate(&music);
        assert_eq!(report.errors().count(), 2);
    }
}
