//! Per-track compilation of a music model.
//!
//! Each track runs through expansion, timeline placement and scheduling on
//! its own; nothing is shared between tracks except the read-only model.
//! Every track stream starts with a prologue at tick 0 carrying the model's
//! time signature and tempo, plus the program change of melodic tracks.

use crate::defaults::Defaults;
use crate::diagnostics::Diagnostic;
use crate::duration::Resolution;
use crate::error::{CompileError, EngineError};
use crate::events::{Event, TimedEvent};
use crate::expand::Expander;
use crate::model::{Instrument, Music, Track, TrackKind};
use crate::scheduler::schedule;
use crate::timeline::build_timeline;
use serde::Serialize;

/// Settings applied on top of the model.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CompileOptions {
    /// Octave and note type used when the model declares no defaults.
    pub fallback: Defaults,
}

impl CompileOptions {
    pub fn with_fallback(mut self, fallback: Defaults) -> Self {
        self.fallback = fallback;
        self
    }
}

/// Event stream of one track.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompiledTrack {
    /// Track name from the model.
    pub name: String,
    /// Melodic or percussive.
    pub kind: TrackKind,
    /// Prologue followed by the scheduled events.
    pub events: Vec<TimedEvent>,
    /// Rounding findings of this track.
    pub diagnostics: Vec<Diagnostic>,
}

/// Event streams of every track, in model order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompiledMusic {
    /// Music name from the model.
    pub name: String,
    /// Ticks per quarter note.
    pub resolution: Resolution,
    /// One stream per track, in declaration order.
    pub tracks: Vec<CompiledTrack>,
}

impl CompiledMusic {
    /// Total number of diagnostics across all tracks.
    pub fn diagnostic_count(&self) -> usize {
        self.tracks.iter().map(|t| t.diagnostics.len()).sum()
    }
}

/// Compiles music models into per-track event streams.
#[derive(Clone, Debug, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Compile every track in order, stopping at the first failing track.
    pub fn compile(&self, music: &Music) -> Result<CompiledMusic, CompileError> {
        let defaults = Defaults::for_music(music, self.options.fallback);
        let tracks = music
            .tracks
            .iter()
            .map(|track| {
                compile_track(music, track, defaults)
                    .map_err(|error| CompileError::new(track.name.clone(), error))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self.finish(music, tracks))
    }

    /// Compile tracks on scoped threads; the result equals [`Compiler::compile`].
    pub fn compile_parallel(&self, music: &Music) -> Result<CompiledMusic, CompileError> {
        let defaults = Defaults::for_music(music, self.options.fallback);

        let results: Vec<Result<CompiledTrack, EngineError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = music
                .tracks
                .iter()
                .map(|track| scope.spawn(move || compile_track(music, track, defaults)))
                .collect();

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        let tracks = results
            .into_iter()
            .zip(&music.tracks)
            .map(|(result, track)| {
                result.map_err(|error| CompileError::new(track.name.clone(), error))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self.finish(music, tracks))
    }

    fn finish(&self, music: &Music, tracks: Vec<CompiledTrack>) -> CompiledMusic {
        let compiled = CompiledMusic {
            name: music.name.clone(),
            resolution: music.resolution,
            tracks,
        };
        log::info!(
            "Compiled '{}': {} tracks, {} diagnostics",
            compiled.name,
            compiled.tracks.len(),
            compiled.diagnostic_count()
        );
        compiled
    }
}

/// Compile one track of `music` with already resolved defaults.
pub fn compile_track(
    music: &Music,
    track: &Track,
    defaults: Defaults,
) -> Result<CompiledTrack, EngineError> {
    let entries = Expander::new(music, defaults).expand_track(track)?;
    let timeline = build_timeline(&entries, music.resolution)?;
    let scheduled = schedule(&entries, &timeline, music.resolution);

    let mut events = prologue(music, track);
    events.extend(scheduled.events);

    log::debug!(
        "Track '{}': {} events, length {} ticks",
        track.name,
        events.len(),
        timeline.length()
    );

    Ok(CompiledTrack {
        name: track.name.clone(),
        kind: track.kind(),
        events,
        diagnostics: scheduled.diagnostics,
    })
}

fn prologue(music: &Music, track: &Track) -> Vec<TimedEvent> {
    let mut events = vec![
        TimedEvent::new(
            0,
            0,
            Event::TimeSignature {
                numerator: music.numerator,
                denominator: music.denominator,
            },
        ),
        TimedEvent::new(0, 0, Event::Tempo { bpm: music.tempo }),
    ];
    if let Instrument::Program(program) = track.instrument {
        events.push(TimedEvent::new(0, 0, Event::ProgramChange { program }));
    }
    events
}

/// Compile `music` with default options.
pub fn compile(music: &Music) -> Result<CompiledMusic, CompileError> {
    Compiler::default().compile(music)
}
