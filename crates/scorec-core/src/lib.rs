//! scorec Core - Timeline resolution and event scheduling for the scorec music compiler.
//!
//! This crate lowers a structured music model into per-track streams of
//! MIDI-level events:
//!
//! - **Model** - Music, tracks, notes, patterns and control entries
//! - **Duration** - Duration tokens and exact tick arithmetic
//! - **Expand** - Pattern expansion, default resolution and drum chord grouping
//! - **Timeline** - Absolute begin/end marks for every entry
//! - **Scheduler** - Tick-ordered merge of the marks with deterministic tie-breaking
//! - **Compiler** - Per-track orchestration with a prologue and optional parallelism
//! - **Validation** - Precondition report for models
//!
//! # Architecture
//!
//! Every track is compiled on its own: the [`Expander`] flattens the track,
//! [`build_timeline`] places each flat entry on the tick grid and the
//! [`EventScheduler`] drains the resulting marks into [`TimedEvent`]s. All
//! intermediate state is owned by one track invocation, so tracks can be
//! compiled concurrently with [`Compiler::compile_parallel`].

pub mod compiler;
pub mod defaults;
pub mod diagnostics;
pub mod duration;
pub mod error;
pub mod events;
pub mod expand;
pub mod model;
pub mod pitch;
pub mod scheduler;
pub mod timeline;
pub mod validation;

// Re-export main types for convenience
pub use compiler::{compile, compile_track, CompileOptions, CompiledMusic, CompiledTrack, Compiler};
pub use defaults::{Defaults, ResolvedNote};
pub use diagnostics::{Diagnostic, Quantity};
pub use duration::{sum_ticks, DurationBase, DurationToken, Modifier, Resolution, TickTime};
pub use error::{CompileError, EngineError, Result};
pub use events::{Event, TimedEvent};
pub use expand::{DrumGroup, EntryOrigin, Expander, FlatEntry, FlatItem, PatternOrigin};
pub use model::{
    ClassicNote, DrumNote, Instrument, Music, PatternDeclaration, PatternNote, PatternReference,
    PitchBend, TempoChange, TimeSignatureChange, Track, TrackEntry, TrackKind,
};
pub use pitch::{DrumElement, PitchName};
pub use scheduler::{schedule, tie_break_rank, EventScheduler, ScheduledTrack};
pub use timeline::{build_timeline, ScheduledMark, Timeline};
pub use validation::{validate, IssueLocation, Severity, ValidationIssue, ValidationReport};
