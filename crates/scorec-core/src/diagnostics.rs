//! Non-fatal findings recorded while emitting events.

use crate::duration::TickTime;
use crate::expand::EntryOrigin;
use serde::Serialize;
use std::fmt;

/// Which emitted quantity was converted to whole ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Tick,
    Wait,
    Duration,
    Delta,
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Quantity::Tick => "tick",
            Quantity::Wait => "wait",
            Quantity::Duration => "duration",
            Quantity::Delta => "delta",
        };
        f.write_str(name)
    }
}

/// A rounding finding attached to a compiled track.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Truncation to whole ticks discarded more than half a tick.
    Rounding {
        origin: EntryOrigin,
        quantity: Quantity,
        exact: f64,
        emitted: i64,
    },
    /// A note with a positive length that occupies no whole tick.
    CollapsedNote { origin: EntryOrigin, exact: f64 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Rounding {
                origin,
                quantity,
                exact,
                emitted,
            } => write!(
                f,
                "{quantity} of {origin} rounded from {exact:.3} to {emitted} ticks"
            ),
            Diagnostic::CollapsedNote { origin, exact } => write!(
                f,
                "{origin} lasts {exact:.3} ticks and collapses to zero length"
            ),
        }
    }
}

/// Converts exact tick values to whole ticks and collects diagnostics.
#[derive(Debug, Default)]
pub struct Rounder {
    diagnostics: Vec<Diagnostic>,
}

impl Rounder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whole ticks of `value`, truncated toward negative infinity.
    pub fn whole(&mut self, value: TickTime, quantity: Quantity, origin: &EntryOrigin) -> i64 {
        let emitted = value.whole_ticks();
        if value.remainder() * 2 > TickTime::SCALE {
            self.record(Diagnostic::Rounding {
                origin: origin.clone(),
                quantity,
                exact: value.to_float(),
                emitted,
            });
        }
        emitted
    }

    /// Like [`Rounder::whole`], saturated into the unsigned event range.
    pub fn unsigned(&mut self, value: TickTime, quantity: Quantity, origin: &EntryOrigin) -> u32 {
        let whole = self.whole(value, quantity, origin);
        whole.clamp(0, i64::from(u32::MAX)) as u32
    }

    /// Record a note whose positive `length` spans no whole tick.
    pub fn collapsed(&mut self, length: TickTime, origin: &EntryOrigin) {
        self.record(Diagnostic::CollapsedNote {
            origin: origin.clone(),
            exact: length.to_float(),
        });
    }

    fn record(&mut self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
