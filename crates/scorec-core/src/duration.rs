//! Duration tokens and exact tick arithmetic.
//!
//! This module provides the timing primitives used by the engine:
//!
//! - [`TickTime`] - Fixed-point tick representation for exact arithmetic
//! - [`Resolution`] - Ticks per quarter note owned by the music model
//! - [`DurationToken`] - Symbolic note value with an optional modifier

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed-point tick value with 96 sub-ticks per tick.
///
/// Every token value (down to a sixty-fourth triplet at resolution 1) is an
/// integer number of sub-ticks, so timeline arithmetic never drifts. Values
/// only become whole ticks when events are emitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TickTime {
    sub: i64,
}

impl TickTime {
    /// Sub-ticks per whole tick.
    pub const SCALE: i64 = 96;

    /// Zero tick constant.
    pub const ZERO: TickTime = TickTime { sub: 0 };

    /// Sentinel later than any reachable tick.
    pub const MAX: TickTime = TickTime { sub: i64::MAX };

    /// Create a TickTime from a whole number of ticks.
    #[inline]
    pub const fn from_ticks(ticks: i64) -> Self {
        Self {
            sub: ticks * Self::SCALE,
        }
    }

    #[inline]
    pub(crate) const fn from_sub_ticks(sub: i64) -> Self {
        Self { sub }
    }

    /// Raw sub-tick count.
    #[inline]
    pub fn sub_ticks(self) -> i64 {
        self.sub
    }

    /// Convert to a floating-point tick value.
    #[inline]
    pub fn to_float(self) -> f64 {
        self.sub as f64 / Self::SCALE as f64
    }

    /// Whole ticks, truncated toward negative infinity.
    #[inline]
    pub fn whole_ticks(self) -> i64 {
        self.sub.div_euclid(Self::SCALE)
    }

    /// Sub-ticks discarded by [`TickTime::whole_ticks`].
    #[inline]
    pub fn remainder(self) -> i64 {
        self.sub.rem_euclid(Self::SCALE)
    }

    /// Check if the value lands exactly on a tick.
    pub fn is_integral(self) -> bool {
        self.remainder() == 0
    }

    /// Check if the value is strictly negative.
    pub fn is_negative(self) -> bool {
        self.sub < 0
    }
}

impl std::ops::Add for TickTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            sub: self.sub.saturating_add(rhs.sub),
        }
    }
}

impl std::ops::Sub for TickTime {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            sub: self.sub.saturating_sub(rhs.sub),
        }
    }
}

impl std::iter::Sum for TickTime {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(TickTime::ZERO, |a, b| a + b)
    }
}

impl fmt::Display for TickTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integral() {
            write!(f, "{}", self.whole_ticks())
        } else {
            write!(f, "{:.3}", self.to_float())
        }
    }
}

/// Ticks per quarter note.
///
/// Always within `1..=128`; construction outside that range fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Resolution(u32);

impl Resolution {
    /// Smallest accepted resolution.
    pub const MIN: u32 = 1;
    /// Largest accepted resolution.
    pub const MAX: u32 = 128;

    /// Create a resolution, rejecting values outside `1..=128`.
    pub fn new(ticks_per_quarter: u32) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&ticks_per_quarter) {
            Ok(Self(ticks_per_quarter))
        } else {
            Err(EngineError::InvalidResolution(ticks_per_quarter))
        }
    }

    /// Ticks per quarter note.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Resolution {
    type Error = EngineError;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Resolution> for u32 {
    fn from(value: Resolution) -> Self {
        value.0
    }
}

/// Base value of a duration token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DurationBase {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
    SixtyFourth,
    /// Fixed one-tick length of a drum hit, independent of resolution.
    Drum,
    /// Zero-length marker grouping a note with the previous one.
    Chord,
}

impl DurationBase {
    const ALL: [DurationBase; 9] = [
        DurationBase::Whole,
        DurationBase::Half,
        DurationBase::Quarter,
        DurationBase::Eighth,
        DurationBase::Sixteenth,
        DurationBase::ThirtySecond,
        DurationBase::SixtyFourth,
        DurationBase::Drum,
        DurationBase::Chord,
    ];

    /// Text form used in model files.
    pub fn name(self) -> &'static str {
        match self {
            DurationBase::Whole => "whole",
            DurationBase::Half => "half",
            DurationBase::Quarter => "quarter",
            DurationBase::Eighth => "eighth",
            DurationBase::Sixteenth => "sixteenth",
            DurationBase::ThirtySecond => "thirty_second",
            DurationBase::SixtyFourth => "sixty_fourth",
            DurationBase::Drum => "drum",
            DurationBase::Chord => "chord",
        }
    }

    /// Length in sixty-fourth notes for the musical values.
    fn sixty_fourths(self) -> Option<i64> {
        match self {
            DurationBase::Whole => Some(64),
            DurationBase::Half => Some(32),
            DurationBase::Quarter => Some(16),
            DurationBase::Eighth => Some(8),
            DurationBase::Sixteenth => Some(4),
            DurationBase::ThirtySecond => Some(2),
            DurationBase::SixtyFourth => Some(1),
            DurationBase::Drum | DurationBase::Chord => None,
        }
    }
}

/// Length modifier applied on top of the base value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Modifier {
    #[default]
    Plain,
    /// Multiplies the base value by 3/2.
    Dotted,
    /// Multiplies the base value by 2/3.
    Triplet,
}

/// A symbolic duration such as `quarter`, `eighth_dotted` or `half_triplet`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DurationToken {
    pub base: DurationBase,
    pub modifier: Modifier,
}

impl DurationToken {
    pub const WHOLE: DurationToken = DurationToken::plain(DurationBase::Whole);
    pub const HALF: DurationToken = DurationToken::plain(DurationBase::Half);
    pub const QUARTER: DurationToken = DurationToken::plain(DurationBase::Quarter);
    pub const EIGHTH: DurationToken = DurationToken::plain(DurationBase::Eighth);
    pub const SIXTEENTH: DurationToken = DurationToken::plain(DurationBase::Sixteenth);
    pub const DRUM: DurationToken = DurationToken::plain(DurationBase::Drum);
    pub const CHORD: DurationToken = DurationToken::plain(DurationBase::Chord);

    /// Create a token with the given modifier.
    pub const fn new(base: DurationBase, modifier: Modifier) -> Self {
        Self { base, modifier }
    }

    /// Create an unmodified token.
    pub const fn plain(base: DurationBase) -> Self {
        Self::new(base, Modifier::Plain)
    }

    /// Dotted variant of this token.
    pub const fn dotted(self) -> Self {
        Self::new(self.base, Modifier::Dotted)
    }

    /// Triplet variant of this token.
    pub const fn triplet(self) -> Self {
        Self::new(self.base, Modifier::Triplet)
    }

    /// Check if this is the zero-length chord marker.
    pub fn is_chord_marker(self) -> bool {
        self.base == DurationBase::Chord
    }

    /// Exact length of this token at the given resolution.
    pub fn ticks(self, resolution: Resolution) -> TickTime {
        // 96 sub-ticks per tick and 16 sixty-fourths per quarter: 6 sub-ticks
        // per sixty-fourth per tick of resolution.
        let plain = match self.base.sixty_fourths() {
            Some(n) => n * i64::from(resolution.get()) * (TickTime::SCALE / 16),
            None if self.base == DurationBase::Drum => TickTime::SCALE,
            None => 0,
        };
        let sub = match self.modifier {
            Modifier::Plain => plain,
            Modifier::Dotted => plain * 3 / 2,
            Modifier::Triplet => plain * 2 / 3,
        };
        TickTime::from_sub_ticks(sub)
    }
}

/// Sum of the individual token lengths; an empty list is zero.
pub fn sum_ticks(tokens: &[DurationToken], resolution: Resolution) -> TickTime {
    tokens.iter().map(|token| token.ticks(resolution)).sum()
}

/// Check if a delay list marks its note as a chord member.
pub fn starts_with_chord_marker(tokens: &[DurationToken]) -> bool {
    tokens.first().is_some_and(|token| token.is_chord_marker())
}

impl FromStr for DurationToken {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let (base_name, modifier) = if let Some(base) = s.strip_suffix("_dotted") {
            (base, Modifier::Dotted)
        } else if let Some(base) = s.strip_suffix("_triplet") {
            (base, Modifier::Triplet)
        } else {
            (s, Modifier::Plain)
        };

        DurationBase::ALL
            .iter()
            .find(|base| base.name() == base_name)
            .map(|&base| DurationToken::new(base, modifier))
            .ok_or_else(|| EngineError::UnknownDurationToken(s.to_string()))
    }
}

impl TryFrom<String> for DurationToken {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DurationToken> for String {
    fn from(value: DurationToken) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DurationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.modifier {
            Modifier::Plain => write!(f, "{}", self.base.name()),
            Modifier::Dotted => write!(f, "{}_dotted", self.base.name()),
            Modifier::Triplet => write!(f, "{}_triplet", self.base.name()),
        }
    }
}
