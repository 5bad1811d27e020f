//! Error types for the scorec-smf crate.

use thiserror::Error;

/// Errors that can occur while encoding a Standard MIDI File.
#[derive(Error, Debug)]
pub enum SmfError {
    /// A tempo that cannot be expressed as microseconds per quarter note.
    #[error("Invalid tempo: {0} BPM")]
    InvalidTempo(f64),

    /// A time signature the meta event cannot carry.
    #[error("Invalid time signature: {numerator}/{denominator}")]
    InvalidTimeSignature { numerator: u8, denominator: u8 },

    /// A key, velocity or program above the 7-bit data range.
    #[error("Invalid {field}: {value} is above 127")]
    DataOutOfRange { field: &'static str, value: u8 },

    /// More tracks than the header can count.
    #[error("Too many tracks: {0}")]
    TooManyTracks(usize),

    /// A value outside the range of a variable-length quantity.
    #[error("Value {0} does not fit a variable-length quantity")]
    VlqOverflow(u64),

    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error during binary encoding.
    #[error("Encoding error: {0}")]
    EncodingError(String),
}

/// Result type alias using SmfError.
pub type Result<T> = std::result::Result<T, SmfError>;
