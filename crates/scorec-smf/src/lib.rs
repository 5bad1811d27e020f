//! scorec SMF - Standard MIDI File encoding for compiled scorec music.
//!
//! - [`encode`] - Encode with default options
//! - [`encode_with`] - Encode with explicit [`EncoderOptions`]
//! - [`write_to_path`] - Encode straight to a file

pub mod encoder;
pub mod errors;

pub use encoder::{
    bend_value, encode, encode_with, write_to_path, write_vlq, EncoderOptions, MELODIC_CHANNEL,
    PERCUSSION_CHANNEL, PITCH_BEND_CENTER,
};
pub use errors::{Result, SmfError};
