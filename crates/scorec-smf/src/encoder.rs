//! Standard MIDI File encoder.
//!
//! This module encodes a [`CompiledMusic`] into a format 1 file: one `MThd`
//! header chunk followed by one `MTrk` chunk per compiled track. Events are
//! positioned by their absolute ticks.

use super::errors::*;
use byteorder::{BigEndian, WriteBytesExt};
use scorec_core::{CompiledMusic, CompiledTrack, Event, TrackKind};
use std::io::Write;
use std::path::Path;

/// Channel used by melodic tracks.
pub const MELODIC_CHANNEL: u8 = 0;
/// General MIDI percussion channel.
pub const PERCUSSION_CHANNEL: u8 = 9;
/// Pitch bend value of the centre position.
pub const PITCH_BEND_CENTER: u16 = 8192;

const NOTE_OFF_VELOCITY: u8 = 64;
const MAX_VLQ: u32 = 0x0FFF_FFFF;
const MAX_TEMPO_MICROS: f64 = 0xFF_FFFF as f64;

/// Encoder settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncoderOptions {
    /// Emit a track name meta event at the start of every track.
    pub track_names: bool,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self { track_names: true }
    }
}

/// Encode compiled music with default options.
pub fn encode(music: &CompiledMusic) -> Result<Vec<u8>> {
    encode_with(music, &EncoderOptions::default())
}

/// Encode compiled music into the bytes of a format 1 Standard MIDI File.
pub fn encode_with(music: &CompiledMusic, options: &EncoderOptions) -> Result<Vec<u8>> {
    let track_count = u16::try_from(music.tracks.len())
        .map_err(|_| SmfError::TooManyTracks(music.tracks.len()))?;
    let division = u16::try_from(music.resolution.get())
        .map_err(|_| SmfError::EncodingError("Resolution exceeds the division field".into()))?;

    let mut buf = Vec::new();

    // Header chunk: "MThd", length 6, format 1, track count, division
    buf.write_all(b"MThd")?;
    buf.write_u32::<BigEndian>(6)?;
    buf.write_u16::<BigEndian>(1)?;
    buf.write_u16::<BigEndian>(track_count)?;
    buf.write_u16::<BigEndian>(division)?;

    for track in &music.tracks {
        let chunk = encode_track(track, options)?;
        buf.write_all(b"MTrk")?;
        buf.write_u32::<BigEndian>(chunk.len() as u32)?;
        buf.write_all(&chunk)?;
    }

    log::debug!(
        "Encoded '{}': {} tracks, {} bytes",
        music.name,
        music.tracks.len(),
        buf.len()
    );
    Ok(buf)
}

/// Encode and write to `path`.
pub fn write_to_path(
    music: &CompiledMusic,
    options: &EncoderOptions,
    path: impl AsRef<Path>,
) -> Result<()> {
    let bytes = encode_with(music, options)?;
    std::fs::write(path.as_ref(), bytes)?;
    log::info!("Wrote {}", path.as_ref().display());
    Ok(())
}

/// Encode the body of one `MTrk` chunk.
fn encode_track(track: &CompiledTrack, options: &EncoderOptions) -> Result<Vec<u8>> {
    let channel = match track.kind {
        TrackKind::Melodic => MELODIC_CHANNEL,
        TrackKind::Percussive => PERCUSSION_CHANNEL,
    };

    let mut buf = Vec::new();
    let mut last_tick = 0u32;

    if options.track_names {
        write_vlq(&mut buf, 0)?;
        write_meta(&mut buf, 0x03, track.name.as_bytes())?;
    }

    for timed in &track.events {
        let messages = messages(&timed.event, channel)?;
        for message in messages {
            let delta = timed.tick.saturating_sub(last_tick);
            write_vlq(&mut buf, delta)?;
            buf.write_all(&message)?;
            last_tick = timed.tick.max(last_tick);
        }
    }

    // End of track
    write_vlq(&mut buf, 0)?;
    write_meta(&mut buf, 0x2F, &[])?;

    log::trace!("Track '{}': {} bytes on channel {}", track.name, buf.len(), channel);
    Ok(buf)
}

/// Raw messages (status byte onwards) for one event.
fn messages(event: &Event, channel: u8) -> Result<Vec<Vec<u8>>> {
    let messages = match event {
        Event::ProgramChange { program } => {
            vec![vec![0xC0 | channel, data_byte("program", *program)?]]
        }
        Event::TimeSignature {
            numerator,
            denominator,
        } => {
            if *denominator == 0 {
                return Err(SmfError::InvalidTimeSignature {
                    numerator: *numerator,
                    denominator: *denominator,
                });
            }
            let dd = f64::from(*denominator).log2().round() as u8;
            vec![meta_bytes(0x58, &[*numerator, dd, 24, 8])?]
        }
        Event::Tempo { bpm } => {
            let micros = 60_000_000.0 / bpm;
            if !bpm.is_finite() || *bpm <= 0.0 || micros > MAX_TEMPO_MICROS {
                return Err(SmfError::InvalidTempo(*bpm));
            }
            let micros = micros.round() as u32;
            vec![meta_bytes(
                0x51,
                &[(micros >> 16) as u8, (micros >> 8) as u8, micros as u8],
            )?]
        }
        Event::NoteOn {
            pitches, velocity, ..
        } => {
            let velocity = data_byte("velocity", *velocity)?;
            pitches
                .iter()
                .map(|key| Ok(vec![0x90 | channel, data_byte("key", *key)?, velocity]))
                .collect::<Result<Vec<_>>>()?
        }
        Event::NoteOff { pitches, .. } => pitches
            .iter()
            .map(|key| Ok(vec![0x80 | channel, data_byte("key", *key)?, NOTE_OFF_VELOCITY]))
            .collect::<Result<Vec<_>>>()?,
        Event::PitchBendBegin { amount, .. } => vec![pitch_bend(channel, bend_value(*amount))],
        Event::PitchBendEnd { .. } => vec![pitch_bend(channel, PITCH_BEND_CENTER)],
    };
    Ok(messages)
}

/// A channel message data byte; values above 127 are rejected.
fn data_byte(field: &'static str, value: u8) -> Result<u8> {
    if value > 0x7F {
        return Err(SmfError::DataOutOfRange { field, value });
    }
    Ok(value)
}

/// 14-bit pitch bend value for an amount in `-1.0..=1.0`.
pub fn bend_value(amount: f32) -> u16 {
    let value = f32::from(PITCH_BEND_CENTER) + amount * f32::from(PITCH_BEND_CENTER);
    value.round().clamp(0.0, 16383.0) as u16
}

fn pitch_bend(channel: u8, value: u16) -> Vec<u8> {
    vec![0xE0 | channel, (value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8]
}

fn meta_bytes(kind: u8, data: &[u8]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_meta(&mut buf, kind, data)?;
    Ok(buf)
}

fn write_meta(buf: &mut Vec<u8>, kind: u8, data: &[u8]) -> Result<()> {
    buf.write_u8(0xFF)?;
    buf.write_u8(kind)?;
    write_vlq(buf, data.len() as u32)?;
    buf.write_all(data)?;
    Ok(())
}

/// Write `value` as a MIDI variable-length quantity.
pub fn write_vlq(buf: &mut Vec<u8>, value: u32) -> Result<()> {
    if value > MAX_VLQ {
        return Err(SmfError::VlqOverflow(u64::from(value)));
    }

    let mut groups = [0u8; 4];
    let mut count = 0;
    let mut rest = value;
    loop {
        groups[count] = (rest & 0x7F) as u8;
        count += 1;
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }

    for i in (0..count).rev() {
        let continuation = if i > 0 { 0x80 } else { 0 };
        buf.write_u8(groups[i] | continuation)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorec_core::{
        compile, ClassicNote, DrumElement, DrumNote, DurationToken, Instrument, Music, PitchBend,
        PitchName, Resolution, TimedEvent, Track,
    };

    fn vlq(value: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        write_vlq(&mut buf, value).unwrap();
        buf
    }

    #[test]
    fn test_vlq() {
        assert_eq!(vlq(0), vec![0x00]);
        assert_eq!(vlq(0x40), vec![0x40]);
        assert_eq!(vlq(0x7F), vec![0x7F]);
        assert_eq!(vlq(0x80), vec![0x81, 0x00]);
        assert_eq!(vlq(0x2000), vec![0xC0, 0x00]);
        assert_eq!(vlq(0x3FFF), vec![0xFF, 0x7F]);
        assert_eq!(vlq(0x0FFF_FFFF), vec![0xFF, 0xFF, 0xFF, 0x7F]);
        assert!(write_vlq(&mut Vec::new(), 0x1000_0000).is_err());
    }

    #[test]
    fn test_bend_value() {
        assert_eq!(bend_value(0.0), 8192);
        assert_eq!(bend_value(0.5), 12288);
        assert_eq!(bend_value(-1.0), 0);
        assert_eq!(bend_value(1.0), 16383);
    }

    fn music() -> Music {
        Music::new("test", Resolution::new(4).unwrap())
            .with_defaults(4, DurationToken::QUARTER)
            .with_track(
                Track::new("lead", Instrument::Program(5))
                    .with_entry(ClassicNote::new(PitchName::C))
                    .with_entry(PitchBend::new(0.5, vec![DurationToken::EIGHTH])),
            )
            .with_track(
                Track::new("kit", Instrument::Drums)
                    .with_entry(DrumNote::new(DrumElement::Kick))
                    .with_entry(DrumNote::new(DrumElement::Snare).chorded()),
            )
    }

    #[test]
    fn test_header() {
        let compiled = compile(&music()).unwrap();
        let bytes = encode(&compiled).unwrap();

        assert_eq!(&bytes[0..4], b"MThd");
        assert_eq!(bytes[4..8], [0, 0, 0, 6]);
        // format 1, two tracks, division 4
        assert_eq!(bytes[8..14], [0, 1, 0, 2, 0, 4]);
        assert_eq!(&bytes[14..18], b"MTrk");
    }

    #[test]
    fn test_melodic_track_body() {
        let compiled = compile(&music()).unwrap();
        let body = encode_track(&compiled.tracks[0], &EncoderOptions { track_names: false }).unwrap();

        let expected: Vec<u8> = [
            // time signature 4/4
            &[0x00, 0xFF, 0x58, 0x04, 4, 2, 24, 8][..],
            // tempo 120 BPM = 500000 us
            &[0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20],
            // program change 5
            &[0x00, 0xC0, 5],
            // C4 on at 0, off at 4
            &[0x00, 0x90, 60, 100],
            &[0x04, 0x80, 60, 64],
            // bend from 4 to 6
            &[0x00, 0xE0, 0x00, 0x60],
            &[0x02, 0xE0, 0x00, 0x40],
            // end of track
            &[0x00, 0xFF, 0x2F, 0x00],
        ]
        .concat();
        assert_eq!(body, expected);
    }

    #[test]
    fn test_percussion_track_uses_channel_ten() {
        let compiled = compile(&music()).unwrap();
        let body = encode_track(&compiled.tracks[1], &EncoderOptions::default()).unwrap();

        let mut expected = vec![0x00, 0xFF, 0x03, 3];
        expected.extend_from_slice(b"kit");
        expected.extend_from_slice(&[0x00, 0xFF, 0x58, 0x04, 4, 2, 24, 8]);
        expected.extend_from_slice(&[0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20]);
        expected.extend_from_slice(&[0x00, 0x99, 35, 100, 0x00, 0x99, 38, 100]);
        expected.extend_from_slice(&[0x01, 0x89, 35, 64, 0x00, 0x89, 38, 64]);
        expected.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
        assert_eq!(body, expected);
    }

    #[test]
    fn test_invalid_tempo() {
        let mut compiled = compile(&music()).unwrap();
        compiled.tracks[0]
            .events
            .push(TimedEvent::new(8, 2, Event::Tempo { bpm: 0.0 }));
        assert!(matches!(encode(&compiled), Err(SmfError::InvalidTempo(_))));
    }

    #[test]
    fn test_write_to_path() {
        let compiled = compile(&music()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mid");
        write_to_path(&compiled, &EncoderOptions::default(), &path).unwrap();
        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, encode(&compiled).unwrap());
    }

    #[test]
    fn test_velocity_above_127_is_rejected() {
        let mut compiled = compile(&music()).unwrap();
        compiled.tracks[0].events.push(TimedEvent::new(
            8,
            0,
            Event::NoteOn {
                pitches: vec![60],
                velocity: 200,
                wait: 0,
            },
        ));
        assert!(matches!(
            encode(&compiled),
            Err(SmfError::DataOutOfRange {
                field: "velocity",
                value: 200
            })
        ));
    }
}
