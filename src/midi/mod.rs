//! MIDI data structures consumed by the playback engine.
//!
//! This module provides the message and parsed-file types handed over by an
//! external file parser. The playback engine never decodes bytes; it works
//! entirely on these structures.

mod file;
mod message;

pub use file::{EventKind, ParsedFile, ParsedTrack, TrackEvent};
pub use message::{ChannelMessage, PITCH_BEND_CENTER};

/// Default tempo in microseconds per quarter note (120 BPM), used when a
/// file carries no tempo event at tick 0.
pub const DEFAULT_USEC_PER_BEAT: u32 = 500_000;

/// Default timing resolution in ticks per quarter note.
pub const DEFAULT_TICKS_PER_BEAT: u16 = 480;

/// Converts a tempo in microseconds per quarter note to beats per minute.
///
/// # Arguments
///
/// * `usec_per_beat` - Tempo as stored in a MIDI tempo event
///
/// # Returns
///
/// Tempo in BPM, or 0.0 for a zero input
pub fn usec_per_beat_to_bpm(usec_per_beat: u32) -> f64 {
    if usec_per_beat == 0 {
        return 0.0;
    }
    60_000_000.0 / usec_per_beat as f64
}

/// Converts beats per minute to microseconds per quarter note.
pub fn bpm_to_usec_per_beat(bpm: f64) -> u32 {
    if bpm <= 0.0 {
        return 0;
    }
    (60_000_000.0 / bpm).round() as u32
}
