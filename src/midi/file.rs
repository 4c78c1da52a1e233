//! Parsed MIDI file representation.
//!
//! These types are the hand-off format from the (out-of-scope) file parser:
//! ordered tracks of delta-timed events plus the header's ticks-per-beat
//! resolution. No byte-level decoding happens here. The model is serde-
//! serializable so frontends can ship sequences as JSON, which is also how
//! the demo binary consumes them.

use super::message::ChannelMessage;
use super::DEFAULT_TICKS_PER_BEAT;
use serde::{Deserialize, Serialize};

/// One event as it appears inside a track: a delta time in ticks relative
/// to the previous event, plus the event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackEvent {
    /// Ticks elapsed since the preceding event in the same track.
    pub delta_ticks: u32,

    /// The event payload.
    pub kind: EventKind,
}

impl TrackEvent {
    pub fn new(delta_ticks: u32, kind: EventKind) -> Self {
        Self { delta_ticks, kind }
    }
}

/// Payload of a parsed track event.
///
/// Channel-voice messages are carried whole; of the meta events only tempo
/// changes matter to playback, so the rest collapse into markers that the
/// event-list builder discards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// A channel-voice message, playable as-is.
    Channel(ChannelMessage),

    /// Tempo change meta event, in microseconds per quarter note.
    Tempo(u32),

    /// Any other meta event (track name, time signature, markers, ...).
    Meta,

    /// A system-exclusive message.
    SysEx,

    /// End-of-track marker.
    EndOfTrack,
}

/// A single parsed track: an ordered sequence of delta-timed events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTrack {
    pub events: Vec<TrackEvent>,
}

impl ParsedTrack {
    pub fn new(events: Vec<TrackEvent>) -> Self {
        Self { events }
    }
}

/// A complete parsed MIDI file: the header's timing resolution plus all
/// tracks in file order.
///
/// An empty file (no tracks, or tracks without events) is a valid input and
/// produces a playable-but-silent engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFile {
    /// Ticks per quarter note from the file header.
    pub ticks_per_beat: u16,

    /// Tracks in their original file order.
    pub tracks: Vec<ParsedTrack>,
}

impl ParsedFile {
    pub fn new(ticks_per_beat: u16, tracks: Vec<ParsedTrack>) -> Self {
        Self {
            ticks_per_beat,
            tracks,
        }
    }

    /// Returns the total number of events across all tracks.
    pub fn event_count(&self) -> usize {
        self.tracks.iter().map(|t| t.events.len()).sum()
    }
}

impl Default for ParsedFile {
    fn default() -> Self {
        Self {
            ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            tracks: Vec::new(),
        }
    }
}
