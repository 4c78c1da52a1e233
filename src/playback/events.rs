//! Flattening parsed tracks into one chronological event list.
//!
//! The engine plays from a single sorted list rather than walking all
//! tracks in parallel. Each track's delta times are accumulated on its own
//! counter, only channel-voice messages are kept (tempo events are consumed
//! by the tempo map, other meta and system events carry nothing playable),
//! and the combined list is stably sorted by absolute tick.

use crate::midi::{ChannelMessage, EventKind, ParsedTrack};

/// A channel-voice message scheduled at an absolute tick position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledEvent {
    /// Absolute tick from the start of the file.
    pub tick: u64,

    /// Index of the originating track in the parsed file (0-based).
    pub track_index: u32,

    /// The message to deliver.
    pub message: ChannelMessage,
}

/// Flattens all tracks into one list sorted ascending by tick.
///
/// Ties are broken by original track order, then by original intra-track
/// order: events are collected track by track and the sort is stable. An
/// empty or track-less input yields an empty list.
pub fn build_event_list(tracks: &[ParsedTrack]) -> Vec<ScheduledEvent> {
    let mut events = Vec::new();
    for (track_index, track) in tracks.iter().enumerate() {
        let mut current_tick: u64 = 0;
        for event in &track.events {
            current_tick += u64::from(event.delta_ticks);
            if let EventKind::Channel(message) = event.kind {
                events.push(ScheduledEvent {
                    tick: current_tick,
                    track_index: track_index as u32,
                    message,
                });
            }
        }
    }
    events.sort_by_key(|e| e.tick);
    events
}
