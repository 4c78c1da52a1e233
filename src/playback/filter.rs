//! Mute and suppression filtering.
//!
//! `MuteConfig` is the editor-facing switchboard deciding which scheduled
//! events reach the output sink: per-track mutes, per-track solos,
//! per-channel mutes, and two message-type suppression flags. The filter is
//! a pure predicate over immutable event data; toggling it never retracts
//! events that were already delivered, it only affects what the engine has
//! not yet passed.

use super::events::ScheduledEvent;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which events are forwarded to the output sink.
///
/// Owned by the engine but mutated by the hosting editor/UI layer. The
/// configuration survives `load()` of a new file; a frontend's mute state
/// is not tied to one sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuteConfig {
    /// Tracks whose events are withheld (0-based track indices).
    pub muted_tracks: HashSet<u32>,

    /// When non-empty, only these tracks play; all others are withheld.
    pub solo_tracks: HashSet<u32>,

    /// MIDI channels (0-15) whose events are withheld.
    pub muted_channels: HashSet<u8>,

    /// Withhold all program change messages.
    pub suppress_program_changes: bool,

    /// Withhold all control change messages.
    pub suppress_control_changes: bool,
}

impl MuteConfig {
    /// Decides whether `event` is forwarded to the sink.
    ///
    /// Forwards only if the event's track is not muted (and is soloed, when
    /// any solo is active), its channel is not muted, and its message type
    /// is not suppressed.
    pub fn should_send(&self, event: &ScheduledEvent) -> bool {
        if self.muted_tracks.contains(&event.track_index) {
            return false;
        }
        if !self.solo_tracks.is_empty() && !self.solo_tracks.contains(&event.track_index) {
            return false;
        }
        if self.muted_channels.contains(&event.message.channel()) {
            return false;
        }
        if self.suppress_program_changes && event.message.is_program_change() {
            return false;
        }
        if self.suppress_control_changes && event.message.is_control_change() {
            return false;
        }
        true
    }

    /// Mutes or unmutes a track.
    pub fn set_track_muted(&mut self, track_index: u32, muted: bool) {
        if muted {
            self.muted_tracks.insert(track_index);
        } else {
            self.muted_tracks.remove(&track_index);
        }
    }

    /// Solos or unsolos a track. An empty solo set means every unmuted
    /// track plays.
    pub fn set_track_solo(&mut self, track_index: u32, solo: bool) {
        if solo {
            self.solo_tracks.insert(track_index);
        } else {
            self.solo_tracks.remove(&track_index);
        }
    }

    /// Mutes or unmutes a MIDI channel (0-15).
    pub fn set_channel_muted(&mut self, channel: u8, muted: bool) {
        if muted {
            self.muted_channels.insert(channel.min(15));
        } else {
            self.muted_channels.remove(&channel.min(15));
        }
    }
}
