//! MIDI channel-voice message representation.
//!
//! A `ChannelMessage` is one already-parsed channel-voice message as handed
//! over by the file parser: note on/off, aftertouch, control change, program
//! change, or pitch bend, always carrying its channel.

use serde::{Deserialize, Serialize};

/// Center value of the 14-bit pitch bend range (no bend applied).
pub const PITCH_BEND_CENTER: u16 = 0x2000;

/// A single MIDI channel-voice message with payload.
///
/// Meta events (tempo, track name, end-of-track) and system messages are
/// represented separately in the parsed-file model; this enum only covers
/// messages that address one of the 16 channels and can be sent to an
/// output port as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelMessage {
    /// Start sounding a note. A velocity of 0 is preserved as-is; output
    /// layers may treat it as note off per the MIDI convention.
    NoteOn { channel: u8, key: u8, velocity: u8 },

    /// Stop sounding a note.
    NoteOff { channel: u8, key: u8, velocity: u8 },

    /// Per-key pressure change while a note is held.
    PolyAftertouch { channel: u8, key: u8, pressure: u8 },

    /// Continuous controller change (volume is CC 7, pan is CC 10, ...).
    ControlChange { channel: u8, controller: u8, value: u8 },

    /// Instrument (program) selection for a channel.
    ProgramChange { channel: u8, program: u8 },

    /// Channel-wide pressure change.
    ChannelAftertouch { channel: u8, pressure: u8 },

    /// Pitch wheel position, 14-bit (0..=16383, [`PITCH_BEND_CENTER`] = no bend).
    PitchBend { channel: u8, value: u16 },
}

impl ChannelMessage {
    /// Returns the MIDI channel (0-15) this message addresses.
    pub fn channel(&self) -> u8 {
        match *self {
            ChannelMessage::NoteOn { channel, .. }
            | ChannelMessage::NoteOff { channel, .. }
            | ChannelMessage::PolyAftertouch { channel, .. }
            | ChannelMessage::ControlChange { channel, .. }
            | ChannelMessage::ProgramChange { channel, .. }
            | ChannelMessage::ChannelAftertouch { channel, .. }
            | ChannelMessage::PitchBend { channel, .. } => channel,
        }
    }

    /// Returns true for program change messages.
    pub fn is_program_change(&self) -> bool {
        matches!(self, ChannelMessage::ProgramChange { .. })
    }

    /// Returns true for control change messages.
    pub fn is_control_change(&self) -> bool {
        matches!(self, ChannelMessage::ControlChange { .. })
    }

    /// Creates a note-on with pitch/velocity clamped to the 0-127 range.
    ///
    /// # Arguments
    ///
    /// * `channel` - MIDI channel (0-15)
    /// * `key` - MIDI note number (0-127)
    /// * `velocity` - Note velocity (0-127)
    pub fn note_on(channel: u8, key: u8, velocity: u8) -> Self {
        ChannelMessage::NoteOn {
            channel: channel.min(15),
            key: key.min(127),
            velocity: velocity.min(127),
        }
    }

    /// Creates a note-off with pitch/velocity clamped to the 0-127 range.
    pub fn note_off(channel: u8, key: u8, velocity: u8) -> Self {
        ChannelMessage::NoteOff {
            channel: channel.min(15),
            key: key.min(127),
            velocity: velocity.min(127),
        }
    }
}
