//! midiplay - a tempo-aware MIDI file playback engine.
//!
//! This library is the playback core of a MIDI editor: it takes an
//! already-parsed Standard MIDI File (tracks of delta-timed events plus the
//! header's timing resolution), flattens it into a schedule, and delivers
//! each channel-voice message to a callback at the correct wall-clock time,
//! honoring every tempo change, per-track and per-channel mutes, and
//! message-type suppression. Pause, resume, and arbitrary seeking are
//! supported through a small transport layer.
//!
//! File parsing, MIDI port I/O, and synthesis are deliberately out of
//! scope; the engine is a single-threaded, poll-driven component that a
//! hosting application drives from a periodic timer.

pub mod midi;
pub mod playback;

// Re-export commonly used types
pub use midi::{ChannelMessage, EventKind, ParsedFile, ParsedTrack, TrackEvent};
pub use playback::{
    build_event_list, MuteConfig, PlaybackEngine, ProcessStatus, ScheduledEvent, TempoMap,
    TimingError, TransportController, TransportState,
};
