//! The playback engine and its supporting pieces.
//!
//! Construction order mirrors the data flow: a [`TempoMap`] and a flattened
//! event list are built from the parsed file, the [`PlaybackEngine`] plays
//! the list against the wall clock through a [`MuteConfig`] filter, and a
//! [`TransportController`] translates play/pause/stop/seek intents into
//! engine calls.

mod engine;
mod events;
mod filter;
mod tempo;
mod transport;

pub use engine::{EventSink, PlaybackEngine, ProcessStatus};
pub use events::{build_event_list, ScheduledEvent};
pub use filter::MuteConfig;
pub use tempo::{TempoMap, TimingError};
pub use transport::{TransportController, TransportState};
