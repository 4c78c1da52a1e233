//! Transport control: translating UI intents into engine calls.
//!
//! `TransportController` is a thin state machine over play/pause/stop/seek
//! buttons. It owns no engine; the engine is passed by reference per call,
//! so one controller can be rebound and engines stay directly pollable by
//! the driving timer.

use super::engine::PlaybackEngine;

/// The user-visible transport state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// Not playing, position at the start (or wherever a seek left it).
    Stopped,
    /// Currently playing.
    Playing,
    /// Not playing, position retained mid-file for resume.
    Paused,
}

/// Drives a [`PlaybackEngine`] from transport-button intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportController {
    state: TransportState,
}

impl TransportController {
    pub fn new() -> Self {
        Self {
            state: TransportState::Stopped,
        }
    }

    /// Returns the current transport state.
    pub fn state(&self) -> TransportState {
        self.state
    }

    /// Starts or resumes playback from the engine's retained position.
    ///
    /// A fresh or fully rewound engine starts at tick 0; a paused one
    /// resumes where it stopped, without replaying past events.
    pub fn play(&mut self, engine: &mut PlaybackEngine) {
        engine.start(engine.current_tick());
        self.state = TransportState::Playing;
    }

    /// Pauses playback, keeping the position for a later resume.
    pub fn pause(&mut self, engine: &mut PlaybackEngine) {
        if self.state == TransportState::Playing {
            engine.stop();
            self.state = TransportState::Paused;
        }
    }

    /// Stops playback and rewinds to tick 0.
    pub fn stop(&mut self, engine: &mut PlaybackEngine) {
        engine.stop();
        engine.scrub_to_tick(0);
        self.state = TransportState::Stopped;
    }

    /// Moves the playback position to `tick`.
    ///
    /// If playback is active it continues from the new position without a
    /// gap; otherwise the position is retained for the next `play`.
    pub fn seek(&mut self, engine: &mut PlaybackEngine, tick: u64) {
        engine.scrub_to_tick(tick);
        if self.state == TransportState::Playing {
            engine.start(tick);
        }
    }

    /// Flips between playing and paused (the play/pause button).
    pub fn toggle(&mut self, engine: &mut PlaybackEngine) {
        if self.state == TransportState::Playing {
            self.pause(engine);
        } else {
            self.play(engine);
        }
    }

    /// Rewinds to tick 0 and immediately starts playing.
    pub fn restart(&mut self, engine: &mut PlaybackEngine) {
        engine.stop();
        engine.scrub_to_tick(0);
        engine.start(0);
        self.state = TransportState::Playing;
    }
}

impl Default for TransportController {
    fn default() -> Self {
        Self::new()
    }
}
