//! The poll-driven playback engine.
//!
//! `PlaybackEngine` owns a tempo map, a flattened event list, and a mute
//! configuration, and delivers due events to a callback each time
//! [`process_until_now`](PlaybackEngine::process_until_now) is polled. It
//! performs no I/O, spawns no threads, and holds no locks: an external
//! driver (typically a 10-20 ms timer) polls it, and all methods must be
//! called from that single logical thread.
//!
//! Scheduling is drift-free: every delivery decision compares an event's
//! absolute time (from the tempo map) against elapsed wall-clock time from
//! a fixed origin, never against incremental per-poll deltas.

use super::events::{build_event_list, ScheduledEvent};
use super::filter::MuteConfig;
use super::tempo::{TempoMap, TimingError};
use crate::midi::{ChannelMessage, ParsedFile};
use std::time::Instant;

/// Result of one processing poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// The engine is not playing; nothing was examined.
    Stopped,
    /// Playback is active and events remain.
    Playing,
    /// The last event was passed during this poll; playback has ended.
    Finished,
}

/// Callback receiving each delivered channel-voice message.
///
/// Runs synchronously inside the processing poll; a callback that blocks
/// delays delivery of every later event due in the same poll.
pub type EventSink = Box<dyn FnMut(ChannelMessage)>;

/// Plays a flattened MIDI event list against the wall clock.
///
/// A freshly constructed engine holds the default tempo map and no events:
/// it is playable but silent until [`load`](Self::load) is called. There is
/// exactly one engine per active player; it is an owned value passed by
/// reference to the driver and the transport, never a global.
pub struct PlaybackEngine {
    tempo_map: TempoMap,
    events: Vec<ScheduledEvent>,

    /// Mute/suppress switchboard. Mutated by the hosting editor layer;
    /// deliberately untouched by `load`.
    pub mute: MuteConfig,

    on_event: EventSink,

    /// Index of the next undelivered event.
    cursor: usize,
    playing: bool,

    /// Wall-clock instant playback (re)started, paired with the seconds
    /// offset of the start tick so that
    /// `elapsed(now) == ticks_to_seconds(current position)`.
    started_at: Instant,
    start_offset_seconds: f64,

    /// Position retained while stopped, in ticks; the resume point.
    position_tick: u64,
}

impl PlaybackEngine {
    /// Creates an engine delivering events to `on_event`.
    pub fn new(on_event: impl FnMut(ChannelMessage) + 'static) -> Self {
        Self {
            tempo_map: TempoMap::default(),
            events: Vec::new(),
            mute: MuteConfig::default(),
            on_event: Box::new(on_event),
            cursor: 0,
            playing: false,
            started_at: Instant::now(),
            start_offset_seconds: 0.0,
            position_tick: 0,
        }
    }

    /// Replaces the loaded sequence.
    ///
    /// Resets the cursor and position to tick 0 and stops playback. The
    /// mute configuration persists across loads.
    pub fn load(&mut self, tempo_map: TempoMap, events: Vec<ScheduledEvent>) {
        tracing::debug!(
            events = events.len(),
            tempo_changes = tempo_map.change_count(),
            ticks_per_beat = tempo_map.ticks_per_beat(),
            "loaded sequence"
        );
        self.tempo_map = tempo_map;
        self.events = events;
        self.cursor = 0;
        self.playing = false;
        self.position_tick = 0;
    }

    /// Builds timing and event list from a parsed file and loads them.
    ///
    /// An empty file is valid and produces a silent engine.
    ///
    /// # Errors
    ///
    /// Returns [`TimingError`] if the file header is unusable.
    pub fn load_file(&mut self, file: &ParsedFile) -> Result<(), TimingError> {
        let tempo_map = TempoMap::from_file(file)?;
        let events = build_event_list(&file.tracks);
        self.load(tempo_map, events);
        Ok(())
    }

    /// Starts playback from `start_tick` against the real clock.
    pub fn start(&mut self, start_tick: u64) {
        self.start_at(start_tick, Instant::now());
    }

    /// Starts playback from `start_tick`, treating `now` as the current
    /// instant. The cursor moves to the first event at or after
    /// `start_tick`; earlier events are never redelivered.
    pub fn start_at(&mut self, start_tick: u64, now: Instant) {
        self.cursor = self.events.partition_point(|e| e.tick < start_tick);
        self.started_at = now;
        self.start_offset_seconds = self.tempo_map.ticks_to_seconds(start_tick);
        self.position_tick = start_tick;
        self.playing = true;
        tracing::debug!(tick = start_tick, "playback started");
    }

    /// Delivers every event due by the real clock. See
    /// [`process_at`](Self::process_at).
    pub fn process_until_now(&mut self) -> ProcessStatus {
        self.process_at(Instant::now())
    }

    /// Delivers every event whose scheduled time has passed as of `now`.
    ///
    /// Filtered events are skipped but still advance the cursor, so an
    /// unmute affects only events not yet passed. The cursor is advanced
    /// *before* the callback is invoked: a panic escaping the callback
    /// leaves the engine past the offending event, and a caller that
    /// catches it can keep polling without redelivery.
    ///
    /// # Returns
    ///
    /// [`ProcessStatus::Stopped`] when not playing (the poll is a no-op),
    /// [`ProcessStatus::Finished`] on the poll that passes the final event
    /// (playback stops and the position parks at end-of-file), and
    /// [`ProcessStatus::Playing`] otherwise.
    pub fn process_at(&mut self, now: Instant) -> ProcessStatus {
        if !self.playing {
            return ProcessStatus::Stopped;
        }

        let elapsed = self.elapsed_seconds(now);
        while self.cursor < self.events.len() {
            let event = self.events[self.cursor];
            if self.tempo_map.ticks_to_seconds(event.tick) > elapsed {
                break;
            }
            self.cursor += 1;
            if self.mute.should_send(&event) {
                (self.on_event)(event.message);
            }
        }

        if self.cursor >= self.events.len() {
            self.playing = false;
            self.position_tick = self.duration_ticks();
            tracing::debug!("playback finished");
            return ProcessStatus::Finished;
        }
        self.position_tick = self.tempo_map.seconds_to_ticks(elapsed);
        ProcessStatus::Playing
    }

    /// Stops playback, retaining the current position for resume.
    pub fn stop(&mut self) {
        self.stop_at(Instant::now());
    }

    /// Stops playback as of `now`, retaining the position reached.
    pub fn stop_at(&mut self, now: Instant) {
        if self.playing {
            self.position_tick = self.tempo_map.seconds_to_ticks(self.elapsed_seconds(now));
            self.playing = false;
            tracing::debug!(tick = self.position_tick, "playback stopped");
        }
    }

    /// Repositions the cursor to the first event at or after `tick`
    /// without starting or stopping playback.
    pub fn scrub_to_tick(&mut self, tick: u64) {
        self.scrub_at(tick, Instant::now());
    }

    /// Repositions as of `now`. The clock origin is re-anchored so a
    /// subsequent poll or start continues from `tick`; seeking past the
    /// last event clamps the cursor to the end of the list, and the next
    /// poll reports end-of-file without delivering anything.
    pub fn scrub_at(&mut self, tick: u64, now: Instant) {
        self.cursor = self.events.partition_point(|e| e.tick < tick);
        self.started_at = now;
        self.start_offset_seconds = self.tempo_map.ticks_to_seconds(tick);
        self.position_tick = tick;
    }

    /// Returns whether playback is active.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Returns the playback position in ticks.
    ///
    /// While playing this is refreshed on every poll, so it is as current
    /// as the driving timer; while stopped it is the retained resume point.
    pub fn current_tick(&self) -> u64 {
        self.position_tick
    }

    /// Returns the playback position in seconds from tick 0.
    pub fn current_seconds(&self) -> f64 {
        self.tempo_map.ticks_to_seconds(self.position_tick)
    }

    /// Returns the tick of the last event, or 0 for an empty sequence.
    pub fn duration_ticks(&self) -> u64 {
        self.events.last().map(|e| e.tick).unwrap_or(0)
    }

    /// Returns the total duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.tempo_map.ticks_to_seconds(self.duration_ticks())
    }

    /// Returns the number of scheduled events in the loaded sequence.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Returns the loaded tempo map, for frontend display.
    pub fn tempo_map(&self) -> &TempoMap {
        &self.tempo_map
    }

    fn elapsed_seconds(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.started_at).as_secs_f64() + self.start_offset_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::{EventKind, ParsedTrack, TrackEvent};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    type Log = Rc<RefCell<Vec<ChannelMessage>>>;

    fn engine_with_log() -> (PlaybackEngine, Log) {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let engine = PlaybackEngine::new(move |msg| sink.borrow_mut().push(msg));
        (engine, log)
    }

    fn channel_event(delta: u32, message: ChannelMessage) -> TrackEvent {
        TrackEvent::new(delta, EventKind::Channel(message))
    }

    /// 480 ticks/beat at 120 BPM: notes on track 0 at ticks 0, 480, 960;
    /// a program change and a control change on track 1 at ticks 0 and 480.
    fn demo_file() -> ParsedFile {
        ParsedFile::new(
            480,
            vec![
                ParsedTrack::new(vec![
                    channel_event(0, ChannelMessage::note_on(0, 60, 100)),
                    channel_event(480, ChannelMessage::note_on(0, 62, 100)),
                    channel_event(480, ChannelMessage::note_on(0, 64, 100)),
                ]),
                ParsedTrack::new(vec![
                    channel_event(
                        0,
                        ChannelMessage::ProgramChange {
                            channel: 1,
                            program: 8,
                        },
                    ),
                    channel_event(
                        480,
                        ChannelMessage::ControlChange {
                            channel: 1,
                            controller: 7,
                            value: 90,
                        },
                    ),
                ]),
            ],
        )
    }

    fn at(base: Instant, millis: u64) -> Instant {
        base + Duration::from_millis(millis)
    }

    #[test]
    fn test_fresh_engine_is_silent() {
        let (mut engine, log) = engine_with_log();
        let t0 = Instant::now();
        engine.start_at(0, t0);
        assert_eq!(engine.process_at(at(t0, 100)), ProcessStatus::Finished);
        assert!(log.borrow().is_empty());
        assert!(!engine.is_playing());
    }

    #[test]
    fn test_load_resets_state_but_not_mute() {
        let (mut engine, _log) = engine_with_log();
        engine.mute.set_track_muted(2, true);
        engine.mute.suppress_control_changes = true;

        let t0 = Instant::now();
        engine.load_file(&demo_file()).unwrap();
        engine.start_at(480, t0);
        engine.process_at(at(t0, 10));
        assert!(engine.is_playing());

        engine.load_file(&demo_file()).unwrap();
        assert!(!engine.is_playing());
        assert_eq!(engine.current_tick(), 0);
        assert!(engine.mute.muted_tracks.contains(&2));
        assert!(engine.mute.suppress_control_changes);
    }

    #[test]
    fn test_delivers_each_event_exactly_once_in_order() {
        let (mut engine, log) = engine_with_log();
        engine.load_file(&demo_file()).unwrap();
        let t0 = Instant::now();
        engine.start_at(0, t0);

        // Poll at uneven intervals, including repeats at the same instant.
        let mut finished = 0;
        for millis in [0, 0, 100, 250, 250, 500, 700, 1000, 1100, 1100] {
            if engine.process_at(at(t0, millis)) == ProcessStatus::Finished {
                finished += 1;
            }
        }
        assert_eq!(finished, 1);
        assert_eq!(log.borrow().len(), 5);
        // Tick 0 pair first, then tick 480 pair, then tick 960.
        assert_eq!(log.borrow()[0], ChannelMessage::note_on(0, 60, 100));
        assert_eq!(log.borrow()[2], ChannelMessage::note_on(0, 62, 100));
        assert_eq!(log.borrow()[4], ChannelMessage::note_on(0, 64, 100));
    }

    #[test]
    fn test_delivery_follows_tempo_changes() {
        // Tempo doubles at tick 480: the tick-960 note is due at 0.75 s,
        // not at the constant-tempo 1.0 s.
        let mut file = demo_file();
        file.tracks.push(ParsedTrack::new(vec![
            TrackEvent::new(0, EventKind::Tempo(500_000)),
            TrackEvent::new(480, EventKind::Tempo(250_000)),
        ]));
        let (mut engine, log) = engine_with_log();
        engine.load_file(&file).unwrap();
        let t0 = Instant::now();
        engine.start_at(0, t0);

        engine.process_at(at(t0, 700));
        assert_eq!(log.borrow().len(), 4);
        assert_eq!(engine.process_at(at(t0, 760)), ProcessStatus::Finished);
        assert_eq!(log.borrow().len(), 5);
    }

    #[test]
    fn test_track_mute_and_mid_playback_unmute() {
        let (mut engine, log) = engine_with_log();
        engine.load_file(&demo_file()).unwrap();
        engine.mute.set_track_muted(0, true);
        let t0 = Instant::now();
        engine.start_at(0, t0);

        engine.process_at(at(t0, 100));
        // Only track 1's program change came through.
        assert_eq!(log.borrow().len(), 1);
        assert!(log.borrow()[0].is_program_change());

        // Unmuting takes effect for events not yet passed; the tick-0 note
        // is not retroactively delivered.
        engine.mute.set_track_muted(0, false);
        engine.process_at(at(t0, 1100));
        let delivered: Vec<ChannelMessage> = log.borrow().clone();
        assert_eq!(delivered.len(), 4);
        assert!(!delivered.contains(&ChannelMessage::note_on(0, 60, 100)));
        assert!(delivered.contains(&ChannelMessage::note_on(0, 62, 100)));
    }

    #[test]
    fn test_suppress_program_changes() {
        let (mut engine, log) = engine_with_log();
        engine.load_file(&demo_file()).unwrap();
        engine.mute.suppress_program_changes = true;
        let t0 = Instant::now();
        engine.start_at(0, t0);
        engine.process_at(at(t0, 10));

        // Both tracks have a tick-0 event; only the note-on survives.
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(log.borrow()[0], ChannelMessage::note_on(0, 60, 100));
    }

    #[test]
    fn test_scrub_then_start_skips_earlier_events() {
        let (mut engine, log) = engine_with_log();
        engine.load_file(&demo_file()).unwrap();
        let t0 = Instant::now();
        engine.scrub_at(480, t0);
        assert_eq!(engine.current_tick(), 480);
        assert!(!engine.is_playing());

        engine.start_at(480, t0);
        engine.process_at(at(t0, 1000));
        for msg in log.borrow().iter() {
            assert_ne!(*msg, ChannelMessage::note_on(0, 60, 100));
            assert!(!msg.is_program_change());
        }
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn test_scrub_past_end_clamps() {
        let (mut engine, log) = engine_with_log();
        engine.load_file(&demo_file()).unwrap();
        let t0 = Instant::now();
        engine.scrub_at(1_000_000, t0);
        engine.start_at(1_000_000, t0);
        assert_eq!(engine.process_at(at(t0, 10)), ProcessStatus::Finished);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_post_finish_polls_are_noops() {
        let (mut engine, log) = engine_with_log();
        engine.load_file(&demo_file()).unwrap();
        let t0 = Instant::now();
        engine.start_at(0, t0);
        assert_eq!(engine.process_at(at(t0, 5000)), ProcessStatus::Finished);
        let count = log.borrow().len();

        assert_eq!(engine.process_at(at(t0, 6000)), ProcessStatus::Stopped);
        assert_eq!(log.borrow().len(), count);
        assert!(!engine.is_playing());
        assert_eq!(engine.current_tick(), engine.duration_ticks());
    }

    #[test]
    fn test_stop_retains_position_for_resume() {
        let (mut engine, log) = engine_with_log();
        engine.load_file(&demo_file()).unwrap();
        let t0 = Instant::now();
        engine.start_at(0, t0);
        engine.process_at(at(t0, 600));
        engine.stop_at(at(t0, 600));

        assert!(!engine.is_playing());
        // 0.6 s at 120 BPM is 576 ticks.
        assert_eq!(engine.current_tick(), 576);

        // Resuming from the retained position replays nothing.
        let count = log.borrow().len();
        let t1 = at(t0, 10_000);
        engine.start_at(engine.current_tick(), t1);
        engine.process_at(t1);
        assert_eq!(log.borrow().len(), count);
        engine.process_at(at(t1, 5000));
        assert_eq!(log.borrow().len(), 5);
    }

    #[test]
    fn test_position_tracks_polls_while_playing() {
        let (mut engine, _log) = engine_with_log();
        engine.load_file(&demo_file()).unwrap();
        let t0 = Instant::now();
        engine.start_at(0, t0);
        engine.process_at(at(t0, 250));
        assert_eq!(engine.current_tick(), 240);
        assert!((engine.current_seconds() - 0.25).abs() < 1e-9);
        assert!((engine.duration_seconds() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_ticks_per_beat_load_fails() {
        let (mut engine, _log) = engine_with_log();
        let file = ParsedFile::new(0, vec![]);
        assert_eq!(
            engine.load_file(&file).unwrap_err(),
            TimingError::ZeroTicksPerBeat
        );
    }
}
