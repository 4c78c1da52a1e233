//! Tempo map construction and tick/time conversion.
//!
//! A MIDI file measures time in ticks; wall-clock scheduling needs seconds.
//! The conversion is only piecewise linear: every tempo meta event starts a
//! new segment with its own seconds-per-tick rate. `TempoMap` merges the
//! tempo events of *all* tracks into one tick-ordered timeline and
//! precomputes cumulative seconds at each change, so `ticks_to_seconds` is
//! an O(log n) lookup in the number of tempo changes regardless of how many
//! notes the file contains.

use crate::midi::{
    EventKind, ParsedFile, ParsedTrack, DEFAULT_TICKS_PER_BEAT, DEFAULT_USEC_PER_BEAT,
};
use thiserror::Error;

/// Errors raised while building timing structures from a parsed file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimingError {
    /// The file header declares zero ticks per quarter note, which makes
    /// every tick-to-time conversion undefined.
    #[error("file header declares zero ticks per beat")]
    ZeroTicksPerBeat,
}

/// One tempo segment boundary with its precomputed cumulative time.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TempoChange {
    /// Absolute tick of the tempo event.
    tick: u64,
    /// Tempo from this tick onward, in microseconds per quarter note.
    usec_per_beat: u32,
    /// Seconds elapsed from tick 0 to `tick`.
    cumulative_seconds: f64,
}

/// Immutable tick-to-seconds conversion across all tempo changes of a file.
///
/// Invariants, established at construction and never revalidated:
/// entries are strictly ascending by tick, and an entry at tick 0 always
/// exists (synthesized at 120 BPM when the file has none).
#[derive(Debug, Clone, PartialEq)]
pub struct TempoMap {
    ticks_per_beat: u16,
    changes: Vec<TempoChange>,
}

impl TempoMap {
    /// Builds a tempo map from all tracks of a parsed file.
    ///
    /// Each track's delta times are accumulated on an independent counter
    /// (delta times are track-relative), and the tempo events of every
    /// track are merged into a single timeline. Zero-valued tempo events
    /// are dropped, leaving the previous tempo in effect. When two merged
    /// events land on the same tick the last one wins.
    ///
    /// # Arguments
    ///
    /// * `tracks` - All tracks of the parsed file
    /// * `ticks_per_beat` - Timing resolution from the file header
    ///
    /// # Errors
    ///
    /// Returns [`TimingError::ZeroTicksPerBeat`] if `ticks_per_beat` is 0.
    pub fn build(tracks: &[ParsedTrack], ticks_per_beat: u16) -> Result<Self, TimingError> {
        if ticks_per_beat == 0 {
            return Err(TimingError::ZeroTicksPerBeat);
        }

        // Merge tempo events across tracks, each track keeping its own
        // absolute tick accumulator.
        let mut merged: Vec<(u64, u32)> = Vec::new();
        for track in tracks {
            let mut current_tick: u64 = 0;
            for event in &track.events {
                current_tick += u64::from(event.delta_ticks);
                if let EventKind::Tempo(usec) = event.kind {
                    if usec > 0 {
                        merged.push((current_tick, usec));
                    }
                }
            }
        }
        merged.sort_by_key(|&(tick, _)| tick);
        // Same-tick collisions: keep the last event merged at that tick.
        merged.dedup_by(|later, earlier| {
            if earlier.0 == later.0 {
                earlier.1 = later.1;
                true
            } else {
                false
            }
        });

        if merged.first().map(|&(tick, _)| tick) != Some(0) {
            merged.insert(0, (0, DEFAULT_USEC_PER_BEAT));
        }

        // Cumulative seconds at each change: segment duration is
        // segment_ticks * tempo / 1e6 / ticks_per_beat.
        let mut changes = Vec::with_capacity(merged.len());
        let mut cumulative_seconds = 0.0;
        let mut prev: Option<(u64, u32)> = None;
        for (tick, usec_per_beat) in merged {
            if let Some((prev_tick, prev_usec)) = prev {
                cumulative_seconds +=
                    (tick - prev_tick) as f64 * seconds_per_tick(prev_usec, ticks_per_beat);
            }
            changes.push(TempoChange {
                tick,
                usec_per_beat,
                cumulative_seconds,
            });
            prev = Some((tick, usec_per_beat));
        }

        Ok(Self {
            ticks_per_beat,
            changes,
        })
    }

    /// Builds a tempo map straight from a parsed file.
    pub fn from_file(file: &ParsedFile) -> Result<Self, TimingError> {
        Self::build(&file.tracks, file.ticks_per_beat)
    }

    /// Converts an absolute tick to elapsed seconds from tick 0.
    ///
    /// Binary-searches for the tempo segment containing `tick` and adds the
    /// partial segment at that segment's rate. Non-decreasing in `tick`.
    pub fn ticks_to_seconds(&self, tick: u64) -> f64 {
        let change = self.change_at(tick);
        change.cumulative_seconds
            + (tick - change.tick) as f64
                * seconds_per_tick(change.usec_per_beat, self.ticks_per_beat)
    }

    /// Converts elapsed seconds from tick 0 back to an absolute tick.
    ///
    /// The inverse of [`ticks_to_seconds`](Self::ticks_to_seconds), used for
    /// progress display and resume positions. Negative input clamps to 0.
    pub fn seconds_to_ticks(&self, seconds: f64) -> u64 {
        if seconds <= 0.0 {
            return 0;
        }
        // Last change whose cumulative time is at or before `seconds`.
        let idx = self
            .changes
            .partition_point(|c| c.cumulative_seconds <= seconds)
            .saturating_sub(1);
        let change = &self.changes[idx];
        let rate = seconds_per_tick(change.usec_per_beat, self.ticks_per_beat);
        // The small nudge keeps tick-exact inputs from flooring one tick
        // short after the division rounds.
        change.tick + ((seconds - change.cumulative_seconds) / rate + 1e-6) as u64
    }

    /// Returns the tempo in effect at `tick`, in microseconds per beat.
    pub fn tempo_at(&self, tick: u64) -> u32 {
        self.change_at(tick).usec_per_beat
    }

    /// Returns the timing resolution in ticks per quarter note.
    pub fn ticks_per_beat(&self) -> u16 {
        self.ticks_per_beat
    }

    /// Returns the number of tempo segments (including the tick-0 entry).
    pub fn change_count(&self) -> usize {
        self.changes.len()
    }

    /// Last change at or before `tick`. The tick-0 entry guarantees a hit.
    fn change_at(&self, tick: u64) -> &TempoChange {
        let idx = self
            .changes
            .partition_point(|c| c.tick <= tick)
            .saturating_sub(1);
        &self.changes[idx]
    }
}

impl Default for TempoMap {
    /// A constant 120 BPM map at the default resolution: the state of an
    /// engine before any file is loaded, or after loading an empty one.
    fn default() -> Self {
        Self {
            ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            changes: vec![TempoChange {
                tick: 0,
                usec_per_beat: DEFAULT_USEC_PER_BEAT,
                cumulative_seconds: 0.0,
            }],
        }
    }
}

fn seconds_per_tick(usec_per_beat: u32, ticks_per_beat: u16) -> f64 {
    usec_per_beat as f64 / 1_000_000.0 / ticks_per_beat as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::TrackEvent;

    const EPS: f64 = 1e-9;

    fn tempo_track(events: &[(u32, u32)]) -> ParsedTrack {
        ParsedTrack::new(
            events
                .iter()
                .map(|&(delta, usec)| TrackEvent::new(delta, EventKind::Tempo(usec)))
                .collect(),
        )
    }

    #[test]
    fn test_default_map() {
        let map = TempoMap::default();
        assert_eq!(map.tempo_at(0), DEFAULT_USEC_PER_BEAT);
        assert_eq!(map.ticks_per_beat(), DEFAULT_TICKS_PER_BEAT);
        // One beat at 120 BPM is half a second.
        assert!((map.ticks_to_seconds(480) - 0.5).abs() < EPS);
    }

    #[test]
    fn test_single_tempo() {
        let map = TempoMap::build(&[tempo_track(&[(0, 500_000)])], 480).unwrap();
        assert!((map.ticks_to_seconds(0)).abs() < EPS);
        assert!((map.ticks_to_seconds(480) - 0.5).abs() < EPS);
        assert!((map.ticks_to_seconds(960) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_tempo_change_integration() {
        // 120 BPM for the first beat, 240 BPM afterwards.
        let map =
            TempoMap::build(&[tempo_track(&[(0, 500_000), (480, 250_000)])], 480).unwrap();
        assert!((map.ticks_to_seconds(480) - 0.5).abs() < EPS);
        assert!((map.ticks_to_seconds(720) - 0.625).abs() < EPS);
        assert!((map.ticks_to_seconds(960) - 0.75).abs() < EPS);
        assert_eq!(map.tempo_at(479), 500_000);
        assert_eq!(map.tempo_at(480), 250_000);
    }

    #[test]
    fn test_merges_tempo_events_across_tracks() {
        // The slow-down lives in a different track than the initial tempo.
        // Both must survive the merge, each positioned by its own track's
        // delta accumulation.
        let initial = tempo_track(&[(0, 500_000)]);
        let slowdown = tempo_track(&[(960, 1_000_000)]);
        let map = TempoMap::build(&[initial, slowdown], 480).unwrap();
        assert_eq!(map.change_count(), 2);
        assert!((map.ticks_to_seconds(960) - 1.0).abs() < EPS);
        assert!((map.ticks_to_seconds(1440) - 2.0).abs() < EPS);
    }

    #[test]
    fn test_per_track_accumulators_are_independent() {
        // Two tracks with identical deltas: their events land on the same
        // absolute ticks, not on ticks shifted by the other track's sum.
        let a = tempo_track(&[(480, 250_000)]);
        let b = ParsedTrack::new(vec![
            TrackEvent::new(480, EventKind::Meta),
            TrackEvent::new(480, EventKind::Tempo(125_000)),
        ]);
        let map = TempoMap::build(&[a, b], 480).unwrap();
        // Synthesized default at 0, then changes at 480 and 960.
        assert_eq!(map.change_count(), 3);
        assert_eq!(map.tempo_at(480), 250_000);
        assert_eq!(map.tempo_at(960), 125_000);
    }

    #[test]
    fn test_zero_tempo_dropped() {
        let map =
            TempoMap::build(&[tempo_track(&[(0, 500_000), (480, 0), (480, 250_000)])], 480)
                .unwrap();
        // The zero event at tick 480 is ignored; 500000 stays in effect
        // until the valid change at tick 960.
        assert_eq!(map.tempo_at(480), 500_000);
        assert_eq!(map.tempo_at(960), 250_000);
        assert!((map.ticks_to_seconds(960) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_synthesizes_default_at_tick_zero() {
        let map = TempoMap::build(&[tempo_track(&[(960, 250_000)])], 480).unwrap();
        assert_eq!(map.tempo_at(0), DEFAULT_USEC_PER_BEAT);
        assert!((map.ticks_to_seconds(960) - 1.0).abs() < EPS);
        assert!((map.ticks_to_seconds(1440) - 1.25).abs() < EPS);
    }

    #[test]
    fn test_same_tick_last_wins() {
        let first = tempo_track(&[(0, 500_000), (480, 300_000)]);
        let second = tempo_track(&[(480, 250_000)]);
        let map = TempoMap::build(&[first, second], 480).unwrap();
        assert_eq!(map.change_count(), 2);
        assert_eq!(map.tempo_at(480), 250_000);
    }

    #[test]
    fn test_empty_input_is_valid() {
        let map = TempoMap::build(&[], 480).unwrap();
        assert_eq!(map.change_count(), 1);
        assert!((map.ticks_to_seconds(480) - 0.5).abs() < EPS);
    }

    #[test]
    fn test_zero_ticks_per_beat_rejected() {
        assert_eq!(
            TempoMap::build(&[], 0).unwrap_err(),
            TimingError::ZeroTicksPerBeat
        );
    }

    #[test]
    fn test_monotonic() {
        let map = TempoMap::build(
            &[tempo_track(&[(0, 500_000), (480, 100_000), (480, 900_000)])],
            480,
        )
        .unwrap();
        let mut last = -1.0;
        for tick in (0..3000).step_by(7) {
            let s = map.ticks_to_seconds(tick);
            assert!(s >= last, "not monotonic at tick {}", tick);
            last = s;
        }
    }

    #[test]
    fn test_inverse_conversion() {
        let map =
            TempoMap::build(&[tempo_track(&[(0, 500_000), (480, 250_000)])], 480).unwrap();
        assert_eq!(map.seconds_to_ticks(0.0), 0);
        assert_eq!(map.seconds_to_ticks(-1.0), 0);
        assert_eq!(map.seconds_to_ticks(0.5), 480);
        assert_eq!(map.seconds_to_ticks(0.75), 960);
        // Round trip on arbitrary ticks (exact up to floor).
        for tick in [0u64, 120, 480, 481, 960, 5000] {
            assert_eq!(map.seconds_to_ticks(map.ticks_to_seconds(tick)), tick);
        }
    }
}
