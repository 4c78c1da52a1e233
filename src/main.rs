//! midiplay - command-line demonstration driver for the playback engine.
//!
//! Loads a JSON-serialized parsed MIDI sequence, then drives the engine
//! from a periodic timer loop and prints every delivered event with its
//! delivery time. This is the "external driver" role of the library:
//! a real frontend would forward the callback's messages to a MIDI output
//! port instead of stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- sequence.json                 # play from the top
//! cargo run -- sequence.json --seek 960      # start from tick 960
//! cargo run -- sequence.json --mute-track 1  # silence track 1
//! ```

use anyhow::{Context, Result};
use midiplay::{
    midi::usec_per_beat_to_bpm, ChannelMessage, ParsedFile, PlaybackEngine, ProcessStatus,
    TransportController,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// How often the timer loop polls the engine.
const POLL_INTERVAL: Duration = Duration::from_millis(15);

/// Command-line options for the demo driver.
struct CliOptions {
    /// Path to the JSON sequence file.
    path: PathBuf,
    /// Tick to seek to before playing.
    start_tick: u64,
    /// Track indices to mute.
    muted_tracks: Vec<u32>,
    /// MIDI channels to mute.
    muted_channels: Vec<u8>,
    /// Withhold program changes.
    no_program_changes: bool,
    /// Withhold control changes.
    no_control_changes: bool,
}

impl CliOptions {
    /// Parses command-line arguments.
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut path: Option<PathBuf> = None;
        let mut start_tick = 0u64;
        let mut muted_tracks = Vec::new();
        let mut muted_channels = Vec::new();
        let mut no_program_changes = false;
        let mut no_control_changes = false;
        let mut i = 1;

        while i < args.len() {
            match args[i].as_str() {
                "--seek" => {
                    i += 1;
                    start_tick = Self::numeric_arg(&args, i, "--seek")?;
                }
                "--mute-track" => {
                    i += 1;
                    muted_tracks.push(Self::numeric_arg(&args, i, "--mute-track")?);
                }
                "--mute-channel" => {
                    i += 1;
                    muted_channels.push(Self::numeric_arg(&args, i, "--mute-channel")?);
                }
                "--no-program-changes" => no_program_changes = true,
                "--no-control-changes" => no_control_changes = true,
                "--help" | "-h" => {
                    eprintln!("midiplay - play a JSON-serialized MIDI sequence");
                    eprintln!();
                    eprintln!(
                        "Usage: {} SEQUENCE.json [OPTIONS]",
                        args.first().map(String::as_str).unwrap_or("midiplay")
                    );
                    eprintln!();
                    eprintln!("Options:");
                    eprintln!("  --seek TICK           Start playback from TICK");
                    eprintln!("  --mute-track INDEX    Mute a track (repeatable)");
                    eprintln!("  --mute-channel CH     Mute a MIDI channel 0-15 (repeatable)");
                    eprintln!("  --no-program-changes  Withhold program change messages");
                    eprintln!("  --no-control-changes  Withhold control change messages");
                    eprintln!("  -h, --help            Print this help message");
                    std::process::exit(0);
                }
                other if other.starts_with('-') => {
                    anyhow::bail!("unknown option: {} (use --help)", other);
                }
                other => {
                    if path.is_some() {
                        anyhow::bail!("only one sequence file may be given");
                    }
                    path = Some(PathBuf::from(other));
                }
            }
            i += 1;
        }

        Ok(Self {
            path: path.context("missing sequence file argument (use --help)")?,
            start_tick,
            muted_tracks,
            muted_channels,
            no_program_changes,
            no_control_changes,
        })
    }

    fn numeric_arg<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> Result<T> {
        let raw = args
            .get(i)
            .with_context(|| format!("{} requires a value", flag))?;
        raw.parse()
            .map_err(|_| anyhow::anyhow!("{} expects a number, got '{}'", flag, raw))
    }
}

/// Renders a delivered message as one log line.
fn describe(message: ChannelMessage) -> String {
    match message {
        ChannelMessage::NoteOn {
            channel,
            key,
            velocity,
        } => format!("note on   ch {:<2} key {:<3} vel {}", channel, key, velocity),
        ChannelMessage::NoteOff { channel, key, .. } => {
            format!("note off  ch {:<2} key {}", channel, key)
        }
        ChannelMessage::PolyAftertouch {
            channel,
            key,
            pressure,
        } => format!("poly at   ch {:<2} key {:<3} val {}", channel, key, pressure),
        ChannelMessage::ControlChange {
            channel,
            controller,
            value,
        } => format!("control   ch {:<2} cc {:<3} val {}", channel, controller, value),
        ChannelMessage::ProgramChange { channel, program } => {
            format!("program   ch {:<2} pgm {}", channel, program)
        }
        ChannelMessage::ChannelAftertouch { channel, pressure } => {
            format!("chan at   ch {:<2} val {}", channel, pressure)
        }
        ChannelMessage::PitchBend { channel, value } => {
            format!("bend      ch {:<2} val {}", channel, value)
        }
    }
}

/// Main entry point.
fn main() -> Result<()> {
    let cli = CliOptions::parse()?;

    // Initialize logging (optional, for debugging)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let json = std::fs::read_to_string(&cli.path)
        .with_context(|| format!("failed to read {}", cli.path.display()))?;
    let file: ParsedFile = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse {}", cli.path.display()))?;

    let reference = Instant::now();
    let mut engine = PlaybackEngine::new(move |message| {
        println!(
            "{:>9.3}s  {}",
            reference.elapsed().as_secs_f64(),
            describe(message)
        );
    });
    engine
        .load_file(&file)
        .context("sequence has an unusable timing header")?;

    for track in cli.muted_tracks {
        engine.mute.set_track_muted(track, true);
    }
    for channel in cli.muted_channels {
        engine.mute.set_channel_muted(channel, true);
    }
    engine.mute.suppress_program_changes = cli.no_program_changes;
    engine.mute.suppress_control_changes = cli.no_control_changes;

    println!(
        "{}: {} events across {} tracks, {:.1} s at {:.0} BPM initial tempo",
        cli.path.display(),
        engine.event_count(),
        file.tracks.len(),
        engine.duration_seconds(),
        usec_per_beat_to_bpm(engine.tempo_map().tempo_at(0)),
    );

    let mut transport = TransportController::new();
    if cli.start_tick > 0 {
        transport.seek(&mut engine, cli.start_tick);
    }
    transport.play(&mut engine);

    // The external timer loop of the engine's contract: poll until the
    // engine reports that the final event has passed.
    loop {
        std::thread::sleep(POLL_INTERVAL);
        match engine.process_until_now() {
            ProcessStatus::Finished => break,
            ProcessStatus::Stopped => break,
            ProcessStatus::Playing => {}
        }
    }
    transport.stop(&mut engine);

    println!("done.");
    Ok(())
}
