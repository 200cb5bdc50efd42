//! polysynth - play the engine from the computer keyboard
//!
//! Run with: cargo run --release -- [--device NAME] [--arp]
//!
//! Terminals report key presses but not releases, so each key plays a
//! fixed-length note through the sequencer queue.

use std::io::Write;
use std::time::Duration;

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal;
use tracing_subscriber::EnvFilter;

use polysynth::io::backend::start_output;
use polysynth::{EngineConfig, EngineHandle, ParamId, SeqEvent, StatusMonitor, SynthEngine};

/// One octave of piano layout on the home row, C to C.
const KEYS: &str = "awsedftgyhujk";
const NOTE_SECONDS: f32 = 0.4;
const VELOCITY: u8 = 100;

struct Options {
    device: Option<String>,
    arp: bool,
}

impl Options {
    fn parse(mut args: impl Iterator<Item = String>) -> Self {
        let mut options = Options {
            device: None,
            arp: false,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--device" => options.device = args.next(),
                "--arp" => options.arp = true,
                other => tracing::warn!(arg = other, "ignoring unknown argument"),
            }
        }
        options
    }
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("polysynth=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = Options::parse(std::env::args().skip(1));

    let (engine, handle, mut monitor) = SynthEngine::new(EngineConfig::default());
    let output = start_output(engine, options.device.as_deref())
        .wrap_err("failed to start audio output")?;
    tracing::info!(
        device = %output.device_name,
        sample_rate = output.sample_rate,
        channels = output.channels,
        "audio running"
    );

    if options.arp {
        handle.push_param(ParamId::ArpEnabled, true)?;
        handle.push_param(ParamId::ArpOctaves, 2)?;
    }

    println!("=== polysynth ===");
    println!("Keys: {KEYS} play C..C   z/x octave   1-6 waveform");
    println!("      space all notes off   q/Esc quit");
    println!();

    terminal::enable_raw_mode()?;
    let result = run(&handle, &mut monitor, output.sample_rate);
    terminal::disable_raw_mode()?;
    println!();
    result
}

fn run(handle: &EngineHandle, monitor: &mut StatusMonitor, sample_rate: u32) -> EyreResult<()> {
    let note_frames = (NOTE_SECONDS * sample_rate as f32) as u32;
    let mut octave: i32 = 4;

    loop {
        if event::poll(Duration::from_millis(16))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Esc | KeyCode::Char('q') => break,
                    KeyCode::Char(' ') => {
                        let _ = handle.all_notes_off();
                    }
                    KeyCode::Char('z') => octave = (octave - 1).max(0),
                    KeyCode::Char('x') => octave = (octave + 1).min(8),
                    KeyCode::Char(c @ '1'..='6') => {
                        let _ = handle.push_param(ParamId::Osc1Waveform, c as i32 - '1' as i32);
                    }
                    KeyCode::Char(c) => {
                        if let Some(offset) = KEYS.find(c) {
                            let note = (12 * (octave + 1) + offset as i32).clamp(0, 127) as u8;
                            // Frame zero is always in the past, so the note starts now
                            let _ = handle.push_seq_event(SeqEvent {
                                frame: 0,
                                note,
                                velocity: VELOCITY,
                                length_frames: note_frames,
                            });
                        }
                    }
                    _ => {}
                }
            }
        }

        if let Some(status) = monitor.poll() {
            print!(
                "\roctave {octave}  voices {:>2}  peak {:>5.2}  ",
                status.active_voices, status.peak
            );
            std::io::stdout().flush()?;
        }
    }

    Ok(())
}
