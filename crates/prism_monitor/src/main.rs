//! Prism Monitor - command-line driver for the spectrum plugin
//!
//! Runs the plugin's audio half on its own thread fed with a test tone and
//! polls the monitor half at display rate, printing one JSON event per line
//! on stdout. Logs go to stderr.

mod cli;
mod tone;

use std::io::{self, Write};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{select, Receiver};
use prism_core::{Event, Spectrum, SpectrumFrame, SpectrumMonitor};
use prism_dsp::{bin_frequency_hz, power_to_db};
use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cli::Args;
use tone::ToneGenerator;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = args.spectrum_config()?;

    if args.block_size == 0 || args.sample_rate == 0 {
        anyhow::bail!("block size and sample rate must be non-zero");
    }

    let (spectrum, mut monitor) = Spectrum::new(&config)?;

    // Rust pattern: observers run on the emitting thread, so forward the
    // notification through a channel instead of printing from the callback
    let (event_tx, event_rx) = crossbeam_channel::unbounded::<Event>();
    monitor.connect_bins_changed(move |&bins| {
        let _ = event_tx.send(Event::HistogramBinsChanged { bins });
    });

    info!(
        sample_rate = args.sample_rate,
        block_size = args.block_size,
        tone_hz = args.tone,
        seconds = args.seconds,
        "Starting monitor"
    );

    let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(0);
    let audio = spawn_audio_thread(spectrum, &args, done_tx)?;

    let result = display_loop(&args, &monitor, &event_rx, &done_rx);

    if audio.join().is_err() {
        error!("Audio thread panicked");
    }

    info!(skipped_levels = monitor.skipped_levels(), "Monitor finished");
    result
}

/// Generate audio in real time until the requested duration has elapsed
fn spawn_audio_thread(
    mut spectrum: Spectrum,
    args: &Args,
    done_tx: crossbeam_channel::Sender<()>,
) -> Result<thread::JoinHandle<()>> {
    let sample_rate = args.sample_rate;
    let block_size = args.block_size;
    let total_blocks =
        (args.seconds.max(0.0) * sample_rate as f32 / block_size as f32).ceil() as u64;
    let block_period = Duration::from_secs_f64(block_size as f64 / sample_rate as f64);
    let mut tone = ToneGenerator::new(args.tone, sample_rate);

    thread::Builder::new()
        .name("prism-audio".into())
        .spawn(move || {
            let mut left_in = vec![0.0; block_size];
            let mut right_in = vec![0.0; block_size];
            let mut left_out = vec![0.0; block_size];
            let mut right_out = vec![0.0; block_size];

            let start = Instant::now();
            for block in 0..total_blocks {
                tone.fill(&mut left_in, &mut right_in);
                spectrum.process_planar(
                    &left_in,
                    &right_in,
                    &mut left_out,
                    &mut right_out,
                    sample_rate,
                );

                // Pace like a sound card would
                let due = start + block_period.mul_f64((block + 1) as f64);
                if let Some(wait) = due.checked_duration_since(Instant::now()) {
                    thread::sleep(wait);
                }
            }

            // Dropping the sender wakes the display loop
            drop(done_tx);
        })
        .context("spawning audio thread")
}

/// Poll the monitor at `fps` until the audio thread finishes
fn display_loop(
    args: &Args,
    monitor: &SpectrumMonitor,
    events: &Receiver<Event>,
    done: &Receiver<()>,
) -> Result<()> {
    let fps = args.fps.max(1);
    let ticker = crossbeam_channel::tick(Duration::from_secs(1) / fps);
    let start = Instant::now();
    let mut rebin = args.rebin_after.zip(args.rebin_to);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    loop {
        select! {
            recv(ticker) -> _ => {
                if let Some((after, bins)) = rebin {
                    if start.elapsed().as_secs_f32() >= after {
                        if let Err(e) = monitor.update_histogram_bins(bins) {
                            warn!(error = %e, "Rebin rejected");
                            print_event(&mut out, &Event::error(e))?;
                        }
                        rebin = None;
                    }
                }

                if let Some(frame) = monitor.compute_magnitudes() {
                    if args.full_spectrum {
                        print_event(&mut out, &Event::from(frame))?;
                    } else {
                        print_peak(&mut out, &frame)?;
                    }
                }

                print_event(&mut out, &Event::from(monitor.get_statistics()))?;
            }
            recv(events) -> event => {
                if let Ok(event) = event {
                    print_event(&mut out, &event)?;
                }
            }
            recv(done) -> _ => break,
        }
    }

    // Notifications raised by the last tick
    for event in events.try_iter() {
        print_event(&mut out, &event)?;
    }

    Ok(())
}

fn print_event(out: &mut impl Write, event: &Event) -> Result<()> {
    serde_json::to_writer(&mut *out, event)?;
    writeln!(out)?;
    Ok(())
}

/// Compact spectrum line: strongest band only
fn print_peak(out: &mut impl Write, frame: &SpectrumFrame) -> Result<()> {
    let bands = frame.band_count();
    let (bin, power) = frame
        .magnitudes
        .iter()
        .copied()
        .enumerate()
        .fold((0, 0.0_f32), |best, (i, p)| if p > best.1 { (i, p) } else { best });

    let line = json!({
        "type": "SpectrumPeak",
        "payload": {
            "sample_rate": frame.sample_rate,
            "bands": bands,
            "bin": bin,
            "frequency_hz": bin_frequency_hz(bin, frame.sample_rate, bands),
            "level_db": power_to_db(power),
        }
    });
    serde_json::to_writer(&mut *out, &line)?;
    writeln!(out)?;
    Ok(())
}
