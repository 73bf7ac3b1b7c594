//! SIGPRINT host application
//!
//! Drives the full pipeline against a synthetic frontend: lock-in
//! demodulation at 250 Hz, packet encoding at 25 Hz, fingerprint refresh
//! at 1 Hz, with stage rotation every 15 s.
//!
//! # Usage
//!
//! ```bash
//! # Stream packets, logging a summary once per second
//! sigprint stream
//!
//! # Stream raw 383-byte frames into a file for 60 seconds
//! sigprint stream --output capture.bin --duration-s 60
//!
//! # WebSocket broadcast mode (requires the `server` feature)
//! sigprint server --port 8080
//! ```

mod pipeline;
#[cfg(feature = "server")]
mod server;
mod source;
mod stage;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use sigprint_core::protocol::{PACKET_SIZE, PAYLOAD_SIZE};
use sigprint_core::types::{CHANNEL_COUNT, PACKET_INTERVAL_MS, PACKET_RATE_HZ, SAMPLE_RATE_HZ};

use crate::pipeline::Pipeline;
use crate::source::{SampleSource, SyntheticSource};
use crate::stage::StageClock;

/// SIGPRINT neural stream
#[derive(Parser, Debug)]
#[command(name = "sigprint")]
#[command(author, version, about = "SIGPRINT multi-band neural stream", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the pipeline and stream packets (default if no subcommand)
    Stream {
        /// Stop after this many seconds (runs until interrupted if unset)
        #[arg(long)]
        duration_s: Option<u64>,

        /// Append raw 383-byte frames to this file ("-" for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Broadcast packets to WebSocket clients
    Server {
        /// Server port
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Bind address
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("SIGPRINT v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        None => run_stream(None, None),
        Some(Commands::Stream { duration_s, output }) => run_stream(duration_s, output),
        Some(Commands::Server { port, bind }) => run_server(bind, port),
    }
}

/// Run the cooperative pipeline loop in the foreground.
fn run_stream(duration_s: Option<u64>, output: Option<PathBuf>) -> anyhow::Result<()> {
    info!(
        "Packet size: {} bytes (payload {}), {} Hz stream, {} Hz sampling",
        PACKET_SIZE, PAYLOAD_SIZE, PACKET_RATE_HZ, SAMPLE_RATE_HZ
    );

    let mut writer: Option<Box<dyn Write>> = match output {
        Some(path) if path.as_os_str() == "-" => Some(Box::new(std::io::stdout().lock())),
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("creating output file {}", path.display()))?;
            info!("Writing frames to {}", path.display());
            Some(Box::new(BufWriter::new(file)))
        }
        None => None,
    };

    let mut source = SyntheticSource::new();
    let mut pipeline = Pipeline::new();

    let start = Instant::now();
    let mut stage = StageClock::new(start);
    let mut last_stage = stage.stage();

    let sample_period = Duration::from_micros(u64::from(1_000_000 / SAMPLE_RATE_HZ));
    let packet_period = Duration::from_millis(u64::from(PACKET_INTERVAL_MS));
    let mut next_sample = start;
    let mut next_packet = start;

    let deadline = duration_s.map(|s| start + Duration::from_secs(s));
    let mut frame = [0i32; CHANNEL_COUNT];
    let mut packet_count: u64 = 0;

    loop {
        let now = Instant::now();
        if let Some(deadline) = deadline {
            if now >= deadline {
                break;
            }
        }

        if now >= next_sample {
            next_sample += sample_period;
            if source.available() && source.read_frame(&mut frame) {
                pipeline.ingest(&frame);
            }
        }

        if now >= next_packet {
            next_packet += packet_period;
            stage.poll(now);
            if stage.stage() != last_stage {
                info!(
                    "Stage {} -> {} ({} Hz)",
                    last_stage,
                    stage.stage(),
                    stage.frequency_hz()
                );
                last_stage = stage.stage();
            }

            let now_ms = now.duration_since(start).as_millis() as u32;
            let bytes = pipeline.tick(now_ms, stage.stage());
            if let Some(writer) = writer.as_mut() {
                writer.write_all(bytes).context("writing frame")?;
            }

            packet_count += 1;
            if packet_count % u64::from(PACKET_RATE_HZ) == 0 {
                let fp = pipeline.fingerprint();
                info!(
                    "packets={} code={} coherence={:.3} entropy={:.3} gates=0x{:02X} loops=0x{:02X}",
                    packet_count, fp, fp.coherence, fp.entropy, fp.gate_flags, fp.loop_flags
                );
            }
        }

        let next_deadline = next_sample.min(next_packet);
        if let Some(wait) = next_deadline.checked_duration_since(Instant::now()) {
            std::thread::sleep(wait);
        }
    }

    if let Some(writer) = writer.as_mut() {
        writer.flush().context("flushing output")?;
    }
    info!(
        "Stopped after {} packets ({:.1} s)",
        packet_count,
        start.elapsed().as_secs_f32()
    );
    Ok(())
}

#[cfg(feature = "server")]
fn run_server(bind: String, port: u16) -> anyhow::Result<()> {
    server::run(bind, port)
}

#[cfg(not(feature = "server"))]
fn run_server(_bind: String, _port: u16) -> anyhow::Result<()> {
    anyhow::bail!(
        "WebSocket server not enabled. Rebuild with --features server:\n\
         cargo run -p sigprint-app --features server -- server"
    )
}
