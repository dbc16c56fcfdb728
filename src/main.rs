//! Application entry point: a stdin → stdout audio filter.
//!
//! # Usage
//!
//! ```text
//! asr-prep [PRESET] < capture.f32 > speech.pcm
//! ```
//!
//! # Startup sequence
//!
//! 1. Initialise logging (stderr; `RUST_LOG` overrides the `info` default).
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Apply the optional preset argument.
//! 4. Build the [`AudioProcessingPipeline`] and the [`BufferPool`].
//! 5. Pump stdin through the pipeline one packet at a time.
//! 6. Finalize (WAV mode writes the whole file here) and log statistics.

use std::io::{self, BufWriter, Read, Write};

use anyhow::{Context, Result};
use asr_prep::{
    audio::BufferPool,
    config::AppConfig,
    pipeline::{AudioProcessingPipeline, Preset},
};

// ---------------------------------------------------------------------------
// Packet reader
// ---------------------------------------------------------------------------

/// Fill `buf` from `reader`, returning how many bytes were read.  Short only
/// at end of input.
fn read_packet(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// ---------------------------------------------------------------------------
// Pump
// ---------------------------------------------------------------------------

fn run(
    pipeline: &mut AudioProcessingPipeline,
    pool: &mut BufferPool,
    packet_bytes: usize,
    input: &mut impl Read,
    output: &mut impl Write,
) -> Result<()> {
    let mut packet = vec![0u8; packet_bytes.max(1)];

    loop {
        let n = read_packet(input, &mut packet).context("reading stdin")?;
        if n == 0 {
            break;
        }
        if let Some(processed) = pipeline.process(&packet[..n], pool)? {
            output.write_all(&processed).context("writing stdout")?;
            pipeline.release_buffer(pool, processed);
        }
        if n < packet.len() {
            break;
        }
    }

    match pipeline.finalize() {
        Ok(Some(file)) => output.write_all(&file).context("writing stdout")?,
        Ok(None) => {}
        Err(e) if pipeline.stats().chunks_processed == 0 => {
            log::warn!("no input received; nothing to write ({e})");
        }
        Err(e) => return Err(e.into()),
    }
    output.flush().context("flushing stdout")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    if AppConfig::is_first_run() {
        log::info!("no settings file found; using defaults");
    }

    // 3. Preset override
    if let Some(name) = std::env::args().nth(1) {
        let preset: Preset = name.parse()?;
        config.pipeline.preset = Some(preset);
    }

    // 4. Pipeline + pool
    let mut pipeline = AudioProcessingPipeline::new(config.pipeline_config())?;
    let mut pool = config.buffer_pool()?;
    log::info!("asr-prep starting\n{}", pipeline.info());

    // 5–6. Pump and finalize
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut input = stdin.lock();
    let mut output = BufWriter::new(stdout.lock());
    run(
        &mut pipeline,
        &mut pool,
        config.input.packet_bytes,
        &mut input,
        &mut output,
    )?;

    log::info!("pipeline: {}", pipeline.stats());
    log::info!("buffer pool: {}", pool.stats());
    Ok(())
}
