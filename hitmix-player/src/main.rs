//! hitmix-player - plays a chart through the multi-event sound channel
//!
//! Loads a JSON chart, pre-loads its samples, then plays it in real time
//! against the software mixer. With `--record` the mix is written to a WAV
//! file; there is no audio device output.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use hitmix_common::events::{HitmixEvent, PlaybackStatus};
use hitmix_player::audio::SoundCache;
use hitmix_player::config::PlayerConfig;
use hitmix_player::playback::{ChartEventSource, Mixer, PlaybackEngine};
use tokio::sync::broadcast;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Frames rendered per mixer pass
const RENDER_BLOCK_FRAMES: usize = 512;

/// Command-line arguments for hitmix-player
#[derive(Parser, Debug)]
#[command(name = "hitmix-player")]
#[command(about = "Play a rhythm-game chart's hit sounds through the hitmix channel")]
#[command(version)]
struct Args {
    /// Chart file (JSON)
    chart: PathBuf,

    /// Directory holding the chart's samples (defaults to the chart's directory)
    #[arg(short, long, env = "HITMIX_SAMPLES")]
    samples: Option<PathBuf>,

    /// Config file (overrides HITMIX_CONFIG and the platform default)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Playback rate
    #[arg(long, default_value_t = 1.0)]
    rate: f64,

    /// Rate changes keep pitch (affects latency correction)
    #[arg(long)]
    tempo_compensated: bool,

    /// Audio offset in milliseconds
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    offset: f64,

    /// Start position in milliseconds
    #[arg(long, default_value_t = 0.0)]
    start: f64,

    /// Write the mix to this WAV file
    #[arg(short, long)]
    record: Option<PathBuf>,

    /// Mixer sample rate (overrides config)
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Channel volume 0.0-1.0 (overrides config)
    #[arg(long)]
    volume: Option<f32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hitmix_player=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!(
        "hitmix-player {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let mut config =
        PlayerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(rate) = args.sample_rate {
        config.sample_rate = rate;
    }
    if let Some(volume) = args.volume {
        config.master_volume = volume;
    }
    config.validate().context("Invalid configuration")?;

    let samples_dir = args
        .samples
        .clone()
        .or_else(|| args.chart.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    info!("Chart: {}", args.chart.display());
    info!("Samples: {}", samples_dir.display());

    let root = Mixer::new(config.sample_rate);
    let engine = PlaybackEngine::with_mixer(
        &config,
        Arc::new(ChartEventSource::new(&args.chart)),
        Arc::new(SoundCache::new(samples_dir, config.sample_rate)),
        Arc::new(root.clone()),
    )
    .context("Failed to create playback engine")?;

    engine.set_playback_rate(args.rate, args.tempo_compensated)?;
    engine.set_manual_offset(args.offset)?;
    engine
        .initialize()
        .await
        .context("Failed to initialize channel")?;

    let rendering = Arc::new(AtomicBool::new(true));
    let renderer = {
        let root = root.clone();
        let rendering = Arc::clone(&rendering);
        let record = args.record.clone();
        std::thread::spawn(move || render_realtime(root, record.as_deref(), rendering))
    };

    let mut events = engine.subscribe();
    if args.start > 0.0 {
        engine.skip_to(args.start).await?;
    }
    engine.play().await?;

    tokio::select! {
        _ = wait_for_finish(&mut events) => {
            info!("Chart finished");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            info!("Received Ctrl+C, stopping");
        }
    }

    engine.dispose().await?;

    // Let released sounds ring out into the recording
    tokio::time::sleep(Duration::from_millis(config.release_fade_ms)).await;
    rendering.store(false, Ordering::Release);
    let frames = renderer
        .join()
        .map_err(|_| anyhow::anyhow!("Render thread panicked"))??;
    info!(
        "Rendered {:.1}s of audio",
        frames as f64 / config.sample_rate as f64
    );

    Ok(())
}

/// Wait until the channel reports `Finished`
async fn wait_for_finish(events: &mut broadcast::Receiver<HitmixEvent>) {
    loop {
        match events.recv().await {
            Ok(HitmixEvent::StatusChanged { new_status, .. })
                if new_status == PlaybackStatus::Finished =>
            {
                return;
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // Position ticks are plentiful; only status matters here
                debug!("Skipped {} notifications", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Pull frames from the root mixer at wall-clock pace until told to stop
///
/// Returns the number of frames rendered.
fn render_realtime(root: Mixer, record: Option<&Path>, rendering: Arc<AtomicBool>) -> Result<u64> {
    let sample_rate = root.sample_rate();
    let mut writer = match record {
        Some(path) => {
            let spec = hound::WavSpec {
                channels: 2,
                sample_rate,
                bits_per_sample: 32,
                sample_format: hound::SampleFormat::Float,
            };
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            info!("Recording mix to {}", path.display());
            Some(hound::WavWriter::new(BufWriter::new(file), spec)?)
        }
        None => None,
    };

    let started = Instant::now();
    let mut block = vec![0.0f32; RENDER_BLOCK_FRAMES * 2];
    let mut rendered: u64 = 0;

    while rendering.load(Ordering::Acquire) {
        let due = (started.elapsed().as_secs_f64() * sample_rate as f64) as u64;
        if rendered + RENDER_BLOCK_FRAMES as u64 > due {
            std::thread::sleep(Duration::from_millis(2));
            continue;
        }

        root.render(&mut block);
        rendered += RENDER_BLOCK_FRAMES as u64;

        if let Some(writer) = writer.as_mut() {
            for &sample in &block {
                writer.write_sample(sample.clamp(-1.0, 1.0))?;
            }
        }
    }

    if let Some(writer) = writer {
        writer.finalize()?;
    }
    Ok(rendered)
}
