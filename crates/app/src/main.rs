use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use blackbox_app::assistant::MockChat;
use blackbox_app::config::AppConfig;
use blackbox_app::runtime::Runtime;
use blackbox_app::trigger::TriggerListener;
use blackbox_foundation::ShutdownHandler;
use blackbox_stt::{MockTranscriber, NoOpTranscriber, Transcriber};
use blackbox_vad::EnergyMetric;

#[derive(Parser, Debug)]
#[command(name = "blackbox", about = "BB, the Black Box voice assistant")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Capture device name (substring match)
    #[arg(long)]
    device: Option<String>,

    /// Silence amplitude threshold, raw sample units (calibrate per mic)
    #[arg(long)]
    silence_threshold: Option<u16>,

    /// Continuous silence required to stop recording, in ms
    #[arg(long)]
    silence_ms: Option<u32>,

    /// Hard cap on a single recording, in ms
    #[arg(long)]
    max_ms: Option<u32>,

    /// Use true RMS instead of mean absolute amplitude for energy
    #[arg(long)]
    rms: bool,

    /// Pretend every clip transcribed to this text (offline demo)
    #[arg(long)]
    simulate: Option<String>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if cli.device.is_some() {
        config.device = cli.device.clone();
    }
    if let Some(threshold) = cli.silence_threshold {
        config.session.silence.threshold = threshold;
    }
    if let Some(ms) = cli.silence_ms {
        config.session.silence.silence_duration_ms = ms;
    }
    if let Some(ms) = cli.max_ms {
        config.session.max_duration_ms = ms;
    }
    if cli.rms {
        config.session.silence.energy_metric = EnergyMetric::Rms;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    apply_overrides(&mut config, &cli);
    tracing::info!(
        threshold = config.session.silence.threshold,
        silence_ms = config.session.silence.silence_duration_ms,
        metric = ?config.session.silence.energy_metric,
        "starting BB"
    );

    // Remote transcription/chat backends are deployment-specific
    // collaborators; the shipped binary wires in the offline doubles.
    let transcriber: Arc<dyn Transcriber> = match &cli.simulate {
        Some(text) => Arc::new(MockTranscriber::with_transcript(text.clone())),
        None => Arc::new(NoOpTranscriber::new()),
    };
    let chat = Arc::new(MockChat::default());

    let shutdown = ShutdownHandler::new().install().await;
    let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
    let _listener = TriggerListener::spawn(trigger_tx).context("starting keyboard listener")?;

    let runtime = Runtime::new(config, transcriber, chat).context("building runtime")?;
    runtime
        .run(shutdown, trigger_rx)
        .await
        .context("assistant loop failed")?;
    Ok(())
}
