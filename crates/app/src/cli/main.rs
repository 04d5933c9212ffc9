//! Quietwave CLI Application

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use quietwave_core::domain::config::{ConfigManager, QuietwaveConfig, RenderSettings};
use quietwave_core::domain::{DenoiseChain, Decoder, OfflineRenderer};
use quietwave_core::WAV_MIME_TYPE;
use quietwave_infra::SymphoniaDecoder;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quietwave")]
#[command(about = "Offline audio denoiser producing PCM16 WAV", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/quietwave/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Denoise an audio file and write a WAV file
    Denoise {
        /// Input audio file (MP3, AAC/M4A, FLAC, OGG, WAV)
        input: PathBuf,

        /// Output WAV path (defaults to processed_<name>.wav next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Noise reduction level, 0-100 (overrides the config file)
        #[arg(short, long, allow_negative_numbers = true)]
        level: Option<i32>,

        /// Filter channels one after another instead of in parallel
        #[arg(long)]
        sequential: bool,

        /// Abandon the run after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Print the filter parameters derived from a level
    Params {
        #[arg(short, long, allow_negative_numbers = true)]
        level: Option<i32>,

        /// Sample rate used to validate the cutoffs
        #[arg(long, default_value_t = 44100)]
        sample_rate: u32,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
    /// Print the config file path
    Path,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn config_manager(path: Option<&Path>) -> anyhow::Result<ConfigManager> {
    match path {
        Some(path) => Ok(ConfigManager::with_file(path.to_path_buf())),
        None => Ok(ConfigManager::new(ConfigManager::default_config_dir()?)),
    }
}

/// `processed_<stem>.wav` next to the input
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    input.with_file_name(format!("processed_{}.wav", stem))
}

/// How a render job ended
#[derive(Debug)]
enum RenderOutcome {
    Finished(Vec<u8>),
    Interrupted,
    TimedOut,
}

/// Run decode → denoise → encode on a blocking worker
///
/// Returns as soon as `interrupt` resolves or `timeout` elapses. An abandoned
/// job keeps running on its blocking thread and its result is dropped.
async fn render_job<D, I>(
    bytes: Vec<u8>,
    decoder: D,
    level: i32,
    settings: RenderSettings,
    timeout: Option<Duration>,
    interrupt: I,
) -> anyhow::Result<RenderOutcome>
where
    D: Decoder + 'static,
    I: Future<Output = ()>,
{
    let job = tokio::task::spawn_blocking(move || {
        OfflineRenderer::new(settings).process(&bytes, &decoder, level)
    });

    let deadline = async {
        match timeout {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => std::future::pending::<()>().await,
        }
    };

    let result = tokio::select! {
        joined = job => joined.context("Render task failed")?,
        _ = interrupt => return Ok(RenderOutcome::Interrupted),
        _ = deadline => return Ok(RenderOutcome::TimedOut),
    };

    match result {
        Ok(bytes) => Ok(RenderOutcome::Finished(bytes)),
        Err(e) => {
            error!(kind = e.kind(), error = %e, "Processing failed");
            bail!("{}: {}", e.user_message(), e);
        }
    }
}

/// Resolves on the first Ctrl-C; never resolves if the handler cannot be installed
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Ctrl-C handler unavailable");
        std::future::pending::<()>().await
    }
}

async fn run_denoise(
    config: QuietwaveConfig,
    input: PathBuf,
    output: Option<PathBuf>,
    level: Option<i32>,
    sequential: bool,
    timeout_secs: Option<u64>,
) -> anyhow::Result<()> {
    let level = level.unwrap_or(config.denoise.level);
    let settings = RenderSettings {
        parallel_channels: config.render.parallel_channels && !sequential,
    };
    let output = output.unwrap_or_else(|| default_output_path(&input));

    let bytes = tokio::fs::read(&input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let decoder = match input.extension().and_then(|e| e.to_str()) {
        Some(ext) => SymphoniaDecoder::with_extension(ext),
        None => SymphoniaDecoder::new(),
    };

    info!(input = %input.display(), level, "Processing");

    let timeout = timeout_secs.map(Duration::from_secs);
    let wav_bytes = match render_job(bytes, decoder, level, settings, timeout, ctrl_c()).await? {
        RenderOutcome::Finished(bytes) => bytes,
        RenderOutcome::Interrupted => {
            warn!("Interrupted, discarding run");
            bail!("interrupted");
        }
        RenderOutcome::TimedOut => {
            warn!(timeout_secs, "Timed out, discarding run");
            bail!("timed out");
        }
    };

    tokio::fs::write(&output, &wav_bytes)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        output = %output.display(),
        bytes = wav_bytes.len(),
        mime = WAV_MIME_TYPE,
        "Wrote processed audio"
    );
    println!("{}", output.display());
    Ok(())
}

fn run_params(
    config: &QuietwaveConfig,
    level: Option<i32>,
    sample_rate: u32,
    json: bool,
) -> anyhow::Result<()> {
    let level = level.unwrap_or(config.denoise.level);
    let chain = DenoiseChain::build(level, sample_rate)
        .map_err(|e| anyhow::anyhow!("{}: {}", e.user_message(), e))?;
    let summary = chain.summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("level        {}", summary.level);
        println!("sample rate  {} Hz", summary.sample_rate_hz);
        println!("highpass     {:.1} Hz", summary.highpass_hz);
        println!("lowpass      {:.1} Hz", summary.lowpass_hz);
        println!(
            "peaking      {:+.1} dB @ {} Hz, Q {}",
            summary.peaking_gain_db, summary.peaking_center_hz, summary.peaking_q
        );
        println!("output gain  {:.2}x", summary.output_gain);
    }
    Ok(())
}

async fn run_config(manager: &ConfigManager, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            if manager.exists() {
                println!("{} already exists", manager.config_path().display());
            } else {
                manager.save(&QuietwaveConfig::default()).await?;
                println!("{}", manager.config_path().display());
            }
        }
        ConfigAction::Show => {
            let config = manager.load().await;
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Path => println!("{}", manager.config_path().display()),
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let manager = config_manager(cli.config.as_deref())?;

    match cli.command {
        Command::Denoise {
            input,
            output,
            level,
            sequential,
            timeout_secs,
        } => {
            let config = manager.load().await;
            run_denoise(config, input, output, level, sequential, timeout_secs).await
        }
        Command::Params {
            level,
            sample_rate,
            json,
        } => {
            let config = manager.load().await;
            run_params(&config, level, sample_rate, json)
        }
        Command::Config { action } => run_config(&manager, action).await,
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let result = runtime.block_on(run(cli));

    // An abandoned render may still occupy a blocking thread; exit without joining it
    runtime.shutdown_background();
    result
}
