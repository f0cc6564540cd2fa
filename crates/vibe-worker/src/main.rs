//! Narration worker binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{info, warn};

use vibe_analysis::{BackoffStrategy, BatchOrchestrator, HttpFrameAnalyzer, HttpNetworkProbe};
use vibe_cache::CacheStore;
use vibe_models::{Style, VideoKey};
use vibe_worker::{init_tracing, load_frames_dir, SubtitlePipeline, WorkerConfig};

#[derive(Parser)]
#[command(name = "vibe-worker", version, about = "Narrate videos frame by frame for English learners")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Narrate a video and print the analysis result as JSON.
    Analyze {
        /// Video file; its name, size and mtime identify it in the cache.
        video: PathBuf,
        /// Directory of extracted .jpg/.png frames. Cached frames are used when omitted.
        frames_dir: Option<PathBuf>,
        #[arg(long, default_value = "casual")]
        style: Style,
        /// Pass each batch's last sentence on to the next batch.
        #[arg(long)]
        continuity: bool,
        /// Video duration in seconds (defaults to frame count times interval).
        #[arg(long)]
        duration: Option<f64>,
        /// Probe the network and size batches adaptively.
        #[arg(long)]
        adaptive: bool,
    },
    /// Delete expired cache entries.
    Sweep,
    /// List cached videos.
    Stats,
    /// Delete the whole cache database.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = WorkerConfig::from_env();

    if let Some(addr) = config.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(addr = %addr, "Metrics exporter listening");
    }

    let cache = Arc::new(CacheStore::new(config.cache.clone()));

    let outcome = match cli.command {
        Command::Analyze {
            video,
            frames_dir,
            style,
            continuity,
            duration,
            adaptive,
        } => {
            analyze(
                &config,
                cache.clone(),
                AnalyzeArgs {
                    video,
                    frames_dir,
                    style,
                    continuity,
                    duration,
                    adaptive,
                },
            )
            .await
        }
        Command::Sweep => {
            let removed = cache.clean_expired_cache().await;
            println!("Removed {} expired entries", removed);
            Ok(())
        }
        Command::Stats => stats(&cache).await,
        Command::Clear => cache
            .clear_all()
            .await
            .map(|()| println!("Cache cleared"))
            .context("Failed to clear cache"),
    };

    cache.close().await;
    outcome
}

struct AnalyzeArgs {
    video: PathBuf,
    frames_dir: Option<PathBuf>,
    style: Style,
    continuity: bool,
    duration: Option<f64>,
    adaptive: bool,
}

async fn analyze(config: &WorkerConfig, cache: Arc<CacheStore>, args: AnalyzeArgs) -> anyhow::Result<()> {
    let key = VideoKey::from_path(&args.video)
        .with_context(|| format!("Cannot read video metadata for {}", args.video.display()))?;

    let mut orchestrator_config = config.orchestrator.clone();
    if args.adaptive {
        orchestrator_config.adaptive = true;
        orchestrator_config.retry.strategy = BackoffStrategy::Exponential;
    }

    let analyzer = HttpFrameAnalyzer::from_env().context("Failed to create analysis client")?;
    let orchestrator = BatchOrchestrator::with_probe(
        orchestrator_config,
        Arc::new(analyzer),
        Arc::new(HttpNetworkProbe::from_env()),
    );
    let pipeline = SubtitlePipeline::new(cache, orchestrator).with_max_frames(config.max_frames);

    let frames = match &args.frames_dir {
        Some(dir) => load_frames_dir(dir, config.frame_interval_secs).await?,
        None => pipeline
            .cached_frames(&key)
            .await
            .filter(|frames| !frames.is_empty())
            .with_context(|| format!("No frames directory given and no cached frames for {}", key.name))?,
    };

    let duration = args
        .duration
        .unwrap_or(frames.len() as f64 * config.frame_interval_secs as f64);

    let run = pipeline.run(&key, &frames, duration, args.style, args.continuity);
    tokio::pin!(run);

    let output = tokio::select! {
        output = &mut run => output?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Received shutdown signal, cancelling analysis");
            pipeline.orchestrator().cleanup().await;
            run.await?
        }
    };

    info!(
        video = %key.name,
        from_cache = output.from_cache,
        failed = output.result.failed_frames.len(),
        "Analysis finished"
    );
    println!("{}", serde_json::to_string_pretty(&output.result)?);
    Ok(())
}

async fn stats(cache: &CacheStore) -> anyhow::Result<()> {
    let entries = cache.entries().await;
    println!(
        "{} cached videos (max {}, max age {}h) in {}",
        entries.len(),
        cache.config().max_entries,
        cache.config().max_age.as_secs() / 3600,
        cache.config().db_path.display()
    );

    for entry in entries {
        let saved = chrono::DateTime::from_timestamp_millis(entry.timestamp)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| entry.timestamp.to_string());
        println!(
            "  {}  frames={}  analysis={}  saved={}",
            entry.video_name,
            entry.frame_count,
            if entry.has_analysis { "yes" } else { "no" },
            saved
        );
    }
    Ok(())
}
