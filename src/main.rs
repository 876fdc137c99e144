use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newswatch::config::{ClassifierMode, Config};
use newswatch::{metrics, utils};
use newswatch::pipeline::Orchestrator;

/// Polling interval used by `worker`
const WORKER_INTERVAL_SECS: u64 = 300;

/// Hourly cycle budget used by `worker`
const WORKER_CYCLES_PER_HOUR: u32 = 10;

#[derive(Parser)]
#[command(
    name = "newswatch",
    version,
    about = "London security alert pipeline: fetch, classify, geocode, publish",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./newswatch.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Use the keyword-only classifier
    #[arg(long, global = true)]
    basic_filter: bool,

    /// Snapshot output path
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run cycles on the polling interval until Ctrl-C
    Run {
        /// Override the polling interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Run a single cycle; the exit code reflects success
    Once,

    /// Background worker: basic classifier, 5 minute interval, hourly budget
    Worker,

    /// Print system statistics as JSON
    Stats {
        /// Print Prometheus metrics instead
        #[arg(long, default_value = "false")]
        metrics: bool,
    },

    /// Evict expired cache records
    CleanupCache,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    if let Err(e) = metrics::init_metrics() {
        tracing::warn!(error = %e, "Metrics initialization failed");
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "newswatch starting");

    match cli.command {
        Commands::Run { interval } => {
            let mut config = config;
            if let Some(secs) = interval {
                config.app.polling_interval_secs = secs;
            }
            config.validate()?;
            run_loop(config).await?;
        }

        Commands::Once => {
            let orchestrator = Orchestrator::from_config(config)?;
            let success = orchestrator.run_single_cycle().await;
            if !success {
                tracing::error!("Cycle failed");
                std::process::exit(1);
            }
        }

        Commands::Worker => {
            let mut config = config;
            config.classifier.mode = ClassifierMode::Basic;
            config.app.polling_interval_secs = WORKER_INTERVAL_SECS;
            config.app.max_cycles_per_hour = Some(WORKER_CYCLES_PER_HOUR);
            tracing::info!(
                interval_secs = WORKER_INTERVAL_SECS,
                cycles_per_hour = WORKER_CYCLES_PER_HOUR,
                "Starting worker mode"
            );
            run_loop(config).await?;
        }

        Commands::Stats { metrics: true } => {
            let text = metrics::encode_metrics()
                .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {e}"))?;
            print!("{text}");
        }

        Commands::Stats { metrics: false } => {
            let orchestrator = Orchestrator::from_config(config)?;
            let stats = orchestrator.get_system_stats();
            tracing::info!(
                cache_entries = stats.cache_stats.total_entries,
                cache_size = %utils::format_bytes(stats.cache_stats.total_size_bytes),
                "Cache usage"
            );
            println!(
                "{}",
                serde_json::to_string_pretty(&stats).context("Failed to serialize stats")?
            );
        }

        Commands::CleanupCache => {
            let orchestrator = Orchestrator::from_config(config)?;
            let evicted = orchestrator.cleanup_cache();
            println!("Evicted {evicted} expired cache records");
        }
    }

    Ok(())
}

/// Config file and environment, then command-line overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if cli.basic_filter {
        config.classifier.mode = ClassifierMode::Basic;
    }
    if let Some(output) = &cli.output {
        config.app.output_file = output.clone();
    }

    Ok(config)
}

async fn run_loop(config: Config) -> Result<()> {
    let orchestrator = Orchestrator::from_config(config)?;
    let handle = orchestrator.shutdown_handle();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown requested");
                handle.shutdown();
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    orchestrator.run().await;
    tracing::info!("newswatch stopped");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let default_directive = if verbose {
        "newswatch=debug,info".to_string()
    } else {
        format!("newswatch={level},warn")
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&default_directive))
        .context("Invalid log filter")?;

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
