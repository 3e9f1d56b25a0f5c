//! Beacon Agent
//!
//! Reads analytics events as JSON lines on stdin and delivers them to the
//! collector in batches.

mod config;
mod identity;
mod input;
mod shutdown;
mod system;

use beacon_core::{LifecycleEvent, LifecycleSignal, Telemetry};
use clap::Parser;
use config::{CliOverrides, ConfigLoader};
use identity::FileIdentity;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::BufReader;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Beacon Agent - batched analytics event forwarder
#[derive(Parser, Debug)]
#[command(name = "beacon-agent")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./beacon.toml")]
    config: PathBuf,

    /// Override the measurement id (e.g., G-XXXXXXX)
    #[arg(long, env = "BEACON_MEASUREMENT_ID")]
    measurement_id: Option<String>,

    /// Override the number of events per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Seconds to wait for in-flight deliveries before exiting
    #[arg(long, default_value = "10")]
    drain_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting beacon-agent v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let overrides = CliOverrides {
        measurement_id: args.measurement_id.clone(),
        batch_size: args.batch_size,
    };
    let config = ConfigLoader::new(&args.config, overrides)
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let system = system::detect(config.screen_resolution, config.language);

    let identity =
        FileIdentity::unless_seeded(config.telemetry.client_id_seed.as_deref(), &config.id_file);

    let mut builder = Telemetry::builder(config.telemetry).on_complete(|outcome| {
        if let Some(failure) = outcome.failure() {
            tracing::error!(error = %failure, "Batch was not delivered");
        }
    });
    if let Some(identity) = identity {
        tracing::debug!(path = %identity.path().display(), "Install id ready");
        builder = builder.identity(identity);
    }
    let telemetry = builder.build()?;
    tracing::info!(client_id = %telemetry.client_id(), "Telemetry ready");

    // SIGUSR1 flushes through the lifecycle signal
    let lifecycle = LifecycleSignal::new();
    let watcher = telemetry.watch_lifecycle(lifecycle.subscribe());
    let suspend_handler = shutdown::spawn_suspend_handler(lifecycle.clone())?;
    let shutdown = shutdown::shutdown_signal()?;

    let stats = input::run(
        BufReader::new(tokio::io::stdin()),
        &telemetry,
        &system,
        shutdown,
    )
    .await?;
    tracing::info!(
        accepted = stats.accepted,
        rejected = stats.rejected,
        "Stopped reading input"
    );

    // Hand off whatever is left, then give deliveries a chance to finish
    let flushed = telemetry.on_lifecycle(LifecycleEvent::Terminating);
    tracing::info!(events = flushed, "Flushed pending events");

    suspend_handler.abort();
    let _ = suspend_handler.await;
    drop(lifecycle);
    let _ = watcher.await;

    if telemetry
        .wait_idle(Duration::from_secs(args.drain_timeout))
        .await
    {
        tracing::info!("Agent shutdown complete");
    } else {
        tracing::warn!("Deliveries still in flight at exit, they are lost");
    }

    Ok(())
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,beacon_core=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
