use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use storefront_reputation::{
    metrics_server::run_metrics_server, FallbackResolver, PollingController, ReputationConfig,
};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to the reputation configuration file.
    #[clap(short, long, value_parser, default_value = "config/reputation.toml")]
    config: PathBuf,

    /// Resolve a single snapshot, print it as JSON and exit.
    #[clap(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let mut config = ReputationConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load configuration file: {:?}", args.config))?;
    config.apply_env_overrides();

    let log_level_str = config.log_level.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level_str))
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));
    fmt::Subscriber::builder().with_env_filter(filter).init();

    if config.places.credentials().is_none() {
        info!("Places credentials not configured; SDK and REST sources are disabled");
    }

    let resolver = Arc::new(
        FallbackResolver::from_config(&config).context("Failed to build reputation resolver")?,
    );
    info!("Source chain: {:?}", resolver.chain());

    if args.once {
        let snapshot = resolver.resolve().await;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    if let Some(port) = config.metrics_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        tokio::spawn(run_metrics_server(addr));
    }

    let mut controller = PollingController::new(resolver);
    let mut updates = controller.subscribe();
    controller.start()?;

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    error!("Snapshot channel closed unexpectedly");
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                info!(
                    "Reputation snapshot: {:.1} stars, {} reviews, {} samples (source: {})",
                    snapshot.rating,
                    snapshot.total_review_count,
                    snapshot.reviews.len(),
                    snapshot.source_kind.diagnostic_label()
                );
            }
            _ = signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C).");
                break;
            }
        }
    }

    controller.stop().await?;
    info!("Reputation resolver shut down");
    Ok(())
}
