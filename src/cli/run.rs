use crate::aggregate::{AggregateError, Aggregator};
use crate::config::load_config;
use crate::sink::{BatchSink, HttpSink, SinkError};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::signal;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("aggregation error: {0}")]
    Aggregate(#[from] AggregateError),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub async fn run(config_path: Option<PathBuf>, once: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = match config_path {
        Some(path) => path,
        None => {
            eprintln!("Error: config not found");
            eprintln!("Searched locations:");
            eprintln!("  ~/.config/telhub/config.yml");
            eprintln!("  /etc/telhub/config.yml");
            eprintln!("\nUse --config <path> to specify a config file, or run 'telhub config init' to generate one.");
            std::process::exit(1);
        }
    };

    run_aggregator(&config_path, once).await.map_err(|e| e.into())
}

async fn run_aggregator(config_path: &PathBuf, once: bool) -> Result<(), RunError> {
    info!(config_path = %config_path.display(), "Loading configuration");
    let config = load_config(config_path)?;

    let sink: Option<Arc<dyn BatchSink>> = match &config.sink.url {
        Some(url) => {
            info!(url = %url, "Batch sink configured");
            Some(Arc::new(HttpSink::new(url.clone(), config.sink.timeout)?))
        }
        None => {
            warn!("No sink endpoint configured, batches will be aggregated but not delivered");
            None
        }
    };

    let mut aggregator = Aggregator::new(&config, sink);

    if once {
        match aggregator.run_once().await? {
            Some(batch) => println!("{}", serde_json::to_string_pretty(&batch)?),
            None => info!("Nothing to ship"),
        }
        return Ok(());
    }

    info!(
        interval = ?config.aggregation.interval,
        logs_dir = %config.logs.dir.display(),
        "Starting aggregation loop, press Ctrl+C to shutdown"
    );

    let mut ticker = tokio::time::interval(config.aggregation.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match aggregator.run_once().await {
                    Ok(Some(batch)) => {
                        info!(entries = batch.data.len(), "Shipped telemetry batch");
                    }
                    Ok(None) => {
                        debug!("No completed operations to ship");
                    }
                    // A failed rewrite is a potential data-loss incident;
                    // surface it to the operator instead of retrying.
                    Err(e) => {
                        error!(error = %e, "Aggregation run failed");
                        return Err(e.into());
                    }
                }
            }
            _ = signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}
