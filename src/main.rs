use clap::{Parser, Subcommand};
use std::path::PathBuf;
use telhub::config::resolve_config_path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "telhub")]
#[command(about = "Telemetry log aggregator", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Run {
        /// Run a single aggregation pass and exit
        #[arg(long)]
        once: bool,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Init {
        #[arg(long)]
        stdout: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "telhub=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.as_deref());

    match cli.command {
        Some(Commands::Run { once }) => {
            telhub::cli::run::run(config_path, once).await?;
        }
        None => {
            telhub::cli::run::run(config_path, false).await?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { stdout } => {
                telhub::cli::config::init(stdout)?;
            }
        },
    }

    Ok(())
}
