use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use hamspam::{AppState, ArtifactPaths, Config, download, service, trainer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hamspam", about = "SMS spam classifier: prepare data, train, serve")]
struct Cli {
    /// TOML config file; defaults apply when it does not exist
    #[arg(long, global = true, default_value = "hamspam.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download the SMS Spam Collection and write it as a CSV
    Download {
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Train all candidates, save the best model and the metrics heatmap
    Train,
    /// Load the saved artifacts and serve predictions
    Serve {
        #[arg(long)]
        addr: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config from {:?}", cli.config))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Command::Download { url, out } => {
            if let Some(url) = url {
                config.dataset.url = url;
            }
            if let Some(out) = out {
                config.dataset.csv_path = out;
            }
            let rows = download::prepare(
                &config.dataset.url,
                &config.dataset.csv_path,
                Duration::from_secs(config.dataset.download_timeout_secs),
            )
            .await
            .context("dataset preparation failed")?;
            info!("✅ Prepared {} rows", rows);
        }
        Command::Train => {
            let report = tokio::task::spawn_blocking(move || trainer::run(&config))
                .await?
                .context("training failed")?;
            let best = report.best_record();
            info!("✅ Saved {} (f1={:.4})", best.model, best.f1);
        }
        Command::Serve { addr } => {
            if let Some(addr) = addr {
                config.server.listen_addr = addr;
            }
            let state = Arc::new(AppState::unloaded());
            state
                .load(&ArtifactPaths::from(&config.artifacts))
                .context("failed to load model artifacts")?;
            service::serve(state, &config.server.listen_addr).await?;
        }
    }

    Ok(())
}
