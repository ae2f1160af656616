use clap::Parser;
use media_reposter::{config, pipeline, Cli, FetchConfig, SourcesConfig, XrpcClient};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(config::log_filter()).init();

    let cli = Cli::parse();

    let Some((username, password)) = cli.credentials() else {
        error!("Missing BSKY_USERNAME / BSKY_PASSWORD, nothing to do");
        return Ok(());
    };

    let sources = match SourcesConfig::load(&cli.sources).await {
        Ok(sources) => sources,
        Err(e) => {
            error!("Could not load sources: {}", e);
            return Ok(());
        }
    };
    if sources.is_empty() {
        warn!("No feeds or lists configured in {}", cli.sources.display());
        return Ok(());
    }

    let client = XrpcClient::login(&cli.service, &username, &password, FetchConfig::default()).await?;

    let config = cli.run_config();
    info!(
        "Window {}h, max {} per run, max {} per author, ledger {}",
        config.hours_back,
        config.executor.max_per_run,
        config.executor.max_per_user,
        config.ledger_path.display()
    );

    pipeline::run(&client, &config, &sources).await?;
    Ok(())
}
