use clap::Parser;
use sekolah_scraper::{setup_logging, Cli, CliRunner, Config};
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    setup_logging(args.verbose);

    info!("Starting sekolah-scraper v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args).await?;
    let runner = CliRunner::new(config)?;

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::broadcast::channel(1);
    let _shutdown_handler = setup_shutdown_handler(shutdown_tx);

    let result = tokio::select! {
        result = runner.run(args.command) => result,
        _ = shutdown_rx.recv() => {
            info!("Received shutdown signal");
            Ok(())
        }
    };

    if let Err(e) = &result {
        error!("Application error: {}", e);
    }
    result
}

async fn load_config(args: &Cli) -> anyhow::Result<Config> {
    let mut config = if let Some(config_path) = &args.config {
        let content = tokio::fs::read_to_string(config_path).await?;
        serde_json::from_str(&content)?
    } else {
        Config::default()
    };

    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(timeout) = args.timeout {
        config.page_load_timeout = Duration::from_secs(timeout);
        config.element_wait_timeout = Duration::from_secs(timeout);
    }
    if let Some(chrome_path) = &args.chrome_path {
        config.chrome_path = Some(chrome_path.clone());
    }
    if let Some(registry) = &args.registry {
        config.registry_path = registry.clone();
    }

    validate_config(&config)?;

    info!("Workers: {}", config.workers);
    info!("Page-load timeout: {:?}", config.page_load_timeout);
    info!("Registry: {}", config.registry_path);

    Ok(config)
}

fn validate_config(config: &Config) -> anyhow::Result<()> {
    if config.workers == 0 {
        anyhow::bail!("Worker count must be greater than 0");
    }
    if config.page_load_timeout.as_secs() == 0 {
        anyhow::bail!("Page-load timeout must be greater than 0");
    }
    if config.window_width == 0 || config.window_height == 0 {
        anyhow::bail!("Window dimensions must be greater than 0");
    }
    Ok(())
}

fn setup_shutdown_handler(
    shutdown_tx: tokio::sync::broadcast::Sender<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
            .expect("Failed to create SIGINT handler");
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to create SIGTERM handler");

        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT"),
            _ = sigterm.recv() => info!("Received SIGTERM"),
        }

        let _ = shutdown_tx.send(());
    })
}
