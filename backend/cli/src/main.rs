mod config;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use receiptforge_extractor::{build_provider, ExtractorConfig, FieldExtractor, RetryPolicy};
use receiptforge_gateway::{start_server, GatewayState};
use receiptforge_logging::init_logger;
use receiptforge_store::{open_store, RecordStore};

use config::Config;

#[derive(Parser)]
#[command(name = "receiptforge")]
#[command(about = "receiptforge: upload receipts, extract their fields, browse them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the receipt web server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Probe a running server's health endpoint
    Status,
    /// Print every stored receipt as one JSON line
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    let cli = Cli::parse();

    // Stdout carries data for the one-shot commands; keep their logs quiet.
    let level = match cli.command {
        Commands::Serve { .. } => config.log_level.as_str(),
        Commands::Status | Commands::List => "warn",
    };
    init_logger(config.log_dir.as_deref(), level);

    match cli.command {
        Commands::Serve { port } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                ..config
            };
            run_server(config).await?;
        }
        Commands::Status => {
            let client = reqwest::Client::new();
            let url = format!("http://localhost:{}/api/health", config.port);
            match client.get(&url).send().await {
                Ok(resp) => {
                    let body: serde_json::Value = resp.json().await?;
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(_) => {
                    println!("receiptforge is not running on port {}", config.port);
                }
            }
        }
        Commands::List => list_receipts(&config).await?,
    }

    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    info!(
        port = config.port,
        bind = %config.bind_address,
        store = %config.store_url,
        provider = %config.vision_provider,
        "Starting receiptforge"
    );

    let kv = open_store(&config.store_url).context("failed to open the key-value store")?;
    let provider = build_provider(&config.provider_settings()?)
        .context("failed to configure the vision provider")?;
    info!(provider = provider.name(), "Vision provider ready");

    let extractor = FieldExtractor::new(provider).with_config(ExtractorConfig {
        timeout: config.extract_timeout(),
        retry: RetryPolicy::default(),
        ..ExtractorConfig::default()
    });
    let state = GatewayState::new(RecordStore::new(kv), extractor);

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", config.bind_address, config.port))?;

    start_server(addr, state, config.max_upload_bytes()).await
}

async fn list_receipts(config: &Config) -> Result<()> {
    let kv = open_store(&config.store_url).context("failed to open the key-value store")?;
    let listing = RecordStore::new(kv).list().await?;

    for record in &listing.records {
        println!("{}", serde_json::to_string(record)?);
    }
    for skipped in &listing.skipped {
        eprintln!("skipped {}: {}", skipped.key, skipped.reason);
    }
    Ok(())
}
