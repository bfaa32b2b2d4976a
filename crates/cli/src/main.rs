//! Spanstore CLI
//!
//! Generates and installs the span index template.

use clap::Parser;
use spanstore_cli::{Cli, Command, init_logging};
use spanstore_persistence::{LazyClient, StorageConfig, generate_template};
use tracing::{info, warn};

/// Connects lazily, installs the template and reports cluster health.
async fn install(config: StorageConfig) -> anyhow::Result<()> {
    let client = LazyClient::elasticsearch(config)?;
    info!(client = %client, "Installing index template");

    let outcome = client.check().await;
    client.close().await;

    let health = outcome?;
    info!(%health, "Index template installed");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = cli.storage.to_config();
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid storage configuration: {}", e))?;

    match cli.command {
        Command::Template { engine_version } => {
            let template = generate_template(&engine_version, &config)?;
            if template.requires_fielddata() {
                warn!("Tokenized trace ids enable fielddata, which is memory-expensive");
            }
            println!("{}", template);
        }
        Command::Install => install(config).await?,
    }

    Ok(())
}
