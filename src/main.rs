use clap::Parser;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nandi_chat::{
    cli::{self, Cli, CliResult, Commands},
    config::{Config, LogFormat},
    remote::{CatalogClient, NandiClient},
    session::{ChatSession, SessionOptions},
    storage::SqliteKeyValueStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(version = env!("CARGO_PKG_VERSION"), "Nandi client starting...");

    let command = cli.command.unwrap_or(Commands::Chat { persona: None });

    let result = match command {
        Commands::Chat { persona } => {
            run_chat(&config, persona.unwrap_or(config.chat.persona)).await?;
            return Ok(());
        }
        Commands::Points => cli::show_points(&open_store(&config).await?).await,
        Commands::Reset => cli::reset_points(&open_store(&config).await?).await,
        catalog_command => {
            let catalog = CatalogClient::new(&config.services, config.request.clone())?;
            info!(base_url = %catalog.base_url(), "Catalog client initialized");
            cli::execute_catalog_command(catalog_command, &catalog).await
        }
    };

    finish(result)
}

async fn run_chat(config: &Config, persona: nandi_chat::Persona) -> anyhow::Result<()> {
    let store = open_store(config).await?;

    let client = match NandiClient::new(&config.services, config.request.clone()) {
        Ok(c) => {
            info!(
                ai_service_url = %c.ai_service_url(),
                api_service_url = %c.api_service_url(),
                "Service client initialized"
            );
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize service client");
            return Err(e.into());
        }
    };

    let mut session =
        ChatSession::new(SessionOptions::new(persona), client.clone(), client, store).await?;

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    cli::run_chat(&mut session, stdin, &mut stdout).await?;

    info!(session_id = %session.session_id(), "Chat session closed");
    Ok(())
}

async fn open_store(config: &Config) -> anyhow::Result<SqliteKeyValueStore> {
    match SqliteKeyValueStore::new(&config.storage).await {
        Ok(s) => {
            info!(path = %config.storage.path.display(), "Storage initialized");
            Ok(s)
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize storage");
            Err(e.into())
        }
    }
}

fn finish(result: CliResult) -> anyhow::Result<()> {
    if result.exit_code == 0 {
        println!("{}", result.message);
        Ok(())
    } else {
        eprintln!("{}", result.message);
        std::process::exit(result.exit_code);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
