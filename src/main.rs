// src/main.rs - Chirpy server entry point
use chirpy::config::{self, Config};
use chirpy::store::DocumentStore;
use chirpy::web;
use clap::Parser;
use std::path::Path;

#[derive(Parser, Debug)]
#[command(name = "chirpy", version, about = "Chirpy posting service")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "chirpy.toml")]
    config: String,

    /// Delete the database file before starting (hard reset, no backup)
    #[arg(long)]
    debug: bool,

    /// Override the listening port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(if args.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    tracing::info!("Starting Chirpy");

    let mut config = if Path::new(&args.config).exists() {
        tracing::info!("Loading configuration from: {}", args.config);
        config::load_config(&args.config).map_err(|e| {
            tracing::error!("Failed to load config from '{}': {}", args.config, e);
            Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>
        })?
    } else {
        tracing::warn!("Config file '{}' not found, using defaults", args.config);
        Config::default()
    };
    config::load_dotenv(Path::new(".env"));
    config.apply_env();
    if let Some(port) = args.port {
        config.server.port = port;
    }

    if config.auth.jwt_secret.is_empty() {
        tracing::error!("No JWT secret configured; set JWT_SECRET or [auth].jwt_secret");
        return Err("missing JWT secret".into());
    }
    if config.auth.polka_key.is_none() {
        tracing::warn!("No POLKA_KEY configured; payment webhooks will be rejected");
    }

    if args.debug {
        tracing::warn!("Debug mode: deleting {}", config.database.path.display());
        DocumentStore::reset(&config.database.path)?;
    }

    let state = web::api::build_state(&config)?;
    tracing::info!("Database: {}", config.database.path.display());

    let app = web::api::create_router(state, &config.server.filepath_root);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.server.port)).await?;
    tracing::info!("Web API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
