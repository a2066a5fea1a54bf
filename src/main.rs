//! Idea Bank - share concepts and trace how they build on each other

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use ideabank::{config::Args, db::Database, logging, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    logging::init(&args.log_level);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Idea Bank");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Database: {}", args.database_path.display());
    info!("Pool size: {}", args.db_pool_size);
    info!("Object links: {}", args.link_base_url);
    info!("======================================");

    let db = Database::open(&args.database_path, args.db_pool_size)?;
    let state = Arc::new(server::AppState::new(args, db)?);

    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
