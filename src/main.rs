use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

mod config;
mod db;
mod error;
mod llm;
mod util;
mod web;

use crate::config::{AppConfig, CliArgs};
use crate::db::schema_manager::load_schema_text;
use crate::error::StartupError;
use crate::llm::LlmManager;
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = CliArgs::parse();

    // Initialize logging
    init_tracing(args.log_json);

    if let Err(e) = run(args).await {
        error!("{}", e);
        return Err(e.into());
    }

    Ok(())
}

async fn run(args: CliArgs) -> Result<(), StartupError> {
    dotenv::from_path(&args.env_file).map_err(|e| StartupError::env_file(&args.env_file, e))?;
    info!("Loaded environment from {}", args.env_file.display());

    let config = AppConfig::from_env(&args)?;

    let pool = db::pool::connect(&config.database).await?;

    // The schema is read once; later changes need a restart
    info!("Introspecting database schema");
    let schema = load_schema_text(&pool).await?;

    info!(
        "Initializing LLM manager with backend: {} (model: {})",
        config.llm.backend, config.llm.model
    );
    let llm_manager = LlmManager::new(&config.llm)?;

    let app_state = Arc::new(AppState::new(schema, llm_manager));

    let served = web::run_server(config.web, app_state).await;

    pool.close().await;

    match served {
        Ok(()) => {
            info!("Server stopped gracefully");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
