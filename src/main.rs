use crate::booter::Booter;
use crate::config::Config;
use crate::server::router::build_router;
use crate::server::types::AppState;
use crate::utils::logger::init_logger;

pub mod booter;
pub mod config;
pub mod core;
pub mod server;
pub mod utils;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    // keep the guard alive so buffered log lines get flushed to the file
    let _log_guard = init_logger(&config.log_dir)?;

    tokio::fs::create_dir_all(&config.upload_folder).await?;
    tracing::info!("Storing uploads in {}", config.upload_folder.display());

    let state = AppState::from_config(&config);
    let router = build_router(state);

    let booter = Booter::new(config.port).await?;
    booter.start(router).await?;

    Ok(())
}
