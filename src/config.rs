use crate::utils::constants::{DEFAULT_LOG_DIR, DEFAULT_PORT};
use crate::utils::get_env::{get_env_var, get_optional_env_var};
use anyhow::{Context, Error};
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    pub hard_key: String,
    pub upload_folder: PathBuf,
    pub port: u16,
    pub log_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        let hard_key = get_env_var("HARD_KEY").context("HARD_KEY must be set")?;
        if hard_key.is_empty() {
            anyhow::bail!("HARD_KEY must not be empty");
        }
        let upload_folder = get_env_var("UPLOAD_FOLDER").context("UPLOAD_FOLDER must be set")?;

        let port = match get_optional_env_var("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("invalid PORT value: {raw}"))?,
            None => DEFAULT_PORT,
        };
        let log_dir = get_optional_env_var("LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.to_string());

        Ok(Config {
            hard_key,
            upload_folder: PathBuf::from(upload_folder),
            port,
            log_dir: PathBuf::from(log_dir),
        })
    }
}
