use anyhow::Error;
use dotenv::dotenv;
use std::env;

pub fn get_env_var(key: &str) -> Result<String, Error> {
    dotenv().ok();
    Ok(env::var(key)?)
}

pub fn get_optional_env_var(key: &str) -> Option<String> {
    get_env_var(key).ok().filter(|v| !v.trim().is_empty())
}
