use crate::config::Config;
use crate::core::recompress::RecompressOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct AppState {
    pub upload_folder: PathBuf,
    pub hard_key: String,
    pub recompress: RecompressOptions,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            upload_folder: config.upload_folder.clone(),
            hard_key: config.hard_key.clone(),
            recompress: RecompressOptions::default(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct UploadQuery {
    pub key: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileMetadata {
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub id: String,
    pub size: u64,
    pub title: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub timestamp: String,
}

// Response structure
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UploadResponse {
    pub message: String,
    pub data: FileMetadata,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DeleteRequest {
    #[serde(rename = "fileName")]
    pub file_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DeleteResponse {
    pub message: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
}
