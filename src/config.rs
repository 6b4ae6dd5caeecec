// Process configuration, read from the environment exactly once at
// startup. The resulting struct is immutable and handed explicitly to the
// components that need it, so nothing else reads ambient env state.

use anyhow::{bail, Result};
use std::path::PathBuf;

/// Default API base used when `API_URL` is not set.
pub const DEFAULT_API_URL: &str = "https://api.meshcapade.com/api/v1";

/// Folder scanned for subject directories.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Startup configuration: operator credentials, the API base URL and the
/// local data root holding subject folders.
#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub password: String,
    pub api_url: String,
    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables. A `.env` file in the
    /// working directory is read first if present. `USERNAME` and
    /// `PASSWORD` are required; `API_URL` falls back to the public API.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let username = std::env::var("USERNAME").unwrap_or_default();
        let password = std::env::var("PASSWORD").unwrap_or_default();
        if username.is_empty() || password.is_empty() {
            bail!("USERNAME and PASSWORD must be set in the environment or a .env file");
        }

        let api_url = std::env::var("API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());

        Ok(Config {
            username,
            password,
            api_url,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        })
    }
}
