use crate::core::ClientError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

include!(concat!(env!("OUT_DIR"), "/default_config.rs"));

const SESSION_DIR: &str = "rag-chat";
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub auth_url: String,
    pub assistant_url: String,
    pub session_file: Option<PathBuf>,
    pub default_mode: String,
    pub info_mode_marker: String,
    pub error_message: String,
    pub max_upload_bytes: u64,
    pub allowed_extensions: Vec<String>,
    pub theme: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("Invalid default config")
    }
}

impl Config {
    /// Loads `config.toml` from the working directory, falling back to the
    /// compiled-in defaults.
    pub fn load() -> Result<Self, ClientError> {
        Self::load_from(Path::new("config.toml"))
    }

    pub fn load_from(config_path: &Path) -> Result<Self, ClientError> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path).map_err(|e| {
                ClientError::ConfigError(format!("Failed to read config file: {e}"))
            })?;

            toml::from_str(&contents)
                .map_err(|e| ClientError::ConfigError(format!("Failed to parse config file: {e}")))
        } else {
            Ok(Self::default())
        }
    }

    pub fn update_auth_url(&mut self, url: String) {
        self.auth_url = url;
    }

    pub fn update_assistant_url(&mut self, url: String) {
        self.assistant_url = url;
    }

    /// Location of the persisted session, configured or under the platform
    /// data directory.
    pub fn session_path(&self) -> Result<PathBuf, ClientError> {
        if let Some(path) = &self.session_file {
            return Ok(path.clone());
        }
        dirs::data_local_dir()
            .map(|dir| dir.join(SESSION_DIR).join(SESSION_FILE))
            .ok_or_else(|| {
                ClientError::ConfigError("Could not determine a data directory".to_string())
            })
    }
}
