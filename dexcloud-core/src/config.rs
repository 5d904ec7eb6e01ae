//! Configuration management for dexcloud
//!
//! Config files are stored in platform-appropriate locations:
//! - Linux: ~/.config/dexcloud/
//! - macOS: ~/Library/Application Support/dexcloud/
//! - Windows: %APPDATA%\dexcloud\
//!
//! Every field has a default, so an empty or partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::protocol::Envelope;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    NoDirFound,

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where the DexCloud server lives
    #[serde(default)]
    pub server: ServerConfig,

    /// API paths relative to the server base URL
    #[serde(default)]
    pub endpoints: Endpoints,

    /// Response shapes and success statuses
    #[serde(default)]
    pub api: ApiConfig,

    /// Session cookie names and storage
    #[serde(default)]
    pub cookies: CookieConfig,

    /// Front-end settings
    #[serde(default)]
    pub client: ClientConfig,
}

/// Server location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL, e.g. `http://127.0.0.1:8080`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds (0 disables it)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// API paths consumed by the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default = "default_register")]
    pub register: String,
    #[serde(default = "default_login")]
    pub login: String,
    #[serde(default = "default_check_auth")]
    pub check_auth: String,
    #[serde(default = "default_upload")]
    pub upload: String,
    #[serde(default = "default_file_list")]
    pub file_list: String,
    /// Prefix of per-user download links
    #[serde(default = "default_uploads")]
    pub uploads: String,
}

/// HTTP method used for uploads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMethod {
    #[default]
    Post,
    Put,
}

impl From<UploadMethod> for reqwest::Method {
    fn from(method: UploadMethod) -> Self {
        match method {
            UploadMethod::Post => reqwest::Method::POST,
            UploadMethod::Put => reqwest::Method::PUT,
        }
    }
}

/// Wire contract knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Where the payload sits in auth and listing responses
    #[serde(default)]
    pub envelope: Envelope,

    /// Status that marks a successful login
    #[serde(default = "default_login_status")]
    pub login_status: u16,

    /// Status that marks a successful registration
    #[serde(default = "default_register_status")]
    pub register_status: u16,

    #[serde(default)]
    pub upload_method: UploadMethod,

    /// Multipart field name shared by every uploaded part
    #[serde(default = "default_upload_field")]
    pub upload_field: String,
}

/// Session cookie layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieConfig {
    /// Cookie carrying the user identifier
    #[serde(default = "default_identity_key")]
    pub identity_key: String,

    /// Cookie carrying the session token
    #[serde(default = "default_token_key")]
    pub token_key: String,

    /// Persist cookies between runs
    #[serde(default = "default_true")]
    pub persist: bool,

    /// Override for the cookie file location
    pub store_path: Option<PathBuf>,
}

/// Front-end configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Where downloads are written (defaults to the platform download dir)
    pub download_dir: Option<PathBuf>,

    /// Rows kept visible in the file list before scrolling
    #[serde(default = "default_visible_rows")]
    pub visible_rows: usize,
}

// Default value functions
fn default_base_url() -> String {
    format!("http://127.0.0.1:{}", crate::DEFAULT_PORT)
}
fn default_timeout() -> u64 {
    30
}
fn default_register() -> String {
    "/api/register".to_string()
}
fn default_login() -> String {
    "/api/login".to_string()
}
fn default_check_auth() -> String {
    "/api/checkauth".to_string()
}
fn default_upload() -> String {
    "/api/upload".to_string()
}
fn default_file_list() -> String {
    "/api/filelist".to_string()
}
fn default_uploads() -> String {
    "/uploads".to_string()
}
fn default_login_status() -> u16 {
    200
}
fn default_register_status() -> u16 {
    201
}
fn default_upload_field() -> String {
    "file".to_string()
}
fn default_identity_key() -> String {
    "userid".to_string()
}
fn default_token_key() -> String {
    "token".to_string()
}
fn default_true() -> bool {
    true
}
fn default_visible_rows() -> usize {
    20
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            register: default_register(),
            login: default_login(),
            check_auth: default_check_auth(),
            upload: default_upload(),
            file_list: default_file_list(),
            uploads: default_uploads(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            envelope: Envelope::default(),
            login_status: default_login_status(),
            register_status: default_register_status(),
            upload_method: UploadMethod::default(),
            upload_field: default_upload_field(),
        }
    }
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            identity_key: default_identity_key(),
            token_key: default_token_key(),
            persist: true,
            store_path: None,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            download_dir: None,
            visible_rows: default_visible_rows(),
        }
    }
}

impl CookieConfig {
    /// Cookie file location, or `None` when persistence is off
    pub fn resolved_store_path(&self) -> Option<PathBuf> {
        if !self.persist {
            return None;
        }
        self.store_path
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("dexcloud").join("cookies.json")))
    }
}

impl ClientConfig {
    pub fn resolved_download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Config {
    /// Get config directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join("dexcloud"))
            .ok_or(ConfigError::NoDirFound)
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from default location
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load config from specific path
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot constrain
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, status) in [
            ("api.login_status", self.api.login_status),
            ("api.register_status", self.api.register_status),
        ] {
            if !(200..300).contains(&status) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a 2xx status, got {}",
                    key, status
                )));
            }
        }
        Ok(())
    }

    /// Save config to default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    /// Save config to specific path
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Config pointing at `base_url` with everything else defaulted
    pub fn for_server(base_url: &str) -> Self {
        let mut config = Self::default();
        config.server.base_url = base_url.to_string();
        config
    }
}
