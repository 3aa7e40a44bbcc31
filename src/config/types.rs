use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::token::{DEFAULT_EXPIRY_MINUTES, MAX_EXPIRY_MINUTES};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub tokens: TokenConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding the metadata store file and the media root.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    /// Path of the JSON metadata store file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("hlsgate.json")
    }

    /// Root directory under which each media item gets a private
    /// `{internal_id}/` segment directory.
    pub fn hls_root(&self) -> PathBuf {
        self.data_dir.join("hls")
    }

    /// Scratch directory for uploads awaiting transcoding.
    pub fn scratch_dir(&self) -> PathBuf {
        self.data_dir.join("scratch")
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    /// Process-wide signing secret. Generated (and persisted back into the
    /// config file, when one exists) on first start if absent.
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Signing algorithm identifier. Only HS256 is supported.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// Ceiling for every expiry window, in minutes.
    #[serde(default = "default_max_expiry")]
    pub max_expiry_minutes: u32,

    /// Expiry applied when an upload does not specify one.
    #[serde(default = "default_expiry")]
    pub default_expiry_minutes: u32,
}

fn default_algorithm() -> String {
    "HS256".to_string()
}
fn default_max_expiry() -> u32 {
    MAX_EXPIRY_MINUTES
}
fn default_expiry() -> u32 {
    DEFAULT_EXPIRY_MINUTES
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            algorithm: default_algorithm(),
            max_expiry_minutes: default_max_expiry(),
            default_expiry_minutes: default_expiry(),
        }
    }
}
