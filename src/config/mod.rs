pub mod persist;
mod types;

pub use types::*;

use crate::token::MAX_EXPIRY_MINUTES;
use anyhow::{Context, Result};
use rand::Rng;
use std::path::Path;

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config.
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = ["./config.toml", "./hlsgate.toml", "/etc/hlsgate/config.toml"];

    for path_str in default_paths {
        let path = Path::new(path_str);
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration.
fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.tokens.algorithm != "HS256" {
        anyhow::bail!(
            "Unsupported signing algorithm '{}' (only HS256 is supported)",
            config.tokens.algorithm
        );
    }

    let max = config.tokens.max_expiry_minutes;
    if max == 0 || max > MAX_EXPIRY_MINUTES {
        anyhow::bail!(
            "max_expiry_minutes must be within [1, {}], got {}",
            MAX_EXPIRY_MINUTES,
            max
        );
    }

    let default = config.tokens.default_expiry_minutes;
    if default == 0 || default > max {
        anyhow::bail!(
            "default_expiry_minutes must be within [1, {}], got {}",
            max,
            default
        );
    }

    Ok(())
}

/// Generate a random signing secret.
pub fn generate_secret() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

/// Resolve the process signing secret, generating one on first start.
///
/// When a config file exists the fresh secret is persisted back into it so
/// tokens survive restarts; without one the secret lives only for this
/// process and every outstanding token dies on restart.
pub fn ensure_secret(config: &mut Config, config_path: Option<&Path>) -> Result<String> {
    if let Some(ref secret) = config.tokens.secret_key {
        return Ok(secret.clone());
    }

    let secret = generate_secret();
    config.tokens.secret_key = Some(secret.clone());

    match config_path {
        Some(path) => {
            persist::update_secret(path, &secret)?;
            tracing::info!("Generated signing secret and persisted it to {:?}", path);
        }
        None => {
            tracing::warn!(
                "No config file; generated an in-memory signing secret. \
                 All tokens will be invalidated on restart."
            );
        }
    }

    Ok(secret)
}
