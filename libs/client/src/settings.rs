//! Configuration loading.
//!
//! Settings are merged from four layers, highest precedence last:
//! built-in defaults, the system file (`/etc/cirrus/cirrus.yml`), a local
//! file (`./cirrus.yml`), and `CIRRUS_*` environment variables. CLI flags
//! are applied by the caller on top of the merged result.

use std::path::PathBuf;

use config::{Config as Loader, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Default server URL.
pub const DEFAULT_URL: &str = "https://localhost:8443";

const SYSTEM_CONFIG: &str = "/etc/cirrus/cirrus";
const LOCAL_CONFIG: &str = "cirrus";
const ENV_PREFIX: &str = "CIRRUS";

/// Merged connection settings for the Cirrus server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server base URL.
    pub url: String,

    /// Username for the basic-auth token exchange.
    pub username: String,

    /// Password for the basic-auth token exchange.
    pub password: String,

    /// Explicit bearer token. When set it is validated as-is and never
    /// silently replaced.
    pub token: Option<String>,

    /// Verify the server TLS certificate.
    pub enable_ssl_verify: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            username: "admin".to_string(),
            password: "smartvm".to_string(),
            token: None,
            enable_ssl_verify: false,
        }
    }
}

impl Settings {
    /// Load settings from all configuration layers.
    pub fn load() -> Result<Self> {
        let defaults = Settings::default();
        let merged = Loader::builder()
            .set_default("url", defaults.url)?
            .set_default("username", defaults.username)?
            .set_default("password", defaults.password)?
            .set_default("token", None::<String>)?
            .set_default("enable_ssl_verify", defaults.enable_ssl_verify)?
            .add_source(File::new(SYSTEM_CONFIG, FileFormat::Yaml).required(false))
            .add_source(File::new(LOCAL_CONFIG, FileFormat::Yaml).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        Ok(merged.try_deserialize()?)
    }
}

/// Per-user location of the cached auth token.
pub fn token_cache_path() -> Result<PathBuf> {
    ProjectDirs::from("io", "Cirrus", "cirrus")
        .map(|dirs| dirs.config_dir().join("auth").join("token"))
        .ok_or_else(|| {
            ClientError::Config("could not determine token cache directory".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_resolvable_url() {
        let settings = Settings::default();
        assert_eq!(settings.url, DEFAULT_URL);
        assert!(settings.token.is_none());
        assert!(!settings.enable_ssl_verify);
    }
}
