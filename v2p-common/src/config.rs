//! Configuration loading with ENV -> TOML priority
//!
//! Every setting resolves in priority order:
//! 1. `V2P_*` environment variable (highest)
//! 2. TOML config file (`~/.config/v2p/config.toml`)
//! 3. Compiled default, where one exists
//!
//! Required credentials with no value in any tier fail with an actionable
//! `Error::Config` message.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, warn};

/// TOML config file contents. All fields optional; ENV overrides each.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub setlist_fm_api_key: Option<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub spotify_refresh_token: Option<String>,
    pub cache_path: Option<PathBuf>,
}

/// Resolved application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Setlist.fm API key
    pub setlist_fm_api_key: String,
    /// Spotify application client ID
    pub spotify_client_id: String,
    /// Spotify application client secret
    pub spotify_client_secret: String,
    /// Spotify OAuth refresh token with playlist-modify scope
    pub spotify_refresh_token: String,
    /// Path to the SQLite result cache
    pub cache_path: PathBuf,
}

impl Settings {
    /// Load settings from the default config file location plus environment.
    pub fn load() -> Result<Self> {
        let toml_config = load_toml_config(&default_config_path())?;
        Self::from_tiers(&toml_config)
    }

    /// Resolve all settings from an already-loaded TOML tier plus ENV.
    pub fn from_tiers(toml_config: &TomlConfig) -> Result<Self> {
        Ok(Self {
            setlist_fm_api_key: resolve_required(
                "V2P_SETLIST_FM_API_KEY",
                toml_config.setlist_fm_api_key.as_deref(),
                "setlist_fm_api_key",
                "https://api.setlist.fm/docs/1.0/index.html",
            )?,
            spotify_client_id: resolve_required(
                "V2P_SPOTIFY_CLIENT_ID",
                toml_config.spotify_client_id.as_deref(),
                "spotify_client_id",
                "https://developer.spotify.com/dashboard",
            )?,
            spotify_client_secret: resolve_required(
                "V2P_SPOTIFY_CLIENT_SECRET",
                toml_config.spotify_client_secret.as_deref(),
                "spotify_client_secret",
                "https://developer.spotify.com/dashboard",
            )?,
            spotify_refresh_token: resolve_required(
                "V2P_SPOTIFY_REFRESH_TOKEN",
                toml_config.spotify_refresh_token.as_deref(),
                "spotify_refresh_token",
                "https://developer.spotify.com/documentation/web-api/tutorials/code-flow",
            )?,
            cache_path: resolve_cache_path(toml_config),
        })
    }
}

/// Default config file path: `~/.config/v2p/config.toml` (platform adjusted).
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("v2p").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("./v2p-config.toml"))
}

/// Default cache database path: `~/.local/share/v2p/cache.db` (platform adjusted).
pub fn default_cache_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("v2p").join("cache.db"))
        .unwrap_or_else(|| PathBuf::from("./v2p-cache.db"))
}

/// Load the TOML tier. A missing file is not an error; a malformed one is.
pub fn load_toml_config(path: &std::path::Path) -> Result<TomlConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "No config file, using ENV and defaults");
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Resolve a required credential with ENV -> TOML priority.
fn resolve_required(
    env_var: &str,
    toml_value: Option<&str>,
    toml_key: &str,
    obtain_url: &str,
) -> Result<String> {
    let env_value = std::env::var(env_var).ok().filter(|v| is_valid_value(v));
    let toml_value = toml_value.filter(|v| is_valid_value(v));

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} set in both environment and config file; using environment (highest priority)",
            toml_key
        );
    }

    if let Some(value) = env_value {
        debug!("{} loaded from environment", toml_key);
        return Ok(value);
    }
    if let Some(value) = toml_value {
        debug!("{} loaded from config file", toml_key);
        return Ok(value.to_string());
    }

    Err(Error::Config(format!(
        "{} not configured. Set the {} environment variable or add \
         {} = \"...\" to {}. Obtain credentials at: {}",
        toml_key,
        env_var,
        toml_key,
        default_config_path().display(),
        obtain_url
    )))
}

fn resolve_cache_path(toml_config: &TomlConfig) -> PathBuf {
    if let Ok(path) = std::env::var("V2P_CACHE_PATH") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    toml_config
        .cache_path
        .clone()
        .unwrap_or_else(default_cache_path)
}

/// Validate a configured value (non-empty, non-whitespace).
fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn missing_config_file_yields_defaults() {
        let config = load_toml_config(std::path::Path::new("/nonexistent/v2p.toml")).unwrap();
        assert!(config.setlist_fm_api_key.is_none());
        assert!(config.cache_path.is_none());
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "not valid toml [[[").unwrap();

        let result = load_toml_config(&path);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn toml_tier_parses_all_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
setlist_fm_api_key = "slfm-key"
spotify_client_id = "client-id"
spotify_client_secret = "client-secret"
spotify_refresh_token = "refresh-token"
cache_path = "/tmp/v2p-test/cache.db"
"#,
        )
        .unwrap();

        let config = load_toml_config(&path).unwrap();
        assert_eq!(config.setlist_fm_api_key.as_deref(), Some("slfm-key"));
        assert_eq!(
            config.cache_path.as_deref(),
            Some(std::path::Path::new("/tmp/v2p-test/cache.db"))
        );
    }

    #[test]
    #[serial]
    fn env_overrides_toml() {
        std::env::set_var("V2P_SETLIST_FM_API_KEY", "env-key");

        let toml_config = TomlConfig {
            setlist_fm_api_key: Some("toml-key".to_string()),
            ..TomlConfig::default()
        };
        let resolved = resolve_required(
            "V2P_SETLIST_FM_API_KEY",
            toml_config.setlist_fm_api_key.as_deref(),
            "setlist_fm_api_key",
            "https://example.com",
        )
        .unwrap();
        assert_eq!(resolved, "env-key");

        std::env::remove_var("V2P_SETLIST_FM_API_KEY");
    }

    #[test]
    #[serial]
    fn missing_required_value_names_both_tiers() {
        std::env::remove_var("V2P_SETLIST_FM_API_KEY");

        let err = resolve_required(
            "V2P_SETLIST_FM_API_KEY",
            None,
            "setlist_fm_api_key",
            "https://example.com",
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("V2P_SETLIST_FM_API_KEY"));
        assert!(msg.contains("setlist_fm_api_key"));
    }

    #[test]
    #[serial]
    fn whitespace_env_value_is_ignored() {
        std::env::set_var("V2P_SETLIST_FM_API_KEY", "   ");

        let resolved = resolve_required(
            "V2P_SETLIST_FM_API_KEY",
            Some("toml-key"),
            "setlist_fm_api_key",
            "https://example.com",
        )
        .unwrap();
        assert_eq!(resolved, "toml-key");

        std::env::remove_var("V2P_SETLIST_FM_API_KEY");
    }
}
