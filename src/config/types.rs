//! Core configuration types and loading.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::defaults::{
    default_bot_cloud_ttl, default_bot_server_timeout, default_database_path, default_listen,
    default_login_url, default_user_header,
};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read bot server key from {path}: {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Service configuration, loaded once at startup and shared by reference.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Site identity and HTTP listener.
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Trusted authentication proxy settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Bot server RPC endpoint. Without it the bot cloud is unavailable and
    /// bot changes are not pushed anywhere.
    pub bot_server: Option<BotServerConfig>,
    /// Cache lifetimes.
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Load configuration from a TOML file, then read any secrets it points to.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        if let Some(bot_server) = config.bot_server.as_mut() {
            bot_server.load_key()?;
        }
        Ok(config)
    }
}

/// Site identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Site name (e.g., "cia.vc").
    pub name: String,
    /// HTTP listen address (default: 127.0.0.1:8080).
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Authentication is done by a fronting proxy which passes the logged-in
/// username in a trusted header.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Header carrying the authenticated username.
    #[serde(default = "default_user_header")]
    pub user_header: String,
    /// Where unauthenticated requests are redirected.
    #[serde(default = "default_login_url")]
    pub login_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            user_header: default_user_header(),
            login_url: default_login_url(),
        }
    }
}

/// Bot server RPC configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotServerConfig {
    /// RPC endpoint URL (e.g., "http://localhost:3910").
    pub url: String,
    /// File holding the shared RPC key. `~/` is expanded.
    pub key_file: Option<String>,
    /// Per-call timeout in seconds.
    #[serde(default = "default_bot_server_timeout")]
    pub timeout_secs: u64,
    /// Key read from `key_file` by [`Config::load`].
    #[serde(skip)]
    pub key: Option<String>,
}

impl BotServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Read and trim the key file, if one is configured.
    pub fn load_key(&mut self) -> Result<(), ConfigError> {
        let Some(ref key_file) = self.key_file else {
            return Ok(());
        };
        let path = expand_home(key_file);
        let key = std::fs::read_to_string(&path).map_err(|source| ConfigError::KeyFile {
            path: path.display().to_string(),
            source,
        })?;
        self.key = Some(key.trim().to_string());
        Ok(())
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of the aggregated bot cloud, in seconds.
    #[serde(default = "default_bot_cloud_ttl")]
    pub bot_cloud_ttl_secs: u64,
}

impl CacheConfig {
    pub fn bot_cloud_ttl(&self) -> Duration {
        Duration::from_secs(self.bot_cloud_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            bot_cloud_ttl_secs: default_bot_cloud_ttl(),
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(rest);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: Config = toml::from_str("[server]\nname = \"cia.example\"\n").unwrap();
        assert_eq!(config.server.listen, default_listen());
        assert_eq!(config.database.path, "data/cia.db");
        assert_eq!(config.auth.user_header, "X-Remote-User");
        assert_eq!(config.auth.login_url, "/account/login/");
        assert_eq!(config.cache.bot_cloud_ttl(), Duration::from_secs(3600));
        assert!(config.bot_server.is_none());
    }

    #[test]
    fn test_load_reads_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("cia_key");
        std::fs::write(&key_path, "  s3cret\n").unwrap();

        let config_path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            "[server]\nname = \"cia.example\"\nlisten = \"0.0.0.0:9000\"\n\n\
             [bot_server]\nurl = \"http://localhost:3910\"\nkey_file = {:?}\ntimeout_secs = 3\n",
            key_path.display().to_string()
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.server.listen.port(), 9000);
        let bot_server = config.bot_server.unwrap();
        assert_eq!(bot_server.key.as_deref(), Some("s3cret"));
        assert_eq!(bot_server.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_missing_key_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            "[server]\nname = \"x\"\n[bot_server]\nurl = \"http://localhost:3910\"\nkey_file = \"/nonexistent/cia_key\"\n",
        )
        .unwrap();

        let err = Config::load(&config_path).unwrap_err();
        assert!(matches!(err, ConfigError::KeyFile { .. }));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/etc/cia_key"), PathBuf::from("/etc/cia_key"));
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(expand_home("~/.cia_key"), PathBuf::from(home).join(".cia_key"));
        }
    }
}
