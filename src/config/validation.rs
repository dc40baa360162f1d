//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("auth.user_header is not a valid HTTP header name: '{0}'")]
    InvalidUserHeader(String),
    #[error("auth.login_url must be an absolute path or URL, got '{0}'")]
    InvalidLoginUrl(String),
    #[error("bot_server.url must start with http:// or https://, got '{0}'")]
    InvalidBotServerUrl(String),
    #[error("bot_server.timeout_secs must be greater than zero")]
    ZeroBotServerTimeout,
    #[error("cache.bot_cloud_ttl_secs must be greater than zero")]
    ZeroCacheTtl,
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.trim().is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    if axum::http::HeaderName::from_bytes(config.auth.user_header.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidUserHeader(
            config.auth.user_header.clone(),
        ));
    }
    let login = &config.auth.login_url;
    if !(login.starts_with('/') || login.starts_with("http://") || login.starts_with("https://")) {
        errors.push(ValidationError::InvalidLoginUrl(login.clone()));
    }

    if let Some(ref bot_server) = config.bot_server {
        if !(bot_server.url.starts_with("http://") || bot_server.url.starts_with("https://")) {
            errors.push(ValidationError::InvalidBotServerUrl(bot_server.url.clone()));
        }
        if bot_server.timeout_secs == 0 {
            errors.push(ValidationError::ZeroBotServerTimeout);
        }
    }

    if config.cache.bot_cloud_ttl_secs == 0 {
        errors.push(ValidationError::ZeroCacheTtl);
    }

    // Database path validation
    if config.database.path != ":memory:" {
        let db_path = Path::new(&config.database.path);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::DatabasePathInvalid(
                config.database.path.clone(),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Config {
        toml::from_str(toml_src).unwrap()
    }

    #[test]
    fn test_valid_config() {
        let config = parse(
            "[server]\nname = \"cia.example\"\n[database]\npath = \":memory:\"\n\
             [bot_server]\nurl = \"http://localhost:3910\"\n",
        );
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let config = parse(
            "[server]\nname = \"\"\n[auth]\nuser_header = \"bad header\"\nlogin_url = \"login\"\n\
             [database]\npath = \"/nonexistent/dir/cia.db\"\n\
             [bot_server]\nurl = \"localhost:3910\"\ntimeout_secs = 0\n\
             [cache]\nbot_cloud_ttl_secs = 0\n",
        );
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 7);
        assert!(matches!(errors[0], ValidationError::MissingServerName));
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ValidationError::InvalidBotServerUrl(_)))
        );
    }
}
