//! cia-accounts - CIA account management service.

use std::sync::Arc;

use cia_accounts::accounts::Accounts;
use cia_accounts::config::{self, Config};
use cia_accounts::db::Database;
use cia_accounts::http::{self, AppState};
use cia_accounts::metrics;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "{} configuration error(s) in {}",
            errors.len(),
            config_path
        ));
    }

    info!(
        server = %config.server.name,
        listen = %config.server.listen,
        "Starting cia-accounts"
    );

    metrics::init();

    let db = Database::new(&config.database.path).await?;

    match config.bot_server {
        Some(ref bot_server) => {
            if bot_server.key.is_none() {
                warn!(url = %bot_server.url, "Bot server configured without a key file");
            }
            info!(url = %bot_server.url, "Bot server configured");
        }
        None => warn!("No bot server configured: bot changes will not be pushed and the bot cloud is disabled"),
    }

    let state = Arc::new(AppState {
        accounts: Accounts::from_config(&config, db),
        auth: config.auth.clone(),
    });

    http::serve(config.server.listen, state).await?;
    Ok(())
}
