//! Account workflows.
//!
//! [`Accounts`] ties the registry, the changeset ledger, the bot server and
//! the bot cloud together. Each public method is one user-facing action and
//! assumes the caller has already authenticated the user.

mod bots;
pub mod forms;

pub use bots::{AddBotOutcome, BotView};
pub use forms::{AddBotInput, EditBotInput, OTHER_NETWORK};

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::botserver::{BotServer, HttpBotServer};
use crate::cache::{Cache, MemoryCache};
use crate::cloud::{BotCloud, BotCloudMap};
use crate::config::Config;
use crate::db::{Database, Network, User};
use crate::error::{AccountError, AccountResult};
use crate::registry::AssetRegistry;

/// The account service.
pub struct Accounts {
    db: Database,
    bot_server: Option<Arc<dyn BotServer>>,
    cloud: Option<BotCloud>,
}

impl Accounts {
    /// Without a bot server, changes are stored but not pushed and the bot
    /// cloud is unavailable.
    pub fn new(
        db: Database,
        bot_server: Option<Arc<dyn BotServer>>,
        cache: Arc<dyn Cache<BotCloudMap>>,
        cloud_ttl: Duration,
    ) -> Self {
        let cloud = bot_server
            .clone()
            .map(|server| BotCloud::new(cache, server, cloud_ttl));
        Self {
            db,
            bot_server,
            cloud,
        }
    }

    /// Build the service from startup configuration.
    pub fn from_config(config: &Config, db: Database) -> Self {
        let bot_server = config
            .bot_server
            .as_ref()
            .map(|c| Arc::new(HttpBotServer::new(c)) as Arc<dyn BotServer>);
        Self::new(
            db,
            bot_server,
            Arc::new(MemoryCache::<BotCloudMap>::new()),
            config.cache.bot_cloud_ttl(),
        )
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn registry(&self) -> AssetRegistry<'_> {
        AssetRegistry::new(&self.db)
    }

    /// The user row for an authenticated username, created on first visit.
    pub async fn current_user(&self, username: &str) -> AccountResult<User> {
        let (user, created) = self.db.users().get_or_create(username).await?;
        if created {
            debug!(user = %user.username, "First visit, user created");
        }
        Ok(user)
    }

    /// Networks to choose from, popular first. The built-in list is
    /// imported the first time the table is found empty.
    pub async fn list_networks(&self) -> AccountResult<Vec<Network>> {
        let networks = self.db.networks().list().await?;
        if !networks.is_empty() {
            return Ok(networks);
        }
        self.db.networks().import_defaults().await?;
        Ok(self.db.networks().list().await?)
    }

    /// Requests the bot server is serving, grouped by IRC server.
    pub async fn bot_cloud(&self) -> AccountResult<BotCloudMap> {
        let cloud = self.cloud.as_ref().ok_or(AccountError::BotServerUnavailable)?;
        Ok(cloud.get().await?)
    }
}
