//! Asset registry: resolves networks and bots, and hands out ownership.
//!
//! Every lookup here is a get-or-create backed by the database's unique
//! constraints, so concurrent requests for the same network or bot converge
//! on a single row.

use tracing::{info, warn};

use crate::channel::normalize_channel_to_location;
use crate::db::{
    Asset, AssetRef, Bot, BotRepository, Claim, Database, DbError, FieldValue, META_CREATED, Network,
    User, UserAsset,
};
use crate::error::{AccountError, AccountResult};
use crate::metrics;

/// Which network an add-bot request names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkSelection {
    /// A network from the list.
    Existing(i64),
    /// A network typed in by the user.
    Other {
        /// `host[:port]`.
        server: String,
        /// Display name, used only if the network is new.
        description: String,
    },
}

/// Result of claiming an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed(UserAsset),
    /// Another user owns the asset.
    Conflict { asset: AssetRef },
}

/// Get-or-create access to networks, bots and ownership links.
pub struct AssetRegistry<'a> {
    db: &'a Database,
}

impl<'a> AssetRegistry<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Look up a listed network, or get-or-create one from a server name.
    pub async fn resolve_network(&self, user: &User, selection: &NetworkSelection) -> AccountResult<Network> {
        match selection {
            NetworkSelection::Existing(id) => self
                .db
                .networks()
                .get(*id)
                .await?
                .ok_or(AccountError::NotFound {
                    kind: "network",
                    id: *id,
                }),
            NetworkSelection::Other {
                server,
                description,
            } => {
                let uri = Network::uri_for(server);
                let (network, created) = self
                    .db
                    .networks()
                    .get_or_create(&uri, description, Some(user.id))
                    .await?;
                if created {
                    info!(network = %network.uri, user = %user.username, "Network created");
                    metrics::record_network_created();
                }
                Ok(network)
            }
        }
    }

    /// Get-or-create the bot for a channel given in either spelling.
    ///
    /// A new bot and its creation changeset (recording network and location)
    /// commit together, so a bot never exists without its `_created` record.
    /// Returns the bot and whether this call created it.
    pub async fn resolve_bot(
        &self,
        user: &User,
        network: &Network,
        channel: &str,
        remote_addr: Option<String>,
    ) -> AccountResult<(Bot, bool)> {
        let location = normalize_channel_to_location(channel);
        let mut tx = self.db.begin().await?;
        let (bot, created) = BotRepository::get_or_create_in(&mut *tx, network.id, location).await?;

        if created {
            let mut cset = self
                .db
                .changesets()
                .begin(user.id, &bot)
                .with_remote_addr(remote_addr);
            cset.set_meta(META_CREATED);
            cset.set_fields([
                ("network_id", FieldValue::Int(network.id)),
                ("location", FieldValue::from(location)),
            ])?;
            cset.finish_in(&mut *tx).await?;
        }
        tx.commit().await.map_err(DbError::from)?;

        if created {
            metrics::record_changeset(Bot::KIND.as_str());
            metrics::record_bot_created();
            info!(bot = bot.id, uri = %bot.uri(network), user = %user.username, "Bot created");
        }

        Ok((bot, created))
    }

    /// Make `user` the owner of `bot` unless someone else already is.
    pub async fn claim_asset(&self, user: &User, bot: &Bot) -> AccountResult<ClaimOutcome> {
        let asset = bot.asset_ref();
        match self.db.user_assets().claim(user.id, asset).await? {
            Claim::Owned { user_asset, created } => {
                if created {
                    info!(bot = bot.id, user = %user.username, user_asset = user_asset.id, "Bot claimed");
                }
                Ok(ClaimOutcome::Claimed(user_asset))
            }
            Claim::Conflict { owner_id } => {
                warn!(bot = bot.id, user = %user.username, owner = owner_id, "Bot already owned by another user");
                metrics::record_conflict();
                Ok(ClaimOutcome::Conflict { asset })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::AssetKind;

    async fn setup() -> (Database, User, User) {
        let db = Database::new(":memory:").await.unwrap();
        let (alice, _) = db.users().get_or_create("alice").await.unwrap();
        let (bob, _) = db.users().get_or_create("bob").await.unwrap();
        (db, alice, bob)
    }

    fn other(server: &str, description: &str) -> NetworkSelection {
        NetworkSelection::Other {
            server: server.to_string(),
            description: description.to_string(),
        }
    }

    #[tokio::test]
    async fn test_resolve_network_converges() {
        let (db, alice, bob) = setup().await;
        let registry = AssetRegistry::new(&db);

        let first = registry
            .resolve_network(&alice, &other("irc.example.org", "Example"))
            .await
            .unwrap();
        assert_eq!(first.uri, "irc://irc.example.org/");
        assert_eq!(first.created_by, Some(alice.id));

        let second = registry
            .resolve_network(&bob, &other("IRC.EXAMPLE.ORG", "Shouting"))
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(db.networks().count().await.unwrap(), 1);

        let by_id = registry
            .resolve_network(&bob, &NetworkSelection::Existing(first.id))
            .await
            .unwrap();
        assert_eq!(by_id, first);

        let missing = registry
            .resolve_network(&bob, &NetworkSelection::Existing(999))
            .await
            .unwrap_err();
        assert!(matches!(missing, AccountError::NotFound { kind: "network", id: 999 }));
    }

    #[tokio::test]
    async fn test_resolve_bot_any_spelling() {
        let (db, alice, _) = setup().await;
        let registry = AssetRegistry::new(&db);
        let network = registry
            .resolve_network(&alice, &other("irc.example.org", "Example"))
            .await
            .unwrap();

        let (bot, created) = registry.resolve_bot(&alice, &network, "#CIA", None).await.unwrap();
        assert!(created);
        assert_eq!(bot.location, "CIA");

        let (again, created) = registry.resolve_bot(&alice, &network, "cia", None).await.unwrap();
        assert!(!created);
        assert_eq!(again.id, bot.id);

        // Only the creation is in the ledger.
        let history = db.changesets().history(bot.asset_ref()).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].has_meta(META_CREATED));
        assert_eq!(
            history[0].change("location").and_then(|c| c.new_value.as_deref()),
            Some("CIA")
        );

        let (double, created) = registry.resolve_bot(&alice, &network, "##cia", None).await.unwrap();
        assert!(created);
        assert_eq!(double.location, "##cia");
    }

    #[tokio::test]
    async fn test_failed_creation_record_rolls_back_bot() {
        let (db, alice, _) = setup().await;
        let registry = AssetRegistry::new(&db);
        let network = registry
            .resolve_network(&alice, &other("irc.example.org", "Example"))
            .await
            .unwrap();

        sqlx::query(
            "CREATE TRIGGER reject_changesets BEFORE INSERT ON asset_changesets \
             BEGIN SELECT RAISE(ABORT, 'ledger offline'); END",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let err = registry.resolve_bot(&alice, &network, "#cia", None).await.unwrap_err();
        assert_eq!(err.error_code(), "database");
        assert!(db.bots().find(network.id, "cia").await.unwrap().is_none());

        sqlx::query("DROP TRIGGER reject_changesets")
            .execute(db.pool())
            .await
            .unwrap();

        // The retry creates the bot, and this time its creation is recorded.
        let (bot, created) = registry.resolve_bot(&alice, &network, "#cia", None).await.unwrap();
        assert!(created);
        let history = db.changesets().history(bot.asset_ref()).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].has_meta(META_CREATED));
    }

    #[tokio::test]
    async fn test_second_claim_conflicts() {
        let (db, alice, bob) = setup().await;
        let registry = AssetRegistry::new(&db);
        let network = registry
            .resolve_network(&alice, &other("irc.example.org", "Example"))
            .await
            .unwrap();
        let (bot, _) = registry.resolve_bot(&alice, &network, "cia", None).await.unwrap();

        let ClaimOutcome::Claimed(ua) = registry.claim_asset(&alice, &bot).await.unwrap() else {
            panic!("first claim should succeed");
        };
        assert_eq!(ua.user_id, alice.id);

        let outcome = registry.claim_asset(&bob, &bot).await.unwrap();
        assert_eq!(
            outcome,
            ClaimOutcome::Conflict {
                asset: AssetRef::new(AssetKind::Bot, bot.id)
            }
        );
        assert!(db.user_assets().list_for_user(bob.id).await.unwrap().is_empty());
    }
}
