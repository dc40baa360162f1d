//! Bot workflows: add, view, edit, release.

use std::borrow::Cow;

use tracing::{debug, info, warn};

use super::Accounts;
use super::forms::{AddBotInput, EditBotInput, validate_add_bot, validate_edit_bot};
use crate::botserver::BotSync;
use crate::db::{
    Asset, AssetKind, Bot, ChangesetRecord, META_RELEASED, Network, User, UserAsset,
};
use crate::error::{AccountError, AccountResult, FieldErrors};
use crate::metrics;
use crate::registry::{ClaimOutcome, NetworkSelection};

/// Where an add-bot request ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddBotOutcome {
    /// The user owns the bot.
    Claimed { user_asset: UserAsset, bot: Bot },
    /// Another user owns the bot. The caller should send the user to the
    /// conflict page rather than report an error.
    Conflict { bot_id: i64 },
}

impl AddBotOutcome {
    /// Page to send the user to next.
    pub fn redirect(&self) -> String {
        let kind = AssetKind::Bot.as_str();
        match self {
            AddBotOutcome::Claimed { user_asset, .. } => {
                format!("/account/{}/{}/", kind, user_asset.id)
            }
            AddBotOutcome::Conflict { bot_id } => format!("/account/conflict/{}/{}/", kind, bot_id),
        }
    }
}

/// An owned bot with everything its settings page shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotView {
    pub user_asset: UserAsset,
    pub bot: Bot,
    pub network: Network,
    /// Committed changesets, oldest first.
    pub history: Vec<ChangesetRecord>,
}

impl BotView {
    pub fn channel(&self) -> Cow<'_, str> {
        self.bot.channel()
    }

    pub fn host(&self) -> &str {
        self.network.host()
    }

    pub fn uri(&self) -> String {
        self.bot.uri(&self.network)
    }
}

impl Accounts {
    /// Register a bot on a channel and claim it for `user`.
    ///
    /// All input is validated before anything is written. A bot that already
    /// belongs to someone else is still resolved (and created, if new), but
    /// the result is [`AddBotOutcome::Conflict`].
    pub async fn add_bot(
        &self,
        user: &User,
        input: &AddBotInput,
        remote_addr: Option<String>,
    ) -> AccountResult<AddBotOutcome> {
        let form = validate_add_bot(input).map_err(AccountError::Validation)?;

        if let NetworkSelection::Existing(id) = form.network
            && self.db.networks().get(id).await?.is_none()
        {
            return Err(AccountError::invalid("network", "Select a network."));
        }

        let registry = self.registry();
        let network = registry.resolve_network(user, &form.network).await?;
        let (bot, created) = registry
            .resolve_bot(user, &network, &form.channel, remote_addr)
            .await?;
        let outcome = match registry.claim_asset(user, &bot).await? {
            ClaimOutcome::Claimed(user_asset) => AddBotOutcome::Claimed {
                user_asset,
                bot: bot.clone(),
            },
            ClaimOutcome::Conflict { asset } => AddBotOutcome::Conflict { bot_id: asset.id },
        };

        // A new bot has a creation changeset to push. The owner adding it
        // again pushes too, which repairs an earlier add whose sync failed.
        if created || matches!(outcome, AddBotOutcome::Claimed { .. }) {
            self.sync(&bot, &network).await?;
        }

        Ok(outcome)
    }

    /// The bot behind one of `user`'s assets.
    pub async fn bot_detail(&self, user: &User, user_asset_id: i64) -> AccountResult<BotView> {
        let (user_asset, bot, network) = self.owned_bot(user, user_asset_id).await?;
        let history = self.db.changesets().history(bot.asset_ref()).await?;
        Ok(BotView {
            user_asset,
            bot,
            network,
            history,
        })
    }

    /// Change a bot's filter settings and push them to the bot server.
    pub async fn edit_bot(
        &self,
        user: &User,
        user_asset_id: i64,
        input: &EditBotInput,
        remote_addr: Option<String>,
    ) -> AccountResult<BotView> {
        let (_, bot, _) = self.owned_bot(user, user_asset_id).await?;
        let settings = validate_edit_bot(input).map_err(AccountError::Validation)?;

        let mut cset = self
            .db
            .changesets()
            .begin(user.id, &bot)
            .with_remote_addr(remote_addr);
        cset.set_fields(settings.into_fields())?;
        match cset.finish().await? {
            Some(record) => {
                metrics::record_changeset(Bot::KIND.as_str());
                info!(bot = bot.id, user = %user.username, changes = record.changes.len(), "Bot settings changed");
            }
            None => debug!(bot = bot.id, "Bot settings unchanged"),
        }

        let view = self.bot_detail(user, user_asset_id).await?;
        self.sync(&view.bot, &view.network).await?;
        Ok(view)
    }

    /// Give up ownership of a bot. The bot itself stays registered.
    pub async fn release_bot(
        &self,
        user: &User,
        user_asset_id: i64,
        remote_addr: Option<String>,
    ) -> AccountResult<()> {
        let (user_asset, bot, _) = self.owned_bot(user, user_asset_id).await?;

        if !self.db.user_assets().release(user.id, user_asset.id).await? {
            return Err(AccountError::NotFound {
                kind: "user asset",
                id: user_asset_id,
            });
        }

        let mut cset = self
            .db
            .changesets()
            .begin(user.id, &bot)
            .with_remote_addr(remote_addr);
        cset.set_meta(META_RELEASED);
        cset.finish().await?;
        metrics::record_changeset(Bot::KIND.as_str());

        info!(bot = bot.id, user = %user.username, "Bot released");
        Ok(())
    }

    async fn owned_bot(&self, user: &User, user_asset_id: i64) -> AccountResult<(UserAsset, Bot, Network)> {
        let user_asset = self
            .db
            .user_assets()
            .get_for_user(user.id, user_asset_id)
            .await?
            .ok_or(AccountError::NotFound {
                kind: "user asset",
                id: user_asset_id,
            })?;

        let bot_id = match user_asset.asset.kind {
            AssetKind::Bot => user_asset.asset.id,
        };
        let bot = self
            .db
            .bots()
            .get(bot_id)
            .await?
            .ok_or(AccountError::NotFound { kind: "bot", id: bot_id })?;
        let network = self
            .db
            .networks()
            .get(bot.network_id)
            .await?
            .ok_or(AccountError::NotFound {
                kind: "network",
                id: bot.network_id,
            })?;

        Ok((user_asset, bot, network))
    }

    /// Push a bot's current configuration to the bot server, if there is one.
    async fn sync(&self, bot: &Bot, network: &Network) -> AccountResult<()> {
        let Some(ref bot_server) = self.bot_server else {
            debug!(bot = bot.id, "No bot server configured, skipping sync");
            return Ok(());
        };

        let ruleset = bot.effective_ruleset().map_err(|e| {
            let mut errors = FieldErrors::new();
            errors.add("custom_ruleset", e.to_string());
            AccountError::Validation(errors)
        })?;
        let sync = BotSync {
            bot_id: bot.id,
            uri: bot.uri(network),
            ruleset: ruleset.to_string(),
            show_project_names: bot.show_project_names,
        };

        if let Err(e) = bot_server.sync_bot(&sync).await {
            warn!(bot = bot.id, error = %e, "Bot sync failed");
            metrics::record_bot_server_error("sync_bot", e.error_code());
            return Err(e.into());
        }
        debug!(bot = bot.id, uri = %sync.uri, "Bot synced");
        Ok(())
    }
}
