//! The bot cloud: every request the bot server is serving, grouped by IRC
//! server and weighted by channel size for display.
//!
//! The aggregate is expensive to fetch, so it lives in the cache under
//! [`BOT_CLOUD_KEY`]. A reader that finds the key empty first stores an empty
//! placeholder, then fetches and replaces it. Readers arriving while the fill
//! is in flight get the placeholder instead of starting their own fetch. This
//! is a best-effort guard, not a lock: another process with its own cache
//! may fill concurrently, and the last write wins.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::botserver::{BotRequest, BotServer, BotServerError};
use crate::cache::Cache;
use crate::metrics;

/// Cache key for the aggregate.
pub const BOT_CLOUD_KEY: &str = "cia.bot_cloud";

/// Smallest display size, so empty channels stay visible.
const MIN_SIZE: f64 = 0.5;

/// A request annotated with its display size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudEntry {
    #[serde(flatten)]
    pub request: BotRequest,
    pub size: f64,
}

/// All requests served through one IRC server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRequestGroup {
    pub name: String,
    pub num_requests: usize,
    pub requests: Vec<CloudEntry>,
}

/// Groups keyed by server name.
pub type BotCloudMap = BTreeMap<String, ServerRequestGroup>;

/// `max(0.5, ln(2 + users) / ln(20))`. A channel of 18 users has size 1.
pub fn display_size(user_count: Option<u32>) -> f64 {
    let scale = 1.0 / 20f64.ln();
    ((2.0 + f64::from(user_count.unwrap_or(0))).ln() * scale).max(MIN_SIZE)
}

/// Group requests by server, keeping the bot server's order within a group.
pub fn group_requests(requests: Vec<BotRequest>) -> BotCloudMap {
    let mut groups = BotCloudMap::new();
    for request in requests {
        let group = groups
            .entry(request.server.clone())
            .or_insert_with(|| ServerRequestGroup {
                name: request.server.clone(),
                num_requests: 0,
                requests: Vec::new(),
            });
        group.num_requests += 1;
        group.requests.push(CloudEntry {
            size: display_size(request.user_count),
            request,
        });
    }
    groups
}

/// Cached view of the bot server's requests.
pub struct BotCloud {
    cache: Arc<dyn Cache<BotCloudMap>>,
    bot_server: Arc<dyn BotServer>,
    ttl: Duration,
}

impl BotCloud {
    pub fn new(cache: Arc<dyn Cache<BotCloudMap>>, bot_server: Arc<dyn BotServer>, ttl: Duration) -> Self {
        Self {
            cache,
            bot_server,
            ttl,
        }
    }

    /// Current aggregate, fetching it if the cache holds nothing.
    ///
    /// A failed fetch is returned to the caller and leaves the placeholder
    /// in place until it expires.
    pub async fn get(&self) -> Result<BotCloudMap, BotServerError> {
        if let Some(cloud) = self.cache.get(BOT_CLOUD_KEY) {
            metrics::record_cloud_lookup("hit");
            return Ok(cloud);
        }

        if !self.cache.add(BOT_CLOUD_KEY, BotCloudMap::new(), self.ttl) {
            // Someone else is filling.
            metrics::record_cloud_lookup("placeholder");
            debug!("Bot cloud fill in progress, serving placeholder");
            return Ok(self.cache.get(BOT_CLOUD_KEY).unwrap_or_default());
        }

        metrics::record_cloud_lookup("fill");
        let requests = match self.bot_server.all_request_info().await {
            Ok(requests) => requests,
            Err(e) => {
                warn!(error = %e, "Bot cloud fetch failed");
                metrics::record_bot_server_error("all_request_info", e.error_code());
                return Err(e);
            }
        };

        let cloud = group_requests(requests);
        info!(
            servers = cloud.len(),
            requests = cloud.values().map(|g| g.num_requests).sum::<usize>(),
            "Bot cloud refreshed"
        );
        self.cache.set(BOT_CLOUD_KEY, cloud.clone(), self.ttl);
        Ok(cloud)
    }
}
