//! Client for the remote bot server.
//!
//! The bot server runs the IRC bots. We ask it for the requests it is
//! currently serving (for the bot cloud) and push bot configuration to it
//! whenever a bot's changeset is committed.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::BotServerConfig;

/// Header carrying the shared RPC key.
pub const KEY_HEADER: &str = "X-CIA-Key";

/// Errors talking to the bot server.
#[derive(Debug, Error)]
pub enum BotServerError {
    #[error("bot server request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("bot server did not answer within {0:?}")]
    Timeout(Duration),
    #[error("bot server returned HTTP {0}")]
    Status(u16),
    #[error("invalid bot server response: {0}")]
    Decode(String),
    #[error("bot server error: {0}")]
    Remote(String),
}

impl BotServerError {
    /// Static label for metrics.
    pub fn error_code(&self) -> &'static str {
        match self {
            BotServerError::Request(_) => "request",
            BotServerError::Timeout(_) => "timeout",
            BotServerError::Status(_) => "status",
            BotServerError::Decode(_) => "decode",
            BotServerError::Remote(_) => "remote",
        }
    }
}

/// One request (bot, channel) the bot server is serving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotRequest {
    /// IRC server the bot is connected to.
    pub server: String,
    #[serde(default)]
    pub channel: String,
    /// Users in the channel, if the bot has joined it.
    #[serde(default)]
    pub user_count: Option<u32>,
    /// Anything else the bot server reports, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Bot state pushed to the bot server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BotSync {
    pub bot_id: i64,
    /// `irc://host/location`.
    pub uri: String,
    /// Canonical ruleset text the bot filters with.
    pub ruleset: String,
    pub show_project_names: bool,
}

/// Operations the account layer needs from the bot server.
#[async_trait]
pub trait BotServer: Send + Sync {
    /// Every request the bot server is serving, across all IRC servers.
    async fn all_request_info(&self) -> Result<Vec<BotRequest>, BotServerError>;

    /// Push one bot's configuration.
    async fn sync_bot(&self, bot: &BotSync) -> Result<(), BotServerError>;
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

/// JSON-over-HTTP bot server client.
pub struct HttpBotServer {
    url: String,
    key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpBotServer {
    pub fn new(config: &BotServerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("cia-accounts/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            url: config.url.clone(),
            key: config.key.clone(),
            timeout: config.timeout(),
            client,
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, BotServerError> {
        let mut request = self
            .client
            .post(&self.url)
            .json(&json!({ "method": method, "params": params }));
        if let Some(ref key) = self.key {
            request = request.header(KEY_HEADER, key.as_str());
        }

        let response = match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) if e.is_timeout() => return Err(BotServerError::Timeout(self.timeout)),
            Ok(Err(e)) => return Err(BotServerError::Request(e)),
            Err(_) => return Err(BotServerError::Timeout(self.timeout)),
        };

        let status = response.status();
        if !status.is_success() {
            warn!(method, status = status.as_u16(), "Bot server call failed");
            return Err(BotServerError::Status(status.as_u16()));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| BotServerError::Decode(e.to_string()))?;
        if let Some(error) = body.error {
            return Err(BotServerError::Remote(error));
        }

        debug!(method, "Bot server call succeeded");
        serde_json::from_value(body.result).map_err(|e| BotServerError::Decode(e.to_string()))
    }
}

#[async_trait]
impl BotServer for HttpBotServer {
    async fn all_request_info(&self) -> Result<Vec<BotRequest>, BotServerError> {
        self.call("getAllRequestInfo", Value::Array(Vec::new())).await
    }

    async fn sync_bot(&self, bot: &BotSync) -> Result<(), BotServerError> {
        let params = serde_json::to_value(bot).map_err(|e| BotServerError::Decode(e.to_string()))?;
        let _: Value = self.call("syncBot", params).await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-process bot server that records syncs and serves canned requests.
    #[derive(Default)]
    pub struct MockBotServer {
        pub requests: Vec<BotRequest>,
        pub fail: bool,
        pub fetches: AtomicUsize,
        pub synced: Mutex<Vec<BotSync>>,
    }

    impl MockBotServer {
        pub fn with_requests(requests: Vec<BotRequest>) -> Self {
            Self {
                requests,
                ..Self::default()
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn synced(&self) -> Vec<BotSync> {
            self.synced.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BotServer for MockBotServer {
        async fn all_request_info(&self) -> Result<Vec<BotRequest>, BotServerError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(BotServerError::Status(503));
            }
            Ok(self.requests.clone())
        }

        async fn sync_bot(&self, bot: &BotSync) -> Result<(), BotServerError> {
            if self.fail {
                return Err(BotServerError::Status(503));
            }
            self.synced.lock().unwrap().push(bot.clone());
            Ok(())
        }
    }

    pub fn request(server: &str, channel: &str, user_count: Option<u32>) -> BotRequest {
        BotRequest {
            server: server.to_string(),
            channel: channel.to_string(),
            user_count,
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;

    #[test]
    fn test_bot_request_keeps_extra_fields() {
        let raw = r##"{"server": "irc.example.org", "channel": "#cia", "user_count": null, "nick": "CIA-1"}"##;
        let request: BotRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.user_count, None);
        assert_eq!(request.extra.get("nick"), Some(&json!("CIA-1")));

        let back = serde_json::to_value(&request).unwrap();
        assert_eq!(back["nick"], "CIA-1");
    }

    async fn rpc(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        if headers.get(KEY_HEADER).and_then(|v| v.to_str().ok()) != Some("s3cret") {
            return (StatusCode::FORBIDDEN, Json(Value::Null));
        }
        let result = match body["method"].as_str() {
            Some("getAllRequestInfo") => json!({
                "result": [{"server": "irc.example.org", "channel": "#cia", "user_count": 12}]
            }),
            Some("syncBot") if body["params"]["bot_id"] == 7 => json!({ "result": true }),
            _ => json!({ "error": "no such method" }),
        };
        (StatusCode::OK, Json(result))
    }

    async fn spawn_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = axum::Router::new().route("/rpc", post(rpc));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/rpc", addr)
    }

    fn client(url: String, key: Option<&str>) -> HttpBotServer {
        HttpBotServer::new(&BotServerConfig {
            url,
            key_file: None,
            timeout_secs: 5,
            key: key.map(String::from),
        })
    }

    #[tokio::test]
    async fn test_http_round_trip() {
        let url = spawn_server().await;
        let server = client(url, Some("s3cret"));

        let requests = server.all_request_info().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].user_count, Some(12));

        let sync = BotSync {
            bot_id: 7,
            uri: "irc://irc.example.org/cia".to_string(),
            ruleset: "all".to_string(),
            show_project_names: false,
        };
        server.sync_bot(&sync).await.unwrap();

        let unknown = BotSync { bot_id: 8, ..sync };
        assert!(matches!(
            server.sync_bot(&unknown).await,
            Err(BotServerError::Remote(_))
        ));
    }

    #[tokio::test]
    async fn test_http_rejects_missing_key() {
        let url = spawn_server().await;
        let server = client(url, None);
        let err = server.all_request_info().await.unwrap_err();
        assert!(matches!(err, BotServerError::Status(403)));
        assert_eq!(err.error_code(), "status");
    }
}
