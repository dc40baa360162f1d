//! Scriptable stand-in for the remote bot server.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cia_accounts::botserver::{BotRequest, BotServer, BotServerError, BotSync};

#[derive(Default)]
pub struct MockBotServer {
    requests: Mutex<Vec<BotRequest>>,
    synced: Mutex<Vec<BotSync>>,
    fetches: AtomicUsize,
    failing: AtomicBool,
    /// Delay before answering `all_request_info`.
    delay: Option<Duration>,
}

#[allow(dead_code)]
impl MockBotServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn serve(&self, server: &str, channel: &str, user_count: Option<u32>) {
        self.requests.lock().unwrap().push(BotRequest {
            server: server.to_string(),
            channel: channel.to_string(),
            user_count,
            extra: Default::default(),
        });
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn synced(&self) -> Vec<BotSync> {
        self.synced.lock().unwrap().clone()
    }
}

#[async_trait]
impl BotServer for MockBotServer {
    async fn all_request_info(&self) -> Result<Vec<BotRequest>, BotServerError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(BotServerError::Timeout(Duration::from_secs(10)));
        }
        Ok(self.requests.lock().unwrap().clone())
    }

    async fn sync_bot(&self, bot: &BotSync) -> Result<(), BotServerError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BotServerError::Status(500));
        }
        self.synced.lock().unwrap().push(bot.clone());
        Ok(())
    }
}
