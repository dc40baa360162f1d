//! Spawn the HTTP service against an in-memory database.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cia_accounts::accounts::Accounts;
use cia_accounts::botserver::BotServer;
use cia_accounts::cache::MemoryCache;
use cia_accounts::cloud::BotCloudMap;
use cia_accounts::config::AuthConfig;
use cia_accounts::db::Database;
use cia_accounts::http::{AppState, router};

use super::MockBotServer;

pub const USER_HEADER: &str = "X-Remote-User";

pub struct TestServer {
    pub addr: SocketAddr,
    pub bot_server: Arc<MockBotServer>,
    client: reqwest::Client,
}

#[allow(dead_code)]
impl TestServer {
    pub async fn spawn() -> anyhow::Result<Self> {
        let db = Database::new(":memory:").await?;
        let bot_server = Arc::new(MockBotServer::new());
        let accounts = Accounts::new(
            db,
            Some(bot_server.clone() as Arc<dyn BotServer>),
            Arc::new(MemoryCache::<BotCloudMap>::new()),
            Duration::from_secs(3600),
        );
        let state = Arc::new(AppState {
            accounts,
            auth: AuthConfig {
                user_header: USER_HEADER.to_string(),
                login_url: "/account/login/".to_string(),
            },
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("test server stopped: {}", e);
            }
        });

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            addr,
            bot_server,
            client,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// A request builder authenticated as `user`.
    pub fn as_user(&self, method: reqwest::Method, path: &str, user: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header(USER_HEADER, user)
    }

    pub fn anonymous(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client.request(method, self.url(path))
    }
}
