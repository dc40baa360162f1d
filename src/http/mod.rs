//! HTTP surface for the account service.
//!
//! JSON in and out. HTML rendering is left to whatever sits in front.

mod auth;
mod routes;

pub use auth::{ClientAddr, CurrentUser};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::accounts::Accounts;
use crate::config::AuthConfig;
use crate::error::AccountError;

/// State shared by all handlers.
pub struct AppState {
    pub accounts: Accounts,
    pub auth: AuthConfig,
}

/// Build the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/account/networks", get(routes::list_networks))
        .route("/account/bots", axum::routing::post(routes::add_bot))
        .route(
            "/account/bot/:id",
            get(routes::bot_detail)
                .post(routes::edit_bot)
                .delete(routes::release_bot),
        )
        .route("/account/bots/cloud", get(routes::bot_cloud))
        .route("/metrics", get(routes::metrics))
        .with_state(state)
}

/// Serve until the listener fails.
pub async fn serve(listen: SocketAddr, state: Arc<AppState>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(&listen).await?;
    tracing::info!(addr = %listen, "HTTP server listening");
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        crate::metrics::record_account_error(self.error_code());

        let status = match &self {
            AccountError::Validation(_) => StatusCode::BAD_REQUEST,
            AccountError::NotFound { .. } => StatusCode::NOT_FOUND,
            AccountError::Transport(_) => StatusCode::BAD_GATEWAY,
            AccountError::BotServerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AccountError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = match self {
            AccountError::Validation(errors) => json!({ "error": "validation", "fields": errors }),
            // Internals stay in the log.
            AccountError::Database(_) => json!({ "error": "database" }),
            other => json!({ "error": other.error_code(), "message": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
