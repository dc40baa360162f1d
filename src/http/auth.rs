//! Request identity.
//!
//! Authentication happens in the fronting proxy, which passes the logged-in
//! username in a trusted header. Requests without it are sent to the login
//! page.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};

use super::AppState;
use crate::db::User;

/// The authenticated user making the request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let username = parts
            .headers
            .get(state.auth.user_header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|name| !name.is_empty());

        let Some(username) = username else {
            return Err(Redirect::to(&state.auth.login_url).into_response());
        };

        state
            .accounts
            .current_user(username)
            .await
            .map(CurrentUser)
            .map_err(IntoResponse::into_response)
    }
}

/// Client address for the changeset ledger: the first `X-Forwarded-For`
/// hop, else the peer address.
#[derive(Debug, Clone, Default)]
pub struct ClientAddr(pub Option<String>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ClientAddr {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from);

        let addr = forwarded.or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });
        Ok(ClientAddr(addr))
    }
}
