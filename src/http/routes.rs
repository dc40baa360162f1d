//! Route handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect};
use serde_json::{Value, json};

use super::{AppState, ClientAddr, CurrentUser};
use crate::accounts::{AddBotInput, BotView, EditBotInput};
use crate::cloud::BotCloudMap;
use crate::error::AccountResult;

fn bot_json(view: &BotView) -> Value {
    json!({
        "user_asset_id": view.user_asset.id,
        "bot_id": view.bot.id,
        "network": view.network.description,
        "host": view.host(),
        "channel": view.channel(),
        "uri": view.uri(),
        "filter_mode": view.bot.filter_mode.code(),
        "filter_mode_label": view.bot.filter_mode.label(),
        "project_list": view.bot.project_list,
        "custom_ruleset": view.bot.custom_ruleset,
        "show_project_names": view.bot.show_project_names,
        "history": view.history.iter().map(|cset| json!({
            "id": cset.id,
            "user_id": cset.user_id,
            "created_at": cset.created_at,
            "changes": cset.changes.iter().map(|c| json!({
                "item": c.item,
                "old": c.old_value,
                "new": c.new_value,
            })).collect::<Vec<_>>(),
        })).collect::<Vec<_>>(),
    })
}

/// GET /account/networks
pub async fn list_networks(State(state): State<Arc<AppState>>, _user: CurrentUser) -> AccountResult<Json<Value>> {
    let networks = state.accounts.list_networks().await?;
    Ok(Json(Value::Array(
        networks
            .iter()
            .map(|n| {
                json!({
                    "id": n.id,
                    "uri": n.uri,
                    "host": n.host(),
                    "description": n.description,
                    "is_popular": n.is_popular,
                })
            })
            .collect(),
    )))
}

/// POST /account/bots
pub async fn add_bot(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientAddr(addr): ClientAddr,
    Json(input): Json<AddBotInput>,
) -> AccountResult<Redirect> {
    let outcome = state.accounts.add_bot(&user, &input, addr).await?;
    Ok(Redirect::to(&outcome.redirect()))
}

/// GET /account/bot/:id
pub async fn bot_detail(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AccountResult<Json<Value>> {
    let view = state.accounts.bot_detail(&user, id).await?;
    Ok(Json(bot_json(&view)))
}

/// POST /account/bot/:id
pub async fn edit_bot(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientAddr(addr): ClientAddr,
    Path(id): Path<i64>,
    Json(input): Json<EditBotInput>,
) -> AccountResult<Json<Value>> {
    let view = state.accounts.edit_bot(&user, id, &input, addr).await?;
    Ok(Json(bot_json(&view)))
}

/// DELETE /account/bot/:id
pub async fn release_bot(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientAddr(addr): ClientAddr,
    Path(id): Path<i64>,
) -> AccountResult<StatusCode> {
    state.accounts.release_bot(&user, id, addr).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /account/bots/cloud
pub async fn bot_cloud(State(state): State<Arc<AppState>>, _user: CurrentUser) -> AccountResult<Json<BotCloudMap>> {
    Ok(Json(state.accounts.bot_cloud().await?))
}

/// GET /metrics
pub async fn metrics() -> impl IntoResponse {
    crate::metrics::gather_metrics()
}
