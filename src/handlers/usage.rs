// Usage and app info handlers

use std::convert::Infallible;
use warp::{Rejection, Reply};

use crate::db::User;
use crate::models::{InfoResponse, UsageQuery};
use crate::state::AppState;

use super::error::reject;

/// GET /api/v1/usage?conversation_id=...
pub async fn usage_handler(query: UsageQuery, user: User, state: AppState) -> Result<impl Reply, Rejection> {
    let summary = state
        .chat
        .usage_summary(&user, query.conversation_id)
        .await
        .map_err(reject)?;

    Ok(warp::reply::json(&summary))
}

/// GET /api/v1/info
pub async fn info_handler(state: AppState) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&InfoResponse::from(state.config.as_ref())))
}
