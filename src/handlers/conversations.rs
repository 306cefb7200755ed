// Conversation handlers

use uuid::Uuid;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

use crate::db::User;
use crate::models::{DeletedResponse, ListConversationsQuery, UpdateConversationRequest};
use crate::state::AppState;

use super::error::{reject, ApiError};

/// GET /api/v1/conversations?saved=true|false
pub async fn list_conversations_handler(
    query: ListConversationsQuery,
    user: User,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let saved_only = query.saved.unwrap_or(false);
    let conversations = state
        .chat
        .list_conversations(&user, saved_only)
        .await
        .map_err(reject)?;

    Ok(warp::reply::json(&conversations))
}

/// POST /api/v1/conversations
pub async fn create_conversation_handler(user: User, state: AppState) -> Result<impl Reply, Rejection> {
    let conversation = state.chat.new_conversation(&user).await.map_err(reject)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&conversation),
        StatusCode::CREATED,
    ))
}

/// GET /api/v1/conversations/{id}
pub async fn get_conversation_handler(
    conversation_id: Uuid,
    user: User,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let view = state
        .chat
        .load_conversation(&user, conversation_id)
        .await
        .map_err(reject)?;

    Ok(warp::reply::json(&view))
}

/// PATCH /api/v1/conversations/{id}
///
/// Accepts a new title, a saved flag, or both.
pub async fn update_conversation_handler(
    conversation_id: Uuid,
    request: UpdateConversationRequest,
    user: User,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    if request.title.is_none() && request.is_saved.is_none() {
        return Err(reject(ApiError::BadRequest(
            "Nothing to update: provide title or is_saved".to_string(),
        )));
    }

    let mut conversation = None;
    if let Some(title) = &request.title {
        conversation = Some(
            state
                .chat
                .rename(&user, conversation_id, title)
                .await
                .map_err(reject)?,
        );
    }
    if let Some(is_saved) = request.is_saved {
        conversation = Some(
            state
                .chat
                .set_saved(&user, conversation_id, is_saved)
                .await
                .map_err(reject)?,
        );
    }

    tracing::info!(
        user_id = %user.id,
        %conversation_id,
        title = ?request.title,
        is_saved = ?request.is_saved,
        "Updated conversation"
    );
    Ok(warp::reply::json(&conversation))
}

/// DELETE /api/v1/conversations/{id}
pub async fn delete_conversation_handler(
    conversation_id: Uuid,
    user: User,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    state
        .chat
        .delete_conversation(&user, conversation_id)
        .await
        .map_err(reject)?;

    Ok(warp::reply::json(&DeletedResponse { deleted: true }))
}
