// POST /conversations/{id}/messages handler

use bytes::BufMut;
use futures_util::stream::{StreamExt, TryStreamExt};
use uuid::Uuid;
use warp::multipart::{FormData, Part};
use warp::{Rejection, Reply};

use crate::chat::Upload;
use crate::db::User;
use crate::sse::create_reply_event;
use crate::state::AppState;

use super::error::{reject, ApiError};

/// Contents of a send form: the `text` field and any `file` parts
#[derive(Debug, Default)]
pub struct MessageForm {
    pub text: String,
    pub uploads: Vec<Upload>,
}

pub async fn send_message_handler(
    conversation_id: Uuid,
    form: FormData,
    user: User,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    send(Some(conversation_id), form, user, state).await
}

/// POST /messages - first message of a conversation that does not exist yet
pub async fn send_first_message_handler(
    form: FormData,
    user: User,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    send(None, form, user, state).await
}

async fn send(
    conversation_id: Option<Uuid>,
    form: FormData,
    user: User,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let message = read_form(form).await?;

    let replies = state
        .chat
        .send_message(&user, conversation_id, &message.text, message.uploads)
        .await
        .map_err(reject)?;

    let event_stream = replies.map(create_reply_event);

    Ok(warp::sse::reply(
        warp::sse::keep_alive().stream(event_stream),
    ))
}

fn invalid_form(e: warp::Error) -> Rejection {
    reject(ApiError::BadRequest(format!("Invalid form data: {}", e)))
}

/// Read every part of the form in order
pub async fn read_form(form: FormData) -> Result<MessageForm, Rejection> {
    let mut form = std::pin::pin!(form);
    let mut message = MessageForm::default();

    while let Some(part) = form.try_next().await.map_err(invalid_form)? {
        let name = part.name().to_string();
        let filename = part.filename().map(str::to_string);
        let bytes = read_part(part).await.map_err(invalid_form)?;

        match (name.as_str(), filename) {
            ("text", _) => {
                message.text = String::from_utf8(bytes).map_err(|_| {
                    reject(ApiError::BadRequest("Message text must be UTF-8".to_string()))
                })?;
            }
            // Browsers send an empty part for an untouched file input
            ("file", Some(filename)) if !filename.is_empty() => {
                message.uploads.push(Upload { filename, bytes });
            }
            ("file", _) => {}
            (other, _) => tracing::debug!(field = other, "Ignoring form field"),
        }
    }

    Ok(message)
}

async fn read_part(part: Part) -> Result<Vec<u8>, warp::Error> {
    part.stream()
        .try_fold(Vec::new(), |mut bytes, chunk| async move {
            bytes.put(chunk);
            Ok(bytes)
        })
        .await
}
