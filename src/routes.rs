// Route definitions and filters

use std::convert::Infallible;
use uuid::Uuid;
use warp::Filter;

use crate::auth::SESSION_COOKIE;
use crate::config::MAX_REQUEST_BYTES;
use crate::db::User;
use crate::handlers;
use crate::models::{ListConversationsQuery, UsageQuery};
use crate::state::AppState;

const MAX_JSON_BYTES: u64 = 64 * 1024;

pub fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Session token from a bearer header, falling back to the session cookie
pub fn session_token() -> impl Filter<Extract = (Option<String>,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::cookie::optional::<String>(SESSION_COOKIE))
        .map(|authorization: Option<String>, cookie: Option<String>| {
            handlers::auth::bearer_token(authorization.as_deref())
                .map(str::to_string)
                .or(cookie)
        })
}

/// The signed-in user, or `None`
pub fn with_session(
    state: AppState,
) -> impl Filter<Extract = (Option<User>,), Error = warp::Rejection> + Clone {
    session_token()
        .and(with_state(state))
        .and_then(handlers::resolve_session)
}

/// The signed-in user; rejects with 401 otherwise
pub fn with_user(state: AppState) -> impl Filter<Extract = (User,), Error = warp::Rejection> + Clone {
    with_session(state).and_then(handlers::require_user)
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_JSON_BYTES).and(warp::body::json())
}

pub fn configure_routes(
    state: AppState,
) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
    let api = warp::path("api").and(warp::path("v1"));

    // GET /
    let index = warp::path::end()
        .and(warp::get())
        .and(with_session(state.clone()))
        .and_then(handlers::index_handler);

    // GET /login
    let login_page = warp::path("login")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_session(state.clone()))
        .and_then(handlers::login_page_handler);

    // POST /auth/login
    let login = api
        .and(warp::path("auth"))
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::login_handler);

    // POST /auth/register
    let register = api
        .and(warp::path("auth"))
        .and(warp::path("register"))
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::register_handler);

    // POST /auth/refresh
    let refresh = api
        .and(warp::path("auth"))
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::post())
        .and(session_token())
        .and(with_state(state.clone()))
        .and_then(handlers::refresh_handler);

    // POST /auth/logout
    let logout = api
        .and(warp::path("auth"))
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(warp::post())
        .and_then(handlers::logout_handler);

    // GET /me
    let me = api
        .and(warp::path("me"))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_user(state.clone()))
        .and_then(handlers::me_handler);

    // GET /info
    let info = api
        .and(warp::path("info"))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::info_handler);

    // GET /conversations?saved=
    let list_conversations = api
        .and(warp::path("conversations"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<ListConversationsQuery>())
        .and(with_user(state.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::list_conversations_handler);

    // POST /conversations
    let create_conversation = api
        .and(warp::path("conversations"))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_user(state.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::create_conversation_handler);

    // GET /conversations/{id}
    let get_conversation = api
        .and(warp::path("conversations"))
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_user(state.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::get_conversation_handler);

    // PATCH /conversations/{id}
    let update_conversation = api
        .and(warp::path("conversations"))
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::patch())
        .and(json_body())
        .and(with_user(state.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::update_conversation_handler);

    // DELETE /conversations/{id}
    let delete_conversation = api
        .and(warp::path("conversations"))
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::delete())
        .and(with_user(state.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::delete_conversation_handler);

    // POST /conversations/{id}/messages
    let send_message = api
        .and(warp::path("conversations"))
        .and(warp::path::param::<Uuid>())
        .and(warp::path("messages"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_REQUEST_BYTES))
        .and(warp::multipart::form().max_length(MAX_REQUEST_BYTES))
        .and(with_user(state.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::send_message_handler);

    // POST /messages
    let send_first_message = api
        .and(warp::path("messages"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_REQUEST_BYTES))
        .and(warp::multipart::form().max_length(MAX_REQUEST_BYTES))
        .and(with_user(state.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::send_first_message_handler);

    // GET /usage?conversation_id=
    let usage = api
        .and(warp::path("usage"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<UsageQuery>())
        .and(with_user(state.clone()))
        .and(with_state(state))
        .and_then(handlers::usage_handler);

    // Combine routes
    let pages = index.or(login_page);
    let auth = login.or(register).or(refresh).or(logout).or(me);
    let conversations = list_conversations
        .or(create_conversation)
        .or(get_conversation)
        .or(update_conversation)
        .or(delete_conversation);
    let messages = send_message.or(send_first_message);

    pages
        .or(auth)
        .or(info)
        .or(conversations)
        .or(messages)
        .or(usage)
        .recover(handlers::handle_rejection)
}
