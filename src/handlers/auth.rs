// Session handlers: login, register, refresh, logout, me

use std::convert::Infallible;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

use crate::auth::SESSION_COOKIE;
use crate::db::User;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, TokenResponse};
use crate::state::AppState;

use super::error::{reject, ApiError};

/// Token from an `Authorization: Bearer ...` header value
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// `Set-Cookie` value carrying a session token
pub fn session_cookie(token: &str, expiration_hours: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        expiration_hours.max(0) * 3600
    )
}

/// `Set-Cookie` value that clears the session
pub fn expired_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// The signed-in user, if the request carries a valid token
///
/// Invalid and expired tokens count as signed out; only storage failures
/// reject.
pub async fn resolve_session(token: Option<String>, state: AppState) -> Result<Option<User>, Rejection> {
    let Some(token) = token else {
        return Ok(None);
    };

    match state.auth.validate_token(&token).await {
        Ok(user) => Ok(Some(user)),
        Err(e) if e.is_unauthenticated() => {
            tracing::debug!(error = %e, "Ignoring session token");
            Ok(None)
        }
        Err(e) => Err(reject(e)),
    }
}

/// Unwrap a resolved session or reject with 401
pub async fn require_user(user: Option<User>) -> Result<User, Rejection> {
    user.ok_or_else(|| reject(ApiError::not_signed_in()))
}

fn session_reply(state: &AppState, user: User, token: String, status: StatusCode) -> impl Reply {
    let hours = state.config.jwt_expiration_hours;
    let cookie = session_cookie(&token, hours);
    let body = AuthResponse {
        user,
        token,
        expires_in_hours: hours,
    };
    warp::reply::with_header(
        warp::reply::with_status(warp::reply::json(&body), status),
        "set-cookie",
        cookie,
    )
}

pub async fn login_handler(request: LoginRequest, state: AppState) -> Result<impl Reply, Rejection> {
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(reject(ApiError::BadRequest(
            "Please enter both username and password".to_string(),
        )));
    }

    match state.auth.authenticate(&request.username, &request.password).await {
        Ok(session) => Ok(session_reply(&state, session.user, session.token, StatusCode::OK)),
        Err(e) => {
            tracing::warn!(username = %request.username.trim(), error = %e, "Login failed");
            Err(reject(e))
        }
    }
}

pub async fn register_handler(
    request: RegisterRequest,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    if let Some(confirm) = &request.password_confirm {
        if *confirm != request.password {
            return Err(reject(ApiError::BadRequest("Passwords do not match".to_string())));
        }
    }

    let session = state
        .auth
        .register(&request.username, &request.email, &request.password)
        .await
        .map_err(|e| {
            tracing::warn!(username = %request.username.trim(), error = %e, "Registration failed");
            reject(e)
        })?;

    Ok(session_reply(
        &state,
        session.user,
        session.token,
        StatusCode::CREATED,
    ))
}

pub async fn refresh_handler(token: Option<String>, state: AppState) -> Result<impl Reply, Rejection> {
    let token = token.ok_or_else(|| reject(ApiError::not_signed_in()))?;
    let fresh = state.auth.refresh_token(&token).await.map_err(reject)?;

    let hours = state.config.jwt_expiration_hours;
    let cookie = session_cookie(&fresh, hours);
    Ok(warp::reply::with_header(
        warp::reply::json(&TokenResponse {
            token: fresh,
            expires_in_hours: hours,
        }),
        "set-cookie",
        cookie,
    ))
}

pub async fn logout_handler() -> Result<impl Reply, Infallible> {
    Ok(warp::reply::with_header(
        warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT),
        "set-cookie",
        expired_cookie(),
    ))
}

pub async fn me_handler(user: User) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(Some("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(Some("Bearer   ")), None);
        assert_eq!(bearer_token(Some("Basic dXNlcg==")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn test_session_cookie() {
        let cookie = session_cookie("tok", 24);
        assert!(cookie.starts_with("chat_token=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=86400"));
    }

    #[test]
    fn test_expired_cookie() {
        assert!(expired_cookie().contains("Max-Age=0"));
    }
}
