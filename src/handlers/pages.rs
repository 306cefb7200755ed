// HTML pages

use std::convert::Infallible;
use warp::http::Uri;
use warp::reply::Response;
use warp::Reply;

use crate::db::User;

const CHAT_PAGE: &str = include_str!("../../static/index.html");
const LOGIN_PAGE: &str = include_str!("../../static/login.html");

/// GET / - the chat page, or a redirect to the login page
pub async fn index_handler(user: Option<User>) -> Result<Response, Infallible> {
    match user {
        Some(_) => Ok(warp::reply::html(CHAT_PAGE).into_response()),
        None => Ok(warp::redirect::see_other(Uri::from_static("/login")).into_response()),
    }
}

/// GET /login - signed-in users go straight to the chat
pub async fn login_page_handler(user: Option<User>) -> Result<Response, Infallible> {
    match user {
        Some(_) => Ok(warp::redirect::see_other(Uri::from_static("/")).into_response()),
        None => Ok(warp::reply::html(LOGIN_PAGE).into_response()),
    }
}
