use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{AppendHeaders, IntoResponse, Redirect};
use axum::routing::get;
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth;
use crate::db::users;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    confirmation: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
}

// The static frontend owns the actual forms; these GETs just answer so the
// pages have something to probe.
async fn register_page() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn login_page() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn register(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RegisterForm>,
) -> Result<Redirect, AppError> {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        return Err(AppError::InvalidCredentials);
    }
    auth::validate_password(&form.password)?;
    if form.password != form.confirmation {
        return Err(AppError::PasswordMismatch);
    }

    let hash = auth::hash_password(&form.password)?;
    let conn = state.pool.get()?;
    users::create(&conn, username, &hash, state.config.starting_cash)?;

    tracing::info!("registered user {username}");
    Ok(Redirect::to("/login"))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, AppError> {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        return Err(AppError::InvalidCredentials);
    }

    let user = {
        let conn = state.pool.get()?;
        users::find_by_username(&conn, username)?
    };

    // Same error for unknown user and wrong password: no account
    // enumeration through the login form.
    let user = user.ok_or(AppError::InvalidCredentials)?;
    if !auth::verify_password(&user.password_hash, &form.password) {
        return Err(AppError::InvalidCredentials);
    }

    let token = state.sessions.create(user.id).await;
    tracing::info!("user {username} logged in");
    Ok((
        AppendHeaders([(SET_COOKIE, auth::session_cookie(&token))]),
        Redirect::to("/"),
    ))
}

async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = auth::session_token(&headers) {
        state.sessions.remove(&token).await;
    }
    (
        AppendHeaders([(SET_COOKIE, auth::clear_session_cookie())]),
        Redirect::to("/"),
    )
}
