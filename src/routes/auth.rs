use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{password, session};
use crate::db::SqliteFeed;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::feed::User;
use crate::identity;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// The signed-in account as its owner sees it.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountView {
    pub id: String,
    pub pseudonym: String,
    pub initials: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for AccountView {
    fn from(user: User) -> Self {
        AccountView {
            initials: identity::initials(&user.pseudonym),
            id: user.id,
            pseudonym: user.pseudonym,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: AccountView,
    pub token: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/me", get(me))
}

fn session_cookie(name: &str, token: &str, hours: u64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name,
        token,
        hours * 3600
    )
}

/// Issue a session for `user` and answer with it as JSON and as a cookie.
fn start_session(state: &AppState, user: User, status: StatusCode) -> AppResult<Response> {
    let conn = state.db.get()?;
    let token = session::create_session(&conn, &user.id, state.config.auth.session_hours)?;
    tracing::info!(user_id = %user.id, "signed in");

    let cookie = session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );
    let body = SessionResponse {
        user: user.into(),
        token,
    };
    Ok((status, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Create an account. The pseudonym is drawn here, once.
async fn signup(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> AppResult<Response> {
    if req.password.chars().count() < password::MIN_PASSWORD_CHARS {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            password::MIN_PASSWORD_CHARS
        )));
    }

    let cost = state.config.auth.bcrypt_cost;
    let plaintext = req.password;
    let hash = tokio::task::spawn_blocking(move || password::hash_password(&plaintext, cost))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let mut conn = state.db.get()?;
    let user =
        SqliteFeed::new(&mut conn, state.config.feed.limits()).register_user(&req.email, &hash)?;
    drop(conn);
    start_session(&state, user, StatusCode::CREATED)
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> AppResult<Response> {
    let mut conn = state.db.get()?;
    let found = SqliteFeed::new(&mut conn, state.config.feed.limits()).credentials(&req.email)?;
    drop(conn);
    let (user, hash) = match found {
        Some((user, Some(hash))) => (user, hash),
        _ => {
            tracing::warn!("login rejected for unknown account");
            return Err(AppError::Unauthorized);
        }
    };

    let plaintext = req.password;
    let verified = tokio::task::spawn_blocking(move || password::verify_password(&plaintext, &hash))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !verified {
        tracing::warn!(user_id = %user.id, "login rejected for wrong password");
        return Err(AppError::Unauthorized);
    }

    start_session(&state, user, StatusCode::OK)
}

async fn logout(State(state): State<AppState>, current: CurrentUser) -> AppResult<Response> {
    let conn = state.db.get()?;
    session::delete_session(&conn, &current.token)?;
    tracing::info!(user_id = %current.user.id, "signed out");

    let cookie = format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
        state.config.auth.cookie_name
    );
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]).into_response())
}

async fn me(current: CurrentUser) -> Json<AccountView> {
    Json(current.user.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_carries_lifetime() {
        let cookie = session_cookie("campusfeed_session", "abc", 2);
        assert!(cookie.starts_with("campusfeed_session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=7200"));
    }

    #[test]
    fn account_view_derives_initials() {
        let mut user = User::new("a@vit.ac.in");
        user.pseudonym = "Brave Falcon".into();
        let view = AccountView::from(user);
        assert_eq!(view.initials, "BF");
        assert_eq!(view.email, "a@vit.ac.in");
    }
}
