//! Sessions, password hashing, and the password policy.
//!
//! Sessions are opaque server-side entries: a UUID token in an HttpOnly
//! cookie mapping to the user id, with a TTL and lazy eviction. Handlers
//! never read ambient state; the middleware resolves the cookie once and
//! injects `CurrentUser` as a request extension.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{Request, State};
use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// Symbols the password policy accepts (and requires at least one of).
pub const ALLOWED_SYMBOLS: &str = "@$!%*#?&";

/// The authenticated user for this request, injected by `require_session`.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: i64,
}

struct SessionEntry {
    user_id: i64,
    created: Instant,
}

/// Server-side session store: token → user id, TTL-bounded.
pub struct SessionStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Mint a session token for a freshly logged-in user.
    /// Lazily evicts expired entries.
    pub async fn create(&self, user_id: i64) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, e| e.created.elapsed() < self.ttl);
        entries.insert(
            token.clone(),
            SessionEntry {
                user_id,
                created: Instant::now(),
            },
        );
        token
    }

    /// Resolve a token to a user id; expired tokens count as absent.
    pub async fn user_id(&self, token: &str) -> Option<i64> {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, e| e.created.elapsed() < self.ttl);
        entries.get(token).map(|e| e.user_id)
    }

    pub async fn remove(&self, token: &str) {
        self.entries.lock().await.remove(token);
    }
}

/// Axum middleware guarding the logged-in routes.
///
/// A valid session cookie puts `CurrentUser` on the request; anything else
/// bounces to the login page rather than erroring.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let user_id = match session_token(request.headers()) {
        Some(token) => state.sessions.user_id(&token).await,
        None => None,
    };

    match user_id {
        Some(id) => {
            request.extensions_mut().insert(CurrentUser { id });
            next.run(request).await
        }
        None => AppError::Unauthorized.into_response(),
    }
}

/// Pull the session token out of the Cookie header, if present.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Password policy: 6–20 chars, at least one lowercase, one uppercase,
/// one digit, and one symbol from [`ALLOWED_SYMBOLS`]; nothing outside
/// those classes.
pub fn validate_password(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if !(6..=20).contains(&len) {
        return Err(AppError::PasswordPolicy(
            "password must be 6-20 characters long",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(AppError::PasswordPolicy(
            "password must contain a lowercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(AppError::PasswordPolicy(
            "password must contain an uppercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::PasswordPolicy("password must contain a digit"));
    }
    if !password.chars().any(|c| ALLOWED_SYMBOLS.contains(c)) {
        return Err(AppError::PasswordPolicy(
            "password must contain a symbol (@$!%*#?&)",
        ));
    }
    if password
        .chars()
        .any(|c| !c.is_ascii_alphanumeric() && !ALLOWED_SYMBOLS.contains(c))
    {
        return Err(AppError::PasswordPolicy(
            "password contains an unsupported character",
        ));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    PasswordHash::new(hash)
        .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_accepts_a_compliant_password() {
        assert!(validate_password("Abcdef1!").is_ok());
    }

    #[test]
    fn policy_rejects_missing_character_classes() {
        // no upper, digit, or symbol
        assert!(validate_password("abcdef").is_err());
        assert!(validate_password("ABCDEF1!").is_err());
        assert!(validate_password("Abcdefg!").is_err());
        assert!(validate_password("Abcdefg1").is_err());
    }

    #[test]
    fn policy_rejects_bad_lengths() {
        assert!(validate_password("Ab1!").is_err());
        assert!(validate_password("Abcdefghijklmnopq1!xx").is_err());
    }

    #[test]
    fn policy_rejects_characters_outside_the_alphabet() {
        assert!(validate_password("Abcde f1!").is_err());
        assert!(validate_password("Abcdef1^").is_err());
    }

    #[test]
    fn hash_verify_round_trip() {
        let hash = hash_password("Abcdef1!").unwrap();
        assert!(verify_password(&hash, "Abcdef1!"));
        assert!(!verify_password(&hash, "Abcdef1?"));
        assert!(!verify_password("not-a-phc-string", "Abcdef1!"));
    }

    #[test]
    fn session_token_is_parsed_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "theme=dark; session=abc-123; lang=en".parse().unwrap());
        assert_eq!(session_token(&headers).as_deref(), Some("abc-123"));

        headers.insert(COOKIE, "theme=dark".parse().unwrap());
        assert_eq!(session_token(&headers), None);
    }

    #[tokio::test]
    async fn session_store_round_trip_and_removal() {
        let store = SessionStore::new(Duration::from_secs(60));
        let token = store.create(7).await;

        assert_eq!(store.user_id(&token).await, Some(7));
        assert_eq!(store.user_id("unknown-token").await, None);

        store.remove(&token).await;
        assert_eq!(store.user_id(&token).await, None);
    }

    #[tokio::test]
    async fn expired_sessions_are_evicted() {
        let store = SessionStore::new(Duration::ZERO);
        let token = store.create(7).await;
        assert_eq!(store.user_id(&token).await, None);
    }
}
