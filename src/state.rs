use std::sync::Arc;

use crate::auth::SessionStore;
use crate::config::Config;
use crate::db::pool::DbPool;
use crate::quotes::QuoteClient;

/// Shared application state, passed to all route handlers via
/// `axum::extract::State`.
pub struct AppState {
    pub config: Config,
    pub pool: DbPool,
    pub quotes: QuoteClient,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config, pool: DbPool) -> Arc<Self> {
        let quotes = QuoteClient::new(config.quote_url.clone(), config.quote_api_key.clone());
        let sessions = SessionStore::new(config.session_ttl);

        Arc::new(Self {
            config,
            pool,
            quotes,
            sessions,
        })
    }
}
