pub mod account;
pub mod portfolio;
pub mod trade;

use axum::middleware;
use axum::Router;
use std::sync::Arc;

use crate::auth;
use crate::state::AppState;

/// Assemble the API router: account routes are public, everything else
/// sits behind the session middleware.
pub fn api_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .merge(portfolio::routes())
        .merge(trade::routes())
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_session,
        ));

    Router::new().merge(account::routes()).merge(protected)
}
