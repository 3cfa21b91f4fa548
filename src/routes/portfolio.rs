use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::db::{ledger, users};
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/history", get(history))
}

/// Portfolio view: cash, current holdings marked to the latest quote, and
/// the grand total. A user with no transactions just sees their cash.
async fn index(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Value>, AppError> {
    let (cash, holdings) = {
        let conn = state.pool.get()?;
        (
            users::fetch_cash(&conn, user.id)?,
            ledger::holdings(&conn, user.id)?,
        )
    };

    let mut total = cash;
    let mut rows: Vec<Value> = Vec::with_capacity(holdings.len());
    for holding in &holdings {
        let quote = state
            .quotes
            .lookup(&holding.symbol)
            .await?
            .ok_or(AppError::InvalidSymbol)?;
        let value = quote
            .price
            .checked_mul_shares(holding.shares)
            .ok_or_else(|| AppError::Internal("holding value overflow".to_string()))?;
        total += value;

        rows.push(json!({
            "symbol": holding.symbol,
            "name": quote.name,
            "shares": holding.shares,
            "price": quote.price.as_dollars(),
            "price_usd": quote.price.usd(),
            "value": value.as_dollars(),
            "value_usd": value.usd(),
        }));
    }

    Ok(Json(json!({
        "cash": cash.as_dollars(),
        "cash_usd": cash.usd(),
        "holdings": rows,
        "total": total.as_dollars(),
        "total_usd": total.usd(),
    })))
}

/// Raw transaction history, oldest first, exactly as written to the ledger.
async fn history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Value>, AppError> {
    let conn = state.pool.get()?;
    let rows = ledger::history(&conn, user.id)?;

    let transactions: Vec<Value> = rows
        .iter()
        .map(|row| {
            json!({
                "symbol": row.symbol,
                "shares": row.shares,
                "price": row.price.as_dollars(),
                "price_usd": row.price.usd(),
                "transacted_at": row.transacted_at,
            })
        })
        .collect();

    Ok(Json(json!({ "transactions": transactions })))
}
