use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::routing::get;
use axum::{Extension, Form, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::db::{ledger, users};
use crate::error::AppError;
use crate::quotes::Quote;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QuoteForm {
    #[serde(default)]
    symbol: String,
}

#[derive(Debug, Deserialize)]
pub struct TradeForm {
    #[serde(default)]
    symbol: String,
    // Kept as a string so a non-integer share count surfaces as the
    // domain error instead of a framework rejection.
    #[serde(default)]
    shares: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/buy", get(buy_page).post(buy))
        .route("/sell", get(sell_page).post(sell))
        .route("/quote", get(quote_page).post(quote))
}

fn normalize_symbol(raw: &str) -> Result<String, AppError> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty()
        || !symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(AppError::InvalidSymbol);
    }
    Ok(symbol)
}

fn parse_shares(raw: &str) -> Result<i64, AppError> {
    let shares: i64 = raw.trim().parse().map_err(|_| AppError::InvalidShareCount)?;
    if shares <= 0 {
        return Err(AppError::InvalidShareCount);
    }
    Ok(shares)
}

fn now_stamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

async fn fetch_quote(state: &AppState, symbol: &str) -> Result<Quote, AppError> {
    state
        .quotes
        .lookup(symbol)
        .await?
        .ok_or(AppError::InvalidSymbol)
}

// ── Buy ─────────────────────────────────────────────────────────────

/// The buy form only needs the user's spendable cash.
async fn buy_page(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Value>, AppError> {
    let conn = state.pool.get()?;
    let cash = users::fetch_cash(&conn, user.id)?;
    Ok(Json(json!({
        "cash": cash.as_dollars(),
        "cash_usd": cash.usd(),
    })))
}

async fn buy(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<TradeForm>,
) -> Result<Redirect, AppError> {
    let symbol = normalize_symbol(&form.symbol)?;
    let shares = parse_shares(&form.shares)?;
    // Price always comes from a fresh lookup, never from the form.
    let quote = fetch_quote(&state, &symbol).await?;

    let mut conn = state.pool.get()?;
    ledger::buy(&mut conn, user.id, &symbol, shares, quote.price, &now_stamp())?;

    tracing::info!(
        "user {} bought {shares} {symbol} at {}",
        user.id,
        quote.price.usd()
    );
    Ok(Redirect::to("/"))
}

// ── Sell ────────────────────────────────────────────────────────────

/// The sell form needs the symbols the user can actually sell.
async fn sell_page(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Value>, AppError> {
    let conn = state.pool.get()?;
    let symbols: Vec<String> = ledger::holdings(&conn, user.id)?
        .into_iter()
        .map(|h| h.symbol)
        .collect();
    Ok(Json(json!({ "symbols": symbols })))
}

async fn sell(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<TradeForm>,
) -> Result<Redirect, AppError> {
    let symbol = normalize_symbol(&form.symbol)?;
    let shares = parse_shares(&form.shares)?;
    let quote = fetch_quote(&state, &symbol).await?;

    let mut conn = state.pool.get()?;
    ledger::sell(&mut conn, user.id, &symbol, shares, quote.price, &now_stamp())?;

    tracing::info!(
        "user {} sold {shares} {symbol} at {}",
        user.id,
        quote.price.usd()
    );
    Ok(Redirect::to("/"))
}

// ── Quote ───────────────────────────────────────────────────────────

async fn quote_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<QuoteForm>,
) -> Result<Json<Value>, AppError> {
    if query.symbol.trim().is_empty() {
        return Ok(Json(json!({ "ok": true })));
    }
    quote_response(&state, &query.symbol).await
}

async fn quote(
    State(state): State<Arc<AppState>>,
    Form(form): Form<QuoteForm>,
) -> Result<Json<Value>, AppError> {
    quote_response(&state, &form.symbol).await
}

async fn quote_response(state: &AppState, raw_symbol: &str) -> Result<Json<Value>, AppError> {
    let symbol = normalize_symbol(raw_symbol)?;
    let quote = fetch_quote(state, &symbol).await?;
    Ok(Json(json!({
        "name": quote.name,
        "symbol": quote.symbol,
        "price": quote.price.as_dollars(),
        "price_usd": quote.price.usd(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_trimmed_and_uppercased() {
        assert_eq!(normalize_symbol("  aapl ").unwrap(), "AAPL");
        assert_eq!(normalize_symbol("brk.b").unwrap(), "BRK.B");
    }

    #[test]
    fn empty_or_malformed_symbols_are_invalid() {
        assert!(matches!(normalize_symbol(""), Err(AppError::InvalidSymbol)));
        assert!(matches!(normalize_symbol("   "), Err(AppError::InvalidSymbol)));
        assert!(matches!(
            normalize_symbol("AA PL"),
            Err(AppError::InvalidSymbol)
        ));
        assert!(matches!(
            normalize_symbol("AAPL/quote"),
            Err(AppError::InvalidSymbol)
        ));
    }

    #[test]
    fn share_counts_must_be_positive_integers() {
        assert_eq!(parse_shares("10").unwrap(), 10);
        assert_eq!(parse_shares(" 3 ").unwrap(), 3);
        for bad in ["0", "-1", "1.5", "ten", ""] {
            assert!(matches!(
                parse_shares(bad),
                Err(AppError::InvalidShareCount)
            ));
        }
    }
}
