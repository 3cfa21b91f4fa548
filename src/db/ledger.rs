//! The transaction ledger: append-only buy/sell records plus the cash
//! balance they move.
//!
//! Every buy/sell runs its balance check and both writes inside a single
//! IMMEDIATE transaction, so two concurrent operations for the same user
//! serialize at the store — the second one re-reads state the first has
//! already committed. Rolling back on any failure keeps the invariants:
//! cash never goes below zero and net shares per (user, symbol) never go
//! negative.

use rusqlite::{params, Connection, TransactionBehavior};

use crate::error::AppError;
use crate::money::Cents;

#[derive(Debug, Clone)]
pub struct LedgerRow {
    pub symbol: String,
    pub shares: i64,
    pub price: Cents,
    pub transacted_at: String,
}

#[derive(Debug, Clone)]
pub struct Holding {
    pub symbol: String,
    pub shares: i64,
}

/// Buy `shares` of `symbol` at `unit_price`: append a positive ledger row
/// and deduct the cost from the user's cash, atomically.
pub fn buy(
    conn: &mut Connection,
    user_id: i64,
    symbol: &str,
    shares: i64,
    unit_price: Cents,
    now: &str,
) -> Result<(), AppError> {
    if shares <= 0 {
        return Err(AppError::InvalidShareCount);
    }
    let cost = unit_price
        .checked_mul_shares(shares)
        .ok_or(AppError::InvalidShareCount)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let cash = cash_in_tx(&tx, user_id)?;
    if cost > cash {
        return Err(AppError::InsufficientFunds);
    }

    tx.execute(
        "INSERT INTO transactions (user_id, symbol, shares, price_cents, transacted_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, symbol, shares, unit_price.raw(), now],
    )?;
    tx.execute(
        "UPDATE users SET cash_cents = cash_cents - ?1 WHERE id = ?2",
        params![cost.raw(), user_id],
    )?;

    tx.commit()?;
    Ok(())
}

/// Sell `shares` of `symbol` at `unit_price`: append a negative ledger row
/// and credit the proceeds, atomically. A symbol the user never bought
/// counts as a holding of 0, not a lookup error.
pub fn sell(
    conn: &mut Connection,
    user_id: i64,
    symbol: &str,
    shares: i64,
    unit_price: Cents,
    now: &str,
) -> Result<(), AppError> {
    if shares <= 0 {
        return Err(AppError::InvalidShareCount);
    }
    let proceeds = unit_price
        .checked_mul_shares(shares)
        .ok_or(AppError::InvalidShareCount)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let held = net_shares_in_tx(&tx, user_id, symbol)?;
    if shares > held {
        return Err(AppError::InsufficientShares);
    }

    tx.execute(
        "INSERT INTO transactions (user_id, symbol, shares, price_cents, transacted_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, symbol, -shares, unit_price.raw(), now],
    )?;
    tx.execute(
        "UPDATE users SET cash_cents = cash_cents + ?1 WHERE id = ?2",
        params![proceeds.raw(), user_id],
    )?;

    tx.commit()?;
    Ok(())
}

/// Net shares currently held per symbol, positives only, symbol order.
pub fn holdings(conn: &Connection, user_id: i64) -> Result<Vec<Holding>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT symbol, SUM(shares) FROM transactions
         WHERE user_id = ?1
         GROUP BY symbol
         HAVING SUM(shares) > 0
         ORDER BY symbol",
    )?;
    let rows = stmt
        .query_map(params![user_id], |row| {
            Ok(Holding {
                symbol: row.get(0)?,
                shares: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every ledger row for the user, oldest first, exactly as written.
pub fn history(conn: &Connection, user_id: i64) -> Result<Vec<LedgerRow>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT symbol, shares, price_cents, transacted_at FROM transactions
         WHERE user_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt
        .query_map(params![user_id], |row| {
            Ok(LedgerRow {
                symbol: row.get(0)?,
                shares: row.get(1)?,
                price: Cents::new(row.get(2)?),
                transacted_at: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn cash_in_tx(tx: &Connection, user_id: i64) -> Result<Cents, AppError> {
    let cents: i64 = tx.query_row(
        "SELECT cash_cents FROM users WHERE id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(Cents::new(cents))
}

/// Net shares of one symbol; 0 when the user never traded it.
fn net_shares_in_tx(tx: &Connection, user_id: i64, symbol: &str) -> Result<i64, AppError> {
    let net: i64 = tx.query_row(
        "SELECT COALESCE(SUM(shares), 0) FROM transactions
         WHERE user_id = ?1 AND symbol = ?2",
        params![user_id, symbol],
        |row| row.get(0),
    )?;
    Ok(net)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{schema, users};

    const STAMP: &str = "2024-01-02 10:30:00";

    fn test_conn() -> (Connection, i64) {
        let conn = Connection::open_in_memory().unwrap();
        schema::init(&conn).unwrap();
        let user_id = users::create(&conn, "alice", "hash", Cents::new(1_000_000)).unwrap();
        (conn, user_id)
    }

    #[test]
    fn buy_deducts_exact_cost_and_appends_row() {
        let (mut conn, user_id) = test_conn();

        buy(&mut conn, user_id, "AAPL", 10, Cents::new(15_000), STAMP).unwrap();

        assert_eq!(users::fetch_cash(&conn, user_id).unwrap(), Cents::new(850_000));
        let rows = history(&conn, user_id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "AAPL");
        assert_eq!(rows[0].shares, 10);
        assert_eq!(rows[0].price, Cents::new(15_000));
        assert_eq!(rows[0].transacted_at, STAMP);
    }

    #[test]
    fn buy_rejects_unaffordable_order_without_state_change() {
        let (mut conn, user_id) = test_conn();

        let err = buy(&mut conn, user_id, "AAPL", 100, Cents::new(15_000), STAMP).unwrap_err();
        assert!(matches!(err, AppError::InsufficientFunds));

        assert_eq!(users::fetch_cash(&conn, user_id).unwrap(), Cents::new(1_000_000));
        assert!(history(&conn, user_id).unwrap().is_empty());
    }

    #[test]
    fn buy_rejects_non_positive_share_count() {
        let (mut conn, user_id) = test_conn();

        for shares in [0, -5] {
            let err = buy(&mut conn, user_id, "AAPL", shares, Cents::new(100), STAMP).unwrap_err();
            assert!(matches!(err, AppError::InvalidShareCount));
        }
        assert!(history(&conn, user_id).unwrap().is_empty());
    }

    #[test]
    fn buy_exactly_at_cash_limit_succeeds() {
        let (mut conn, user_id) = test_conn();

        buy(&mut conn, user_id, "AAPL", 100, Cents::new(10_000), STAMP).unwrap();
        assert_eq!(users::fetch_cash(&conn, user_id).unwrap(), Cents::ZERO);
    }

    #[test]
    fn sell_credits_proceeds_and_appends_negative_row() {
        let (mut conn, user_id) = test_conn();
        buy(&mut conn, user_id, "AAPL", 10, Cents::new(15_000), STAMP).unwrap();

        sell(&mut conn, user_id, "AAPL", 5, Cents::new(16_000), STAMP).unwrap();

        assert_eq!(users::fetch_cash(&conn, user_id).unwrap(), Cents::new(930_000));
        let rows = history(&conn, user_id).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].shares, -5);
        assert_eq!(net_shares_in_tx(&conn, user_id, "AAPL").unwrap(), 5);
    }

    #[test]
    fn oversell_is_rejected_without_state_change() {
        let (mut conn, user_id) = test_conn();
        buy(&mut conn, user_id, "AAPL", 10, Cents::new(15_000), STAMP).unwrap();

        let err = sell(&mut conn, user_id, "AAPL", 11, Cents::new(16_000), STAMP).unwrap_err();
        assert!(matches!(err, AppError::InsufficientShares));

        assert_eq!(users::fetch_cash(&conn, user_id).unwrap(), Cents::new(850_000));
        assert_eq!(history(&conn, user_id).unwrap().len(), 1);
        assert_eq!(net_shares_in_tx(&conn, user_id, "AAPL").unwrap(), 10);
    }

    #[test]
    fn selling_a_symbol_never_bought_is_insufficient_shares() {
        let (mut conn, user_id) = test_conn();

        let err = sell(&mut conn, user_id, "TSLA", 100, Cents::new(100), STAMP).unwrap_err();
        assert!(matches!(err, AppError::InsufficientShares));
        assert_eq!(users::fetch_cash(&conn, user_id).unwrap(), Cents::new(1_000_000));
    }

    #[test]
    fn holdings_aggregate_and_drop_closed_positions() {
        let (mut conn, user_id) = test_conn();
        buy(&mut conn, user_id, "AAPL", 10, Cents::new(15_000), STAMP).unwrap();
        buy(&mut conn, user_id, "NFLX", 3, Cents::new(40_000), STAMP).unwrap();
        buy(&mut conn, user_id, "AAPL", 2, Cents::new(15_500), STAMP).unwrap();
        sell(&mut conn, user_id, "NFLX", 3, Cents::new(41_000), STAMP).unwrap();

        let holdings = holdings(&conn, user_id).unwrap();
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].symbol, "AAPL");
        assert_eq!(holdings[0].shares, 12);
    }

    #[test]
    fn holdings_are_per_user() {
        let (mut conn, alice) = test_conn();
        let bob = users::create(&conn, "bob", "hash", Cents::new(1_000_000)).unwrap();
        buy(&mut conn, alice, "AAPL", 10, Cents::new(15_000), STAMP).unwrap();

        assert!(holdings(&conn, bob).unwrap().is_empty());
        let err = sell(&mut conn, bob, "AAPL", 1, Cents::new(15_000), STAMP).unwrap_err();
        assert!(matches!(err, AppError::InsufficientShares));
    }

    #[test]
    fn repeated_holdings_reads_are_identical() {
        let (mut conn, user_id) = test_conn();
        buy(&mut conn, user_id, "AAPL", 10, Cents::new(15_000), STAMP).unwrap();
        buy(&mut conn, user_id, "NFLX", 3, Cents::new(40_000), STAMP).unwrap();

        let pairs = |hs: Vec<Holding>| -> Vec<(String, i64)> {
            hs.into_iter().map(|h| (h.symbol, h.shares)).collect()
        };
        let first = pairs(holdings(&conn, user_id).unwrap());
        let second = pairs(holdings(&conn, user_id).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn history_preserves_insertion_order() {
        let (mut conn, user_id) = test_conn();
        buy(&mut conn, user_id, "AAPL", 10, Cents::new(15_000), "2024-01-02 10:00:00").unwrap();
        sell(&mut conn, user_id, "AAPL", 5, Cents::new(16_000), "2024-01-02 11:00:00").unwrap();
        buy(&mut conn, user_id, "NFLX", 1, Cents::new(40_000), "2024-01-02 12:00:00").unwrap();

        let rows = history(&conn, user_id).unwrap();
        let shares: Vec<i64> = rows.iter().map(|r| r.shares).collect();
        assert_eq!(shares, vec![10, -5, 1]);
    }
}
