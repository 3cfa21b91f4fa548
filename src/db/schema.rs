use rusqlite::Connection;

use crate::error::AppError;

/// Create tables on startup if they don't exist.
///
/// Money columns are INTEGER cents — never formatted strings. The
/// transactions table is the append-only ledger; nothing updates or
/// deletes rows in it.
pub fn init(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
             id            INTEGER PRIMARY KEY AUTOINCREMENT,
             username      TEXT NOT NULL UNIQUE,
             password_hash TEXT NOT NULL,
             cash_cents    INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS transactions (
             id            INTEGER PRIMARY KEY AUTOINCREMENT,
             user_id       INTEGER NOT NULL REFERENCES users(id),
             symbol        TEXT NOT NULL,
             shares        INTEGER NOT NULL,
             price_cents   INTEGER NOT NULL,
             transacted_at TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_transactions_user_symbol
             ON transactions(user_id, symbol);",
    )?;
    Ok(())
}
