use rusqlite::{params, Connection};

use crate::error::AppError;
use crate::money::Cents;

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub cash: Cents,
}

/// Insert a new user with the configured starting balance.
///
/// Usernames are case-sensitive and unique; a constraint violation maps to
/// `UsernameTaken` so registration doesn't need a separate existence probe.
pub fn create(
    conn: &Connection,
    username: &str,
    password_hash: &str,
    starting_cash: Cents,
) -> Result<i64, AppError> {
    let result = conn.execute(
        "INSERT INTO users (username, password_hash, cash_cents) VALUES (?1, ?2, ?3)",
        params![username, password_hash, starting_cash.raw()],
    );
    match result {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(AppError::UsernameTaken)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn find_by_username(conn: &Connection, username: &str) -> Result<Option<User>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, username, password_hash, cash_cents FROM users WHERE username = ?1",
    )?;
    let result = stmt.query_row(params![username], |row| {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            cash: Cents::new(row.get(3)?),
        })
    });
    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn fetch_cash(conn: &Connection, user_id: i64) -> Result<Cents, AppError> {
    let cents: i64 = conn.query_row(
        "SELECT cash_cents FROM users WHERE id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(Cents::new(cents))
}
