use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

use crate::error::AppError;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Create a read-write SQLite connection pool for the given database file,
/// creating the file on first run.
///
/// WAL mode lets portfolio/history reads proceed while a buy/sell write
/// transaction is open; foreign keys back the transactions → users
/// reference.
pub fn open_pool(path: &Path, max_size: u32) -> Result<DbPool, AppError> {
    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(())
    });
    Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| AppError::Db(e.to_string()))
}
