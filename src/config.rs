use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::money::Cents;

/// Service configuration derived from environment variables.
///
/// Everything has a default except the quote-provider credential: the
/// process refuses to start without one.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub static_dir: PathBuf,
    pub quote_url: String,
    pub quote_api_key: String,
    pub starting_cash: Cents,
    pub session_ttl: Duration,
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_path(name: &str, default: &str) -> PathBuf {
    PathBuf::from(env_str(name, default))
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // `API_KEY` is the name the original deployment used; keep it as a
        // fallback so existing env files work unchanged.
        let quote_api_key = env::var("PAPERTRADE_QUOTE_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "PAPERTRADE_QUOTE_API_KEY (or API_KEY) not set".to_string())?;

        let starting_dollars = env_f64("PAPERTRADE_STARTING_CASH", 10_000.0);
        let starting_cash = Cents::from_dollars(starting_dollars)
            .filter(|c| !c.is_negative())
            .ok_or_else(|| {
                format!("PAPERTRADE_STARTING_CASH is not a valid amount: {starting_dollars}")
            })?;

        Ok(Self {
            bind: env_str("PAPERTRADE_BIND", "127.0.0.1"),
            port: env_u16("PAPERTRADE_PORT", 8080),
            db_path: env_path("PAPERTRADE_DB", "papertrade.db"),
            static_dir: env_path("PAPERTRADE_STATIC_DIR", "frontend/dist"),
            quote_url: env_str("PAPERTRADE_QUOTE_URL", "https://cloud.iexapis.com/stable"),
            quote_api_key,
            starting_cash,
            session_ttl: Duration::from_secs(env_u64("PAPERTRADE_SESSION_TTL_S", 86_400)),
        })
    }
}
