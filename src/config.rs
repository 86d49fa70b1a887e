//! Configuration — spec §6.5, read from the process environment the way
//! the teacher has no analogue for (a Solana program reads no env vars at
//! runtime; this is a pure ambient-stack addition).

use std::env;

use crate::constants::{DEFAULT_ACTION_TIMEOUT_SECONDS, DEFAULT_RECONNECT_GRACE_MS};
use crate::error::{GameError, GameResult};

#[derive(Clone, Debug)]
pub struct Config {
    pub listen_port: u16,
    pub cache_host: String,
    pub cache_port: u16,
    pub cache_db: i64,
    pub directory_url: String,
    pub reconnect_grace_ms: u64,
    pub default_action_timeout_sec: u64,
    pub auth_token_secret: String,
    pub mode: Mode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Production,
    Test,
}

impl Config {
    pub fn from_env() -> GameResult<Self> {
        let mode = match env::var("MODE").as_deref() {
            Ok("test") => Mode::Test,
            _ => Mode::Production,
        };

        Ok(Config {
            listen_port: parse_env("LISTEN_PORT", 8080)?,
            cache_host: env::var("CACHE_HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            cache_port: parse_env("CACHE_PORT", 6379)?,
            cache_db: parse_env("CACHE_DB", 0)?,
            directory_url: env::var("DIRECTORY_URL").unwrap_or_else(|_| "http://localhost:4000".into()),
            reconnect_grace_ms: parse_env("RECONNECT_GRACE_MS", DEFAULT_RECONNECT_GRACE_MS)?,
            default_action_timeout_sec: parse_env("DEFAULT_ACTION_TIMEOUT_SEC", DEFAULT_ACTION_TIMEOUT_SECONDS)?,
            auth_token_secret: env::var("AUTH_TOKEN_SECRET").unwrap_or_default(),
            mode,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> GameResult<T> {
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| GameError::InvariantViolation(format!("{key} is not a valid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_env_is_unset() {
        env::remove_var("LISTEN_PORT");
        env::remove_var("MODE");
        let config = Config::from_env().unwrap();
        assert_eq!(config.listen_port, 8080);
        assert_eq!(config.mode, Mode::Production);
    }

    #[test]
    fn mode_test_is_recognized() {
        env::set_var("MODE", "test");
        let config = Config::from_env().unwrap();
        assert_eq!(config.mode, Mode::Test);
        env::remove_var("MODE");
    }
}
