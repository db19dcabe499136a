//! Environment variable handling.

use std::env;
use thiserror::Error;

use crate::types::CourierConfig;

/// Environment variable errors.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("failed to load .env file: {0}")]
    DotenvError(#[from] dotenvy::Error),
}

/// Environment variable names.
pub mod vars {
    pub const COURIER_ENV: &str = "COURIER_ENV";

    // Overrides
    pub const COURIER_RETRY_MAX_ATTEMPTS: &str = "COURIER_RETRY_MAX_ATTEMPTS";
    pub const COURIER_RETRY_INITIAL_DELAY_MS: &str = "COURIER_RETRY_INITIAL_DELAY_MS";
    pub const COURIER_HTTP_TIMEOUT_SECS: &str = "COURIER_HTTP_TIMEOUT_SECS";

    // Development
    pub const RUST_LOG: &str = "RUST_LOG";
}

/// Environment configuration.
pub struct Environment {
    _guard: (), // Prevent construction outside module
}

impl Environment {
    /// Initialize environment from .env files.
    pub fn init() -> Result<Self, EnvError> {
        // Later files override earlier ones
        let _ = dotenvy::from_filename(".env");
        let _ = dotenvy::from_filename(".env.local");

        if let Ok(env) = env::var(vars::COURIER_ENV) {
            let _ = dotenvy::from_filename(format!(".env.{}", env));
        }

        Ok(Self { _guard: () })
    }

    /// Get an integer variable.
    pub fn get_int<T: std::str::FromStr>(var: &str) -> Result<Option<T>, EnvError> {
        match env::var(var) {
            Ok(v) => v.parse().map(Some).map_err(|_| EnvError::InvalidValue {
                var: var.to_string(),
                message: "expected integer".to_string(),
            }),
            Err(_) => Ok(None),
        }
    }

    /// Apply `COURIER_*` overrides on top of a loaded config.
    pub fn apply_overrides(config: &mut CourierConfig) -> Result<(), EnvError> {
        if let Some(attempts) = Self::get_int(vars::COURIER_RETRY_MAX_ATTEMPTS)? {
            config.retry.max_attempts = attempts;
        }
        if let Some(delay) = Self::get_int(vars::COURIER_RETRY_INITIAL_DELAY_MS)? {
            config.retry.initial_delay_ms = delay;
        }
        if let Some(timeout) = Self::get_int(vars::COURIER_HTTP_TIMEOUT_SECS)? {
            config.http.request_timeout_secs = timeout;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_parsing() {
        env::set_var("COURIER_TEST_INT", "42");
        let val: Result<Option<i32>, _> = Environment::get_int("COURIER_TEST_INT");
        assert_eq!(val.unwrap(), Some(42));

        env::set_var("COURIER_TEST_INT", "invalid");
        let val: Result<Option<i32>, _> = Environment::get_int("COURIER_TEST_INT");
        assert!(val.is_err());

        env::remove_var("COURIER_TEST_INT");
        let val: Result<Option<i32>, _> = Environment::get_int("COURIER_TEST_INT");
        assert_eq!(val.unwrap(), None);
    }

    #[test]
    fn test_apply_overrides() {
        env::set_var(vars::COURIER_RETRY_MAX_ATTEMPTS, "6");
        env::set_var(vars::COURIER_HTTP_TIMEOUT_SECS, "12");

        let mut config = CourierConfig::default();
        Environment::apply_overrides(&mut config).unwrap();

        assert_eq!(config.retry.max_attempts, 6);
        assert_eq!(config.http.request_timeout_secs, 12);
        assert_eq!(config.retry.initial_delay_ms, 500);

        env::remove_var(vars::COURIER_RETRY_MAX_ATTEMPTS);
        env::remove_var(vars::COURIER_HTTP_TIMEOUT_SECS);
    }

    #[test]
    fn test_environment_init() {
        assert!(Environment::init().is_ok());
    }
}
