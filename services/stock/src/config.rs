use std::time::Duration;

use anyhow::Context;

use crate::domain::types::DEFAULT_OVERRIDE_KEY;
use crate::usecase::consume::DEFAULT_CONSUME_TIMEOUT;

/// Stock service configuration loaded from environment variables.
#[derive(Debug)]
pub struct StockConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port to listen on (default 3120). Env var: `STOCK_PORT`.
    pub stock_port: u16,
    /// Override key code. Env var: `OVERRIDE_KEY`; empty disables the override.
    pub override_key: Option<String>,
    /// Whether `override_key` fell back to the built-in default.
    pub override_key_is_default: bool,
    /// Upper bound on one consumption. Env var: `CONSUME_TIMEOUT_MS`.
    pub consume_timeout: Duration,
}

impl StockConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let stock_port = match var("STOCK_PORT") {
            Some(v) => v
                .parse()
                .with_context(|| format!("invalid STOCK_PORT: {v:?}"))?,
            None => 3120,
        };

        let (override_key, override_key_is_default) = match var("OVERRIDE_KEY") {
            Some(v) if v.is_empty() => (None, false),
            Some(v) => (Some(v), false),
            None => (Some(DEFAULT_OVERRIDE_KEY.to_owned()), true),
        };

        let consume_timeout = match var("CONSUME_TIMEOUT_MS") {
            Some(v) => {
                let ms: u64 = v
                    .parse()
                    .with_context(|| format!("invalid CONSUME_TIMEOUT_MS: {v:?}"))?;
                anyhow::ensure!(ms > 0, "CONSUME_TIMEOUT_MS must be positive");
                Duration::from_millis(ms)
            }
            None => DEFAULT_CONSUME_TIMEOUT,
        };

        Ok(Self {
            database_url,
            stock_port,
            override_key,
            override_key_is_default,
            consume_timeout,
        })
    }
}
