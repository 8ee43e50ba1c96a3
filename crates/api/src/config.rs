//! Environment configuration for the API binary.

use stockroom_infra::ApplyMode;

#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address, `BIND_ADDR` (default `0.0.0.0:8080`).
    pub bind_addr: String,
    /// Postgres connection string, `DATABASE_URL`. Absent means in-memory
    /// stores (dev/tests only; nothing is persisted).
    pub database_url: Option<String>,
    /// How approval applies inventory deltas, `APPROVAL_MODE`
    /// (`atomic` default, `best-effort` mirrors the legacy behavior).
    pub approval_mode: ApplyMode,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let database_url = std::env::var("DATABASE_URL").ok();
        if database_url.is_none() {
            tracing::warn!("DATABASE_URL not set; using in-memory stores (state is not persisted)");
        }

        let approval_mode = match std::env::var("APPROVAL_MODE") {
            Ok(raw) => raw
                .parse::<ApplyMode>()
                .map_err(|e| anyhow::anyhow!("APPROVAL_MODE: {e}"))?,
            Err(_) => ApplyMode::default(),
        };

        Ok(Self {
            bind_addr,
            database_url,
            approval_mode,
        })
    }
}
