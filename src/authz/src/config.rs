//! Engine configuration

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Environment variable names read by [`EngineConfig::from_env`]
pub const ENV_ENABLE_AUDIT: &str = "AUTHZ_ENABLE_AUDIT";
pub const ENV_CACHE_EXPRESSIONS: &str = "AUTHZ_CACHE_EXPRESSIONS";
pub const ENV_DATABASE_URL: &str = "AUTHZ_DATABASE_URL";
pub const ENV_MAX_CONNECTIONS: &str = "AUTHZ_MAX_CONNECTIONS";

/// Authorization engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Record every decision in the audit log
    pub enable_audit: bool,

    /// Keep compiled condition expressions between checks
    pub cache_expressions: bool,

    /// PostgreSQL connection string (used with the `postgres` feature)
    pub database_url: Option<String>,

    /// Connection pool size
    pub max_connections: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_audit: true,
            cache_expressions: true,
            database_url: None,
            max_connections: 10,
        }
    }
}

impl EngineConfig {
    /// Read configuration from `AUTHZ_*` environment variables
    ///
    /// Absent or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            enable_audit: lookup(ENV_ENABLE_AUDIT)
                .and_then(|raw| parse_flag(ENV_ENABLE_AUDIT, &raw))
                .unwrap_or(defaults.enable_audit),
            cache_expressions: lookup(ENV_CACHE_EXPRESSIONS)
                .and_then(|raw| parse_flag(ENV_CACHE_EXPRESSIONS, &raw))
                .unwrap_or(defaults.cache_expressions),
            database_url: lookup(ENV_DATABASE_URL)
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty())
                .or(defaults.database_url),
            max_connections: lookup(ENV_MAX_CONNECTIONS)
                .and_then(|raw| match raw.trim().parse::<u32>() {
                    Ok(n) if n > 0 => Some(n),
                    _ => {
                        warn!("Ignoring invalid {}='{}'", ENV_MAX_CONNECTIONS, raw);
                        None
                    }
                })
                .unwrap_or(defaults.max_connections),
        }
    }

    pub fn with_audit(mut self, enabled: bool) -> Self {
        self.enable_audit = enabled;
        self
    }

    pub fn with_expression_cache(mut self, enabled: bool) -> Self {
        self.cache_expressions = enabled;
        self
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }
}

fn parse_flag(key: &str, raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!("Ignoring invalid {}='{}'", key, raw);
            None
        }
    }
}
