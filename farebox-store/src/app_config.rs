use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub booking: BookingRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_secs() -> u64 {
    3
}

/// Policy knobs of the booking engine.
#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    /// Put seats back into both pools when a company rejects a booking.
    #[serde(default = "default_restore")]
    pub restore_inventory_on_reject: bool,
    /// Base URL the status token is appended to.
    #[serde(default = "default_status_link_base")]
    pub status_link_base: String,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            restore_inventory_on_reject: default_restore(),
            status_link_base: default_status_link_base(),
        }
    }
}

fn default_restore() -> bool {
    true
}

fn default_status_link_base() -> String {
    "http://localhost:3000/bookings/status".to_string()
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            // Environment-specific file, e.g. config/production.toml
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // FAREBOX__DATABASE__URL=... style environment overrides
            .add_source(config::Environment::with_prefix("FAREBOX").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_rules_default_to_restoring_inventory() {
        let rules = BookingRules::default();
        assert!(rules.restore_inventory_on_reject);
        assert!(!rules.status_link_base.is_empty());
    }

    #[test]
    fn database_config_fills_pool_defaults() {
        let db = DatabaseConfig::for_url("postgres://localhost/farebox");
        assert_eq!(db.max_connections, 5);
        assert_eq!(db.acquire_timeout_secs, 3);
    }
}
