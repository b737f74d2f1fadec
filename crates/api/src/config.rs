//! Application configuration loaded from environment variables.

use domain::RetryPolicy;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `CART_RETRY_ATTEMPTS`: attempts per cart or order command on a
///   concurrent write (default: `3`)
/// - `SEED_DEMO_CATALOG`: seed the in-memory catalog and ledger with demo
///   products (default: `true`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub cart_retry_attempts: u32,
    pub seed_demo_catalog: bool,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            cart_retry_attempts: lookup("CART_RETRY_ATTEMPTS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.cart_retry_attempts),
            seed_demo_catalog: lookup("SEED_DEMO_CATALOG")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.seed_demo_catalog),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.cart_retry_attempts)
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            cart_retry_attempts: 3,
            seed_demo_catalog: true,
        }
    }
}
