//! Checkout engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CHECKOUT_API_BASE_URL` - Base URL of the ordering backend
//!
//! ## Optional
//! - `CHECKOUT_FALLBACK_DELIVERY_COST` - Cost assumed when the estimator is unreachable (default: 250)
//! - `CHECKOUT_DEBOUNCE_MS` - Quiet period after address keystrokes (default: 400)
//! - `CHECKOUT_CONTACT_TIMEOUT_MS` - How long to wait for a contact event (default: 8000)
//! - `CHECKOUT_CANCELLED_RETRY_DELAY_MS` - Pause before falling back after a cancelled contact request (default: 2000)
//! - `CHECKOUT_PICKUP_LOCATION_ID` - Pickup point sent on pickup orders (default: 1)
//! - `CHECKOUT_CART_PATH` - Directory for cart persistence files (default: in-memory only)

use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Checkout engine configuration.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Base URL of the ordering backend (the `/api/v1` prefix is appended
    /// per endpoint).
    pub api_base_url: String,
    /// Delivery cost assumed when the estimator endpoint is unreachable.
    /// The order still goes through at this cost rather than blocking.
    pub fallback_delivery_cost: Decimal,
    /// Quiet period applied to address input before estimating.
    pub debounce_delay: Duration,
    /// How long a contact request may stay unanswered before timing out.
    pub contact_timeout: Duration,
    /// Pause before consulting fallback phone sources after the user
    /// cancels the contact prompt.
    pub cancelled_retry_delay: Duration,
    /// Pickup point attached to pickup orders.
    pub pickup_location_id: i64,
    /// Directory for cart persistence files; `None` keeps the cart in
    /// memory. Consumed by `CheckoutSession::from_config`.
    pub cart_path: Option<String>,
}

impl CheckoutConfig {
    /// Configuration with production defaults for the given backend URL.
    #[must_use]
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            fallback_delivery_cost: Decimal::from(250),
            debounce_delay: Duration::from_millis(400),
            contact_timeout: Duration::from_millis(8000),
            cancelled_retry_delay: Duration::from_millis(2000),
            pickup_location_id: 1,
            cart_path: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `CHECKOUT_API_BASE_URL` is missing or any
    /// optional variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = get_required_env("CHECKOUT_API_BASE_URL")?;
        let fallback_delivery_cost =
            parse_env_or("CHECKOUT_FALLBACK_DELIVERY_COST", Decimal::from(250))?;
        let debounce_delay = duration_env_or("CHECKOUT_DEBOUNCE_MS", 400)?;
        let contact_timeout = duration_env_or("CHECKOUT_CONTACT_TIMEOUT_MS", 8000)?;
        let cancelled_retry_delay = duration_env_or("CHECKOUT_CANCELLED_RETRY_DELAY_MS", 2000)?;
        let pickup_location_id = parse_env_or("CHECKOUT_PICKUP_LOCATION_ID", 1_i64)?;
        let cart_path = get_optional_env("CHECKOUT_CART_PATH");

        Ok(Self {
            api_base_url,
            fallback_delivery_cost,
            debounce_delay,
            contact_timeout,
            cancelled_retry_delay,
            pickup_location_id,
            cart_path,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Parse an environment variable, falling back to a default when unset.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Parse a millisecond environment variable into a `Duration`.
fn duration_env_or(key: &str, default_ms: u64) -> Result<Duration, ConfigError> {
    Ok(Duration::from_millis(parse_env_or(key, default_ms)?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CheckoutConfig::new("https://api.example.test");
        assert_eq!(config.fallback_delivery_cost, Decimal::from(250));
        assert_eq!(config.debounce_delay, Duration::from_millis(400));
        assert_eq!(config.contact_timeout, Duration::from_millis(8000));
        assert_eq!(config.cancelled_retry_delay, Duration::from_millis(2000));
        assert_eq!(config.pickup_location_id, 1);
        assert!(config.cart_path.is_none());
    }

    #[test]
    fn test_parse_env_or_uses_default_when_unset() {
        let value: i64 = parse_env_or("CHECKOUT_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_duration_env_or_default() {
        let delay = duration_env_or("CHECKOUT_TEST_UNSET_DELAY", 400).unwrap();
        assert_eq!(delay, Duration::from_millis(400));
    }
}
