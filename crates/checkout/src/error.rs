//! Unified error handling for the checkout engine.
//!
//! Each subsystem defines its own error enum (`ApiError`, `SubmitError`,
//! `HostError`, ...); `CheckoutError` unifies them at the session surface.
//! Embedders should treat `Result<T, CheckoutError>` as the engine's
//! public error contract.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::host::HostError;
use crate::submit::SubmitError;
use piatto_core::PhoneError;

/// Top-level error type for the checkout session.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Configuration loading failed.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Backend API operation failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// A phone number could not be canonicalized.
    #[error("Phone error: {0}")]
    Phone(#[from] PhoneError),

    /// Order submission failed a precondition or a backend step.
    #[error("Submit error: {0}")]
    Submit(#[from] SubmitError),

    /// A host capability failed.
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    /// A submission is already running; the duplicate call was rejected.
    #[error("A submission is already in progress")]
    SubmissionInFlight,
}

/// Result type alias for `CheckoutError`.
pub type Result<T> = std::result::Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CheckoutError::SubmissionInFlight;
        assert_eq!(err.to_string(), "A submission is already in progress");

        let err = CheckoutError::Host(HostError::AlreadyRequested);
        assert_eq!(
            err.to_string(),
            "Host error: a contact request is already in progress"
        );
    }
}
