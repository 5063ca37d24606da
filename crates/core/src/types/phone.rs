//! Phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input does not match any accepted Russian number form.
    #[error(
        "unrecognized phone format: expected a Russian number (+7/7/8 prefix with 11 digits, or 10 bare digits), got {digits} digits"
    )]
    UnrecognizedFormat {
        /// Number of digits found in the input.
        digits: usize,
    },
    /// Normalization produced a string that fails the canonical-form check.
    #[error("phone number failed canonical formatting")]
    Malformed,
}

/// A Russian mobile phone number in canonical MSISDN form.
///
/// The canonical form is always `+7` followed by exactly 10 subscriber
/// digits (12 characters total). Parsing is tolerant of the forms users
/// and host callbacks actually produce:
///
/// - `79161234567` (country code, 11 digits)
/// - `89161234567` (trunk prefix, 11 digits)
/// - `9161234567` (bare subscriber number, 10 digits)
/// - `+79161234567` (already canonical)
///
/// Spacing and punctuation are stripped before matching. Parsing is
/// idempotent: a canonical number parses to itself.
///
/// ## Examples
///
/// ```
/// use piatto_core::PhoneNumber;
///
/// let phone = PhoneNumber::parse("8 (916) 123-45-67").unwrap();
/// assert_eq!(phone.as_str(), "+79161234567");
///
/// // Idempotent on canonical input
/// assert_eq!(PhoneNumber::parse("+79161234567").unwrap(), phone);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Length of a canonical number: `+7` plus 10 subscriber digits.
    pub const CANONICAL_LENGTH: usize = 12;

    /// Parse a `PhoneNumber` from a string, normalizing to `+7XXXXXXXXXX`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or its digits do not match
    /// any accepted Russian number form.
    pub fn parse(input: &str) -> Result<Self, PhoneError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PhoneError::Empty);
        }

        let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();

        let formatted = if digits.len() == 11 && digits.starts_with('7') {
            format!("+{digits}")
        } else if digits.len() == 11 && digits.starts_with('8') {
            format!("+7{}", digits.get(1..).unwrap_or_default())
        } else if digits.len() == 10 {
            format!("+7{digits}")
        } else {
            return Err(PhoneError::UnrecognizedFormat {
                digits: digits.len(),
            });
        };

        if formatted.len() != Self::CANONICAL_LENGTH || !formatted.starts_with("+7") {
            return Err(PhoneError::Malformed);
        }

        Ok(Self(formatted))
    }

    /// Returns the canonical number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `PhoneNumber` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
