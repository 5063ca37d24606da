//! Host-shell capability surface.
//!
//! The engine runs embedded inside a chat host that exposes a small
//! capability/event SDK: contact sharing, alerts, link navigation, and a
//! session-init payload. [`HostShell`] abstracts that surface so the
//! engine can be driven by the real shell in production and by scripted
//! shells in tests.
//!
//! Contact events arrive through a typed subscription
//! ([`HostShell::contact_events`]) rather than ad-hoc callback rewiring;
//! dropping the receiver disposes of the subscription.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors surfaced by host capabilities.
#[derive(Debug, Error, Clone)]
pub enum HostError {
    /// The shell rejects a second contact request while one is open.
    #[error("a contact request is already in progress")]
    AlreadyRequested,

    /// The capability is missing on this host version.
    #[error("capability not supported by host: {0}")]
    Unsupported(String),
}

/// Contact payload attached to a [`ContactEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPayload {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// Asynchronous callback delivered after a contact request.
///
/// The schema is not fully reliable across host versions: the payload may
/// sit under `contact`, appear as bare top-level fields, or be missing
/// entirely with only a status. The canonicalizing parser lives in
/// [`crate::contact`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEvent {
    /// `sent` / `allowed` / `cancelled`, when the host sends one.
    #[serde(default)]
    pub status: Option<String>,
    /// Structured contact payload, when present.
    #[serde(default)]
    pub contact: Option<ContactPayload>,
    /// Fallback shape: contact fields inlined at the top level.
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// User data carried in the host's session-init payload.
///
/// May already contain a phone number, which serves as an auxiliary
/// contact source when the handshake is cancelled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl SessionUser {
    /// First and last name joined, when either is present.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() { None } else { Some(name) }
    }
}

/// Capability surface the embedding chat host exposes to the engine.
pub trait HostShell: Send + Sync {
    /// Ask the host to prompt the user for their phone contact.
    ///
    /// Fire-and-forget: the answer arrives later as a [`ContactEvent`].
    ///
    /// # Errors
    ///
    /// Returns [`HostError::AlreadyRequested`] if a request is already
    /// open, or [`HostError::Unsupported`] on hosts without the
    /// capability.
    fn request_contact(&self) -> Result<(), HostError>;

    /// Subscribe to contact events. Drop the receiver to unsubscribe.
    fn contact_events(&self) -> broadcast::Receiver<ContactEvent>;

    /// User data from the session-init payload, when the host provides it.
    fn session_user(&self) -> Option<SessionUser>;

    /// Raw session-init payload for authentication, when available.
    fn init_data(&self) -> Option<String>;

    /// Show a blocking alert to the user.
    fn show_alert(&self, message: &str);

    /// Navigate the user to an external URL (e.g. a payment page).
    fn open_link(&self, url: &str);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_event_deserializes_official_shape() {
        let event: ContactEvent = serde_json::from_str(
            r#"{"status":"sent","contact":{"first_name":"Ivan","phone_number":"+79161234567"}}"#,
        )
        .unwrap();
        assert_eq!(event.status.as_deref(), Some("sent"));
        assert_eq!(
            event.contact.unwrap().phone_number.as_deref(),
            Some("+79161234567")
        );
    }

    #[test]
    fn test_event_deserializes_bare_shape() {
        let event: ContactEvent =
            serde_json::from_str(r#"{"first_name":"Ivan","phone_number":"89161234567"}"#).unwrap();
        assert!(event.status.is_none());
        assert_eq!(event.phone_number.as_deref(), Some("89161234567"));
    }

    #[test]
    fn test_session_user_full_name() {
        let user = SessionUser {
            first_name: Some("Ivan".to_string()),
            last_name: Some("Petrov".to_string()),
            phone_number: None,
        };
        assert_eq!(user.full_name().as_deref(), Some("Ivan Petrov"));

        let nameless = SessionUser::default();
        assert!(nameless.full_name().is_none());
    }
}
