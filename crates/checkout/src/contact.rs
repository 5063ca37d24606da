//! Contact acquisition state machine.
//!
//! The engine needs a phone number before it can submit an order. The
//! host can prompt the user to share one, but the prompt is asymmetric:
//! the request is fire-and-forget and the answer arrives later as an
//! event whose schema varies across host versions. This module owns the
//! episode lifecycle (one open request at a time, timeout, cancellation)
//! and the canonicalizing event parser; the session drives the host
//! calls and fallback sources around it.

use tracing::debug;

use crate::host::ContactEvent;

/// Identity fields extracted from an accepted contact event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactFragment {
    /// Name parts joined, when the payload carried any.
    pub display_name: Option<String>,
    /// Raw phone string, not yet canonicalized.
    pub phone: String,
}

/// What a contact event means for the open episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The user shared a contact; the episode is closed.
    Accepted(ContactFragment),
    /// The user declined the prompt; the episode is closed and fallback
    /// sources should be consulted after a grace delay.
    Cancelled,
    /// The payload matched no known shape; the episode stays open and
    /// the event is dropped.
    Unrecognized,
    /// No episode is open; the event is stale and must be ignored.
    Ignored,
}

/// Episode phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Phase {
    #[default]
    Idle,
    Requested,
}

/// Tracks the contact handshake with the host.
///
/// Guarantees a single open request: [`ContactAcquisition::try_begin`]
/// refuses to start an episode while one is already open, so the host is
/// never asked twice concurrently.
#[derive(Debug, Default)]
pub struct ContactAcquisition {
    phase: Phase,
    manual_required: bool,
}

impl ContactAcquisition {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an episode. Returns `false` without side effects when one is
    /// already open; the caller must then not re-prompt the host.
    pub fn try_begin(&mut self) -> bool {
        if self.phase == Phase::Requested {
            return false;
        }
        self.phase = Phase::Requested;
        true
    }

    /// Whether an episode is currently open.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.phase == Phase::Requested
    }

    /// Whether every automatic source has been exhausted and the user
    /// must type the phone number in.
    #[must_use]
    pub fn manual_required(&self) -> bool {
        self.manual_required
    }

    /// Record that automatic acquisition is out of options.
    pub fn require_manual(&mut self) {
        self.manual_required = true;
        self.phase = Phase::Idle;
    }

    /// A manually entered (or fallback-sourced) phone closed the gap.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.manual_required = false;
    }

    /// Close the open episode because the host never answered.
    pub fn note_timeout(&mut self) {
        if self.phase == Phase::Requested {
            self.phase = Phase::Idle;
            self.manual_required = true;
        }
    }

    /// Interpret a contact event against the current episode.
    pub fn resolve(&mut self, event: &ContactEvent) -> Resolution {
        if self.phase != Phase::Requested {
            return Resolution::Ignored;
        }
        match parse_event(event) {
            Resolution::Accepted(fragment) => {
                self.phase = Phase::Idle;
                self.manual_required = false;
                Resolution::Accepted(fragment)
            }
            Resolution::Cancelled => {
                self.phase = Phase::Idle;
                Resolution::Cancelled
            }
            other => other,
        }
    }
}

/// Map a contact event to its meaning, tolerating every payload shape
/// observed in the wild.
///
/// Shapes handled, in order:
/// - explicit cancellation status
/// - nested `contact` block carrying a phone
/// - bare top-level contact fields carrying a phone
///
/// Anything else is [`Resolution::Unrecognized`] and gets dropped rather
/// than guessed at.
#[must_use]
pub fn parse_event(event: &ContactEvent) -> Resolution {
    if let Some(status) = event.status.as_deref()
        && status.eq_ignore_ascii_case("cancelled")
    {
        return Resolution::Cancelled;
    }

    if let Some(contact) = &event.contact
        && let Some(phone) = non_empty(contact.phone_number.as_deref())
    {
        return Resolution::Accepted(ContactFragment {
            display_name: join_name(contact.first_name.as_deref(), contact.last_name.as_deref()),
            phone,
        });
    }

    if let Some(phone) = non_empty(event.phone_number.as_deref()) {
        return Resolution::Accepted(ContactFragment {
            display_name: join_name(event.first_name.as_deref(), event.last_name.as_deref()),
            phone,
        });
    }

    debug!(status = ?event.status, "Dropping contact event with unrecognized shape");
    Resolution::Unrecognized
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn join_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let name = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if name.is_empty() { None } else { Some(name) }
}
