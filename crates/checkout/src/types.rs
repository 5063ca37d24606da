//! Domain types for the checkout flow.
//!
//! These types are the engine's authoritative view of the order being
//! built. Wire-level shapes live in [`crate::api::wire`]; the conversion
//! between the two happens at the API boundary.

use piatto_core::{OrderId, PhoneNumber, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Cart
// =============================================================================

/// A single line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Catalog product this line refers to.
    pub product_id: ProductId,
    /// Display name captured at add time.
    pub name: String,
    /// Price per unit.
    pub unit_price: Decimal,
    /// Quantity, always >= 1 (a zero quantity removes the line).
    pub quantity: u32,
    /// Product image reference for rendering.
    pub image_ref: String,
}

impl CartItem {
    /// Line subtotal: `unit_price * quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The cart: an insertion-ordered sequence of lines plus a derived total.
///
/// `total_amount` is recomputed after every mutation and never read from
/// a stale cache; see [`Cart::recompute_total`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub total_amount: Decimal,
}

impl Cart {
    /// An empty cart with a zero total.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Recompute `total_amount` from the current lines.
    pub fn recompute_total(&mut self) {
        self.total_amount = self.items.iter().map(CartItem::subtotal).sum();
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Contact
// =============================================================================

/// The user identity attached to an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContact {
    /// Name shown on the order; empty until a profile or host payload
    /// supplies one.
    pub display_name: String,
    /// Canonical phone number, absent until acquired.
    pub phone: Option<PhoneNumber>,
}

impl UserContact {
    /// Whether the contact is complete enough to submit an order.
    #[must_use]
    pub fn has_identity(&self) -> bool {
        !self.display_name.trim().is_empty()
    }
}

// =============================================================================
// Delivery
// =============================================================================

/// How the order reaches the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryMethod {
    Delivery,
    Pickup,
}

/// A delivery cost verdict for one address at one subtotal.
///
/// Quotes are recomputed on every (debounced) address edit and on every
/// delivery-method change; stale quotes are discarded, never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryQuote {
    /// Whether delivery is available to the quoted address at all.
    pub available: bool,
    /// Delivery cost; zero when unavailable or free.
    pub cost: Decimal,
    /// Pricing zone the address resolved to, when known.
    pub zone_name: Option<String>,
    /// Subtotal above which delivery becomes free, when the zone has one.
    pub free_threshold: Option<Decimal>,
}

impl DeliveryQuote {
    /// A quote for an address delivery cannot reach (or one too short to
    /// look up).
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            available: false,
            cost: Decimal::ZERO,
            zone_name: None,
            free_threshold: None,
        }
    }

    /// Distinct "free delivery" condition: available at zero cost.
    ///
    /// Not to be confused with [`DeliveryQuote::unavailable`], which also
    /// carries a zero cost.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.available && self.cost == Decimal::ZERO
    }
}

// =============================================================================
// Payment & submission
// =============================================================================

/// How the order is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Push payment requiring a redirect to an external confirmation URL.
    Sbp,
    /// Cash on delivery/pickup; accepted without a payment redirect.
    Cash,
}

/// Terminal (or deferred) result of a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Order and payment created; the user must be redirected to pay.
    RedirectToPay { order_id: OrderId, url: String },
    /// Order accepted without an online payment step.
    Accepted { order_id: OrderId },
    /// Submission deferred until a phone number is acquired; resumes
    /// automatically when contact acquisition succeeds.
    PendingContact,
}
