//! Wire-level request/response shapes for the ordering backend.
//!
//! Field names follow the backend's camelCase JSON. Response types keep
//! every field optional where the backend has been observed to omit them,
//! with interpretation helpers (`redirect_url`, `best_name`) doing the
//! shape tolerance in one place.

use piatto_core::{OrderId, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Authentication & profile
// =============================================================================

/// Authentication request carrying the host's session-init payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    /// Raw signed payload from the embedding host.
    pub init_data: String,
    /// Stable per-installation identifier.
    pub device_id: String,
}

/// Authenticated session issued by the backend.
///
/// The token is wrapped into a `SecretString` as soon as it crosses the
/// API boundary; this struct only carries it off the wire.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    /// Bearer token for subsequent requests.
    pub token: String,
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// User profile as the backend knows it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    /// Some backend versions send `phone`, others `phoneNumber`.
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl UserProfile {
    /// Best display name available: full name, then username.
    #[must_use]
    pub fn best_name(&self) -> Option<String> {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !name.is_empty() {
            return Some(name);
        }
        self.username
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .map(String::from)
    }

    /// Phone from whichever field the backend populated.
    #[must_use]
    pub fn best_phone(&self) -> Option<&str> {
        self.phone
            .as_deref()
            .or(self.phone_number.as_deref())
            .filter(|p| !p.trim().is_empty())
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One line to add to the remote cart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

// =============================================================================
// Delivery estimation
// =============================================================================

/// Delivery estimate for one address at one subtotal.
///
/// Every field is optional: the zonal estimator omits what it cannot
/// determine, and an all-absent body still deserializes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryEstimateResponse {
    #[serde(default)]
    pub delivery_available: Option<bool>,
    #[serde(default)]
    pub delivery_cost: Option<Decimal>,
    #[serde(default)]
    pub zone_name: Option<String>,
    #[serde(default)]
    pub free_delivery_threshold: Option<Decimal>,
    #[serde(default)]
    pub is_delivery_free: Option<bool>,
    #[serde(default)]
    pub estimated_time: Option<String>,
    /// Human-readable reason, typically set when delivery is unavailable.
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Orders
// =============================================================================

/// Order creation request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub contact_name: String,
    pub contact_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub payment_method: crate::types::PaymentMethod,
    pub delivery_method: crate::types::DeliveryMethod,
    /// Courier address; absent on pickup orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    /// Pickup point; absent on courier orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_location_id: Option<i64>,
    pub delivery_cost: Decimal,
}

/// Created order as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub id: OrderId,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub total_amount: Option<Decimal>,
}

// =============================================================================
// Payments
// =============================================================================

/// Payment creation request for push payments.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub order_id: OrderId,
    pub payment_method: crate::types::PaymentMethod,
}

/// Nested confirmation block used by the payment provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmationBlock {
    #[serde(default)]
    pub confirmation_url: Option<String>,
}

/// Created payment. The confirmation URL has been observed both nested
/// under `confirmation` and flattened as a top-level `confirmationUrl`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfirmation {
    #[serde(default)]
    pub confirmation: Option<ConfirmationBlock>,
    #[serde(default, rename = "confirmationUrl")]
    pub confirmation_url: Option<String>,
}

impl PaymentConfirmation {
    /// The URL the user must be redirected to, whichever shape carried it.
    #[must_use]
    pub fn redirect_url(&self) -> Option<&str> {
        self.confirmation
            .as_ref()
            .and_then(|c| c.confirmation_url.as_deref())
            .or(self.confirmation_url.as_deref())
            .filter(|url| !url.trim().is_empty())
    }
}
