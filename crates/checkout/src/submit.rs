//! Order submission pipeline.
//!
//! Submission validates preconditions in a fixed order, reconciles the
//! remote cart with the local one, creates the order, and runs the
//! payment step the chosen method requires. The local cart is the source
//! of truth: the remote cart is cleared and rebuilt line by line so the
//! backend bills exactly what the user sees.
//!
//! A missing phone number is not an error: it resolves to
//! [`SubmitOutcome::PendingContact`] so the session can run contact
//! acquisition and resume the submission afterwards.

use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, instrument};

use crate::api::wire::CreateOrderRequest;
use crate::api::{ApiError, RemoteApi};
use crate::types::{Cart, DeliveryMethod, DeliveryQuote, PaymentMethod, SubmitOutcome, UserContact};

/// Errors that fail a submission attempt.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Nothing in the cart to order.
    #[error("Cart is empty")]
    EmptyCart,

    /// No display name to attach to the order.
    #[error("Contact name is missing")]
    MissingIdentity,

    /// Courier delivery selected but no address entered.
    #[error("Delivery address is missing")]
    MissingAddress,

    /// Courier delivery selected but the address cannot be served.
    #[error("Delivery is not available for this address")]
    DeliveryUnavailable,

    /// The payment provider answered without a confirmation URL.
    #[error("Payment response carried no confirmation URL")]
    InvalidPaymentResponse,

    /// A backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Everything a single submission attempt needs, captured up front so
/// concurrent edits cannot change the order mid-flight.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub cart: Cart,
    pub contact: UserContact,
    pub delivery_method: DeliveryMethod,
    /// Courier address; ignored on pickup orders.
    pub address: Option<String>,
    /// Current delivery quote; required for courier orders.
    pub quote: Option<DeliveryQuote>,
    pub payment_method: PaymentMethod,
    pub comment: Option<String>,
    /// Pickup point sent on pickup orders.
    pub pickup_location_id: i64,
}

/// Runs the submission pipeline against the backend.
pub struct OrderSubmitter {
    api: Arc<dyn RemoteApi>,
}

impl OrderSubmitter {
    #[must_use]
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    /// Validate and submit an order.
    ///
    /// Preconditions are checked in a fixed order before any network
    /// call: empty cart, missing name, missing phone (which defers
    /// rather than fails), then for courier orders missing address and
    /// unavailable delivery.
    ///
    /// # Errors
    ///
    /// Returns `SubmitError` on a failed precondition, a failed backend
    /// call, or a payment response without a confirmation URL.
    #[instrument(skip(self, request), fields(method = ?request.delivery_method, payment = ?request.payment_method))]
    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmitOutcome, SubmitError> {
        if request.cart.is_empty() {
            return Err(SubmitError::EmptyCart);
        }
        if !request.contact.has_identity() {
            return Err(SubmitError::MissingIdentity);
        }
        let Some(phone) = request.contact.phone.clone() else {
            return Ok(SubmitOutcome::PendingContact);
        };

        let (delivery_address, delivery_location_id, delivery_cost) = match request.delivery_method
        {
            DeliveryMethod::Delivery => {
                let address = request
                    .address
                    .as_deref()
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .ok_or(SubmitError::MissingAddress)?;
                let quote = request
                    .quote
                    .as_ref()
                    .filter(|quote| quote.available)
                    .ok_or(SubmitError::DeliveryUnavailable)?;
                (Some(address.to_string()), None, quote.cost)
            }
            DeliveryMethod::Pickup => (None, Some(request.pickup_location_id), Decimal::ZERO),
        };

        // Rebuild the remote cart from local truth before ordering.
        self.api.clear_cart().await?;
        for line in &request.cart.items {
            self.api.add_cart_item(line.product_id, line.quantity).await?;
        }

        let order = self
            .api
            .create_order(&CreateOrderRequest {
                contact_name: request.contact.display_name.clone(),
                contact_phone: phone.to_string(),
                comment: request
                    .comment
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(String::from),
                payment_method: request.payment_method,
                delivery_method: request.delivery_method,
                delivery_address,
                delivery_location_id,
                delivery_cost,
            })
            .await?;

        info!(order_id = %order.id, "Order created");

        match request.payment_method {
            PaymentMethod::Sbp => {
                let payment = self
                    .api
                    .create_payment(order.id, request.payment_method)
                    .await?;
                let url = payment
                    .redirect_url()
                    .ok_or(SubmitError::InvalidPaymentResponse)?;
                Ok(SubmitOutcome::RedirectToPay {
                    order_id: order.id,
                    url: url.to_string(),
                })
            }
            PaymentMethod::Cash => Ok(SubmitOutcome::Accepted { order_id: order.id }),
        }
    }
}
