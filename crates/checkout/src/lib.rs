//! Piatto checkout engine.
//!
//! Client-side orchestration for the Piatto food-ordering mini-app:
//! a persistent cart, debounced delivery estimation, contact
//! acquisition through the embedding chat host, and order submission
//! with payment hand-off. [`session::CheckoutSession`] ties the pieces
//! together; the other modules are usable on their own.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod contact;
pub mod debounce;
pub mod delivery;
pub mod error;
pub mod host;
pub mod session;
pub mod submit;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::CheckoutConfig;
pub use error::{CheckoutError, Result};
pub use session::CheckoutSession;
pub use types::{
    Cart, CartItem, DeliveryMethod, DeliveryQuote, PaymentMethod, SubmitOutcome, UserContact,
};
