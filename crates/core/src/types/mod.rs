//! Core types for Piatto.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod phone;

pub use id::{OrderId, ProductId};
pub use phone::{PhoneError, PhoneNumber};
