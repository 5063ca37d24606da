//! Piatto Core - Shared types library.
//!
//! This crate provides common types used across all Piatto components:
//! - `checkout` - The checkout orchestration engine
//! - the host-facing UI layer (external to this workspace)
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no
//! storage access. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and phone numbers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
