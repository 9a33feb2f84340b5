//! Pawmart Core - Shared types library.
//!
//! This crate provides the domain types shared by all Pawmart components:
//! - `storefront` - Shopper-facing storefront (pets, cart panel, checkout)
//! - `integration-tests` - Cross-crate tests against in-process fakes
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. Identifier
//! and price coercion happens here, during deserialization, so the rest of
//! the workspace only ever sees strongly-typed values.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, pets and cart line items

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
