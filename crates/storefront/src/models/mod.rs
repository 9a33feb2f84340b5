//! Session-scoped models for the storefront.

pub mod session;

pub use session::{cart_key, session_keys};
