//! Core types for Pawmart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod lenient;
pub mod pet;
pub mod price;

pub use cart::CartLineItem;
pub use id::*;
pub use pet::{Pet, PetType, PetTypeError};
pub use price::Price;
