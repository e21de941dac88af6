//! `cutstock-core` — shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! the error taxonomy used across inventory policy and reservation flows, and
//! the strongly-typed identifiers that travel between collaborators.

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CartId, InventoryItemId, LineItemId, LocationId, ProductId, ReservationId, VariantId};
pub use value_object::ValueObject;
