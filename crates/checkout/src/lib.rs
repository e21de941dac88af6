//! Cart and checkout integration for fractional-unit inventory.
//!
//! Talks to three external collaborators through the traits in
//! [`collaborators`]: the catalog (variants and quantity policies), the cart
//! store (line items) and the stock ledger (reservations). Holds no stock
//! state of its own.

pub mod availability;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod gate;
pub mod metadata;
pub mod reservation;

pub use availability::{AvailabilityService, VariantAvailability};
pub use collaborators::{
    Cart, Catalog, CreatedReservation, Ledger, LineItem, ReservationRequest, Variant,
};
pub use config::CheckoutConfig;
pub use error::{CheckoutError, CheckoutResult, ServiceError, ServiceResult};
pub use gate::{CartQuantityGate, GateDecision, GatedQuantity};
pub use metadata::{LineItemMetadata, RESERVATION_ID_KEY};
pub use reservation::{
    CartReservationState, ReleaseSummary, ReservationOrchestrator, ReservedLineItem,
};
