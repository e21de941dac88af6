//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Buyer-facing message for any reservation fault.
pub const RESERVATION_RETRY_MESSAGE: &str = "unable to reserve stock, please retry";

/// Domain-level error.
///
/// Covers deterministic quantity/policy failures and the reservation faults the
/// checkout flow must react to. Transport and storage failures of external
/// collaborators are modelled separately by the checkout crate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// A quantity policy is malformed (e.g. `min_increment <= 0`).
    #[error("invalid quantity policy: {0}")]
    InvalidPolicy(String),

    /// A requested quantity was negative.
    #[error("quantity cannot be negative (got {0})")]
    NegativeQuantity(f64),

    /// A requested quantity is below the policy's minimum cut.
    #[error("quantity {requested} is below the minimum cut of {min_cut}")]
    BelowMinimumCut { requested: f64, min_cut: f64 },

    /// An inventory-managed variant has no inventory item mapped to it.
    #[error("variant {variant_id} is inventory-managed but has no inventory item")]
    MissingInventoryMapping { variant_id: String },

    /// The ledger rejected or failed the bulk reservation call.
    #[error("reservation failed: {0}")]
    ReservationFailed(String),

    /// The ledger returned a result set that does not line up 1:1 with the requests.
    #[error("reservation result mismatch (requested: {requested}, returned: {returned})")]
    ReservationMismatch { requested: usize, returned: usize },

    /// A value failed validation (e.g. a non-finite quantity).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation conflicts with current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A requested resource was not found (domain-level).
    #[error("not found: {0}")]
    NotFound(String),
}

impl DomainError {
    pub fn invalid_policy(msg: impl Into<String>) -> Self {
        Self::InvalidPolicy(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn reservation_failed(msg: impl Into<String>) -> Self {
        Self::ReservationFailed(msg.into())
    }

    /// Whether the buyer can fix this by changing their input.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            DomainError::NegativeQuantity(_)
                | DomainError::BelowMinimumCut { .. }
                | DomainError::Validation(_)
        )
    }

    /// Whether this is a reservation fault reported by (or about) the ledger.
    pub fn is_reservation_fault(&self) -> bool {
        matches!(
            self,
            DomainError::ReservationFailed(_) | DomainError::ReservationMismatch { .. }
        )
    }

    /// Text suitable for showing to a buyer.
    ///
    /// Configuration faults never leak their details here; they are reported to
    /// operators through logs instead.
    pub fn user_message(&self) -> String {
        match self {
            DomainError::NegativeQuantity(_) => "quantity cannot be negative".to_string(),
            DomainError::BelowMinimumCut { min_cut, .. } => format!("minimum order is {min_cut}"),
            DomainError::Validation(msg) => msg.clone(),
            DomainError::ReservationFailed(_) | DomainError::ReservationMismatch { .. } => {
                RESERVATION_RETRY_MESSAGE.to_string()
            }
            DomainError::Conflict(_) => "this cart is already being checked out".to_string(),
            DomainError::NotFound(_) => "item not found".to_string(),
            DomainError::InvalidPolicy(_) | DomainError::MissingInventoryMapping { .. } => {
                "this item cannot be purchased right now".to_string()
            }
        }
    }
}
