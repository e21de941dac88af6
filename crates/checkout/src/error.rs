//! Checkout error model.

use thiserror::Error;

use cutstock_core::{DomainError, LineItemId};

/// Result type returned by collaborator adapters.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type returned by checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

/// Failure reported by an external collaborator (catalog, cart store, ledger).
///
/// These are **infrastructure errors** as opposed to domain errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The collaborator returned data this crate cannot interpret.
    #[error("malformed record: {0}")]
    Malformed(String),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// Error returned by the cart gate, reservation orchestrator and availability lookups.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("catalog: {0}")]
    Catalog(#[source] ServiceError),

    #[error("cart: {0}")]
    Cart(#[source] ServiceError),

    #[error("ledger: {0}")]
    Ledger(#[source] ServiceError),

    /// The ledger released every hold, but `pending` line items still record
    /// a reservation id. Retrying the release clears them.
    #[error("release incomplete for {} line item(s): {source}", .pending.len())]
    ReleaseIncomplete {
        pending: Vec<LineItemId>,
        #[source]
        source: ServiceError,
    },
}

impl CheckoutError {
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            CheckoutError::Domain(e) => Some(e),
            _ => None,
        }
    }

    /// Text suitable for showing to a buyer.
    pub fn user_message(&self) -> String {
        match self {
            CheckoutError::Domain(e) => e.user_message(),
            CheckoutError::Catalog(_)
            | CheckoutError::Cart(_)
            | CheckoutError::Ledger(_)
            | CheckoutError::ReleaseIncomplete { .. } => {
                "something went wrong, please retry".to_string()
            }
        }
    }
}
