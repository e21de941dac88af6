//! In-memory collaborator adapters.
//!
//! Intended for tests/dev. Not optimized for performance.

mod cart;
mod catalog;
mod ledger;

pub use cart::InMemoryCart;
pub use catalog::InMemoryCatalog;
pub use ledger::{InMemoryLedger, LedgerCall, LedgerReservation};

use cutstock_checkout::ServiceError;

fn poisoned() -> ServiceError {
    ServiceError::unavailable("lock poisoned")
}
