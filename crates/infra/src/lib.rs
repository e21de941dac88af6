//! Infrastructure layer: adapters for the external collaborators.
//!
//! Only in-memory adapters live here today. They back local development and
//! the integration tests, and the ledger adapter can inject faults (failed or
//! partial batches, failing deletes) to exercise compensation paths.

pub mod memory;

pub use memory::{InMemoryCart, InMemoryCatalog, InMemoryLedger, LedgerCall, LedgerReservation};
