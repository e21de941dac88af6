use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use cutstock_checkout::{CreatedReservation, Ledger, ReservationRequest, ServiceError, ServiceResult};
use cutstock_core::{InventoryItemId, LocationId, ReservationId};
use cutstock_inventory::StockSnapshot;

use super::poisoned;

/// A call the ledger received, recorded for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    CreateReservations(Vec<ReservationRequest>),
    DeleteReservations(Vec<ReservationId>),
    RetrieveStock(InventoryItemId),
}

/// A live reservation held by the in-memory ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReservation {
    pub id: ReservationId,
    pub request: ReservationRequest,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Faults {
    fail_next_create: Option<String>,
    truncate_next_create: Option<usize>,
    fail_deletes: Option<String>,
}

#[derive(Debug, Default)]
struct LedgerState {
    // Insertion order kept so reservation listings are deterministic.
    reservations: Vec<LedgerReservation>,
    stock: HashMap<InventoryItemId, StockSnapshot>,
    calls: Vec<LedgerCall>,
    faults: Faults,
}

/// In-memory stock ledger.
///
/// Stock is tracked per inventory item; locations are recorded on
/// reservations but do not partition stock. Reserved units reported by
/// [`Ledger::retrieve_stock`] are the seeded value plus every live reservation.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_stock(
        &self,
        inventory_item_id: InventoryItemId,
        snapshot: StockSnapshot,
    ) -> ServiceResult<()> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        state.stock.insert(inventory_item_id, snapshot);
        Ok(())
    }

    /// Fail the next `create_reservations` call without creating anything.
    pub fn fail_next_create(&self, reason: impl Into<String>) -> ServiceResult<()> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        state.faults.fail_next_create = Some(reason.into());
        Ok(())
    }

    /// Make the next `create_reservations` call create (and return) only the
    /// first `count` requests.
    pub fn truncate_next_create(&self, count: usize) -> ServiceResult<()> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        state.faults.truncate_next_create = Some(count);
        Ok(())
    }

    /// Fail every `delete_reservations` call until cleared with `None`.
    pub fn fail_deletes(&self, reason: Option<String>) -> ServiceResult<()> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        state.faults.fail_deletes = reason;
        Ok(())
    }

    pub fn reservations(&self) -> Vec<LedgerReservation> {
        self.state
            .lock()
            .map(|state| state.reservations.clone())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.state
            .lock()
            .map(|state| state.calls.clone())
            .unwrap_or_default()
    }

    pub fn create_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, LedgerCall::CreateReservations(_)))
            .count()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn create_reservations(
        &self,
        requests: Vec<ReservationRequest>,
    ) -> ServiceResult<Vec<CreatedReservation>> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        state.calls.push(LedgerCall::CreateReservations(requests.clone()));

        if let Some(reason) = state.faults.fail_next_create.take() {
            return Err(ServiceError::unavailable(reason));
        }
        if let Some(bad) = requests.iter().find(|r| r.quantity < 0) {
            return Err(ServiceError::Malformed(format!(
                "negative reservation quantity for {}",
                bad.inventory_item_id
            )));
        }

        let keep = state
            .faults
            .truncate_next_create
            .take()
            .unwrap_or(requests.len());

        let now = Utc::now();
        let mut created = Vec::with_capacity(keep);
        for request in requests.into_iter().take(keep) {
            let id = ReservationId::new(format!("res_{}", Uuid::now_v7().simple()));
            created.push(CreatedReservation {
                id: id.clone(),
                line_item_id: request.line_item_id.clone(),
            });
            state.reservations.push(LedgerReservation {
                id,
                request,
                created_at: now,
            });
        }

        tracing::debug!(created = created.len(), "ledger reservations created");
        Ok(created)
    }

    async fn delete_reservations(&self, ids: Vec<ReservationId>) -> ServiceResult<()> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        state.calls.push(LedgerCall::DeleteReservations(ids.clone()));

        if let Some(reason) = state.faults.fail_deletes.clone() {
            return Err(ServiceError::unavailable(reason));
        }

        // Ids that are already gone count as deleted.
        state.reservations.retain(|r| !ids.contains(&r.id));
        Ok(())
    }

    async fn retrieve_stock(
        &self,
        inventory_item_id: &InventoryItemId,
        _location_id: Option<&LocationId>,
    ) -> ServiceResult<StockSnapshot> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        state
            .calls
            .push(LedgerCall::RetrieveStock(inventory_item_id.clone()));

        let base = state
            .stock
            .get(inventory_item_id)
            .copied()
            .ok_or_else(|| ServiceError::not_found("inventory item", inventory_item_id.as_str()))?;
        let held: i64 = state
            .reservations
            .iter()
            .filter(|r| &r.request.inventory_item_id == inventory_item_id)
            .map(|r| r.request.quantity)
            .sum();

        Ok(StockSnapshot {
            reserved_units: base.reserved_units + held,
            ..base
        })
    }
}
