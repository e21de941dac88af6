//! Reservation orchestration for checkout.
//!
//! A cart's reservations are created and released as one unit:
//!
//! ```text
//! unreserved -> reserving -> reserved -> releasing -> unreserved
//! ```
//!
//! `reserving` and `releasing` only exist while an orchestration call is in
//! flight; the persisted state is derived from line-item metadata
//! ([`CartReservationState::from_line_items`]).
//!
//! Invariant: a live reservation always has its id recorded on its line item,
//! and a recorded id always refers to a live reservation. Two gaps exist:
//!
//! - a crash between the ledger commit and the metadata writes; such
//!   reservations can only be found by a sweep against the ledger.
//! - a metadata strip failing after a release was committed; the call returns
//!   [`CheckoutError::ReleaseIncomplete`] and the next release clears the
//!   stale ids (the ledger treats them as already deleted).
//!
//! No mutual exclusion is provided across carts. ATS is read and then acted
//! upon, so two checkouts on the same inventory item may both proceed against
//! a stale snapshot; serializing per inventory item is the ledger's job.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use cutstock_core::{CartId, DomainError, Entity, LineItemId, LocationId, ReservationId};
use cutstock_inventory::{QuantityPolicy, RoundingMode};

use crate::collaborators::{Cart, Catalog, CreatedReservation, Ledger, LineItem, ReservationRequest};
use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, CheckoutResult};

/// Reservation lifecycle of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartReservationState {
    Unreserved,
    Reserving,
    Reserved,
    Releasing,
}

impl CartReservationState {
    /// Persisted state: `Reserved` iff any line item records a reservation.
    pub fn from_line_items(items: &[LineItem]) -> Self {
        if items.iter().any(|item| item.metadata.reservation_id().is_some()) {
            CartReservationState::Reserved
        } else {
            CartReservationState::Unreserved
        }
    }

    pub fn is_transient(self) -> bool {
        matches!(
            self,
            CartReservationState::Reserving | CartReservationState::Releasing
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CartReservationState::Unreserved => "unreserved",
            CartReservationState::Reserving => "reserving",
            CartReservationState::Reserved => "reserved",
            CartReservationState::Releasing => "releasing",
        }
    }
}

/// A line item and the reservation now recorded on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedLineItem {
    pub line_item_id: LineItemId,
    pub reservation_id: ReservationId,
}

/// What a release call did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseSummary {
    pub released: Vec<ReservedLineItem>,
    /// Line items that carried no reservation.
    pub skipped: usize,
}

/// A reservation request paired with the line item it was built from.
struct PendingReservation {
    line_item: LineItem,
    request: ReservationRequest,
}

pub struct ReservationOrchestrator<C, L, K> {
    catalog: C,
    ledger: L,
    cart: K,
    config: CheckoutConfig,
}

impl<C, L, K> ReservationOrchestrator<C, L, K>
where
    C: Catalog,
    L: Ledger,
    K: Cart,
{
    pub fn new(catalog: C, ledger: L, cart: K, config: CheckoutConfig) -> Self {
        Self {
            catalog,
            ledger,
            cart,
            config,
        }
    }

    /// Current persisted reservation state of a cart.
    pub async fn reservation_state(&self, cart_id: &CartId) -> CheckoutResult<CartReservationState> {
        let items = self
            .cart
            .list_line_items(cart_id)
            .await
            .map_err(CheckoutError::Cart)?;
        Ok(CartReservationState::from_line_items(&items))
    }

    /// Reserve stock for every inventory-managed line item of a cart, all or nothing.
    ///
    /// Line items are written only after the ledger confirmed one reservation
    /// per request. Any failure before that point leaves the cart unreserved.
    #[tracing::instrument(skip_all, fields(cart_id = %cart_id))]
    pub async fn reserve_on_checkout_start(
        &self,
        cart_id: &CartId,
        location_id: Option<&LocationId>,
    ) -> CheckoutResult<Vec<ReservedLineItem>> {
        let items = self
            .cart
            .list_line_items(cart_id)
            .await
            .map_err(CheckoutError::Cart)?;
        if items.is_empty() {
            return Ok(vec![]);
        }
        if CartReservationState::from_line_items(&items) == CartReservationState::Reserved {
            return Err(DomainError::conflict(format!(
                "cart {cart_id} already holds reservations; release them first"
            ))
            .into());
        }

        let location_id = location_id
            .cloned()
            .or_else(|| self.config.default_location_id.clone());
        tracing::debug!(state = CartReservationState::Reserving.as_str(), items = items.len());

        let pending = self.build_requests(cart_id, items, location_id).await?;
        if pending.is_empty() {
            return Ok(vec![]);
        }

        let requests: Vec<ReservationRequest> =
            pending.iter().map(|p| p.request.clone()).collect();
        let created = self
            .ledger
            .create_reservations(requests)
            .await
            .map_err(|e| DomainError::reservation_failed(e.to_string()))?;

        let paired = match pair_results(&pending, &created) {
            Some(paired) => paired,
            None => {
                self.compensate(&created).await;
                return Err(DomainError::ReservationMismatch {
                    requested: pending.len(),
                    returned: created.len(),
                }
                .into());
            }
        };

        let reserved = self.record_reservations(paired).await?;
        tracing::info!(
            state = CartReservationState::Reserved.as_str(),
            reservations = reserved.len(),
            "cart reserved"
        );
        Ok(reserved)
    }

    /// Release every reservation recorded on a cart's line items.
    ///
    /// Idempotent: items without a `reservation_id` are skipped, and a cart
    /// with none makes no ledger call at all.
    ///
    /// If the ledger delete fails nothing is stripped. If stripping fails for
    /// some items the others are still cleared, and the call fails with
    /// [`CheckoutError::ReleaseIncomplete`] naming the items to retry.
    #[tracing::instrument(skip_all, fields(cart_id = %cart_id))]
    pub async fn release_reservations(&self, cart_id: &CartId) -> CheckoutResult<ReleaseSummary> {
        let items = self
            .cart
            .list_line_items(cart_id)
            .await
            .map_err(CheckoutError::Cart)?;

        let mut summary = ReleaseSummary::default();
        let mut held = Vec::new();
        for item in items {
            match item.metadata.reservation_id() {
                Some(reservation_id) => held.push((item, reservation_id)),
                None => summary.skipped += 1,
            }
        }
        if held.is_empty() {
            return Ok(summary);
        }

        tracing::debug!(state = CartReservationState::Releasing.as_str(), reservations = held.len());

        let ids = held.iter().map(|(_, id)| id.clone()).collect();
        self.ledger
            .delete_reservations(ids)
            .await
            .map_err(CheckoutError::Ledger)?;

        let mut pending = Vec::new();
        let mut first_error = None;
        for (item, reservation_id) in held {
            let stripped = self
                .cart
                .update_line_item_metadata(item.id(), item.metadata.without_reservation_id())
                .await;
            match stripped {
                Ok(_) => summary.released.push(ReservedLineItem {
                    line_item_id: item.id,
                    reservation_id,
                }),
                Err(e) => {
                    tracing::error!(
                        line_item_id = %item.id,
                        reservation_id = %reservation_id,
                        error = %e,
                        "released reservation id left on line item"
                    );
                    pending.push(item.id);
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(source) = first_error {
            return Err(CheckoutError::ReleaseIncomplete { pending, source });
        }

        tracing::info!(
            state = CartReservationState::Unreserved.as_str(),
            released = summary.released.len(),
            "cart reservations released"
        );
        Ok(summary)
    }

    /// Resolve every line item before touching the ledger. Any catalog failure
    /// or missing inventory mapping aborts the whole batch.
    async fn build_requests(
        &self,
        cart_id: &CartId,
        items: Vec<LineItem>,
        location_id: Option<LocationId>,
    ) -> CheckoutResult<Vec<PendingReservation>> {
        let mut pending = Vec::with_capacity(items.len());

        for item in items {
            let variant = self
                .catalog
                .resolve_variant(&item.variant_id)
                .await
                .map_err(CheckoutError::Catalog)?;

            if !variant.manage_inventory {
                tracing::debug!(line_item_id = %item.id, "variant not inventory-managed; skipping");
                continue;
            }

            let Some(inventory_item_id) = variant.inventory_item_id.clone() else {
                tracing::error!(
                    variant_id = %variant.id,
                    line_item_id = %item.id,
                    "inventory-managed variant has no inventory item"
                );
                return Err(DomainError::MissingInventoryMapping {
                    variant_id: variant.id.to_string(),
                }
                .into());
            };

            let policy = self
                .catalog
                .resolve_quantity_policy(&item.variant_id)
                .await
                .map_err(CheckoutError::Catalog)?;
            let quantity = reservation_units(item.quantity, policy.as_ref())?;

            pending.push(PendingReservation {
                request: ReservationRequest {
                    inventory_item_id,
                    location_id: location_id.clone(),
                    quantity,
                    line_item_id: Some(item.id.clone()),
                    cart_id: Some(cart_id.clone()),
                },
                line_item: item,
            });
        }

        Ok(pending)
    }

    /// Delete whatever a failed batch left behind in the ledger.
    async fn compensate(&self, created: &[CreatedReservation]) {
        if created.is_empty() {
            return;
        }
        let ids: Vec<ReservationId> = created.iter().map(|r| r.id.clone()).collect();
        tracing::warn!(reservations = ids.len(), "reservation batch mismatch; compensating");
        if let Err(e) = self.ledger.delete_reservations(ids.clone()).await {
            tracing::error!(
                error = %e,
                reservation_ids = ?ids,
                "compensating delete failed; reservations stranded in ledger"
            );
        }
    }

    /// Write each reservation id onto its line item.
    ///
    /// If a write fails, the whole batch is deleted from the ledger and ids
    /// already written are stripped again, so the cart ends up unreserved.
    async fn record_reservations(
        &self,
        paired: Vec<(LineItem, ReservationId)>,
    ) -> CheckoutResult<Vec<ReservedLineItem>> {
        let mut written: Vec<&LineItem> = Vec::with_capacity(paired.len());
        let mut reserved = Vec::with_capacity(paired.len());

        for (item, reservation_id) in &paired {
            let metadata = item.metadata.with_reservation_id(reservation_id);
            if let Err(e) = self.cart.update_line_item_metadata(&item.id, metadata).await {
                tracing::error!(
                    line_item_id = %item.id,
                    error = %e,
                    "failed to record reservation on line item; rolling back batch"
                );
                self.roll_back(&paired, &written).await;
                return Err(CheckoutError::Cart(e));
            }
            written.push(item);
            reserved.push(ReservedLineItem {
                line_item_id: item.id.clone(),
                reservation_id: reservation_id.clone(),
            });
        }

        Ok(reserved)
    }

    async fn roll_back(&self, paired: &[(LineItem, ReservationId)], written: &[&LineItem]) {
        let ids: Vec<ReservationId> = paired.iter().map(|(_, id)| id.clone()).collect();
        if let Err(e) = self.ledger.delete_reservations(ids.clone()).await {
            // Recorded ids stay in place so a later release can retry them.
            tracing::error!(
                error = %e,
                reservation_ids = ?ids,
                "rollback delete failed; reservations stranded in ledger"
            );
            return;
        }
        for item in written {
            if let Err(e) = self
                .cart
                .update_line_item_metadata(&item.id, item.metadata.clone())
                .await
            {
                tracing::error!(
                    line_item_id = %item.id,
                    error = %e,
                    "failed to clear reservation id during rollback"
                );
            }
        }
    }
}

/// Largest drift from the grid still treated as float noise.
const GRID_TOLERANCE: f64 = 1e-9;

/// Convert a persisted decimal quantity into ledger base units.
///
/// Items without a policy are counted in whole units. A quantity off the grid
/// is refused: holding a different amount than the line item states would
/// break the reservation.
fn reservation_units(quantity: f64, policy: Option<&QuantityPolicy>) -> CheckoutResult<i64> {
    let policy = match policy {
        Some(policy) => *policy,
        None => QuantityPolicy::new(1.0)?,
    };
    let scale = policy.scale()?;
    let units = scale.to_base_units(quantity, RoundingMode::Nearest)?;

    if (scale.from_base_units(units) - quantity).abs() > GRID_TOLERANCE {
        return Err(DomainError::validation(format!(
            "quantity {quantity} is not a multiple of {}",
            policy.min_increment()
        ))
        .into());
    }
    if units == 0 && quantity > 0.0 {
        return Err(DomainError::validation(format!(
            "quantity {quantity} is below the smallest reservable amount"
        ))
        .into());
    }
    Ok(units)
}

/// Pair ledger results with pending requests, 1:1.
///
/// When every result names its line item they are matched by id; otherwise
/// results are taken in request order, and any result that does name a line
/// item must name the one at its position. Returns `None` on any count or id
/// mismatch.
fn pair_results(
    pending: &[PendingReservation],
    created: &[CreatedReservation],
) -> Option<Vec<(LineItem, ReservationId)>> {
    if created.len() != pending.len() {
        return None;
    }
    let unique: HashSet<&ReservationId> = created.iter().map(|r| &r.id).collect();
    if unique.len() != created.len() {
        return None;
    }

    if created.iter().all(|r| r.line_item_id.is_some()) {
        let mut by_line_item: HashMap<&LineItemId, &ReservationId> = HashMap::new();
        for r in created {
            let line_item_id = r.line_item_id.as_ref()?;
            if by_line_item.insert(line_item_id, &r.id).is_some() {
                return None;
            }
        }
        pending
            .iter()
            .map(|p| {
                by_line_item
                    .get(p.line_item.id())
                    .map(|id| (p.line_item.clone(), (*id).clone()))
            })
            .collect()
    } else {
        pending
            .iter()
            .zip(created)
            .map(|(p, r)| match &r.line_item_id {
                Some(named) if named != p.line_item.id() => None,
                _ => Some((p.line_item.clone(), r.id.clone())),
            })
            .collect()
    }
}
