//! Cart quantity gate.
//!
//! Runs on every line-item add and quantity update so that a persisted
//! quantity is always one the normalizer itself would produce. Add and update
//! share [`CartQuantityGate::normalize_for_variant`]; there is no second path.

use cutstock_core::{CartId, DomainError, DomainResult, LineItemId, VariantId};
use cutstock_inventory::{NormalizedQuantity, normalize_quantity};

use crate::collaborators::{Cart, Catalog, LineItem};
use crate::error::{CheckoutError, CheckoutResult};

/// A quantity that passed the gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatedQuantity {
    quantity: f64,
    normalized: Option<NormalizedQuantity>,
}

impl GatedQuantity {
    /// Decimal quantity to persist on the line item.
    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    /// `None` when the variant has no quantity policy (pass-through).
    pub fn normalized(&self) -> Option<&NormalizedQuantity> {
        self.normalized.as_ref()
    }

    pub fn was_rounded(&self) -> bool {
        self.normalized.is_some_and(|n| n.was_rounded())
    }
}

/// Outcome of a gated add/update.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// The cart store accepted the (possibly rounded) quantity.
    Accepted { line_item: LineItem, was_rounded: bool },
    /// The quantity was refused; `message` is shown next to the quantity input.
    Rejected { error: DomainError, message: String },
}

impl GateDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, GateDecision::Accepted { .. })
    }
}

pub struct CartQuantityGate<C, K> {
    catalog: C,
    cart: K,
}

impl<C, K> CartQuantityGate<C, K>
where
    C: Catalog,
    K: Cart,
{
    pub fn new(catalog: C, cart: K) -> Self {
        Self { catalog, cart }
    }

    /// Resolve the variant's policy and normalize `requested` against it.
    ///
    /// Without a policy the quantity passes through unchanged. Reserving it
    /// later requires a whole number for inventory-managed variants.
    pub async fn normalize_for_variant(
        &self,
        variant_id: &VariantId,
        requested: f64,
    ) -> CheckoutResult<GatedQuantity> {
        let policy = self
            .catalog
            .resolve_quantity_policy(variant_id)
            .await
            .map_err(CheckoutError::Catalog)?;

        match policy {
            Some(policy) => {
                let normalized = normalize_quantity(requested, &policy)?;
                Ok(GatedQuantity {
                    quantity: normalized.decimal(),
                    normalized: Some(normalized),
                })
            }
            None => Ok(GatedQuantity {
                quantity: pass_through(requested)?,
                normalized: None,
            }),
        }
    }

    #[tracing::instrument(skip_all, fields(cart_id = %cart_id, variant_id = %variant_id))]
    pub async fn add_line_item(
        &self,
        cart_id: &CartId,
        variant_id: &VariantId,
        requested: f64,
    ) -> CheckoutResult<GateDecision> {
        let gated = match self.gate(variant_id, requested).await? {
            Ok(gated) => gated,
            Err(rejected) => return Ok(rejected),
        };

        let line_item = self
            .cart
            .add_line_item(cart_id, variant_id, gated.quantity())
            .await
            .map_err(CheckoutError::Cart)?;

        Ok(GateDecision::Accepted {
            line_item,
            was_rounded: gated.was_rounded(),
        })
    }

    #[tracing::instrument(skip_all, fields(line_item_id = %line_item_id))]
    pub async fn update_line_item_quantity(
        &self,
        line_item_id: &LineItemId,
        requested: f64,
    ) -> CheckoutResult<GateDecision> {
        let existing = self
            .cart
            .get_line_item(line_item_id)
            .await
            .map_err(CheckoutError::Cart)?;

        let gated = match self.gate(&existing.variant_id, requested).await? {
            Ok(gated) => gated,
            Err(rejected) => return Ok(rejected),
        };

        let line_item = self
            .cart
            .update_line_item_quantity(line_item_id, gated.quantity())
            .await
            .map_err(CheckoutError::Cart)?;

        Ok(GateDecision::Accepted {
            line_item,
            was_rounded: gated.was_rounded(),
        })
    }

    /// Normalize, turning quantity errors into a rejection. Collaborator
    /// failures stay errors.
    async fn gate(
        &self,
        variant_id: &VariantId,
        requested: f64,
    ) -> CheckoutResult<Result<GatedQuantity, GateDecision>> {
        match self.normalize_for_variant(variant_id, requested).await {
            Ok(gated) => {
                if gated.was_rounded() {
                    tracing::debug!(requested, accepted = gated.quantity(), "quantity rounded");
                }
                Ok(Ok(gated))
            }
            Err(CheckoutError::Domain(error)) => {
                if error.is_user_correctable() {
                    tracing::debug!(requested, error = %error, "quantity rejected");
                } else {
                    tracing::error!(variant_id = %variant_id, error = %error, "quantity policy fault");
                }
                let message = error.user_message();
                Ok(Err(GateDecision::Rejected { error, message }))
            }
            Err(other) => Err(other),
        }
    }
}

fn pass_through(requested: f64) -> DomainResult<f64> {
    if !requested.is_finite() {
        return Err(DomainError::validation("quantity must be a number"));
    }
    if requested < 0.0 {
        return Err(DomainError::NegativeQuantity(requested));
    }
    Ok(requested)
}
