//! Variant availability lookups for storefront display.

use serde::Serialize;

use cutstock_core::{DomainError, LocationId, VariantId};
use cutstock_inventory::{AvailabilityReport, QuantityPolicy, StockStatus};

use crate::collaborators::{Catalog, Ledger};
use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, CheckoutResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VariantAvailability {
    /// Stock is not tracked for this variant; it is always sellable.
    Unmanaged,
    Tracked(AvailabilityReport),
}

impl VariantAvailability {
    pub fn status(&self) -> StockStatus {
        match self {
            VariantAvailability::Unmanaged => StockStatus::InStock,
            VariantAvailability::Tracked(report) => report.status,
        }
    }

    pub fn report(&self) -> Option<&AvailabilityReport> {
        match self {
            VariantAvailability::Unmanaged => None,
            VariantAvailability::Tracked(report) => Some(report),
        }
    }
}

pub struct AvailabilityService<C, L> {
    catalog: C,
    ledger: L,
    config: CheckoutConfig,
}

impl<C, L> AvailabilityService<C, L>
where
    C: Catalog,
    L: Ledger,
{
    pub fn new(catalog: C, ledger: L, config: CheckoutConfig) -> Self {
        Self {
            catalog,
            ledger,
            config,
        }
    }

    /// Read the ledger snapshot for a variant and evaluate it under the variant's policy.
    ///
    /// Variants without a policy are evaluated in whole units.
    pub async fn availability_for_variant(
        &self,
        variant_id: &VariantId,
        location_id: Option<&LocationId>,
    ) -> CheckoutResult<VariantAvailability> {
        let variant = self
            .catalog
            .resolve_variant(variant_id)
            .await
            .map_err(CheckoutError::Catalog)?;
        if !variant.manage_inventory {
            return Ok(VariantAvailability::Unmanaged);
        }
        let Some(inventory_item_id) = variant.inventory_item_id.as_ref() else {
            tracing::error!(variant_id = %variant_id, "inventory-managed variant has no inventory item");
            return Err(DomainError::MissingInventoryMapping {
                variant_id: variant_id.to_string(),
            }
            .into());
        };

        let policy = match self
            .catalog
            .resolve_quantity_policy(variant_id)
            .await
            .map_err(CheckoutError::Catalog)?
        {
            Some(policy) => policy,
            None => QuantityPolicy::new(1.0)?,
        };

        let location_id = location_id.or(self.config.default_location_id.as_ref());
        let snapshot = self
            .ledger
            .retrieve_stock(inventory_item_id, location_id)
            .await
            .map_err(CheckoutError::Ledger)?;

        let report = AvailabilityReport::evaluate(
            &snapshot,
            &policy,
            self.config.low_stock_threshold,
            self.config.include_incoming_in_ats,
        )?;
        Ok(VariantAvailability::Tracked(report))
    }
}
