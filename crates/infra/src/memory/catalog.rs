use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

use cutstock_checkout::{Catalog, ServiceError, ServiceResult, Variant};
use cutstock_core::{Entity, ProductId, VariantId};
use cutstock_inventory::QuantityPolicy;

use super::poisoned;

/// In-memory catalog of variants and product-level metadata.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    variants: RwLock<HashMap<VariantId, Variant>>,
    products: RwLock<HashMap<ProductId, Map<String, JsonValue>>>,
    unavailable: RwLock<HashSet<VariantId>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_variant(&self, variant: Variant) -> ServiceResult<()> {
        self.variants
            .write()
            .map_err(|_| poisoned())?
            .insert(variant.id().clone(), variant);
        Ok(())
    }

    pub fn insert_product_metadata(
        &self,
        product_id: ProductId,
        metadata: Map<String, JsonValue>,
    ) -> ServiceResult<()> {
        self.products
            .write()
            .map_err(|_| poisoned())?
            .insert(product_id, metadata);
        Ok(())
    }

    /// Make every lookup of `variant_id` fail as if the catalog were down.
    pub fn fail_lookups_for(&self, variant_id: VariantId) -> ServiceResult<()> {
        self.unavailable
            .write()
            .map_err(|_| poisoned())?
            .insert(variant_id);
        Ok(())
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn resolve_variant(&self, variant_id: &VariantId) -> ServiceResult<Variant> {
        if self.unavailable.read().map_err(|_| poisoned())?.contains(variant_id) {
            return Err(ServiceError::unavailable(format!(
                "catalog lookup failed for {variant_id}"
            )));
        }
        self.variants
            .read()
            .map_err(|_| poisoned())?
            .get(variant_id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("variant", variant_id.as_str()))
    }

    async fn resolve_quantity_policy(
        &self,
        variant_id: &VariantId,
    ) -> ServiceResult<Option<QuantityPolicy>> {
        let variant = self.resolve_variant(variant_id).await?;
        let products = self.products.read().map_err(|_| poisoned())?;
        let product_metadata = variant
            .product_id
            .as_ref()
            .and_then(|product_id| products.get(product_id));

        QuantityPolicy::resolve(Some(&variant.metadata), product_metadata)
            .map_err(|e| ServiceError::Malformed(format!("variant {variant_id}: {e}")))
    }
}
