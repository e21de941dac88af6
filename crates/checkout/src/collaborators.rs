//! Narrow interfaces to the external collaborators.
//!
//! Every method is a suspension point: implementations call out to a catalog
//! service, cart store or stock ledger and resolve on response or error.
//!
//! ## Ledger contract
//!
//! `create_reservations` and `delete_reservations` are **batch** operations.
//! The checkout flow issues exactly one create per checkout attempt and never
//! one call per line item. The ledger owns stock accounting and any ordering or
//! locking it needs across concurrent carts.
//!
//! `delete_reservations` must accept ids it no longer holds and treat them as
//! deleted: a retried release resends ids whose line items could not be
//! cleared the first time.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use cutstock_core::{
    CartId, Entity, InventoryItemId, LineItemId, LocationId, ProductId, ReservationId, VariantId,
};
use cutstock_inventory::{QuantityPolicy, StockSnapshot};

use crate::error::ServiceResult;
use crate::metadata::LineItemMetadata;

/// A sellable variant as the catalog describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    pub manage_inventory: bool,
    #[serde(default)]
    pub inventory_item_id: Option<InventoryItemId>,
    #[serde(default)]
    pub metadata: Map<String, JsonValue>,
}

impl Entity for Variant {
    type Id = VariantId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A cart line item as the cart store persists it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub cart_id: CartId,
    pub variant_id: VariantId,
    /// Decimal quantity, already normalized when a policy applies.
    pub quantity: f64,
    #[serde(default)]
    pub metadata: LineItemMetadata,
}

impl Entity for LineItem {
    type Id = LineItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// One hold to place in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub inventory_item_id: InventoryItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<LocationId>,
    /// Base units.
    pub quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_item_id: Option<LineItemId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_id: Option<CartId>,
}

/// A hold the ledger created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedReservation {
    pub id: ReservationId,
    #[serde(default)]
    pub line_item_id: Option<LineItemId>,
}

/// Product catalog: variants and their quantity policies.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn resolve_variant(&self, variant_id: &VariantId) -> ServiceResult<Variant>;

    /// Variant-level policy, else the parent product's, else `None`.
    async fn resolve_quantity_policy(
        &self,
        variant_id: &VariantId,
    ) -> ServiceResult<Option<QuantityPolicy>>;
}

/// Stock ledger: the authoritative stock and reservation store.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn create_reservations(
        &self,
        requests: Vec<ReservationRequest>,
    ) -> ServiceResult<Vec<CreatedReservation>>;

    async fn delete_reservations(&self, ids: Vec<ReservationId>) -> ServiceResult<()>;

    async fn retrieve_stock(
        &self,
        inventory_item_id: &InventoryItemId,
        location_id: Option<&LocationId>,
    ) -> ServiceResult<StockSnapshot>;
}

/// Cart store: persists line items, their quantities and metadata.
#[async_trait]
pub trait Cart: Send + Sync {
    /// Line items in stored order.
    async fn list_line_items(&self, cart_id: &CartId) -> ServiceResult<Vec<LineItem>>;

    async fn get_line_item(&self, line_item_id: &LineItemId) -> ServiceResult<LineItem>;

    async fn add_line_item(
        &self,
        cart_id: &CartId,
        variant_id: &VariantId,
        quantity: f64,
    ) -> ServiceResult<LineItem>;

    async fn update_line_item_quantity(
        &self,
        line_item_id: &LineItemId,
        quantity: f64,
    ) -> ServiceResult<LineItem>;

    /// Replace the metadata object of a line item.
    async fn update_line_item_metadata(
        &self,
        line_item_id: &LineItemId,
        metadata: LineItemMetadata,
    ) -> ServiceResult<LineItem>;
}

#[async_trait]
impl<T> Catalog for Arc<T>
where
    T: Catalog + ?Sized,
{
    async fn resolve_variant(&self, variant_id: &VariantId) -> ServiceResult<Variant> {
        (**self).resolve_variant(variant_id).await
    }

    async fn resolve_quantity_policy(
        &self,
        variant_id: &VariantId,
    ) -> ServiceResult<Option<QuantityPolicy>> {
        (**self).resolve_quantity_policy(variant_id).await
    }
}

#[async_trait]
impl<T> Ledger for Arc<T>
where
    T: Ledger + ?Sized,
{
    async fn create_reservations(
        &self,
        requests: Vec<ReservationRequest>,
    ) -> ServiceResult<Vec<CreatedReservation>> {
        (**self).create_reservations(requests).await
    }

    async fn delete_reservations(&self, ids: Vec<ReservationId>) -> ServiceResult<()> {
        (**self).delete_reservations(ids).await
    }

    async fn retrieve_stock(
        &self,
        inventory_item_id: &InventoryItemId,
        location_id: Option<&LocationId>,
    ) -> ServiceResult<StockSnapshot> {
        (**self).retrieve_stock(inventory_item_id, location_id).await
    }
}

#[async_trait]
impl<T> Cart for Arc<T>
where
    T: Cart + ?Sized,
{
    async fn list_line_items(&self, cart_id: &CartId) -> ServiceResult<Vec<LineItem>> {
        (**self).list_line_items(cart_id).await
    }

    async fn get_line_item(&self, line_item_id: &LineItemId) -> ServiceResult<LineItem> {
        (**self).get_line_item(line_item_id).await
    }

    async fn add_line_item(
        &self,
        cart_id: &CartId,
        variant_id: &VariantId,
        quantity: f64,
    ) -> ServiceResult<LineItem> {
        (**self).add_line_item(cart_id, variant_id, quantity).await
    }

    async fn update_line_item_quantity(
        &self,
        line_item_id: &LineItemId,
        quantity: f64,
    ) -> ServiceResult<LineItem> {
        (**self).update_line_item_quantity(line_item_id, quantity).await
    }

    async fn update_line_item_metadata(
        &self,
        line_item_id: &LineItemId,
        metadata: LineItemMetadata,
    ) -> ServiceResult<LineItem> {
        (**self).update_line_item_metadata(line_item_id, metadata).await
    }
}
