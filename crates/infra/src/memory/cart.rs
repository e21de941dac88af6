use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use cutstock_checkout::{Cart, LineItem, LineItemMetadata, ServiceError, ServiceResult};
use cutstock_core::{CartId, Entity, LineItemId, VariantId};

use super::poisoned;

/// In-memory cart store. Line items keep insertion order.
#[derive(Debug, Default)]
pub struct InMemoryCart {
    items: RwLock<Vec<LineItem>>,
    failing_metadata_writes: RwLock<HashSet<LineItemId>>,
    metadata_writes: RwLock<Vec<LineItemId>>,
}

impl InMemoryCart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a line item directly, bypassing any gate.
    pub fn insert_line_item(&self, item: LineItem) -> ServiceResult<()> {
        self.items.write().map_err(|_| poisoned())?.push(item);
        Ok(())
    }

    pub fn line_item(&self, line_item_id: &LineItemId) -> Option<LineItem> {
        self.items
            .read()
            .ok()?
            .iter()
            .find(|item| item.id() == line_item_id)
            .cloned()
    }

    /// Make metadata writes for `line_item_id` fail.
    pub fn fail_metadata_writes_for(&self, line_item_id: LineItemId) -> ServiceResult<()> {
        self.failing_metadata_writes
            .write()
            .map_err(|_| poisoned())?
            .insert(line_item_id);
        Ok(())
    }

    /// Undo [`InMemoryCart::fail_metadata_writes_for`].
    pub fn allow_metadata_writes_for(&self, line_item_id: &LineItemId) -> ServiceResult<()> {
        self.failing_metadata_writes
            .write()
            .map_err(|_| poisoned())?
            .remove(line_item_id);
        Ok(())
    }

    /// Line items whose metadata was successfully written, in write order.
    pub fn metadata_writes(&self) -> Vec<LineItemId> {
        self.metadata_writes
            .read()
            .map(|writes| writes.clone())
            .unwrap_or_default()
    }

    fn modify(
        &self,
        line_item_id: &LineItemId,
        f: impl FnOnce(&mut LineItem),
    ) -> ServiceResult<LineItem> {
        let mut items = self.items.write().map_err(|_| poisoned())?;
        let item = items
            .iter_mut()
            .find(|item| item.id() == line_item_id)
            .ok_or_else(|| ServiceError::not_found("line item", line_item_id.as_str()))?;
        f(item);
        Ok(item.clone())
    }
}

#[async_trait]
impl Cart for InMemoryCart {
    async fn list_line_items(&self, cart_id: &CartId) -> ServiceResult<Vec<LineItem>> {
        let items = self.items.read().map_err(|_| poisoned())?;
        Ok(items
            .iter()
            .filter(|item| &item.cart_id == cart_id)
            .cloned()
            .collect())
    }

    async fn get_line_item(&self, line_item_id: &LineItemId) -> ServiceResult<LineItem> {
        self.line_item(line_item_id)
            .ok_or_else(|| ServiceError::not_found("line item", line_item_id.as_str()))
    }

    async fn add_line_item(
        &self,
        cart_id: &CartId,
        variant_id: &VariantId,
        quantity: f64,
    ) -> ServiceResult<LineItem> {
        let item = LineItem {
            id: LineItemId::new(format!("item_{}", Uuid::now_v7().simple())),
            cart_id: cart_id.clone(),
            variant_id: variant_id.clone(),
            quantity,
            metadata: LineItemMetadata::new(),
        };
        self.items
            .write()
            .map_err(|_| poisoned())?
            .push(item.clone());
        Ok(item)
    }

    async fn update_line_item_quantity(
        &self,
        line_item_id: &LineItemId,
        quantity: f64,
    ) -> ServiceResult<LineItem> {
        self.modify(line_item_id, |item| item.quantity = quantity)
    }

    async fn update_line_item_metadata(
        &self,
        line_item_id: &LineItemId,
        metadata: LineItemMetadata,
    ) -> ServiceResult<LineItem> {
        if self
            .failing_metadata_writes
            .read()
            .map_err(|_| poisoned())?
            .contains(line_item_id)
        {
            return Err(ServiceError::unavailable(format!(
                "metadata write failed for {line_item_id}"
            )));
        }
        let updated = self.modify(line_item_id, |item| item.metadata = metadata)?;
        self.metadata_writes
            .write()
            .map_err(|_| poisoned())?
            .push(line_item_id.clone());
        Ok(updated)
    }
}
