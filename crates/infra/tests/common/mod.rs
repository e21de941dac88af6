//! Shared fixtures: a small fabric shop.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{Map, Value as JsonValue, json};

use cutstock_checkout::{LineItem, LineItemMetadata, Variant};
use cutstock_core::{CartId, InventoryItemId, LineItemId, ProductId, VariantId};
use cutstock_infra::{InMemoryCart, InMemoryCatalog, InMemoryLedger};
use cutstock_inventory::StockSnapshot;

/// Quarter-yard increments, one yard minimum cut.
pub const FABRIC: &str = "variant_linen";
/// Half-yard increments inherited from the product.
pub const RIBBON: &str = "variant_ribbon";
/// Whole units, no quantity policy.
pub const SPOOL: &str = "variant_spool";
/// Not inventory-managed.
pub const GIFT_CARD: &str = "variant_gift_card";
/// Inventory-managed but missing its inventory item.
pub const UNMAPPED: &str = "variant_unmapped";

pub const CART: &str = "cart_1";

pub struct Shop {
    pub catalog: Arc<InMemoryCatalog>,
    pub ledger: Arc<InMemoryLedger>,
    pub cart: Arc<InMemoryCart>,
}

pub fn object(value: JsonValue) -> Map<String, JsonValue> {
    match value {
        JsonValue::Object(map) => map,
        _ => panic!("fixture metadata must be an object"),
    }
}

fn variant(id: &str, product: Option<&str>, inventory_item: Option<&str>, metadata: JsonValue) -> Variant {
    Variant {
        id: VariantId::new(id),
        product_id: product.map(ProductId::new),
        manage_inventory: true,
        inventory_item_id: inventory_item.map(InventoryItemId::new),
        metadata: object(metadata),
    }
}

pub fn shop() -> Shop {
    cutstock_observability::init_for_tests();

    let catalog = InMemoryCatalog::new();
    catalog
        .insert_variant(variant(
            FABRIC,
            Some("product_linen"),
            Some("iitem_linen"),
            json!({ "min_increment": 0.25, "min_cut": 1, "rounding_mode": "nearest" }),
        ))
        .unwrap();
    catalog
        .insert_variant(variant(RIBBON, Some("product_ribbon"), Some("iitem_ribbon"), json!({})))
        .unwrap();
    catalog
        .insert_product_metadata(
            ProductId::new("product_ribbon"),
            object(json!({ "min_increment": "0.5" })),
        )
        .unwrap();
    catalog
        .insert_variant(variant(SPOOL, None, Some("iitem_spool"), json!({})))
        .unwrap();
    catalog
        .insert_variant(Variant {
            manage_inventory: false,
            ..variant(GIFT_CARD, None, None, json!({}))
        })
        .unwrap();
    catalog
        .insert_variant(variant(UNMAPPED, None, None, json!({})))
        .unwrap();

    let ledger = InMemoryLedger::new();
    ledger
        .set_stock(InventoryItemId::new("iitem_linen"), StockSnapshot::new(20, 4))
        .unwrap();
    ledger
        .set_stock(
            InventoryItemId::new("iitem_ribbon"),
            StockSnapshot::new(6, 0).with_incoming(10),
        )
        .unwrap();
    ledger
        .set_stock(InventoryItemId::new("iitem_spool"), StockSnapshot::new(0, 0))
        .unwrap();

    Shop {
        catalog: Arc::new(catalog),
        ledger: Arc::new(ledger),
        cart: Arc::new(InMemoryCart::new()),
    }
}

impl Shop {
    /// Seed a line item directly into the cart store.
    pub fn seed(&self, id: &str, variant_id: &str, quantity: f64, metadata: JsonValue) -> LineItemId {
        let line_item_id = LineItemId::new(id);
        self.cart
            .insert_line_item(LineItem {
                id: line_item_id.clone(),
                cart_id: CartId::new(CART),
                variant_id: VariantId::new(variant_id),
                quantity,
                metadata: LineItemMetadata::from_map(object(metadata)),
            })
            .unwrap();
        line_item_id
    }

    pub fn item(&self, id: &LineItemId) -> LineItem {
        self.cart.line_item(id).expect("line item exists")
    }
}

pub fn cart_id() -> CartId {
    CartId::new(CART)
}
