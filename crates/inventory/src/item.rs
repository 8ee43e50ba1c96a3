use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, ItemId};

/// Quantity band below which (inclusive) an in-stock item counts as low.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Derived stock status of an item.
///
/// Always a pure function of the current quantity; never stored
/// independently of it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockStatus {
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Low Stock")]
    LowStock,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
}

impl StockStatus {
    /// `0 -> OutOfStock`, `1..=10 -> LowStock`, `>10 -> InStock`.
    pub fn derive(quantity: i64) -> Self {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= LOW_STOCK_THRESHOLD {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "In Stock",
            StockStatus::LowStock => "Low Stock",
            StockStatus::OutOfStock => "Out of Stock",
        }
    }
}

/// A stock-keeping record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub category: Option<String>,
    pub quantity: i64,
    pub status: StockStatus,
    pub notes: Option<String>,
    pub image_url: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl Item {
    /// Materialize a new record from validated input. The id comes from the
    /// store (single id strategy: store-owned sequence).
    pub fn create(id: ItemId, new: NewItem, now: DateTime<Utc>) -> Self {
        let quantity = new.quantity.unwrap_or(0);
        Self {
            id,
            name: new.name,
            category: new.category,
            quantity,
            status: StockStatus::derive(quantity),
            notes: new.notes,
            image_url: new.image_url,
            last_updated: now,
        }
    }

    /// Merge a patch onto this record. Unspecified fields keep their prior
    /// values; status and `last_updated` are recomputed from the merged
    /// quantity on every write, even for an empty patch.
    pub fn apply_patch(&mut self, patch: ItemPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(category) = patch.category {
            self.category = Some(category);
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(notes) = patch.notes {
            self.notes = Some(notes);
        }
        if let Some(image_url) = patch.image_url {
            self.image_url = Some(image_url);
        }
        self.status = StockStatus::derive(self.quantity);
        self.last_updated = now;
    }
}

/// Input for creating an item. `quantity` defaults to 0 when omitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub category: Option<String>,
    pub quantity: Option<i64>,
    pub notes: Option<String>,
    pub image_url: Option<String>,
}

impl NewItem {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name", "name cannot be empty"));
        }
        if let Some(q) = self.quantity {
            if q < 0 {
                return Err(DomainError::validation("quantity", "quantity cannot be negative"));
            }
        }
        Ok(())
    }
}

/// Partial update for an item; `None` means "leave unchanged".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<i64>,
    pub notes: Option<String>,
    pub image_url: Option<String>,
}

impl ItemPatch {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name", "name cannot be empty"));
            }
        }
        if let Some(q) = self.quantity {
            if q < 0 {
                return Err(DomainError::validation("quantity", "quantity cannot be negative"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_item(name: &str, quantity: Option<i64>) -> NewItem {
        NewItem {
            name: name.to_string(),
            quantity,
            ..NewItem::default()
        }
    }

    #[test]
    fn status_bands() {
        assert_eq!(StockStatus::derive(0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::derive(1), StockStatus::LowStock);
        assert_eq!(StockStatus::derive(10), StockStatus::LowStock);
        assert_eq!(StockStatus::derive(11), StockStatus::InStock);
        assert_eq!(StockStatus::derive(500), StockStatus::InStock);
    }

    #[test]
    fn create_defaults_quantity_to_zero() {
        let item = Item::create(ItemId::new(1), new_item("Widget", None), Utc::now());
        assert_eq!(item.quantity, 0);
        assert_eq!(item.status, StockStatus::OutOfStock);
    }

    #[test]
    fn create_derives_status_from_quantity() {
        let item = Item::create(ItemId::new(1), new_item("Widget", Some(25)), Utc::now());
        assert_eq!(item.status, StockStatus::InStock);
    }

    #[test]
    fn empty_patch_only_bumps_last_updated() {
        let created_at = Utc::now();
        let mut item = Item::create(ItemId::new(1), new_item("Widget", Some(5)), created_at);
        let before = item.clone();

        let later = created_at + chrono::Duration::seconds(30);
        item.apply_patch(ItemPatch::default(), later);

        assert_eq!(item.name, before.name);
        assert_eq!(item.quantity, before.quantity);
        assert_eq!(item.status, before.status);
        assert_eq!(item.notes, before.notes);
        assert_eq!(item.last_updated, later);
    }

    #[test]
    fn patch_recomputes_status_from_merged_quantity() {
        let mut item = Item::create(ItemId::new(1), new_item("Widget", Some(50)), Utc::now());
        item.apply_patch(
            ItemPatch {
                quantity: Some(3),
                ..ItemPatch::default()
            },
            Utc::now(),
        );
        assert_eq!(item.quantity, 3);
        assert_eq!(item.status, StockStatus::LowStock);
    }

    #[test]
    fn new_item_rejects_blank_name_and_negative_quantity() {
        assert!(new_item("   ", None).validate().is_err());
        assert!(new_item("Widget", Some(-1)).validate().is_err());
        assert!(new_item("Widget", Some(0)).validate().is_ok());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Status derivation is total and band boundaries are exact.
            #[test]
            fn derive_matches_bands(q in -1000i64..100_000) {
                let status = StockStatus::derive(q);
                if q <= 0 {
                    prop_assert_eq!(status, StockStatus::OutOfStock);
                } else if q <= LOW_STOCK_THRESHOLD {
                    prop_assert_eq!(status, StockStatus::LowStock);
                } else {
                    prop_assert_eq!(status, StockStatus::InStock);
                }
            }

            /// A write always leaves status consistent with quantity.
            #[test]
            fn patch_keeps_status_consistent(
                initial in 0i64..1000,
                patched in proptest::option::of(0i64..1000),
            ) {
                let mut item = Item::create(
                    ItemId::new(1),
                    NewItem { name: "Widget".into(), quantity: Some(initial), ..NewItem::default() },
                    Utc::now(),
                );
                item.apply_patch(
                    ItemPatch { quantity: patched, ..ItemPatch::default() },
                    Utc::now(),
                );
                prop_assert_eq!(item.status, StockStatus::derive(item.quantity));
            }
        }
    }
}
