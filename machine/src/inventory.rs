//! # Inventory — The Item Catalog
//!
//! The set of beverages the machine can sell: each slot has a numeric id,
//! a display name, a price in coin units, and a stock count. Identity is
//! the id; the map is ordered so that "all stock levels" always comes back
//! in the same sequence.
//!
//! On disk the catalog is a JSON object keyed by *string* ids (see
//! [`crate::store`]). The string-to-integer conversion happens exactly once,
//! at the load boundary — everything past this module speaks [`ItemId`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Numeric slot identifier. Ids start at 1; 0 is never assigned.
pub type ItemId = u32;

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// A single beverage slot: what it's called, what it costs, how many are
/// left. The id lives in the [`Inventory`] map key, matching the persisted
/// form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Display name of the beverage.
    pub name: String,
    /// Price in whole coin units. Always at least 1.
    pub price: u64,
    /// Units remaining in the slot. Unsigned — stock cannot go negative.
    pub stock: u64,
}

impl Item {
    /// Convenience constructor for catalogs and tests.
    pub fn new(name: impl Into<String>, price: u64, stock: u64) -> Self {
        Self {
            name: name.into(),
            price,
            stock,
        }
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// The full catalog, ordered by ascending item id.
///
/// A `BTreeMap` rather than a hash map: the HTTP API exposes "all stock
/// levels" as a bare array, so iteration order is part of the contract.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    items: BTreeMap<ItemId, Item>,
}

impl Inventory {
    /// Creates an empty inventory.
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }

    /// The catalog a freshly initialized machine ships with. Also what the
    /// admin reset restores.
    pub fn seed() -> Self {
        let mut inv = Self::new();
        inv.insert(1, Item::new("Cola", 2, 5));
        inv.insert(2, Item::new("Sparkling Water", 1, 10));
        inv.insert(3, Item::new("Iced Tea", 2, 8));
        inv.insert(4, Item::new("Cold Brew", 3, 6));
        inv
    }

    /// Inserts or replaces a slot. Returns the previous item, if any.
    pub fn insert(&mut self, id: ItemId, item: Item) -> Option<Item> {
        self.items.insert(id, item)
    }

    /// Returns the item in the given slot.
    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// Mutable access to a slot. Used by the dispense cycle to decrement
    /// stock in place.
    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(&id)
    }

    /// Stock counts for every slot, in ascending id order.
    pub fn stock_levels(&self) -> Vec<u64> {
        self.items.values().map(|item| item.stock).collect()
    }

    /// Stock count for one slot, or `None` if the id isn't in the catalog.
    pub fn stock_of(&self, id: ItemId) -> Option<u64> {
        self.items.get(&id).map(|item| item.stock)
    }

    /// Sum of all stock counts. Surfaced by the status endpoint.
    pub fn total_stock(&self) -> u64 {
        self.items.values().map(|item| item.stock).sum()
    }

    /// Number of slots in the catalog.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the catalog has no slots at all.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates slots in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &Item)> {
        self.items.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
