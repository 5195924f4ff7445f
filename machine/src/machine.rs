//! # VendingMachine — Coin Balance & Dispense Cycle
//!
//! The state machine at the center of VENDO. It owns the catalog, the coin
//! balance, and the snapshot store, and it is the only code allowed to
//! mutate any of them.
//!
//! Balance transitions are simple: coins go in one at a time, and the whole
//! balance comes back out on eject or at the end of any purchase attempt.
//! Stock only ever moves down, one unit per successful dispense; the only
//! way up is a wholesale inventory reset.
//!
//! Business outcomes — sold out, unknown slot, short paid — are values of
//! [`DispenseOutcome`], not errors. The only `Err` this module produces is
//! a failed snapshot write.

use crate::config::ACCEPTED_COIN;
use crate::inventory::{Inventory, ItemId};
use crate::store::{JsonStore, StoreResult};

// ---------------------------------------------------------------------------
// DispenseOutcome
// ---------------------------------------------------------------------------

/// Result of one purchase attempt. Every variant reports enough for the
/// caller to set its balance headers without a second lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispenseOutcome {
    /// The item came out. `change` is everything above the price; the
    /// machine keeps nothing, so the post-call balance is always 0.
    Vended {
        /// Coins returned to the caller beyond the price.
        change: u64,
        /// Units dispensed. Always 1 — the machine vends one at a time.
        quantity: u32,
        /// Stock left in the slot after this vend.
        remaining: u64,
    },
    /// Unknown slot id, or the slot is empty. The two cases are reported
    /// identically — the customer-facing panel shows the same light either
    /// way. Balance is untouched.
    NotAvailable {
        /// The held balance, unchanged.
        balance: u64,
    },
    /// Not enough coins for this slot's price. Balance and stock untouched.
    InsufficientFunds {
        /// The held balance, unchanged.
        balance: u64,
    },
}

// ---------------------------------------------------------------------------
// VendingMachine
// ---------------------------------------------------------------------------

/// A single vending machine unit: catalog, coin balance, snapshot store.
///
/// Not internally synchronized — callers serialize access (the server wraps
/// one instance in an async mutex so the dispense critical section,
/// snapshot write included, never interleaves).
#[derive(Debug)]
pub struct VendingMachine {
    /// The item catalog, loaded at startup, persisted on every change.
    inventory: Inventory,
    /// Coins held and not yet returned. Reset to 0 on eject and at the end
    /// of every purchase attempt that gets past the price check.
    coins: u64,
    /// Where the catalog snapshot lives.
    store: JsonStore,
}

impl VendingMachine {
    /// Opens a machine over an existing snapshot. Fails if the snapshot
    /// can't be read — a machine with no catalog can't sell anything.
    pub fn open(store: JsonStore) -> StoreResult<Self> {
        let inventory = store.load()?;
        Ok(Self {
            inventory,
            coins: 0,
            store,
        })
    }

    /// Builds a machine from an in-memory catalog and persists it as the
    /// initial snapshot. Used by first-run provisioning and tests.
    pub fn provision(store: JsonStore, inventory: Inventory) -> StoreResult<Self> {
        store.save(&inventory)?;
        Ok(Self {
            inventory,
            coins: 0,
            store,
        })
    }

    /// Accepts a coin. Only [`ACCEPTED_COIN`] counts; any other value is a
    /// silent no-op (the coin slot rejects it mechanically, and the HTTP
    /// layer rejects it before it gets here). Returns the balance after
    /// the call.
    pub fn insert_coin(&mut self, value: u64) -> u64 {
        if value == ACCEPTED_COIN {
            self.coins += value;
            tracing::debug!(balance = self.coins, "coin accepted");
        }
        self.coins
    }

    /// Returns the held balance to the caller and zeroes it. Idempotent
    /// when the balance is already 0.
    pub fn eject_coins(&mut self) -> u64 {
        let returned = self.coins;
        self.coins = 0;
        if returned > 0 {
            tracing::debug!(returned, "coins ejected");
        }
        returned
    }

    /// The balance currently held.
    pub fn coins(&self) -> u64 {
        self.coins
    }

    /// Stock counts for all slots, in catalog order.
    pub fn stock_levels(&self) -> Vec<u64> {
        self.inventory.stock_levels()
    }

    /// Stock count for one slot, `None` for unknown ids.
    pub fn stock_of(&self, id: ItemId) -> Option<u64> {
        self.inventory.stock_of(id)
    }

    /// Read access to the catalog.
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Attempts to vend one unit from the given slot.
    ///
    /// On success the stock is decremented, the entire balance is returned
    /// to the caller (change = balance − price), and the snapshot is
    /// written before the outcome is reported. The snapshot write runs
    /// after the in-memory mutation; if it fails, memory is one vend ahead
    /// of disk and the error propagates to the caller.
    pub fn dispense(&mut self, id: ItemId) -> StoreResult<DispenseOutcome> {
        let Some(item) = self.inventory.get_mut(id) else {
            return Ok(DispenseOutcome::NotAvailable {
                balance: self.coins,
            });
        };

        if item.stock == 0 {
            return Ok(DispenseOutcome::NotAvailable {
                balance: self.coins,
            });
        }

        if self.coins < item.price {
            return Ok(DispenseOutcome::InsufficientFunds {
                balance: self.coins,
            });
        }

        item.stock -= 1;
        let remaining = item.stock;
        let change = self.coins - item.price;
        tracing::info!(item = id, change, remaining, "item dispensed");

        // The machine keeps no balance after a vend — change goes straight
        // back to the caller.
        self.coins = 0;

        self.store.save(&self.inventory)?;

        Ok(DispenseOutcome::Vended {
            change,
            quantity: 1,
            remaining,
        })
    }

    /// Replaces the whole catalog and persists it. The admin restock path —
    /// the only operation that can raise stock.
    pub fn reset_inventory(&mut self, inventory: Inventory) -> StoreResult<()> {
        self.store.save(&inventory)?;
        self.inventory = inventory;
        tracing::info!(items = self.inventory.len(), "inventory reset");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
