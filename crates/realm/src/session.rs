//! Per-connection game state kept by the realm layer.
//!
//! The core only links a connection to its entity. Everything else a session
//! accumulates (the account's characters, the selected one, quick bar and
//! inventory) lives here and is dropped by the close hook.

use crate::accounts::CharacterRecord;
use game_server::{AccountId, EntityId};
use realm_protocol::{QuickSlot, SetItem};
use std::collections::BTreeMap;
use thiserror::Error;

pub const QUICK_BAR_SLOTS: usize = 8;

/// Window id of the character's inventory.
pub const INVENTORY: u8 = 1;
pub const INVENTORY_SIZE: u16 = 90;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("No item at window {0} position {1}")]
    Empty(u8, u16),

    #[error("Window {0} position {1} is out of range")]
    OutOfRange(u8, u16),

    #[error("Cannot split onto a different item")]
    Occupied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemStack {
    pub item_id: u32,
    pub count: u8,
}

/// Inventory slot address: window and position.
pub type Cell = (u8, u16);

#[derive(Debug, Default)]
pub struct Session {
    pub account: Option<AccountId>,
    pub characters: Vec<Option<CharacterRecord>>,
    pub selected: Option<CharacterRecord>,
    /// Entity of the character while it is in the world
    pub vid: Option<EntityId>,
    pub quick_bar: [Option<QuickSlot>; QUICK_BAR_SLOTS],
    pub inventory: BTreeMap<Cell, ItemStack>,
}

impl Session {
    /// Resets the inventory to what a freshly selected character carries.
    pub fn load_starter_inventory(&mut self) {
        self.inventory.clear();
        self.inventory.insert((INVENTORY, 0), ItemStack { item_id: 19, count: 1 });
        self.inventory.insert((INVENTORY, 1), ItemStack { item_id: 27001, count: 50 });
    }

    /// Moves `count` items from one cell to another; `0` moves the whole stack.
    ///
    /// Whole stacks swap with a different item at the destination and merge
    /// into the same item. Returns both cells' new contents.
    pub fn move_item(&mut self, from: Cell, to: Cell, count: u8) -> Result<[SetItem; 2], InventoryError> {
        check_cell(from)?;
        check_cell(to)?;
        let source = *self.inventory.get(&from).ok_or(InventoryError::Empty(from.0, from.1))?;
        if from == to {
            return Ok([self.set_item(from), self.set_item(to)]);
        }

        let moving = if count == 0 || count >= source.count { source.count } else { count };
        let target = self.inventory.get(&to).copied();

        match target {
            None => {
                self.inventory.insert(to, ItemStack { item_id: source.item_id, count: moving });
                self.take(from, moving);
            }
            Some(target) if target.item_id == source.item_id => {
                let merged = target.count.saturating_add(moving);
                let moved = merged - target.count;
                self.inventory.insert(to, ItemStack { item_id: target.item_id, count: merged });
                self.take(from, moved);
            }
            Some(target) if moving == source.count => {
                self.inventory.insert(to, source);
                self.inventory.insert(from, target);
            }
            Some(_) => return Err(InventoryError::Occupied),
        }

        Ok([self.set_item(from), self.set_item(to)])
    }

    /// Uses one item from the stack at `cell`. Returns the cell's new
    /// contents, which are empty once the last item is used.
    pub fn use_item(&mut self, cell: Cell) -> Result<SetItem, InventoryError> {
        check_cell(cell)?;
        if !self.inventory.contains_key(&cell) {
            return Err(InventoryError::Empty(cell.0, cell.1));
        }
        self.take(cell, 1);
        Ok(self.set_item(cell))
    }

    fn take(&mut self, cell: Cell, count: u8) {
        if let Some(stack) = self.inventory.get_mut(&cell) {
            stack.count -= count;
            if stack.count == 0 {
                self.inventory.remove(&cell);
            }
        }
    }

    /// The `SetItem` describing one cell, empty cells included.
    pub fn set_item(&self, cell: Cell) -> SetItem {
        let stack = self.inventory.get(&cell);
        SetItem {
            window: cell.0,
            position: cell.1,
            item_id: stack.map_or(0, |stack| stack.item_id),
            count: stack.map_or(0, |stack| stack.count),
            ..Default::default()
        }
    }

    /// `SetItem` packets for every occupied cell, in cell order.
    pub fn inventory_packets(&self) -> Vec<SetItem> {
        self.inventory.keys().map(|cell| self.set_item(*cell)).collect()
    }
}

fn check_cell(cell: Cell) -> Result<(), InventoryError> {
    if cell.0 != INVENTORY || cell.1 >= INVENTORY_SIZE {
        return Err(InventoryError::OutOfRange(cell.0, cell.1));
    }
    Ok(())
}
