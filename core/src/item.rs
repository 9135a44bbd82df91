use alloc::vec;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::SpellId;

pub const BASE_INVENTORY_SLOTS: usize = 4;
pub const STAFF_CHARGES: u8 = 3;
pub const RING_CHARGES: u8 = 2;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Potion,
    Ether,
    CrystalBall,
    Spyglass,
    Detector,
    Key,
    Transmute,
    Staff { charges: u8 },
    Ring { charges: u8 },
    Ward,
    Blaze,
    Shield,
    Tome(SpellId),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ItemUse {
    Immediate,
    Direct,
    Targeted,
}

impl ItemKind {
    pub const fn staff() -> Self {
        Self::Staff {
            charges: STAFF_CHARGES,
        }
    }

    pub const fn ring() -> Self {
        Self::Ring {
            charges: RING_CHARGES,
        }
    }

    pub const fn usage(self) -> ItemUse {
        use ItemKind::*;
        match self {
            Ward | Blaze | Shield => ItemUse::Immediate,
            Potion | Ether | CrystalBall | Spyglass | Tome(_) => ItemUse::Direct,
            Detector | Key | Transmute | Staff { .. } | Ring { .. } => ItemUse::Targeted,
        }
    }

    pub const fn auto_applies_when_full(self) -> bool {
        matches!(self, Self::Potion | Self::Ether)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
    Item(ItemKind),
    Spell(SpellId),
}

impl Slot {
    pub const fn from_item(item: ItemKind) -> Self {
        match item {
            ItemKind::Tome(spell) => Self::Spell(spell),
            other => Self::Item(other),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    slots: Vec<Option<Slot>>,
}

impl Inventory {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[Option<Slot>] {
        &self.slots
    }

    pub fn get(&self, index: usize) -> Option<Slot> {
        self.slots.get(index).copied().flatten()
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn grow(&mut self, extra: usize) {
        self.slots.resize(self.slots.len() + extra, None);
    }

    pub fn insert(&mut self, slot: Slot) -> Option<usize> {
        let index = self.slots.iter().position(Option::is_none)?;
        self.slots[index] = Some(slot);
        Some(index)
    }

    pub fn take(&mut self, index: usize) -> Option<Slot> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    pub fn replace(&mut self, index: usize, slot: Option<Slot>) {
        if let Some(entry) = self.slots.get_mut(index) {
            *entry = slot;
        }
    }

    pub fn knows_spell(&self, spell: SpellId) -> bool {
        self.slots.contains(&Some(Slot::Spell(spell)))
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(BASE_INVENTORY_SLOTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_uses_first_empty_slot() {
        let mut inventory = Inventory::new(3);
        assert_eq!(inventory.insert(Slot::Item(ItemKind::Potion)), Some(0));
        assert_eq!(inventory.insert(Slot::Item(ItemKind::Key)), Some(1));
        inventory.take(0);
        assert_eq!(inventory.insert(Slot::Item(ItemKind::Ether)), Some(0));
    }

    #[test]
    fn full_inventory_rejects_insert() {
        let mut inventory = Inventory::new(1);
        inventory.insert(Slot::Item(ItemKind::Potion));
        assert!(inventory.is_full());
        assert_eq!(inventory.insert(Slot::Item(ItemKind::Key)), None);

        inventory.grow(1);
        assert_eq!(inventory.capacity(), 2);
        assert_eq!(inventory.insert(Slot::Item(ItemKind::Key)), Some(1));
    }

    #[test]
    fn tomes_become_spells() {
        assert_eq!(
            Slot::from_item(ItemKind::Tome(SpellId::Mend)),
            Slot::Spell(SpellId::Mend)
        );
        assert_eq!(ItemKind::Ward.usage(), ItemUse::Immediate);
        assert_eq!(ItemKind::staff().usage(), ItemUse::Targeted);
    }
}
