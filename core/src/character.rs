use serde::{Deserialize, Serialize};

use crate::{SpellId, UpgradeId};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterId {
    #[default]
    Wanderer,
    Warrior,
    Mage,
    Merchant,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CharacterProfile {
    pub id: CharacterId,
    pub name: &'static str,
    pub max_hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub max_mana: u32,
    pub gold: u32,
    pub price_modifier: i32,
    pub starting_spells: &'static [SpellId],
    pub blocked_upgrades: &'static [UpgradeId],
    pub limit_overrides: &'static [(UpgradeId, u8)],
}

const WANDERER: CharacterProfile = CharacterProfile {
    id: CharacterId::Wanderer,
    name: "Wanderer",
    max_hp: 20,
    attack: 2,
    defense: 0,
    max_mana: 1,
    gold: 0,
    price_modifier: 0,
    starting_spells: &[],
    blocked_upgrades: &[],
    limit_overrides: &[],
};

const WARRIOR: CharacterProfile = CharacterProfile {
    id: CharacterId::Warrior,
    name: "Warrior",
    max_hp: 25,
    attack: 3,
    defense: 1,
    max_mana: 0,
    blocked_upgrades: &[UpgradeId::Wisdom, UpgradeId::Lingering],
    ..WANDERER
};

const MAGE: CharacterProfile = CharacterProfile {
    id: CharacterId::Mage,
    name: "Mage",
    max_hp: 16,
    attack: 1,
    max_mana: 3,
    starting_spells: &[SpellId::MagicMissile],
    limit_overrides: &[(UpgradeId::Wisdom, 5)],
    ..WANDERER
};

const MERCHANT: CharacterProfile = CharacterProfile {
    id: CharacterId::Merchant,
    name: "Merchant",
    max_hp: 18,
    gold: 5,
    price_modifier: -1,
    limit_overrides: &[(UpgradeId::Traders, 5)],
    ..WANDERER
};

impl CharacterId {
    pub const ALL: [CharacterId; 4] = [Self::Wanderer, Self::Warrior, Self::Mage, Self::Merchant];

    pub const fn profile(self) -> &'static CharacterProfile {
        match self {
            Self::Wanderer => &WANDERER,
            Self::Warrior => &WARRIOR,
            Self::Mage => &MAGE,
            Self::Merchant => &MERCHANT,
        }
    }
}

impl CharacterProfile {
    pub fn blocks(&self, upgrade: UpgradeId) -> bool {
        self.blocked_upgrades.contains(&upgrade)
    }

    pub fn repeat_limit(&self, upgrade: UpgradeId) -> Option<u8> {
        self.limit_overrides
            .iter()
            .find(|(id, _)| *id == upgrade)
            .map(|&(_, limit)| limit)
            .or_else(|| upgrade.base_limit())
    }

    pub fn price(&self, base: u32) -> u32 {
        let adjusted = i64::from(base) + i64::from(self.price_modifier);
        u32::try_from(adjusted.max(1)).unwrap_or(1)
    }
}
