use alloc::vec::Vec;
use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::*;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buffs {
    pub ward: u8,
    pub blaze: u8,
    /// Keeps the turn once after revealing a tile that is not yours.
    pub protection: u8,
}

pub const WARD_ABSORB: i32 = 3;
pub const BLAZE_ATTACK: i32 = 2;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrophySource {
    Board,
    Boss(MonsterKind),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trophy {
    pub level: u8,
    pub source: TrophySource,
    pub stolen: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub character: CharacterId,
    pub level: u8,
    hp: i32,
    max_hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub gold: u32,
    pub loot_per_tile: u32,
    pub inventory: Inventory,
    pub upgrades: HashMap<UpgradeId, u8>,
    pub trophies: Vec<Trophy>,
    mana: u32,
    max_mana: u32,
    pub spell_effects: Vec<SpellEffect>,
    pub buffs: Buffs,
    pub seen_monsters: HashSet<MonsterKind>,
    pub monsters_defeated: u32,
}

impl RunState {
    pub fn new(character: CharacterId) -> Self {
        let profile = character.profile();
        let mut inventory = Inventory::default();
        for &spell in profile.starting_spells {
            inventory.insert(Slot::Spell(spell));
        }

        Self {
            character,
            level: 1,
            hp: profile.max_hp,
            max_hp: profile.max_hp,
            attack: profile.attack,
            defense: profile.defense,
            gold: profile.gold,
            loot_per_tile: 0,
            inventory,
            upgrades: HashMap::new(),
            trophies: Vec::new(),
            mana: profile.max_mana,
            max_mana: profile.max_mana,
            spell_effects: Vec::new(),
            buffs: Buffs::default(),
            seen_monsters: HashSet::new(),
            monsters_defeated: 0,
        }
    }

    pub fn profile(&self) -> &'static CharacterProfile {
        self.character.profile()
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn max_hp(&self) -> i32 {
        self.max_hp
    }

    pub fn mana(&self) -> u32 {
        self.mana
    }

    pub fn max_mana(&self) -> u32 {
        self.max_mana
    }

    pub fn is_dead(&self) -> bool {
        self.hp <= 0
    }

    pub fn set_hp(&mut self, hp: i32) {
        self.hp = hp.clamp(0, self.max_hp);
    }

    pub fn heal(&mut self, amount: i32) {
        self.set_hp(self.hp.saturating_add(amount));
    }

    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let mut amount = amount.max(0);
        if amount > 0 && self.buffs.ward > 0 {
            self.buffs.ward -= 1;
            amount = (amount - WARD_ABSORB).max(0);
        }
        self.set_hp(self.hp.saturating_sub(amount));
        amount
    }

    pub fn raise_max_hp(&mut self, amount: i32) {
        self.max_hp = self.max_hp.saturating_add(amount).max(1);
        self.set_hp(self.hp);
    }

    pub fn restore_mana(&mut self, amount: u32) {
        self.mana = self.mana.saturating_add(amount).min(self.max_mana);
    }

    pub fn refill_mana(&mut self) {
        self.mana = self.max_mana;
    }

    pub fn spend_mana(&mut self, amount: u32) -> ActionResult<()> {
        self.mana = self
            .mana
            .checked_sub(amount)
            .ok_or(ActionError::InsufficientMana {
                needed: amount,
                available: self.mana,
            })?;
        Ok(())
    }

    pub fn raise_max_mana(&mut self, amount: u32) {
        self.max_mana = self.max_mana.saturating_add(amount);
        self.restore_mana(amount);
    }

    pub fn upgrade_count(&self, upgrade: UpgradeId) -> u8 {
        self.upgrades.get(&upgrade).copied().unwrap_or(0)
    }

    pub fn earn_trophy(&mut self, source: TrophySource) {
        self.trophies.push(Trophy {
            level: self.level,
            source,
            stolen: false,
        });
    }

    pub fn steal_trophy(&mut self) -> Option<Trophy> {
        let trophy = self.trophies.iter_mut().rev().find(|t| !t.stolen)?;
        trophy.stolen = true;
        Some(*trophy)
    }

    pub fn trophy_count(&self) -> usize {
        self.trophies.iter().filter(|t| !t.stolen).count()
    }

    pub fn clue_spec(&self, glimpse: bool) -> ClueSpec {
        ClueSpec {
            left_bonus: self.upgrade_count(UpgradeId::LeftHand),
            right_bonus: self.upgrade_count(UpgradeId::RightHand),
            glimpse,
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new(CharacterId::default())
    }
}
