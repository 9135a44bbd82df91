use alloc::vec::Vec;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::RunState;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UpgradeId {
    AttackUp,
    DefenseUp,
    Vitality,
    Prospector,
    Wisdom,
    LeftHand,
    RightHand,
    Traders,
    Backpack,
    Bulwark,
    Lingering,
}

impl UpgradeId {
    pub const ALL: [UpgradeId; 11] = [
        Self::AttackUp,
        Self::DefenseUp,
        Self::Vitality,
        Self::Prospector,
        Self::Wisdom,
        Self::LeftHand,
        Self::RightHand,
        Self::Traders,
        Self::Backpack,
        Self::Bulwark,
        Self::Lingering,
    ];

    pub const fn base_limit(self) -> Option<u8> {
        use UpgradeId::*;
        match self {
            LeftHand | RightHand | Traders | Backpack | Wisdom => Some(3),
            Bulwark => Some(2),
            Lingering => Some(1),
            AttackUp | DefenseUp | Vitality | Prospector => None,
        }
    }
}

pub const VITALITY_HP: i32 = 3;

pub fn is_eligible(run: &RunState, upgrade: UpgradeId) -> bool {
    let profile = run.profile();
    if profile.blocks(upgrade) {
        return false;
    }
    profile
        .repeat_limit(upgrade)
        .is_none_or(|limit| run.upgrade_count(upgrade) < limit)
}

pub fn eligible_upgrades(run: &RunState) -> Vec<UpgradeId> {
    UpgradeId::ALL
        .into_iter()
        .filter(|&upgrade| is_eligible(run, upgrade))
        .collect()
}

pub fn roll_upgrade_choices<R: Rng + ?Sized>(
    run: &RunState,
    count: usize,
    rng: &mut R,
) -> Vec<UpgradeId> {
    let mut pool = eligible_upgrades(run);
    pool.shuffle(rng);
    pool.truncate(count);
    pool
}

pub fn apply_upgrade(run: &mut RunState, upgrade: UpgradeId) {
    use UpgradeId::*;
    match upgrade {
        AttackUp => run.attack += 1,
        DefenseUp => run.defense += 1,
        Vitality => {
            run.raise_max_hp(VITALITY_HP);
            run.heal(VITALITY_HP);
        }
        Prospector => run.loot_per_tile += 1,
        Wisdom => run.raise_max_mana(1),
        Backpack => run.inventory.grow(1),
        Bulwark => run.buffs.protection = run.buffs.protection.saturating_add(1),
        // read where they matter: clues, shop, cloud duration
        LeftHand | RightHand | Traders | Lingering => {}
    }
    *run.upgrades.entry(upgrade).or_insert(0) += 1;
    log::debug!("Applied upgrade {:?}", upgrade);
}
