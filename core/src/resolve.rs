use alloc::vec::Vec;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::*;

pub const TRAP_DAMAGE: i32 = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pickup {
    Applied,
    Stored(usize),
    AutoApplied,
    Lost,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defeat {
    pub kind: MonsterKind,
    pub gold: u32,
    pub trophy: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Nothing,
    Fight {
        kind: MonsterKind,
        report: CombatReport,
        damage: i32,
        defeat: Option<Defeat>,
    },
    Trap {
        damage: i32,
    },
    Gold(u32),
    Loot(u32),
    Item(ItemKind, Pickup),
    UpgradeChoice(Vec<UpgradeId>),
    Shop,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterHit {
    pub at: Coord2,
    pub kind: MonsterKind,
    pub damage: i32,
    pub defeat: Option<Defeat>,
}

pub fn grant_buff(run: &mut RunState, buff: BuffKind) {
    let charge = match buff {
        BuffKind::Ward => &mut run.buffs.ward,
        BuffKind::Blaze => &mut run.buffs.blaze,
        BuffKind::Protection => &mut run.buffs.protection,
    };
    *charge = charge.saturating_add(1);
}

fn apply_consumable(run: &mut RunState, item: ItemKind) -> bool {
    match item {
        ItemKind::Potion => run.heal(POTION_HEAL),
        ItemKind::Ether => run.restore_mana(ETHER_MANA),
        ItemKind::Ward => grant_buff(run, BuffKind::Ward),
        ItemKind::Blaze => grant_buff(run, BuffKind::Blaze),
        ItemKind::Shield => grant_buff(run, BuffKind::Protection),
        _ => return false,
    }
    true
}

/// Puts `item` into the run: immediate items apply, the rest go to the first
/// free slot. A full inventory still lets potions and ethers take effect.
pub fn collect_item(run: &mut RunState, item: ItemKind) -> Pickup {
    if item.usage() == ItemUse::Immediate {
        apply_consumable(run, item);
        return Pickup::Applied;
    }
    if let Some(slot) = run.inventory.insert(Slot::from_item(item)) {
        return Pickup::Stored(slot);
    }
    if item.auto_applies_when_full() && apply_consumable(run, item) {
        return Pickup::AutoApplied;
    }
    log::info!("Inventory full, {:?} lost", item);
    Pickup::Lost
}

pub fn defeat_monster(run: &mut RunState, board: &mut Board, at: Coord2) -> Option<Defeat> {
    let tile = board.tile_mut(at)?;
    let monster = match core::mem::take(&mut tile.content) {
        Content::Monster(monster) => monster,
        other => {
            tile.content = other;
            return None;
        }
    };

    run.gold = run.gold.saturating_add(monster.gold);
    run.monsters_defeated += 1;
    if monster.boss {
        run.earn_trophy(TrophySource::Boss(monster.kind));
    }
    log::debug!("Defeated {:?} at {:?}", monster.kind, at);
    Some(Defeat {
        kind: monster.kind,
        gold: monster.gold,
        trophy: monster.boss,
    })
}

pub fn damage_monster(
    run: &mut RunState,
    board: &mut Board,
    at: Coord2,
    amount: i32,
) -> Option<MonsterHit> {
    let monster = match board.tile_mut(at).map(|tile| &mut tile.content) {
        Some(Content::Monster(monster)) => monster,
        _ => return None,
    };
    let kind = monster.kind;
    let lethal = monster.take_damage(amount);
    run.seen_monsters.insert(kind);

    let defeat = if lethal {
        defeat_monster(run, board, at)
    } else {
        None
    };
    Some(MonsterHit {
        at,
        kind,
        damage: amount,
        defeat,
    })
}

pub fn resolve_reveal<R: Rng + ?Sized>(
    run: &mut RunState,
    board: &mut Board,
    at: Coord2,
    rng: &mut R,
) -> Resolution {
    let Some(tile) = board.tile(at) else {
        return Resolution::Nothing;
    };
    let owner = tile.owner;

    match tile.content.clone() {
        Content::Empty => {
            if owner == Owner::Player && run.loot_per_tile > 0 {
                run.gold = run.gold.saturating_add(run.loot_per_tile);
                Resolution::Loot(run.loot_per_tile)
            } else {
                Resolution::Nothing
            }
        }
        Content::Monster(monster) => melee(run, board, at, &monster),
        Content::Trap => Resolution::Trap {
            damage: run.take_damage(TRAP_DAMAGE),
        },
        Content::Gold(amount) => {
            run.gold = run.gold.saturating_add(amount);
            clear_content(board, at);
            Resolution::Gold(amount)
        }
        Content::Item(item) => {
            clear_content(board, at);
            Resolution::Item(item, collect_item(run, item))
        }
        Content::Upgrade(cache) => {
            clear_content(board, at);
            Resolution::UpgradeChoice(roll_upgrade_choices(
                run,
                usize::from(cache.choice_count),
                rng,
            ))
        }
        Content::Shop => Resolution::Shop,
    }
}

fn melee(run: &mut RunState, board: &mut Board, at: Coord2, monster: &Monster) -> Resolution {
    let mut attack = run.attack;
    if run.buffs.blaze > 0 {
        run.buffs.blaze -= 1;
        attack += BLAZE_ATTACK;
    }

    run.seen_monsters.insert(monster.kind);
    let report = fight_monster(attack, run.defense, monster);
    let damage = run.take_damage(report.damage_taken);

    let defeat = if report.monster_defeated {
        defeat_monster(run, board, at)
    } else {
        None
    };
    Resolution::Fight {
        kind: monster.kind,
        report,
        damage,
        defeat,
    }
}

fn clear_content(board: &mut Board, at: Coord2) {
    if let Some(tile) = board.tile_mut(at) {
        tile.content = Content::Empty;
    }
}

/// Runs every active area effect once: each monster in the 3×3 area of an
/// anchor takes the effect's damage, then finite effects count down and
/// expired ones are dropped.
pub fn tick_spell_effects(run: &mut RunState, board: &mut Board) -> Vec<MonsterHit> {
    let mut hits = Vec::new();
    let effects = run.spell_effects.clone();
    for effect in &effects {
        for pos in board.iter_area(effect.anchor) {
            if let Some(hit) = damage_monster(run, board, pos, effect.damage) {
                hits.push(hit);
            }
        }
    }
    run.spell_effects.retain_mut(SpellEffect::tick);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn board() -> Board {
        Board::from_owner_rows(&["PPO", "PNO", "PPN"]).unwrap()
    }

    fn place(board: &mut Board, at: Coord2, content: Content) {
        board.tile_mut(at).unwrap().content = content;
    }

    #[test]
    fn full_inventory_keeps_potions_useful() {
        let mut run = RunState::default();
        for _ in 0..run.inventory.capacity() {
            run.inventory.insert(Slot::Item(ItemKind::Key));
        }
        run.set_hp(10);

        assert_eq!(collect_item(&mut run, ItemKind::Potion), Pickup::AutoApplied);
        assert_eq!(run.hp(), 15);
        assert_eq!(collect_item(&mut run, ItemKind::Detector), Pickup::Lost);
        assert_eq!(collect_item(&mut run, ItemKind::Shield), Pickup::Applied);
        assert_eq!(run.buffs.protection, 1);
    }

    #[test]
    fn melee_kills_and_pays() {
        let mut run = RunState::default();
        let mut board = board();
        place(&mut board, (1, 1), Content::Monster(Monster::spawn(MonsterKind::Rat, 1)));
        let mut rng = SmallRng::seed_from_u64(0);

        let resolution = resolve_reveal(&mut run, &mut board, (1, 1), &mut rng);
        let Resolution::Fight {
            kind,
            report,
            damage,
            defeat,
        } = resolution
        else {
            panic!("expected a fight");
        };
        assert_eq!(kind, MonsterKind::Rat);
        assert_eq!(report.rounds, 1);
        assert_eq!(damage, 1);
        assert_eq!(defeat.map(|d| d.gold), Some(1));
        assert_eq!(run.hp(), 19);
        assert_eq!(run.gold, 1);
        assert_eq!(run.monsters_defeated, 1);
        assert!(run.seen_monsters.contains(&MonsterKind::Rat));
        assert!(board[(1, 1)].content.is_empty());
    }

    #[test]
    fn blaze_and_ward_are_spent_in_a_fight() {
        let mut run = RunState::default();
        run.buffs.blaze = 1;
        run.buffs.ward = 1;
        let mut board = board();
        let mut slime = Monster::spawn(MonsterKind::Slime, 2);
        slime.attack = 3;
        place(&mut board, (0, 0), Content::Monster(slime));

        // attack 4 against defense 1: two rounds of 3 incoming, ward absorbs 3
        let resolution = resolve_reveal(&mut run, &mut board, (0, 0), &mut SmallRng::seed_from_u64(0));
        assert!(matches!(resolution, Resolution::Fight { damage: 3, .. }));
        assert_eq!(run.buffs, Buffs::default());
    }

    #[test]
    fn boss_kill_earns_a_trophy() {
        let mut run = RunState::default();
        let mut board = board();
        place(&mut board, (0, 1), Content::Monster(Monster::spawn(MonsterKind::Dragon, 11)));
        let defeat = defeat_monster(&mut run, &mut board, (0, 1)).unwrap();
        assert!(defeat.trophy);
        assert_eq!(run.trophy_count(), 1);
        assert_eq!(run.trophies[0].source, TrophySource::Boss(MonsterKind::Dragon));
        assert_eq!(defeat_monster(&mut run, &mut board, (0, 1)), None);
    }

    #[test]
    fn loot_only_on_own_empty_tiles() {
        let mut run = RunState::default();
        run.loot_per_tile = 2;
        let mut board = board();
        let mut rng = SmallRng::seed_from_u64(0);
        assert_eq!(resolve_reveal(&mut run, &mut board, (0, 0), &mut rng), Resolution::Loot(2));
        assert_eq!(resolve_reveal(&mut run, &mut board, (1, 1), &mut rng), Resolution::Nothing);
        assert_eq!(run.gold, 2);
    }

    #[test]
    fn trap_and_gold() {
        let mut run = RunState::default();
        let mut board = board();
        place(&mut board, (0, 0), Content::Trap);
        place(&mut board, (0, 1), Content::Gold(4));
        let mut rng = SmallRng::seed_from_u64(0);

        assert_eq!(
            resolve_reveal(&mut run, &mut board, (0, 0), &mut rng),
            Resolution::Trap { damage: TRAP_DAMAGE }
        );
        assert_eq!(run.hp(), 20 - TRAP_DAMAGE);
        assert_eq!(resolve_reveal(&mut run, &mut board, (0, 1), &mut rng), Resolution::Gold(4));
        assert_eq!(run.gold, 4);
        assert!(board[(0, 1)].content.is_empty());
    }

    #[test]
    fn upgrade_cache_offers_distinct_choices() {
        let mut run = RunState::default();
        let mut board = board();
        place(&mut board, (2, 2), Content::Upgrade(UpgradeCache::default()));
        let resolution = resolve_reveal(&mut run, &mut board, (2, 2), &mut SmallRng::seed_from_u64(4));
        let Resolution::UpgradeChoice(choices) = resolution else {
            panic!("expected an upgrade choice");
        };
        assert_eq!(choices.len(), 3);
        assert!(choices.iter().all(|c| choices.iter().filter(|&d| d == c).count() == 1));
        assert!(board[(2, 2)].content.is_empty());
    }

    #[test]
    fn cloud_ticks_hit_area_and_expire() {
        let mut run = RunState::default();
        let mut board = board();
        let mut rat = Monster::spawn(MonsterKind::Rat, 1);
        rat.hp = 2;
        place(&mut board, (0, 0), Content::Monster(rat));
        place(&mut board, (2, 2), Content::Monster(Monster::spawn(MonsterKind::Bat, 1)));
        run.spell_effects.push(SpellEffect {
            spell: SpellId::StinkingCloud,
            anchor: (0, 0),
            damage: 1,
            duration: EffectDuration::Turns(2),
        });

        let hits = tick_spell_effects(&mut run, &mut board);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].defeat, None);
        assert_eq!(run.spell_effects.len(), 1);

        let hits = tick_spell_effects(&mut run, &mut board);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].defeat.is_some());
        assert!(run.spell_effects.is_empty());
        assert_eq!(board[(2, 2)].content.monster().map(|m| m.hp), Some(3));
        assert_eq!(tick_spell_effects(&mut run, &mut board), vec![]);
    }
}
