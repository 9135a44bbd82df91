use serde::{Deserialize, Serialize};

pub const MAX_COMBAT_ROUNDS: u32 = 1000;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonsterKind {
    Rat,
    Bat,
    Slime,
    Goblin,
    Skeleton,
    Ghost,
    Orc,
    Troll,
    Wraith,
    Dragon,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MonsterTemplate {
    pub kind: MonsterKind,
    pub min_level: u8,
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub gold: u32,
    pub boss: bool,
}

const fn template(
    kind: MonsterKind,
    min_level: u8,
    hp: i32,
    attack: i32,
    defense: i32,
    gold: u32,
) -> MonsterTemplate {
    MonsterTemplate {
        kind,
        min_level,
        hp,
        attack,
        defense,
        gold,
        boss: false,
    }
}

pub const MONSTERS: [MonsterTemplate; 10] = [
    template(MonsterKind::Rat, 1, 2, 1, 0, 1),
    template(MonsterKind::Bat, 1, 3, 1, 0, 1),
    template(MonsterKind::Slime, 2, 5, 1, 1, 2),
    template(MonsterKind::Goblin, 3, 5, 2, 0, 2),
    template(MonsterKind::Skeleton, 4, 7, 3, 1, 3),
    template(MonsterKind::Ghost, 5, 6, 3, 2, 3),
    template(MonsterKind::Orc, 6, 10, 4, 1, 4),
    template(MonsterKind::Troll, 8, 14, 5, 2, 5),
    template(MonsterKind::Wraith, 9, 12, 6, 3, 6),
    MonsterTemplate {
        boss: true,
        ..template(MonsterKind::Dragon, 11, 25, 7, 3, 12)
    },
];

impl MonsterKind {
    pub fn template(self) -> &'static MonsterTemplate {
        // every kind has exactly one row, in declaration order
        &MONSTERS[self as usize]
    }

    pub fn available_at(level: u8) -> impl Iterator<Item = MonsterKind> {
        MONSTERS
            .iter()
            .filter(move |t| t.min_level <= level)
            .map(|t| t.kind)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monster {
    pub kind: MonsterKind,
    pub hp: i32,
    pub max_hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub gold: u32,
    pub boss: bool,
}

impl Monster {
    pub fn spawn(kind: MonsterKind, level: u8) -> Self {
        let t = kind.template();
        let bonus = i32::from(level.saturating_sub(t.min_level) / 2);
        Self {
            kind,
            hp: t.hp + bonus,
            max_hp: t.hp + bonus,
            attack: t.attack,
            defense: t.defense,
            gold: t.gold,
            boss: t.boss,
        }
    }

    pub const fn is_defeated(&self) -> bool {
        self.hp <= 0
    }

    pub fn take_damage(&mut self, amount: i32) -> bool {
        self.hp = self.hp.saturating_sub(amount.max(0));
        self.is_defeated()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatReport {
    pub damage_taken: i32,
    pub rounds: u32,
    pub monster_defeated: bool,
    pub ceiling_hit: bool,
}

/// Round-robin melee: the monster strikes first each round, every hit deals
/// at least 1. Damage is accumulated and left for the caller to apply once.
pub fn fight_monster(attack: i32, defense: i32, monster: &Monster) -> CombatReport {
    let incoming = monster.attack.saturating_sub(defense).max(1);
    let outgoing = attack.saturating_sub(monster.defense).max(1);

    let mut monster_hp = monster.hp;
    let mut damage_taken: i32 = 0;
    let mut rounds = 0;

    while monster_hp > 0 && rounds < MAX_COMBAT_ROUNDS {
        damage_taken = damage_taken.saturating_add(incoming);
        monster_hp = monster_hp.saturating_sub(outgoing);
        rounds += 1;
    }

    let ceiling_hit = monster_hp > 0;
    if ceiling_hit {
        log::warn!(
            "Combat with {:?} hit the {} round ceiling, {} hp left",
            monster.kind,
            MAX_COMBAT_ROUNDS,
            monster_hp
        );
    }

    CombatReport {
        damage_taken,
        rounds,
        monster_defeated: !ceiling_hit,
        ceiling_hit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monster(hp: i32, attack: i32, defense: i32) -> Monster {
        Monster {
            hp,
            max_hp: hp,
            attack,
            defense,
            ..Monster::spawn(MonsterKind::Rat, 1)
        }
    }

    #[test]
    fn monster_strikes_first() {
        let report = fight_monster(10, 0, &monster(1, 2, 0));
        assert_eq!(report.rounds, 1);
        assert_eq!(report.damage_taken, 2);
        assert!(report.monster_defeated);
    }

    #[test]
    fn hits_deal_at_least_one() {
        let report = fight_monster(1, 50, &monster(3, 1, 40));
        assert_eq!(report.rounds, 3);
        assert_eq!(report.damage_taken, 3);
    }

    #[test]
    fn rounds_are_capped() {
        let report = fight_monster(1, 0, &monster(5000, 1, 0));
        assert!(report.ceiling_hit);
        assert!(!report.monster_defeated);
        assert_eq!(report.rounds, MAX_COMBAT_ROUNDS);
        assert_eq!(report.damage_taken, MAX_COMBAT_ROUNDS as i32);
    }

    #[test]
    fn combat_terminates_for_positive_inputs() {
        for attack in 1..8 {
            for defense in 1..8 {
                for hp in [1, 7, 40, 999] {
                    let report = fight_monster(attack, defense, &monster(hp, 3, 1));
                    assert!(report.rounds <= MAX_COMBAT_ROUNDS);
                    assert!(report.damage_taken >= 0);
                }
            }
        }
    }

    #[test]
    fn spawn_scales_with_level() {
        assert_eq!(Monster::spawn(MonsterKind::Rat, 1).hp, 2);
        assert_eq!(Monster::spawn(MonsterKind::Rat, 5).hp, 4);
        assert!(Monster::spawn(MonsterKind::Dragon, 11).boss);
    }

    #[test]
    fn templates_line_up_with_kinds() {
        for t in &MONSTERS {
            assert_eq!(t.kind.template().kind, t.kind);
        }
        assert_eq!(MonsterKind::available_at(1).count(), 2);
    }
}
