use alloc::vec;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::*;

pub const CLOUD_TURNS: u32 = 3;
pub const CLOUD_DAMAGE: i32 = 1;
pub const MEND_HEAL: i32 = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpellId {
    MagicMissile,
    StinkingCloud,
    Clairvoyance,
    Mend,
}

impl SpellId {
    pub const ALL: [SpellId; 4] = [
        Self::MagicMissile,
        Self::StinkingCloud,
        Self::Clairvoyance,
        Self::Mend,
    ];

    pub const fn mana_cost(self) -> u32 {
        match self {
            Self::MagicMissile => 1,
            Self::StinkingCloud | Self::Clairvoyance | Self::Mend => 2,
        }
    }

    pub const fn needs_target(self) -> bool {
        matches!(self, Self::MagicMissile | Self::StinkingCloud)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectDuration {
    Turns(u32),
    Permanent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellEffect {
    pub spell: SpellId,
    pub anchor: Coord2,
    pub damage: i32,
    pub duration: EffectDuration,
}

impl SpellEffect {
    pub fn tick(&mut self) -> bool {
        match &mut self.duration {
            EffectDuration::Permanent => true,
            EffectDuration::Turns(turns) => {
                *turns = turns.saturating_sub(1);
                *turns > 0
            }
        }
    }
}

pub const fn missile_damage(level: u8) -> i32 {
    level.div_ceil(2) as i32
}

pub fn can_cast_spell(run: &RunState, spell: SpellId) -> bool {
    check_mana(run, spell).is_ok()
}

fn check_mana(run: &RunState, spell: SpellId) -> ActionResult<()> {
    let needed = spell.mana_cost();
    if run.mana() < needed {
        Err(ActionError::InsufficientMana {
            needed,
            available: run.mana(),
        })
    } else {
        Ok(())
    }
}

/// Translates a cast into effects. Never mutates; mana is left for the
/// caller to deduct once the effects are applied.
pub fn resolve_spell(
    spell: SpellId,
    run: &RunState,
    board: &Board,
    target: Option<Coord2>,
) -> ActionResult<Vec<Effect>> {
    check_mana(run, spell)?;

    let target = match (spell.needs_target(), target) {
        (true, None) => return Err(ActionError::TargetingRequired),
        (_, target) => target,
    };

    Ok(match (spell, target) {
        (SpellId::MagicMissile, Some(at)) => {
            monster_at(board, at)?;
            vec![Effect::Damage {
                at,
                amount: missile_damage(run.level),
            }]
        }
        (SpellId::StinkingCloud, Some(at)) => {
            let tile = board.tile(at).ok_or(ActionError::OutOfBounds(at))?;
            if tile.is_wall() {
                return Err(ActionError::Wall(at));
            }
            let duration = if run.upgrade_count(UpgradeId::Lingering) > 0 {
                EffectDuration::Permanent
            } else {
                EffectDuration::Turns(CLOUD_TURNS)
            };
            vec![Effect::AddSpellEffect(SpellEffect {
                spell,
                anchor: at,
                damage: CLOUD_DAMAGE,
                duration,
            })]
        }
        (SpellId::Clairvoyance, _) => vec![Effect::Clue { glimpse: false }],
        (SpellId::Mend, _) => vec![Effect::Heal(MEND_HEAL)],
        (SpellId::MagicMissile | SpellId::StinkingCloud, None) => {
            return Err(ActionError::TargetingRequired);
        }
    })
}

pub(crate) fn monster_at(board: &Board, at: Coord2) -> ActionResult<&Monster> {
    let tile = board.tile(at).ok_or(ActionError::OutOfBounds(at))?;
    if tile.fogged && !tile.revealed {
        return Err(ActionError::InvalidTarget(at, "the tile is fogged"));
    }
    tile.content
        .monster()
        .ok_or(ActionError::InvalidTarget(at, "no monster there"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with_monster(hp: i32) -> Board {
        let mut board = Board::from_owner_rows(&["PON", "PON", "PWN"]).unwrap();
        let mut monster = Monster::spawn(MonsterKind::Slime, 2);
        monster.hp = hp;
        board.tile_mut((1, 1)).unwrap().content = Content::Monster(monster);
        board
    }

    fn run_with(level: u8, mana: u32) -> RunState {
        let mut run = RunState::new(CharacterId::Mage);
        run.level = level;
        run.raise_max_mana(mana.saturating_sub(run.max_mana()));
        run.refill_mana();
        run.spend_mana(run.mana() - mana).unwrap();
        run
    }

    #[test]
    fn missile_damage_is_half_level_rounded_up() {
        assert_eq!(missile_damage(1), 1);
        assert_eq!(missile_damage(4), 2);
        assert_eq!(missile_damage(5), 3);
    }

    #[test]
    fn missile_at_monster_yields_damage() {
        let board = board_with_monster(3);
        let run = run_with(4, 1);
        let effects = resolve_spell(SpellId::MagicMissile, &run, &board, Some((1, 1))).unwrap();
        assert_eq!(effects, [Effect::Damage { at: (1, 1), amount: 2 }]);
    }

    #[test]
    fn missile_needs_a_target_and_a_monster() {
        let board = board_with_monster(3);
        let run = run_with(4, 3);
        assert_eq!(
            resolve_spell(SpellId::MagicMissile, &run, &board, None),
            Err(ActionError::TargetingRequired)
        );
        assert!(matches!(
            resolve_spell(SpellId::MagicMissile, &run, &board, Some((0, 0))),
            Err(ActionError::InvalidTarget((0, 0), _))
        ));
    }

    #[test]
    fn fog_hides_whether_a_monster_is_there() {
        let mut board = board_with_monster(3);
        board.tile_mut((1, 1)).unwrap().fogged = true;
        board.tile_mut((2, 1)).unwrap().fogged = true;
        let run = run_with(4, 3);
        let hidden_monster = resolve_spell(SpellId::MagicMissile, &run, &board, Some((1, 1)));
        let hidden_nothing = resolve_spell(SpellId::MagicMissile, &run, &board, Some((2, 1)));
        assert_eq!(
            hidden_monster,
            Err(ActionError::InvalidTarget((1, 1), "the tile is fogged"))
        );
        assert_eq!(
            hidden_nothing,
            Err(ActionError::InvalidTarget((2, 1), "the tile is fogged"))
        );
    }

    #[test]
    fn mana_is_checked_before_targeting() {
        let board = board_with_monster(3);
        let run = run_with(4, 0);
        assert!(!can_cast_spell(&run, SpellId::MagicMissile));
        assert_eq!(
            resolve_spell(SpellId::MagicMissile, &run, &board, None),
            Err(ActionError::InsufficientMana {
                needed: 1,
                available: 0
            })
        );
    }

    #[test]
    fn cloud_becomes_permanent_with_lingering() {
        let board = board_with_monster(3);
        let mut run = run_with(2, 3);
        let effects = resolve_spell(SpellId::StinkingCloud, &run, &board, Some((1, 1))).unwrap();
        assert!(matches!(
            effects.as_slice(),
            [Effect::AddSpellEffect(SpellEffect {
                duration: EffectDuration::Turns(CLOUD_TURNS),
                ..
            })]
        ));

        apply_upgrade(&mut run, UpgradeId::Lingering);
        let effects = resolve_spell(SpellId::StinkingCloud, &run, &board, Some((1, 1))).unwrap();
        assert!(matches!(
            effects.as_slice(),
            [Effect::AddSpellEffect(SpellEffect {
                duration: EffectDuration::Permanent,
                ..
            })]
        ));
        assert_eq!(
            resolve_spell(SpellId::StinkingCloud, &run, &board, Some((1, 2))),
            Err(ActionError::Wall((1, 2)))
        );
    }

    #[test]
    fn untargeted_spells_ignore_target() {
        let board = board_with_monster(3);
        let run = run_with(1, 3);
        assert_eq!(
            resolve_spell(SpellId::Mend, &run, &board, None),
            Ok(vec![Effect::Heal(MEND_HEAL)])
        );
        assert_eq!(
            resolve_spell(SpellId::Clairvoyance, &run, &board, Some((0, 0))),
            Ok(vec![Effect::Clue { glimpse: false }])
        );
    }

    #[test]
    fn finite_effects_expire() {
        let mut effect = SpellEffect {
            spell: SpellId::StinkingCloud,
            anchor: (0, 0),
            damage: 1,
            duration: EffectDuration::Turns(2),
        };
        assert!(effect.tick());
        assert!(!effect.tick());

        effect.duration = EffectDuration::Permanent;
        assert!(effect.tick());
    }
}
