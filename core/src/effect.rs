use alloc::vec;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::*;

pub const POTION_HEAL: i32 = 5;
pub const ETHER_MANA: u32 = 3;
pub const STAFF_DAMAGE: i32 = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuffKind {
    Ward,
    Blaze,
    Protection,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Damage { at: Coord2, amount: i32 },
    Heal(i32),
    RestoreMana(u32),
    AddSpellEffect(SpellEffect),
    Clue { glimpse: bool },
    Scan { at: Coord2 },
    Unlock { at: Coord2 },
    Transmute { at: Coord2 },
    ClearFog { at: Coord2 },
    Buff(BuffKind),
}

/// Translates an item use into effects. Never mutates; consuming the item
/// or a charge is up to the caller.
pub fn resolve_item(
    item: ItemKind,
    board: &Board,
    target: Option<Coord2>,
) -> ActionResult<Vec<Effect>> {
    use ItemKind::*;

    if item.usage() == ItemUse::Targeted && target.is_none() {
        return Err(ActionError::TargetingRequired);
    }

    let effect = match (item, target) {
        (Potion, _) => Effect::Heal(POTION_HEAL),
        (Ether, _) => Effect::RestoreMana(ETHER_MANA),
        (CrystalBall, _) => Effect::Clue { glimpse: false },
        (Spyglass, _) => Effect::Clue { glimpse: true },
        (Ward, _) => Effect::Buff(BuffKind::Ward),
        (Blaze, _) => Effect::Buff(BuffKind::Blaze),
        (Shield, _) => Effect::Buff(BuffKind::Protection),
        (Tome(_), _) => return Err(ActionError::NotUsable(item)),
        (Detector, Some(at)) => {
            non_wall(board, at)?;
            Effect::Scan { at }
        }
        (Ring { .. }, Some(at)) => {
            non_wall(board, at)?;
            Effect::ClearFog { at }
        }
        (Key, Some(at)) => {
            non_wall(board, at)?;
            if !board.is_blocked(at) {
                return Err(ActionError::InvalidTarget(at, "nothing is locked there"));
            }
            Effect::Unlock { at }
        }
        (Transmute, Some(at)) => {
            board
                .check_revealable(at)
                .map_err(|reason| reason.into_action_error(at))?;
            Effect::Transmute { at }
        }
        (Staff { charges }, Some(at)) => {
            if charges == 0 {
                return Err(ActionError::InvalidTarget(at, "the staff is spent"));
            }
            crate::spell::monster_at(board, at)?;
            Effect::Damage {
                at,
                amount: STAFF_DAMAGE,
            }
        }
        (Detector | Ring { .. } | Key | Transmute | Staff { .. }, None) => {
            return Err(ActionError::TargetingRequired);
        }
    };
    Ok(vec![effect])
}

fn non_wall(board: &Board, at: Coord2) -> ActionResult<()> {
    let tile = board.tile(at).ok_or(ActionError::OutOfBounds(at))?;
    if tile.is_wall() {
        Err(ActionError::Wall(at))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> Board {
        let mut board = Board::from_owner_rows(&["POW", "NPO"]).unwrap();
        board.tile_mut((0, 0)).unwrap().chain = Some(Chain {
            id: 0,
            requires: None,
            unlocks: Some((1, 1)),
        });
        board.tile_mut((1, 1)).unwrap().chain = Some(Chain {
            id: 0,
            requires: Some((0, 0)),
            unlocks: None,
        });
        board.tile_mut((1, 0)).unwrap().content =
            Content::Monster(Monster::spawn(MonsterKind::Rat, 1));
        board
    }

    #[test]
    fn direct_items_need_no_target() {
        let board = board();
        assert_eq!(
            resolve_item(ItemKind::Potion, &board, None),
            Ok(vec![Effect::Heal(POTION_HEAL)])
        );
        assert_eq!(
            resolve_item(ItemKind::Spyglass, &board, None),
            Ok(vec![Effect::Clue { glimpse: true }])
        );
    }

    #[test]
    fn tomes_are_learned_not_used() {
        let tome = ItemKind::Tome(SpellId::Mend);
        assert_eq!(
            resolve_item(tome, &board(), None),
            Err(ActionError::NotUsable(tome))
        );
    }

    #[test]
    fn targeted_items_ask_for_a_target() {
        let board = board();
        for item in [
            ItemKind::Detector,
            ItemKind::Key,
            ItemKind::Transmute,
            ItemKind::staff(),
            ItemKind::ring(),
        ] {
            assert_eq!(
                resolve_item(item, &board, None),
                Err(ActionError::TargetingRequired)
            );
        }
    }

    #[test]
    fn key_only_fits_locked_tiles() {
        let board = board();
        assert_eq!(
            resolve_item(ItemKind::Key, &board, Some((1, 1))),
            Ok(vec![Effect::Unlock { at: (1, 1) }])
        );
        assert!(matches!(
            resolve_item(ItemKind::Key, &board, Some((0, 1))),
            Err(ActionError::InvalidTarget(..))
        ));
    }

    #[test]
    fn transmute_respects_reveal_rules() {
        let board = board();
        assert_eq!(
            resolve_item(ItemKind::Transmute, &board, Some((1, 1))),
            Err(ActionError::Blocked((1, 1)))
        );
        assert_eq!(
            resolve_item(ItemKind::Transmute, &board, Some((2, 0))),
            Err(ActionError::Wall((2, 0)))
        );
        assert_eq!(
            resolve_item(ItemKind::Transmute, &board, Some((2, 1))),
            Ok(vec![Effect::Transmute { at: (2, 1) }])
        );
    }

    #[test]
    fn staff_hits_monsters_only() {
        let board = board();
        assert_eq!(
            resolve_item(ItemKind::staff(), &board, Some((1, 0))),
            Ok(vec![Effect::Damage {
                at: (1, 0),
                amount: STAFF_DAMAGE
            }])
        );
        assert!(resolve_item(ItemKind::staff(), &board, Some((0, 1))).is_err());
        assert!(resolve_item(ItemKind::Staff { charges: 0 }, &board, Some((1, 0))).is_err());
    }
}
