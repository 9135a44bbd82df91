use alloc::vec::Vec;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;

use super::*;

/// Prefers tiles the player can already prove are the opponent's, so a
/// reveal hands out as little new information as possible. Falls back to a
/// uniform pick.
#[derive(Clone, Debug)]
pub struct ConstraintPolicy {
    rng: SmallRng,
    config: AnalysisConfig,
    node_budget: usize,
}

impl ConstraintPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            config: AnalysisConfig::default(),
            node_budget: DEFAULT_NODE_BUDGET,
        }
    }

    pub fn with_node_budget(mut self, node_budget: usize) -> Self {
        self.node_budget = node_budget;
        self
    }

    pub fn known_to_player(&self, board: &Board) -> Vec<Coord2> {
        let build = build_constraints(&Observation::from_board(board), self.config);
        if !build.contradictions.is_empty() {
            log::warn!(
                "Player observation has {} contradictions",
                build.contradictions.len()
            );
        }
        solve(&build.problem, self.node_budget)
            .forced_opponent
            .into_iter()
            .filter(|&coords| board.can_reveal(coords))
            .collect()
    }
}

impl OpponentPolicy for ConstraintPolicy {
    fn name(&self) -> &str {
        "constraint"
    }

    fn choose_move(&mut self, board: &Board) -> Option<Coord2> {
        let known = self.known_to_player(board);
        if let Some(&coords) = known.choose(&mut self.rng) {
            log::trace!("Opponent takes deduced tile {:?}", coords);
            return Some(coords);
        }
        board
            .revealable_of(Owner::Opponent)
            .choose(&mut self.rng)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_the_deduced_tile_first() {
        // the opponent clue at (0, 0) pins (1, 0), (0, 1) and (1, 1)
        let mut board = Board::from_owner_rows(&["POPNO", "OONNO", "NPNNO"]).unwrap();
        board.reveal((0, 0), Turn::Opponent);
        let mut policy = ConstraintPolicy::new(3);

        let known = policy.known_to_player(&board);
        assert_eq!(known.len(), 3);
        for _ in 0..20 {
            let coords = policy.choose_move(&board).unwrap();
            assert!(known.contains(&coords));
        }
    }

    #[test]
    fn falls_back_to_any_opponent_tile() {
        let board = Board::from_owner_rows(&["POPNO", "OONNO"]).unwrap();
        let mut policy = ConstraintPolicy::new(3);
        assert!(policy.known_to_player(&board).is_empty());

        let coords = policy.choose_move(&board).unwrap();
        assert_eq!(board[coords].owner, Owner::Opponent);
    }

    #[test]
    fn locked_deductions_are_skipped() {
        let mut board = Board::from_owner_rows(&["POP", "OON", "NPN"]).unwrap();
        board.tile_mut((2, 2)).unwrap().chain = Some(Chain {
            id: 0,
            requires: None,
            unlocks: Some((1, 1)),
        });
        board.tile_mut((1, 1)).unwrap().chain = Some(Chain {
            id: 0,
            requires: Some((2, 2)),
            unlocks: None,
        });
        board.reveal((0, 0), Turn::Opponent);

        let policy = ConstraintPolicy::new(0);
        let known = policy.known_to_player(&board);
        assert!(!known.contains(&(1, 1)));
        assert_eq!(known.len(), 2);
    }

    #[test]
    fn no_move_on_a_finished_board() {
        let mut board = Board::from_owner_rows(&["PO"]).unwrap();
        board.reveal((1, 0), Turn::Opponent);
        assert_eq!(ConstraintPolicy::new(0).choose_move(&board), None);
    }
}
