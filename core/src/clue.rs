use alloc::vec::Vec;
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::*;

pub const BASE_HAND_SIZE: usize = 3;
pub const GLIMPSE_HAND_SIZE: usize = 2;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClueSpec {
    pub left_bonus: u8,
    pub right_bonus: u8,
    pub glimpse: bool,
}

impl ClueSpec {
    pub fn hand_sizes(self) -> (usize, usize) {
        if self.glimpse {
            (GLIMPSE_HAND_SIZE, GLIMPSE_HAND_SIZE)
        } else {
            (
                BASE_HAND_SIZE + usize::from(self.left_bonus),
                BASE_HAND_SIZE + usize::from(self.right_bonus),
            )
        }
    }
}

pub type Hand = SmallVec<[Coord2; 6]>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClueHint {
    pub hand_a: Owner,
    pub hand_b: Owner,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clue {
    pub hand_a: Hand,
    pub hand_b: Hand,
    pub hint: ClueHint,
    pub glimpse: bool,
}

/// Draws a two-hand clue: hand A leans towards the player's tiles, hand B
/// towards the opponent's, each salted with decoys. Only unrevealed tiles
/// are used; `None` when there is nothing left to hint at.
pub fn generate_clue<R: Rng + ?Sized>(board: &Board, spec: ClueSpec, rng: &mut R) -> Option<Clue> {
    let hidden = |owner: Owner| -> Vec<Coord2> {
        board
            .iter()
            .filter(|(_, tile)| tile.owner == owner && !tile.revealed)
            .map(|(coords, _)| coords)
            .collect()
    };
    let player = hidden(Owner::Player);
    let opponent = hidden(Owner::Opponent);
    let neutral = hidden(Owner::Neutral);

    let (size_a, size_b) = spec.hand_sizes();

    let decoys_a: Vec<Coord2> = opponent.iter().chain(&neutral).copied().collect();
    let hand_a = draw_hand(&player, &decoys_a, size_a, rng);

    let unused = |pool: &[Coord2]| -> Vec<Coord2> {
        pool.iter()
            .copied()
            .filter(|coords| !hand_a.contains(coords))
            .collect()
    };
    let majority_b = unused(&opponent);
    let decoys_b = unused(&player.iter().chain(&neutral).copied().collect::<Vec<_>>());
    let hand_b = draw_hand(&majority_b, &decoys_b, size_b, rng);

    if hand_a.is_empty() && hand_b.is_empty() {
        return None;
    }

    Some(Clue {
        hand_a,
        hand_b,
        hint: ClueHint {
            hand_a: Owner::Player,
            hand_b: Owner::Opponent,
        },
        glimpse: spec.glimpse,
    })
}

fn draw_hand<R: Rng + ?Sized>(
    majority_pool: &[Coord2],
    decoy_pool: &[Coord2],
    size: usize,
    rng: &mut R,
) -> Hand {
    if size == 0 || majority_pool.is_empty() {
        return Hand::new();
    }

    let wanted_decoys = match size {
        0 | 1 => 0,
        2 | 3 => 1,
        _ => rng.random_range(1..=(size - 1) / 2),
    };
    let mut decoys = wanted_decoys.min(decoy_pool.len());

    let mut majority = (size - decoys).min(majority_pool.len());
    // never hand out every remaining tile of the majority owner
    if majority == majority_pool.len() && majority > 1 {
        majority -= 1;
    }
    // keep the majority strict except in the one-tile endgame
    decoys = decoys.min(majority.saturating_sub(1).max(1));

    let mut hand: Hand = majority_pool
        .choose_multiple(rng, majority)
        .chain(decoy_pool.choose_multiple(rng, decoys))
        .copied()
        .collect();
    hand.shuffle(rng);
    hand
}

impl Clue {
    pub fn tally(&self, board: &Board, owner: Owner) -> (usize, usize) {
        let count = |hand: &Hand| hand.iter().filter(|&&c| board[c].owner == owner).count();
        (count(&self.hand_a), count(&self.hand_b))
    }
}
