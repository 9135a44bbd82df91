use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservedTile {
    #[default]
    Hidden,
    Wall,
    Revealed { owner: Owner, by: Turn, count: u8 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub size: Coord2,
    pub opponent_remaining: Option<CellCount>,
    pub tiles: Array2<ObservedTile>,
}

impl Observation {
    pub fn new(
        size: Coord2,
        opponent_remaining: Option<CellCount>,
        tiles: Array2<ObservedTile>,
    ) -> Result<Self> {
        let obs = Self {
            size,
            opponent_remaining,
            tiles,
        };
        obs.validate()?;
        Ok(obs)
    }

    pub fn from_board(board: &Board) -> Self {
        let size = board.size();
        let mut tiles = Array2::from_elem(size.to_nd_index(), ObservedTile::Hidden);

        for (coords, tile) in board.iter() {
            tiles[coords.to_nd_index()] = if tile.is_wall() {
                ObservedTile::Wall
            } else {
                match (tile.revealed_by, board.displayed_count(coords)) {
                    (Some(by), Some(count)) => ObservedTile::Revealed {
                        owner: tile.owner,
                        by,
                        count,
                    },
                    _ => ObservedTile::Hidden,
                }
            };
        }

        Self {
            size,
            opponent_remaining: Some(board.unrevealed_count(Owner::Opponent)),
            tiles,
        }
    }

    pub fn tile(&self, coords: Coord2) -> ObservedTile {
        self.tiles[coords.to_nd_index()]
    }

    pub fn validate(&self) -> Result<()> {
        if self.tiles.dim() != (usize::from(self.size.0), usize::from(self.size.1)) {
            return Err(EngineError::InvalidBoardShape);
        }
        Ok(())
    }
}
