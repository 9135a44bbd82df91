use alloc::vec::Vec;
use core::ops::Index;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardStatus {
    InProgress,
    Won,
    Lost,
}

impl BoardStatus {
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

impl Default for BoardStatus {
    fn default() -> Self {
        Self::InProgress
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RevealBlock {
    OutOfBounds,
    Wall,
    AlreadyRevealed,
    Locked,
}

impl RevealBlock {
    pub const fn into_action_error(self, coords: Coord2) -> ActionError {
        match self {
            Self::OutOfBounds => ActionError::OutOfBounds(coords),
            Self::Wall => ActionError::Wall(coords),
            Self::AlreadyRevealed => ActionError::AlreadyRevealed(coords),
            Self::Locked => ActionError::Blocked(coords),
        }
    }
}

/// One level's grid. The revealed counters are only touched by [`Board::reveal`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    tiles: Array2<Tile>,
    player_total: CellCount,
    player_revealed: CellCount,
    opponent_total: CellCount,
    opponent_revealed: CellCount,
}

impl Board {
    pub fn from_owners(owners: Array2<Owner>) -> Self {
        let tiles = owners.mapv(Tile::new);
        let mut board = Self {
            tiles,
            player_total: 0,
            player_revealed: 0,
            opponent_total: 0,
            opponent_revealed: 0,
        };
        board.recount_totals();
        board
    }

    pub fn from_owner_rows(rows: &[&str]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.chars().count());
        if width == 0 || width > usize::from(Coord::MAX) || height > usize::from(Coord::MAX) {
            return Err(EngineError::InvalidBoardShape);
        }

        let mut owners = Array2::from_elem([width, height], Owner::Neutral);
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(EngineError::InvalidBoardShape);
            }
            for (x, c) in row.chars().enumerate() {
                owners[[x, y]] = Owner::from_char(c).ok_or(EngineError::InvalidBoardShape)?;
            }
        }
        Ok(Self::from_owners(owners))
    }

    pub fn size(&self) -> Coord2 {
        array_size(&self.tiles)
    }

    pub fn width(&self) -> Coord {
        self.size().0
    }

    pub fn height(&self) -> Coord {
        self.size().1
    }

    pub fn total_tiles(&self) -> CellCount {
        let (w, h) = self.size();
        mult(w, h)
    }

    pub fn player_total(&self) -> CellCount {
        self.player_total
    }

    pub fn player_revealed(&self) -> CellCount {
        self.player_revealed
    }

    pub fn opponent_total(&self) -> CellCount {
        self.opponent_total
    }

    pub fn opponent_revealed(&self) -> CellCount {
        self.opponent_revealed
    }

    pub fn in_bounds(&self, coords: Coord2) -> bool {
        let size = self.size();
        coords.0 < size.0 && coords.1 < size.1
    }

    pub fn tile(&self, coords: Coord2) -> Option<&Tile> {
        self.tiles.get(coords.to_nd_index())
    }

    pub(crate) fn tile_mut(&mut self, coords: Coord2) -> Option<&mut Tile> {
        self.tiles.get_mut(coords.to_nd_index())
    }

    pub fn coords(&self) -> impl Iterator<Item = Coord2> + use<> {
        let (w, h) = self.size();
        (0..w).flat_map(move |x| (0..h).map(move |y| (x, y)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Coord2, &Tile)> {
        self.coords().map(|coords| (coords, &self[coords]))
    }

    pub fn iter_neighbors(&self, coords: Coord2) -> NeighborIter {
        self.tiles.iter_neighbors(coords)
    }

    pub fn iter_area(&self, coords: Coord2) -> NeighborIter {
        self.tiles.iter_area(coords)
    }

    pub fn is_blocked(&self, coords: Coord2) -> bool {
        self.tile(coords)
            .and_then(|tile| tile.chain)
            .and_then(|chain| chain.requires)
            .is_some_and(|key| self.tile(key).is_some_and(|key_tile| !key_tile.revealed))
    }

    pub fn check_revealable(&self, coords: Coord2) -> core::result::Result<(), RevealBlock> {
        let tile = self.tile(coords).ok_or(RevealBlock::OutOfBounds)?;
        if tile.is_wall() {
            Err(RevealBlock::Wall)
        } else if tile.revealed {
            Err(RevealBlock::AlreadyRevealed)
        } else if self.is_blocked(coords) {
            Err(RevealBlock::Locked)
        } else {
            Ok(())
        }
    }

    pub fn can_reveal(&self, coords: Coord2) -> bool {
        self.check_revealable(coords).is_ok()
    }

    /// Reveals a single tile on behalf of `by`. Returns `false` without
    /// touching anything when the tile cannot be revealed.
    pub fn reveal(&mut self, coords: Coord2, by: Turn) -> bool {
        if let Err(reason) = self.check_revealable(coords) {
            log::trace!("Reveal of {:?} by {:?} refused: {:?}", coords, by, reason);
            return false;
        }

        let tile = &mut self.tiles[coords.to_nd_index()];
        tile.revealed = true;
        tile.revealed_by = Some(by);
        match tile.owner {
            Owner::Player => self.player_revealed += 1,
            Owner::Opponent => self.opponent_revealed += 1,
            Owner::Neutral | Owner::Wall => {}
        }
        log::trace!("{:?} revealed {:?} ({:?})", by, coords, tile.owner);
        true
    }

    pub fn adjacent_count(&self, coords: Coord2, owner: Owner) -> u8 {
        let count = self
            .iter_neighbors(coords)
            .filter(|&pos| self[pos].owner == owner)
            .count();
        u8::try_from(count).unwrap_or(u8::MAX)
    }

    pub fn displayed_count(&self, coords: Coord2) -> Option<u8> {
        let tile = self.tile(coords)?;
        let by = tile.revealed_by.filter(|_| tile.revealed)?;
        Some(self.adjacent_count(coords, by.owner()))
    }

    pub fn scan(&self, coords: Coord2) -> DetectorScan {
        let mut scan = DetectorScan::default();
        for pos in self.iter_area(coords) {
            scan.record(self[pos].owner);
        }
        scan
    }

    pub fn status(&self) -> BoardStatus {
        if self.player_revealed >= self.player_total {
            BoardStatus::Won
        } else if self.opponent_total > 0 && self.opponent_revealed >= self.opponent_total {
            BoardStatus::Lost
        } else {
            BoardStatus::InProgress
        }
    }

    pub fn revealable_of(&self, owner: Owner) -> Vec<Coord2> {
        self.iter()
            .filter(|(coords, tile)| tile.owner == owner && self.can_reveal(*coords))
            .map(|(coords, _)| coords)
            .collect()
    }

    pub fn unrevealed_count(&self, owner: Owner) -> CellCount {
        match owner {
            Owner::Player => self.player_total - self.player_revealed,
            Owner::Opponent => self.opponent_total - self.opponent_revealed,
            Owner::Neutral | Owner::Wall => {
                let count = self
                    .iter()
                    .filter(|(_, tile)| tile.owner == owner && !tile.revealed)
                    .count();
                CellCount::try_from(count).unwrap_or(CellCount::MAX)
            }
        }
    }

    pub(crate) fn unlock(&mut self, coords: Coord2) -> bool {
        let Some(key) = self
            .tile(coords)
            .and_then(|tile| tile.chain)
            .and_then(|chain| chain.requires)
        else {
            return false;
        };

        if let Some(chain) = self.tile_mut(coords).and_then(|tile| tile.chain.as_mut()) {
            chain.requires = None;
        }
        if let Some(chain) = self.tile_mut(key).and_then(|tile| tile.chain.as_mut()) {
            chain.unlocks = None;
        }
        true
    }

    pub(crate) fn set_owner(&mut self, coords: Coord2, owner: Owner) -> bool {
        match self.tile_mut(coords) {
            Some(tile) if !tile.revealed => tile.owner = owner,
            _ => return false,
        }
        self.recount_totals();
        true
    }

    fn recount_totals(&mut self) {
        let mut player = 0;
        let mut opponent = 0;
        for tile in &self.tiles {
            match tile.owner {
                Owner::Player => player += 1,
                Owner::Opponent => opponent += 1,
                Owner::Neutral | Owner::Wall => {}
            }
        }
        self.player_total = player;
        self.opponent_total = opponent;
    }
}

impl Index<Coord2> for Board {
    type Output = Tile;

    fn index(&self, coords: Coord2) -> &Self::Output {
        &self.tiles[coords.to_nd_index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(rows: &[&str]) -> Board {
        Board::from_owner_rows(rows).unwrap()
    }

    fn count_revealed(board: &Board, owner: Owner) -> CellCount {
        board
            .iter()
            .filter(|(_, tile)| tile.owner == owner && tile.revealed)
            .count() as CellCount
    }

    #[test]
    fn parses_rows_with_y_downwards() {
        let board = board(&["PO", "NW"]);
        assert_eq!(board.size(), (2, 2));
        assert_eq!(board[(1, 0)].owner, Owner::Opponent);
        assert_eq!(board[(0, 1)].owner, Owner::Neutral);
        assert_eq!(board.player_total(), 1);
        assert_eq!(board.opponent_total(), 1);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        assert_eq!(
            Board::from_owner_rows(&["PO", "N"]),
            Err(EngineError::InvalidBoardShape)
        );
        assert_eq!(
            Board::from_owner_rows(&["PX"]),
            Err(EngineError::InvalidBoardShape)
        );
    }

    #[test]
    fn counters_track_revealed_tiles() {
        let mut board = board(&["PPO", "NOP", "OOW"]);
        for coords in [(0, 0), (2, 0), (0, 1), (2, 1), (2, 2), (1, 1)] {
            board.reveal(coords, Turn::Player);
            assert_eq!(board.player_revealed(), count_revealed(&board, Owner::Player));
            assert_eq!(board.opponent_revealed(), count_revealed(&board, Owner::Opponent));
        }
    }

    #[test]
    fn second_reveal_is_refused_without_mutation() {
        let mut board = board(&["PO"]);
        assert!(board.reveal((0, 0), Turn::Player));
        let before = board.clone();
        assert!(!board.reveal((0, 0), Turn::Opponent));
        assert_eq!(board, before);
    }

    #[test]
    fn walls_and_out_of_bounds_are_refused() {
        let mut board = board(&["PW"]);
        assert!(!board.reveal((1, 0), Turn::Player));
        assert!(!board.reveal((5, 5), Turn::Player));
        assert_eq!(board.check_revealable((1, 0)), Err(RevealBlock::Wall));
    }

    #[test]
    fn locked_tile_waits_for_its_key() {
        let mut board = board(&["PPO"]);
        board.tile_mut((0, 0)).unwrap().chain = Some(Chain {
            id: 0,
            requires: None,
            unlocks: Some((2, 0)),
        });
        board.tile_mut((2, 0)).unwrap().chain = Some(Chain {
            id: 0,
            requires: Some((0, 0)),
            unlocks: None,
        });

        assert!(board.is_blocked((2, 0)));
        assert!(!board.reveal((2, 0), Turn::Opponent));
        assert!(board.reveal((0, 0), Turn::Player));
        assert!(board.reveal((2, 0), Turn::Opponent));
    }

    #[test]
    fn unlock_clears_both_ends() {
        let mut board = board(&["PO"]);
        board.tile_mut((0, 0)).unwrap().chain = Some(Chain {
            id: 1,
            requires: None,
            unlocks: Some((1, 0)),
        });
        board.tile_mut((1, 0)).unwrap().chain = Some(Chain {
            id: 1,
            requires: Some((0, 0)),
            unlocks: None,
        });

        assert!(board.unlock((1, 0)));
        assert!(!board.is_blocked((1, 0)));
        assert_eq!(board[(0, 0)].chain.unwrap().unlocks, None);
        assert!(!board.unlock((1, 0)));
    }

    #[test]
    fn status_follows_counters() {
        let mut board = board(&["PO", "PO"]);
        board.reveal((0, 0), Turn::Player);
        assert_eq!(board.status(), BoardStatus::InProgress);
        board.reveal((1, 0), Turn::Opponent);
        board.reveal((1, 1), Turn::Opponent);
        assert_eq!(board.status(), BoardStatus::Lost);
    }

    #[test]
    fn board_without_opponent_tiles_is_not_lost() {
        let mut board = board(&["PPO"]);
        assert!(board.set_owner((2, 0), Owner::Player));
        assert_eq!(board.opponent_total(), 0);
        assert_eq!(board.status(), BoardStatus::InProgress);
        board.reveal((0, 0), Turn::Player);
        board.reveal((1, 0), Turn::Player);
        board.reveal((2, 0), Turn::Player);
        assert_eq!(board.status(), BoardStatus::Won);
    }

    #[test]
    fn displayed_count_depends_on_revealer() {
        let rows = &["PPO", "ONO", "PPP"];

        let mut by_player = board(rows);
        by_player.reveal((1, 1), Turn::Player);
        assert_eq!(by_player.displayed_count((1, 1)), Some(5));
        assert_eq!(by_player.displayed_count((0, 0)), None);

        let mut by_opponent = board(rows);
        by_opponent.reveal((1, 1), Turn::Opponent);
        assert_eq!(by_opponent.displayed_count((1, 1)), Some(3));
    }

    #[test]
    fn set_owner_keeps_totals_in_sync() {
        let mut board = board(&["PON"]);
        assert!(board.set_owner((2, 0), Owner::Player));
        assert_eq!(board.player_total(), 2);
        board.reveal((1, 0), Turn::Opponent);
        assert!(!board.set_owner((1, 0), Owner::Player));
        assert_eq!(board.opponent_total(), 1);
    }

    #[test]
    fn scan_counts_area() {
        let board = board(&["PPO", "ONW", "PPP"]);
        let scan = board.scan((1, 1));
        assert_eq!(
            scan,
            DetectorScan {
                player: 5,
                opponent: 2,
                neutral: 1,
                wall: 1
            }
        );
    }
}
