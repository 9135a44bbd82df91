use crate::*;
pub use constraint::*;
pub use random::*;

mod constraint;
mod random;

/// Picks the opponent's next reveal. Implementations keep no state between
/// turns beyond their random source.
pub trait OpponentPolicy {
    fn name(&self) -> &str;

    fn choose_move(&mut self, board: &Board) -> Option<Coord2>;
}
