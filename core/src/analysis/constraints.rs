use alloc::collections::VecDeque;
use alloc::vec;
use alloc::vec::Vec;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::{ObservedTile, Observation};
use crate::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub use_opponent_count: bool,
    pub player_clues: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            use_opponent_count: true,
            player_clues: true,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenTile {
    pub id: usize,
    pub coords: Coord2,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquationSource {
    OpponentReveal(Coord2),
    PlayerReveal(Coord2),
    OpponentRemaining,
}

impl EquationSource {
    pub const fn is_local(self) -> bool {
        !matches!(self, Self::OpponentRemaining)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equation {
    pub source: EquationSource,
    pub tiles: Vec<usize>,
    pub target: CellCount,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub tiles: Vec<usize>,
    pub equations: Vec<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintProblem {
    pub tiles: Vec<HiddenTile>,
    pub equations: Vec<Equation>,
    pub components: Vec<Component>,
    pub free_tiles: Vec<usize>,
}

impl ConstraintProblem {
    pub fn global_equation(&self) -> Option<&Equation> {
        self.equations.iter().find(|eq| !eq.source.is_local())
    }

    pub fn local_equations(&self) -> impl Iterator<Item = &Equation> {
        self.equations.iter().filter(|eq| eq.source.is_local())
    }

    pub fn coords_of(&self, tile: usize) -> Coord2 {
        self.tiles[tile].coords
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Contradiction {
    BadShape,
    OpponentCountTooLarge { count: CellCount, area: CellCount },
    ImpossibleReveal { at: Coord2, needed: i16, hidden: usize },
    ImpossibleOpponentCount { count: CellCount, hidden: usize },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintBuild {
    pub problem: ConstraintProblem,
    pub contradictions: Vec<Contradiction>,
}

fn coords_of((x, y): (usize, usize)) -> Coord2 {
    // observation dimensions come from a `Coord2`
    (x as Coord, y as Coord)
}

/// Turns what the player has seen into equations over hidden tiles.
///
/// A tile revealed by the opponent shows its opponent neighbours, so the
/// hidden neighbours hold that count minus the opponent neighbours already
/// revealed. A tile revealed by the player only says something about
/// opponent tiles when every hidden neighbour must be the player's; that
/// becomes an equation with target zero.
pub fn build_constraints(obs: &Observation, cfg: AnalysisConfig) -> ConstraintBuild {
    let mut build = ConstraintBuild::default();

    if obs.validate().is_err() {
        build.contradictions.push(Contradiction::BadShape);
        return build;
    }
    let area = mult(obs.size.0, obs.size.1);
    if let Some(count) = obs.opponent_remaining.filter(|&count| count > area) {
        build
            .contradictions
            .push(Contradiction::OpponentCountTooLarge { count, area });
        return build;
    }

    let mut index: Array2<Option<usize>> = Array2::from_elem(obs.size.to_nd_index(), None);
    let mut tiles = Vec::new();
    for (pos, observed) in obs.tiles.indexed_iter() {
        if *observed == ObservedTile::Hidden {
            index[pos] = Some(tiles.len());
            tiles.push(HiddenTile {
                id: tiles.len(),
                coords: coords_of(pos),
            });
        }
    }

    let mut equations = Vec::new();
    for (pos, observed) in obs.tiles.indexed_iter() {
        let ObservedTile::Revealed { by, count, .. } = *observed else {
            continue;
        };
        let at = coords_of(pos);
        let counted = by.owner();

        let mut needed = i16::from(count);
        let mut hidden = Vec::new();
        for neighbor in obs.tiles.iter_neighbors(at) {
            match obs.tile(neighbor) {
                ObservedTile::Hidden => hidden.extend(index[neighbor.to_nd_index()]),
                ObservedTile::Revealed { owner, .. } if owner == counted => needed -= 1,
                ObservedTile::Revealed { .. } | ObservedTile::Wall => {}
            }
        }

        let Ok(target) = CellCount::try_from(needed) else {
            build.contradictions.push(Contradiction::ImpossibleReveal {
                at,
                needed,
                hidden: hidden.len(),
            });
            continue;
        };
        if usize::from(target) > hidden.len() {
            build.contradictions.push(Contradiction::ImpossibleReveal {
                at,
                needed,
                hidden: hidden.len(),
            });
            continue;
        }
        if hidden.is_empty() {
            continue;
        }

        match by {
            Turn::Opponent => equations.push(Equation {
                source: EquationSource::OpponentReveal(at),
                tiles: hidden,
                target,
            }),
            // every hidden neighbour is still needed for the player's count
            Turn::Player if cfg.player_clues && usize::from(target) == hidden.len() => {
                equations.push(Equation {
                    source: EquationSource::PlayerReveal(at),
                    tiles: hidden,
                    target: 0,
                });
            }
            Turn::Player => {}
        }
    }

    if let Some(count) = obs.opponent_remaining.filter(|_| cfg.use_opponent_count) {
        if usize::from(count) > tiles.len() {
            build
                .contradictions
                .push(Contradiction::ImpossibleOpponentCount {
                    count,
                    hidden: tiles.len(),
                });
        } else {
            equations.push(Equation {
                source: EquationSource::OpponentRemaining,
                tiles: (0..tiles.len()).collect(),
                target: count,
            });
        }
    }

    let (components, free_tiles) = split_components(tiles.len(), &equations);
    build.problem = ConstraintProblem {
        tiles,
        equations,
        components,
        free_tiles,
    };
    build
}

fn split_components(tile_count: usize, equations: &[Equation]) -> (Vec<Component>, Vec<usize>) {
    let mut equations_of = vec![Vec::new(); tile_count];
    for (eq_id, equation) in equations.iter().enumerate() {
        if equation.source.is_local() {
            for &tile in &equation.tiles {
                equations_of[tile].push(eq_id);
            }
        }
    }

    let mut seen_tile = vec![false; tile_count];
    let mut seen_equation = vec![false; equations.len()];
    let mut components = Vec::new();
    let mut free_tiles = Vec::new();

    for start in 0..tile_count {
        if seen_tile[start] {
            continue;
        }
        if equations_of[start].is_empty() {
            free_tiles.push(start);
            continue;
        }

        let mut component = Component::default();
        let mut queue = VecDeque::from([start]);
        seen_tile[start] = true;
        while let Some(tile) = queue.pop_front() {
            component.tiles.push(tile);
            for &eq_id in &equations_of[tile] {
                if seen_equation[eq_id] {
                    continue;
                }
                seen_equation[eq_id] = true;
                component.equations.push(eq_id);
                for &next in &equations[eq_id].tiles {
                    if !seen_tile[next] {
                        seen_tile[next] = true;
                        queue.push_back(next);
                    }
                }
            }
        }
        component.tiles.sort_unstable();
        component.equations.sort_unstable();
        components.push(component);
    }

    (components, free_tiles)
}
