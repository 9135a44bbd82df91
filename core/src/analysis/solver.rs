use alloc::vec;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use super::{Component, ConstraintProblem};
use crate::*;

pub const DEFAULT_NODE_BUDGET: usize = 50_000;

/// Ownership facts that hold in every assignment consistent with the
/// observation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deductions {
    pub forced_opponent: Vec<Coord2>,
    pub forced_clear: Vec<Coord2>,
    pub undecided_components: usize,
    pub inconsistent_components: usize,
}

impl Deductions {
    pub fn is_forced_opponent(&self, coords: Coord2) -> bool {
        self.forced_opponent.contains(&coords)
    }
}

pub fn solve(problem: &ConstraintProblem, node_budget: usize) -> Deductions {
    let mut deductions = Deductions::default();

    for component in &problem.components {
        let mut search = ComponentSearch::new(problem, component, node_budget);
        match search.run() {
            SearchResult::OutOfBudget => {
                log::debug!(
                    "Component of {} tiles left undecided",
                    component.tiles.len()
                );
                deductions.undecided_components += 1;
            }
            SearchResult::Done if search.solutions == 0 => {
                deductions.inconsistent_components += 1;
            }
            SearchResult::Done => {
                for (local, &tile) in search.tiles.iter().enumerate() {
                    let coords = problem.coords_of(tile);
                    match search.opponent_hits[local] {
                        0 => deductions.forced_clear.push(coords),
                        hits if hits == search.solutions => deductions.forced_opponent.push(coords),
                        _ => {}
                    }
                }
            }
        }
    }

    if let Some(global) = problem.global_equation() {
        let target = usize::from(global.target);
        let total = global.tiles.len();
        let known = deductions.forced_opponent.len();

        if target == 0 {
            for &tile in &global.tiles {
                let coords = problem.coords_of(tile);
                if !deductions.forced_clear.contains(&coords) {
                    deductions.forced_clear.push(coords);
                }
            }
        } else if target == total {
            for &tile in &global.tiles {
                let coords = problem.coords_of(tile);
                if !deductions.forced_opponent.contains(&coords) {
                    deductions.forced_opponent.push(coords);
                }
            }
        } else if known == target && deductions.undecided_components == 0 {
            // everything outside the components is accounted for
            deductions
                .forced_clear
                .extend(problem.free_tiles.iter().map(|&tile| problem.coords_of(tile)));
        }
    }

    deductions
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SearchResult {
    Done,
    OutOfBudget,
}

struct ComponentSearch {
    tiles: Vec<usize>,
    tile_equations: Vec<Vec<usize>>,
    targets: Vec<CellCount>,
    sums: Vec<CellCount>,
    open: Vec<CellCount>,
    assignment: Vec<bool>,
    opponent_hits: Vec<u32>,
    solutions: u32,
    nodes: usize,
    budget: usize,
}

impl ComponentSearch {
    fn new(problem: &ConstraintProblem, component: &Component, budget: usize) -> Self {
        let tiles = component.tiles.clone();
        let mut tile_equations = vec![Vec::new(); tiles.len()];
        let mut targets = Vec::with_capacity(component.equations.len());
        let mut open = Vec::with_capacity(component.equations.len());

        for (local_eq, &eq_id) in component.equations.iter().enumerate() {
            let equation = &problem.equations[eq_id];
            targets.push(equation.target);
            let mut members = 0;
            for tile in &equation.tiles {
                if let Ok(local) = tiles.binary_search(tile) {
                    tile_equations[local].push(local_eq);
                    members += 1;
                }
            }
            open.push(members);
        }

        Self {
            assignment: vec![false; tiles.len()],
            opponent_hits: vec![0; tiles.len()],
            sums: vec![0; targets.len()],
            tiles,
            tile_equations,
            targets,
            open,
            solutions: 0,
            nodes: 0,
            budget,
        }
    }

    fn run(&mut self) -> SearchResult {
        if self.search(0) {
            SearchResult::Done
        } else {
            SearchResult::OutOfBudget
        }
    }

    fn search(&mut self, depth: usize) -> bool {
        self.nodes += 1;
        if self.nodes > self.budget {
            return false;
        }

        if depth == self.tiles.len() {
            self.solutions += 1;
            for (hits, &is_opponent) in self.opponent_hits.iter_mut().zip(&self.assignment) {
                *hits += u32::from(is_opponent);
            }
            return true;
        }

        for value in [false, true] {
            let feasible = self.assign(depth, value);
            let within_budget = !feasible || self.search(depth + 1);
            self.unassign(depth, value);
            if !within_budget {
                return false;
            }
        }
        true
    }

    fn assign(&mut self, local: usize, is_opponent: bool) -> bool {
        self.assignment[local] = is_opponent;
        let mut feasible = true;
        for &eq in &self.tile_equations[local] {
            self.open[eq] -= 1;
            self.sums[eq] += CellCount::from(is_opponent);
            let sum = self.sums[eq];
            if sum > self.targets[eq] || sum + self.open[eq] < self.targets[eq] {
                feasible = false;
            }
        }
        feasible
    }

    fn unassign(&mut self, local: usize, is_opponent: bool) {
        for &eq in &self.tile_equations[local] {
            self.open[eq] += 1;
            self.sums[eq] -= CellCount::from(is_opponent);
        }
        self.assignment[local] = false;
    }
}
