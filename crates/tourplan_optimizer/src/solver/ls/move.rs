use rand::{Rng, seq::IteratorRandom};

use crate::{
    problem::{node::NodeIdx, shift::ShiftIdx},
    solver::solution::working_solution::WorkingSolution,
};

use super::{
    inter_relocate::InterRelocateOperator, relocate::RelocateOperator, swap::SwapOperator,
    two_opt::TwoOptOperator,
};

pub trait LocalSearchOperator: Sized {
    /// Draws a random applicable move, `None` when the solution has no room for one.
    fn random(solution: &WorkingSolution, rng: &mut impl Rng) -> Option<Self>;

    /// New visit sequences of the routes the move touches.
    fn changes(&self, solution: &WorkingSolution) -> Vec<(ShiftIdx, Vec<NodeIdx>)>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalSearchMove {
    /// Moves one visit to another position of the same route.
    Relocate(RelocateOperator),
    /// Exchanges two visits of the same route.
    Swap(SwapOperator),
    /// Reverses the segment between two positions of a route.
    TwoOpt(TwoOptOperator),
    /// Moves one visit into another route.
    InterRelocate(InterRelocateOperator),
}

impl LocalSearchMove {
    /// Picks an operator uniformly, then a random move of that kind.
    pub fn random(solution: &WorkingSolution, rng: &mut impl Rng) -> Option<LocalSearchMove> {
        match rng.random_range(0..4) {
            0 => RelocateOperator::random(solution, rng).map(LocalSearchMove::Relocate),
            1 => SwapOperator::random(solution, rng).map(LocalSearchMove::Swap),
            2 => TwoOptOperator::random(solution, rng).map(LocalSearchMove::TwoOpt),
            _ => InterRelocateOperator::random(solution, rng).map(LocalSearchMove::InterRelocate),
        }
    }

    pub fn changes(&self, solution: &WorkingSolution) -> Vec<(ShiftIdx, Vec<NodeIdx>)> {
        match self {
            LocalSearchMove::Relocate(op) => op.changes(solution),
            LocalSearchMove::Swap(op) => op.changes(solution),
            LocalSearchMove::TwoOpt(op) => op.changes(solution),
            LocalSearchMove::InterRelocate(op) => op.changes(solution),
        }
    }
}

/// A random route with at least `min_len` visits.
pub(super) fn random_route(solution: &WorkingSolution, min_len: usize, rng: &mut impl Rng) -> Option<ShiftIdx> {
    solution
        .routes()
        .iter()
        .filter(|route| route.len() >= min_len)
        .map(|route| route.shift())
        .choose(rng)
}
