use rand::Rng;

use crate::{
    problem::{node::NodeIdx, shift::ShiftIdx},
    solver::solution::working_solution::WorkingSolution,
};

use super::r#move::{LocalSearchOperator, random_route};

/// **Intra-Route 2-Opt**
///
/// Reverses the visits between `from` and `to`, both included.
///
/// ```text
/// BEFORE: (A) -> [B -> C -> D] -> (E)   from = 1, to = 3
/// AFTER:  (A) -> [D -> C -> B] -> (E)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwoOptOperator {
    pub shift: ShiftIdx,
    pub from: usize,
    pub to: usize,
}

impl LocalSearchOperator for TwoOptOperator {
    fn random(solution: &WorkingSolution, rng: &mut impl Rng) -> Option<Self> {
        let shift = random_route(solution, 3, rng)?;
        let len = solution.route(shift).len();
        let from = rng.random_range(0..len - 1);
        let to = rng.random_range(from + 1..len);
        Some(TwoOptOperator { shift, from, to })
    }

    fn changes(&self, solution: &WorkingSolution) -> Vec<(ShiftIdx, Vec<NodeIdx>)> {
        let mut visits = solution.route(self.shift).visits().to_vec();
        visits[self.from..=self.to].reverse();
        vec![(self.shift, visits)]
    }
}
