use rand::{Rng, seq::IndexedRandom};

use crate::{
    problem::{node::NodeIdx, shift::ShiftIdx},
    solver::solution::working_solution::WorkingSolution,
};

use super::r#move::{LocalSearchOperator, random_route};

/// **Inter-Route Relocate**
///
/// Moves the visit at `from` of one route to position `to` of another
/// compatible route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterRelocateOperator {
    pub from_shift: ShiftIdx,
    pub from: usize,
    pub to_shift: ShiftIdx,
    pub to: usize,
}

impl LocalSearchOperator for InterRelocateOperator {
    fn random(solution: &WorkingSolution, rng: &mut impl Rng) -> Option<Self> {
        let from_shift = random_route(solution, 1, rng)?;
        let from = rng.random_range(0..solution.route(from_shift).len());
        let node = solution.route(from_shift).visits()[from];

        let targets = solution
            .problem()
            .candidate_shifts(node)
            .iter()
            .copied()
            .filter(|&shift| shift != from_shift)
            .collect::<Vec<_>>();
        let &to_shift = targets.choose(rng)?;
        let to = rng.random_range(0..=solution.route(to_shift).len());

        Some(InterRelocateOperator {
            from_shift,
            from,
            to_shift,
            to,
        })
    }

    fn changes(&self, solution: &WorkingSolution) -> Vec<(ShiftIdx, Vec<NodeIdx>)> {
        let mut source = solution.route(self.from_shift).visits().to_vec();
        let node = source.remove(self.from);
        let mut target = solution.route(self.to_shift).visits().to_vec();
        target.insert(self.to.min(target.len()), node);
        vec![(self.from_shift, source), (self.to_shift, target)]
    }
}
