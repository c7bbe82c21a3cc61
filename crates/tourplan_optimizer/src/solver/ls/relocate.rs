use rand::Rng;

use crate::{
    problem::{node::NodeIdx, shift::ShiftIdx},
    solver::solution::working_solution::WorkingSolution,
};

use super::r#move::{LocalSearchOperator, random_route};

/// **Intra-Route Relocate**
///
/// Takes the visit at `from` out and reinserts it at `to` of the shortened route.
///
/// ```text
/// BEFORE: (A) -> [B] -> (C) -> (D)      from = 1, to = 2
/// AFTER:  (A) -> (C) -> [B] -> (D)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocateOperator {
    pub shift: ShiftIdx,
    pub from: usize,
    pub to: usize,
}

impl LocalSearchOperator for RelocateOperator {
    fn random(solution: &WorkingSolution, rng: &mut impl Rng) -> Option<Self> {
        let shift = random_route(solution, 2, rng)?;
        let len = solution.route(shift).len();
        let from = rng.random_range(0..len);
        let mut to = rng.random_range(0..len - 1);
        if to >= from {
            to += 1;
        }
        Some(RelocateOperator { shift, from, to })
    }

    fn changes(&self, solution: &WorkingSolution) -> Vec<(ShiftIdx, Vec<NodeIdx>)> {
        let mut visits = solution.route(self.shift).visits().to_vec();
        let node = visits.remove(self.from);
        visits.insert(self.to.min(visits.len()), node);
        vec![(self.shift, visits)]
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        problem::{node::NodeIdx, shift::ShiftIdx},
        solver::ls::r#move::LocalSearchOperator,
        test_utils,
    };

    use super::RelocateOperator;

    #[test]
    fn test_relocate_changes() {
        let solution = test_utils::line_solution(4);
        let operator = RelocateOperator {
            shift: ShiftIdx::new(0),
            from: 1,
            to: 2,
        };

        let changes = operator.changes(&solution);
        assert_eq!(
            changes[0].1,
            [0, 2, 1, 3].map(NodeIdx::new).to_vec()
        );
    }
}
