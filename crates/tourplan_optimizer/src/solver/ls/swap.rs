use rand::Rng;

use crate::{
    problem::{node::NodeIdx, shift::ShiftIdx},
    solver::solution::working_solution::WorkingSolution,
};

use super::r#move::{LocalSearchOperator, random_route};

/// **Intra-Route Swap**
///
/// ```text
/// BEFORE: (A) -> [B] -> (C) -> [D]      first = 1, second = 3
/// AFTER:  (A) -> [D] -> (C) -> [B]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapOperator {
    pub shift: ShiftIdx,
    pub first: usize,
    pub second: usize,
}

impl LocalSearchOperator for SwapOperator {
    fn random(solution: &WorkingSolution, rng: &mut impl Rng) -> Option<Self> {
        let shift = random_route(solution, 2, rng)?;
        let len = solution.route(shift).len();
        let first = rng.random_range(0..len);
        let mut second = rng.random_range(0..len - 1);
        if second >= first {
            second += 1;
        }
        Some(SwapOperator { shift, first, second })
    }

    fn changes(&self, solution: &WorkingSolution) -> Vec<(ShiftIdx, Vec<NodeIdx>)> {
        let mut visits = solution.route(self.shift).visits().to_vec();
        visits.swap(self.first, self.second);
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

    use super::SwapOperator;

    #[test]
    fn test_swap_changes() {
        let solution = test_utils::line_solution(4);
        let operator = SwapOperator {
            shift: ShiftIdx::new(0),
            first: 1,
            second: 3,
        };

        assert_eq!(
            operator.changes(&solution)[0].1,
            [0, 3, 2, 1].map(NodeIdx::new).to_vec()
        );
    }
}
