use std::cmp::Reverse;

use rand::seq::SliceRandom;

use crate::{
    problem::node::NodeIdx,
    solver::{
        insertion::{best_insertion, candidate_shifts, keeps_hard_feasibility},
        solution::working_solution::WorkingSolution,
    },
};

use super::recreate_context::RecreateContext;

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub enum BestInsertionSortStrategy {
    #[default]
    Random,
    Importance,
}

#[derive(Default)]
pub struct BestInsertion {
    sort_strategy: BestInsertionSortStrategy,
}

impl BestInsertion {
    pub fn new(sort_strategy: BestInsertionSortStrategy) -> Self {
        BestInsertion { sort_strategy }
    }

    pub fn insert_nodes(&self, nodes: &[NodeIdx], solution: &mut WorkingSolution, performance_mode: bool) -> usize {
        let mut inserted = 0;
        for &node in nodes {
            let shifts = candidate_shifts(solution, node, performance_mode);
            if let Some((score, insertion)) = best_insertion(solution, node, shifts)
                && keeps_hard_feasibility(&score)
            {
                solution.insert(insertion.node, insertion.shift, insertion.position);
                inserted += 1;
            }
        }
        inserted
    }

    /// Reinserts every unassigned node at its cheapest hard-feasible position.
    pub fn recreate_solution(&self, solution: &mut WorkingSolution, context: RecreateContext) -> usize {
        let mut nodes = solution.unassigned().iter().copied().collect::<Vec<_>>();

        match self.sort_strategy {
            BestInsertionSortStrategy::Random => nodes.shuffle(context.rng),
            BestInsertionSortStrategy::Importance => {
                let problem = solution.problem();
                nodes.sort_by_key(|&node| (Reverse(problem.node(node).importance()), node));
            }
        }

        self.insert_nodes(&nodes, solution, context.performance_mode)
    }
}
