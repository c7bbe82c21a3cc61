use rand::seq::IteratorRandom;

use crate::solver::solution::{view::SolutionView, working_solution::WorkingSolution};

use super::{ruin_context::RuinContext, ruin_solution::RuinSolution};

/// Removes a random visit and the visits nearest to it.
pub struct RuinRadial;

impl RuinSolution for RuinRadial {
    fn ruin_solution<R>(
        &self,
        solution: &mut WorkingSolution,
        RuinContext {
            rng,
            num_nodes_to_remove,
            ..
        }: RuinContext<R>,
    ) where
        R: rand::Rng,
    {
        let Some(center) = solution.assigned_nodes().choose(rng) else {
            return;
        };

        let problem = solution.problem();
        let location = problem.location(problem.node_location(center));
        let nodes = problem
            .node_location_index()
            .nearest_neighbor_iter(location)
            .filter(|&node| solution.is_assigned(node))
            .take(num_nodes_to_remove)
            .collect::<Vec<_>>();

        solution.remove_many(&nodes);
    }
}
