use rand::seq::IteratorRandom;

use crate::solver::solution::working_solution::WorkingSolution;

use super::{ruin_context::RuinContext, ruin_solution::RuinSolution};

pub struct RuinRandom;

impl RuinSolution for RuinRandom {
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
        let nodes = solution
            .assigned_nodes()
            .choose_multiple(rng, num_nodes_to_remove);
        solution.remove_many(&nodes);
    }
}
