use std::collections::VecDeque;

use fixedbitset::FixedBitSet;
use rand::seq::IteratorRandom;

use crate::solver::solution::{view::SolutionView, working_solution::WorkingSolution};

use super::{ruin_context::RuinContext, ruin_solution::RuinSolution};

/// Removes a related group of visits so they can be reinserted together.
///
/// Starts from a random visit with relations and follows them breadth first
/// up to the nesting limit.
pub struct RuinRelation;

impl RuinSolution for RuinRelation {
    fn ruin_solution<R>(
        &self,
        solution: &mut WorkingSolution,
        RuinContext {
            rng,
            num_nodes_to_remove,
            relation_nesting_limit,
        }: RuinContext<R>,
    ) where
        R: rand::Rng,
    {
        let problem = solution.problem();
        let graph = problem.relations();

        let seed = solution
            .assigned_nodes()
            .filter(|&node| graph.has_relations(node))
            .choose(&mut *rng)
            .or_else(|| solution.assigned_nodes().choose(&mut *rng));
        let Some(seed) = seed else {
            return;
        };

        let mut visited = FixedBitSet::with_capacity(problem.num_nodes());
        let mut queue = VecDeque::from([(seed, 0)]);
        visited.insert(seed.get());
        let mut nodes = Vec::new();

        while let Some((node, depth)) = queue.pop_front() {
            if nodes.len() >= num_nodes_to_remove.max(1) {
                break;
            }
            if solution.is_assigned(node) {
                nodes.push(node);
            }
            if depth >= relation_nesting_limit {
                continue;
            }
            for neighbour in graph.neighbours(node) {
                if !visited.put(neighbour.get()) {
                    queue.push_back((neighbour, depth + 1));
                }
            }
        }

        solution.remove_many(&nodes);
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::SmallRng};

    use crate::{
        problem::{node::NodeIdx, relation::Relation, shift::ShiftIdx},
        solver::{
            ruin::{
                ruin_context::RuinContext, ruin_relation::RuinRelation, ruin_solution::RuinSolution,
            },
            solution::working_solution::WorkingSolution,
        },
        test_utils::{self, TestNode},
    };

    #[test]
    fn test_relation_ruin_follows_nesting_limit() {
        let problem = test_utils::create_problem_with_relations(
            vec![
                TestNode::new("A", 50.0, 6.0),
                TestNode::new("B", 50.1, 6.0),
                TestNode::new("C", 50.2, 6.0),
                TestNode::new("D", 50.3, 6.0),
            ],
            vec![test_utils::resource_at("R", 50.0, 6.0, &[test_utils::DAY_ONE])],
            vec![Relation::same_route("A", "B"), Relation::same_route("B", "C")],
        );
        let mut solution = WorkingSolution::from_assignment(
            test_utils::create_evaluator(problem),
            vec![(
                ShiftIdx::new(0),
                (0..4).map(NodeIdx::new).collect(),
            )],
        );

        let mut rng = SmallRng::seed_from_u64(3);
        RuinRelation.ruin_solution(
            &mut solution,
            RuinContext {
                rng: &mut rng,
                num_nodes_to_remove: 10,
                relation_nesting_limit: 2,
            },
        );

        // D has no relation, so it is never part of the group.
        assert!(solution.route(ShiftIdx::new(0)).visits().contains(&NodeIdx::new(3)));
        assert_eq!(solution.unassigned().len(), 3);
    }
}
