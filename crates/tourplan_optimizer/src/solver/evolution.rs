use std::sync::Arc;

use rand::{Rng, rngs::SmallRng, seq::IndexedRandom};
use tracing::{Level, instrument};

use crate::{
    problem::{node::NodeIdx, shift::ShiftIdx},
    selector::{select_binary_tournament::BinaryTournamentSelector, select_solution::SelectSolution},
};

use super::{
    accepted_solution::AcceptedSolution,
    ls::local_search::LocalSearch,
    recreate::{
        best_insertion::{BestInsertion, BestInsertionSortStrategy},
        recreate_context::RecreateContext,
    },
    ruin::{ruin_context::RuinContext, ruin_solution::RuinSolution, ruin_strategy::RuinStrategy},
    solution::{population::Population, working_solution::WorkingSolution},
    solver_params::EvolutionParams,
};

/// Genetic refinement of one sub-population.
pub struct Evolution {
    params: EvolutionParams,
    performance_mode: bool,
    local_search: LocalSearch,
}

impl Evolution {
    pub fn new(params: &EvolutionParams, performance_mode: bool) -> Self {
        let iterations = if performance_mode {
            params.local_search_iterations / 4
        } else {
            params.local_search_iterations
        };

        Evolution {
            params: params.clone(),
            performance_mode,
            local_search: LocalSearch::new(iterations),
        }
    }

    /// Fills a population with the seed and mutated copies of it.
    pub fn seed_population(&self, seed: WorkingSolution, rng: &mut SmallRng) -> Population {
        let mut population = Population::new(self.params.population_size);
        population.add(AcceptedSolution::new(seed.clone()));

        let attempts = self.params.population_size * 2;
        for _ in 0..attempts {
            if population.len() >= self.params.population_size {
                break;
            }
            let mut candidate = seed.clone();
            self.mutate(&mut candidate, rng);
            population.add(AcceptedSolution::new(candidate));
        }

        population
    }

    /// Produces one offspring and offers it to the population.
    #[instrument(skip_all, level = Level::DEBUG)]
    pub fn generation(&self, population: &mut Population, rng: &mut SmallRng) -> bool {
        let selector = BinaryTournamentSelector;
        let (Some(first), Some(second)) = (
            selector.select_solution(population.solutions(), rng),
            selector.select_solution(population.solutions(), rng),
        ) else {
            return false;
        };

        let mut child = self.crossover(&first.solution, &second.solution, rng);
        if rng.random_bool(self.params.mutation_rate) {
            self.mutate(&mut child, rng);
        }
        self.local_search.run(&mut child, rng);

        population.add(AcceptedSolution::new(child))
    }

    /// Route based crossover: the child is `first` with some routes taken from `second`.
    pub fn crossover(
        &self,
        first: &WorkingSolution,
        second: &WorkingSolution,
        rng: &mut SmallRng,
    ) -> WorkingSolution {
        let mut child = first.clone();

        let donor_routes = second
            .non_empty_routes_iter()
            .map(|route| route.shift())
            .collect::<Vec<_>>();
        let mut inherited = donor_routes
            .iter()
            .copied()
            .filter(|_| rng.random_bool(0.5))
            .collect::<Vec<_>>();
        if inherited.is_empty()
            && let Some(&shift) = donor_routes.choose(rng)
        {
            inherited.push(shift);
        }
        if inherited.is_empty() {
            return child;
        }

        let mut moved = vec![false; child.problem().num_nodes()];
        let mut changes: Vec<(ShiftIdx, Vec<NodeIdx>)> = Vec::new();
        for &shift in &inherited {
            let visits = second
                .route(shift)
                .visits()
                .iter()
                .copied()
                .filter(|&node| !child.is_excluded(node))
                .collect::<Vec<_>>();
            for &node in &visits {
                moved[node.get()] = true;
            }
            changes.push((shift, visits));
        }

        for route in child.non_empty_routes_iter() {
            if inherited.contains(&route.shift()) {
                continue;
            }
            if route.visits().iter().any(|node| moved[node.get()]) {
                let kept = route
                    .visits()
                    .iter()
                    .copied()
                    .filter(|node| !moved[node.get()])
                    .collect();
                changes.push((route.shift(), kept));
            }
        }

        child.apply_changes(&changes);
        self.recreate(&mut child, rng);
        child
    }

    /// Ruin and recreate with a random ruin strategy.
    pub fn mutate(&self, solution: &mut WorkingSolution, rng: &mut SmallRng) {
        let assigned = solution.num_assigned();
        if assigned > 0 {
            let strategy = RuinStrategy::ALL[rng.random_range(0..RuinStrategy::ALL.len())];
            let num_nodes_to_remove = ((assigned as f64 * self.params.ruin_ratio).ceil() as usize).max(1);
            strategy.ruin_solution(
                solution,
                RuinContext {
                    rng: &mut *rng,
                    num_nodes_to_remove,
                    relation_nesting_limit: self.params.relation_nesting_limit,
                },
            );
        }
        self.recreate(solution, rng);
    }

    fn recreate(&self, solution: &mut WorkingSolution, rng: &mut SmallRng) {
        BestInsertion::new(BestInsertionSortStrategy::Random).recreate_solution(
            solution,
            RecreateContext {
                rng,
                performance_mode: self.performance_mode,
            },
        );
    }
}

/// One worker's state between generations.
pub struct EvolutionWorker {
    pub index: usize,
    pub rng: SmallRng,
    pub population: Population,
    pub evolution: Arc<Evolution>,
}

impl EvolutionWorker {
    pub fn step(&mut self) -> bool {
        self.evolution.generation(&mut self.population, &mut self.rng)
    }

    pub fn exclude(&mut self, node: NodeIdx) {
        for accepted in self.population.solutions_mut() {
            accepted.solution.exclude(node);
        }
        self.population.resort();
    }

    pub fn restore(&mut self, node: NodeIdx) {
        for accepted in self.population.solutions_mut() {
            accepted.solution.restore(node);
        }
        self.population.resort();
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::SmallRng};

    use crate::{
        problem::{node::NodeIdx, shift::ShiftIdx},
        solver::{solution::working_solution::WorkingSolution, solver_params::EvolutionParams},
        test_utils::{self, TestNode},
    };

    use super::Evolution;

    fn two_route_solution() -> (WorkingSolution, WorkingSolution) {
        let problem = test_utils::create_problem(
            (0..6)
                .map(|i| TestNode::new(format!("N{i}"), 50.0 + i as f64 * 0.05, 6.0))
                .collect(),
            vec![
                test_utils::resource_at("R1", 50.0, 6.0, &[test_utils::DAY_ONE]),
                test_utils::resource_at("R2", 50.3, 6.0, &[test_utils::DAY_ONE]),
            ],
        );
        let evaluator = test_utils::create_evaluator(problem);
        let first = WorkingSolution::from_assignment(
            evaluator.clone(),
            vec![
                (ShiftIdx::new(0), (0..3).map(NodeIdx::new).collect()),
                (ShiftIdx::new(1), (3..6).map(NodeIdx::new).collect()),
            ],
        );
        let second = WorkingSolution::from_assignment(
            evaluator,
            vec![(ShiftIdx::new(1), (0..6).map(NodeIdx::new).collect())],
        );
        (first, second)
    }

    #[test]
    fn test_crossover_keeps_every_node_once() {
        let (first, second) = two_route_solution();
        let evolution = Evolution::new(&EvolutionParams::default(), false);
        let mut rng = SmallRng::seed_from_u64(9);

        let child = evolution.crossover(&first, &second, &mut rng);

        let mut nodes = child.assigned_nodes().collect::<Vec<_>>();
        nodes.sort();
        assert_eq!(nodes, (0..6).map(NodeIdx::new).collect::<Vec<_>>());
    }

    #[test]
    fn test_generation_population_stays_sorted() {
        let (first, _) = two_route_solution();
        let evolution = Evolution::new(
            &EvolutionParams {
                population_size: 4,
                local_search_iterations: 20,
                ..EvolutionParams::default()
            },
            false,
        );
        let mut rng = SmallRng::seed_from_u64(9);
        let mut population = evolution.seed_population(first, &mut rng);

        for _ in 0..5 {
            evolution.generation(&mut population, &mut rng);
        }

        assert!(population.len() <= 4);
        assert!(
            population
                .solutions()
                .windows(2)
                .all(|pair| pair[0].score <= pair[1].score)
        );
    }
}
