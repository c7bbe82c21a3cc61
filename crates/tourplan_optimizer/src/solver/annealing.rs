use std::sync::atomic::{AtomicBool, Ordering};

use jiff::Timestamp;
use rand::Rng;
use tracing::{Level, debug, instrument};

use crate::{
    acceptor::simulated_annealing_acceptor::SimulatedAnnealingAcceptor,
    solver::cost_model::CostComponent,
};

use super::{
    ls::r#move::LocalSearchMove, solution::working_solution::WorkingSolution,
    solver_params::AnnealingParams,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AnnealingStatistics {
    pub iterations: usize,
    pub accepted: usize,
    pub improvements: usize,
}

const DEADLINE_CHECK_INTERVAL: usize = 64;

pub struct Annealing<'a> {
    params: &'a AnnealingParams,
}

impl<'a> Annealing<'a> {
    pub fn new(params: &'a AnnealingParams) -> Self {
        Annealing { params }
    }

    fn initial_temperature(&self, solution: &WorkingSolution) -> f64 {
        self.params.initial_temperature.unwrap_or_else(|| {
            // Routing costs only, without the unassigned penalty.
            let weights = solution.evaluator().weights();
            let soft = solution.score().soft_score
                - solution.costs().soft(CostComponent::Unassigned) * weights.get(CostComponent::Unassigned);
            SimulatedAnnealingAcceptor::initial_temperature_for(soft)
        })
    }

    /// Perturbs `solution` in place and leaves the best solution seen in it.
    /// Stops early once `cancelled` is set or `deadline` has passed.
    #[instrument(skip_all, level = Level::DEBUG)]
    pub fn run(
        &self,
        solution: &mut WorkingSolution,
        rng: &mut impl Rng,
        cancelled: &AtomicBool,
        deadline: Option<Timestamp>,
    ) -> AnnealingStatistics {
        let mut statistics = AnnealingStatistics::default();
        let mut best = solution.clone();

        'repetitions: for repetition in 0..self.params.repetitions {
            let mut acceptor = SimulatedAnnealingAcceptor::new(
                self.initial_temperature(solution),
                self.params.cooling_rate,
            );

            for _ in 0..self.params.iterations {
                if cancelled.load(Ordering::Relaxed) {
                    break 'repetitions;
                }
                if statistics.iterations % DEADLINE_CHECK_INTERVAL == 0
                    && deadline.is_some_and(|deadline| Timestamp::now() >= deadline)
                {
                    debug!(iterations = statistics.iterations, "Annealing stopped by time budget");
                    break 'repetitions;
                }
                statistics.iterations += 1;

                if let Some(local_search_move) = LocalSearchMove::random(solution, rng) {
                    let changes = local_search_move.changes(solution);
                    let delta = solution.evaluate_changes(&changes);

                    if acceptor.accept(&delta, rng) {
                        solution.apply_changes(&changes);
                        statistics.accepted += 1;

                        if solution.score() < best.score() {
                            best = solution.clone();
                            statistics.improvements += 1;
                        }
                    }
                }

                acceptor.cool();
            }

            debug!(
                repetition,
                temperature = acceptor.temperature(),
                best = ?best.score(),
                "Annealing repetition finished"
            );

            // Restart from the best solution with a fresh temperature.
            *solution = best.clone();
        }

        *solution = best;
        statistics
    }
}
