use rand::Rng;
use tracing::{Level, instrument};

use crate::solver::solution::working_solution::WorkingSolution;

use super::r#move::LocalSearchMove;

/// Random descent: draws moves and keeps those that improve the score.
pub struct LocalSearch {
    iterations: usize,
}

impl LocalSearch {
    pub fn new(iterations: usize) -> Self {
        LocalSearch { iterations }
    }

    #[instrument(skip_all, level = Level::DEBUG)]
    pub fn run(&self, solution: &mut WorkingSolution, rng: &mut impl Rng) -> usize {
        let mut improvements = 0;
        for _ in 0..self.iterations {
            let Some(local_search_move) = LocalSearchMove::random(solution, rng) else {
                continue;
            };

            let changes = local_search_move.changes(solution);
            if solution.evaluate_changes(&changes).is_improving() {
                solution.apply_changes(&changes);
                improvements += 1;
            }
        }
        improvements
    }
}
