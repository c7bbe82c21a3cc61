use rand::seq::IteratorRandom;

use crate::solver::accepted_solution::AcceptedSolution;

use super::select_solution::SelectSolution;

pub struct BinaryTournamentSelector;

impl SelectSolution for BinaryTournamentSelector {
    fn select_solution<'r>(
        &self,
        solutions: &'r [AcceptedSolution],
        rng: &mut impl rand::Rng,
    ) -> Option<&'r AcceptedSolution> {
        if solutions.len() <= 1 {
            return solutions.first();
        }

        let drawn = solutions.iter().choose_multiple(rng, 2);
        let (first, second) = (drawn[0], drawn[1]);

        if first.score <= second.score {
            Some(first)
        } else {
            Some(second)
        }
    }
}
