use crate::solver::accepted_solution::AcceptedSolution;

/// Distinct solutions kept sorted best first.
#[derive(Clone)]
pub struct Population {
    solutions: Vec<AcceptedSolution>,
    max_size: usize,
}

impl Population {
    pub fn new(max_size: usize) -> Self {
        Population {
            solutions: Vec::with_capacity(max_size + 1),
            max_size: max_size.max(1),
        }
    }

    pub fn solutions(&self) -> &[AcceptedSolution] {
        &self.solutions
    }

    pub fn solutions_mut(&mut self) -> &mut [AcceptedSolution] {
        &mut self.solutions
    }

    pub fn best(&self) -> Option<&AcceptedSolution> {
        self.solutions.first()
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    /// Adds a survivor candidate. Duplicates and candidates worse than a full population are dropped.
    pub fn add(&mut self, candidate: AcceptedSolution) -> bool {
        if self
            .solutions
            .iter()
            .any(|accepted| accepted.solution.is_identical(&candidate.solution))
        {
            return false;
        }

        if self.solutions.len() >= self.max_size
            && self
                .solutions
                .last()
                .is_some_and(|worst| worst.score <= candidate.score)
        {
            return false;
        }

        let index = self
            .solutions
            .partition_point(|accepted| accepted.score <= candidate.score);
        self.solutions.insert(index, candidate);
        self.solutions.truncate(self.max_size);
        true
    }

    /// Scores may have moved after an in place change of every member.
    pub fn resort(&mut self) {
        for accepted in &mut self.solutions {
            accepted.score = accepted.solution.score();
        }
        self.solutions.sort_by_key(|accepted| accepted.score);
    }
}
