use super::{score::Score, solution::working_solution::WorkingSolution};

#[derive(Clone)]
pub struct AcceptedSolution {
    pub solution: WorkingSolution,
    pub score: Score,
}

impl AcceptedSolution {
    pub fn new(solution: WorkingSolution) -> Self {
        let score = solution.score();
        AcceptedSolution { solution, score }
    }
}
