use jiff::SignedDuration;
use schemars::JsonSchema;
use serde::Serialize;

use super::score::Score;

#[derive(Clone, Debug, PartialEq, Serialize, JsonSchema)]
pub struct ScoreEvolutionRow {
    pub generation: usize,
    pub elapsed: SignedDuration,
    pub score: Score,
}

/// Best score per generation of one run.
#[derive(Clone, Debug, Default, Serialize, JsonSchema)]
pub struct SearchStatistics {
    score_evolution: Vec<ScoreEvolutionRow>,
}

impl SearchStatistics {
    pub fn add_best_score(&mut self, row: ScoreEvolutionRow) {
        self.score_evolution.push(row);
    }

    pub fn score_evolution(&self) -> &[ScoreEvolutionRow] {
        &self.score_evolution
    }

    pub fn into_score_evolution(self) -> Vec<ScoreEvolutionRow> {
        self.score_evolution
    }
}
