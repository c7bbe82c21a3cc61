use std::fmt::Display;

use crate::solver::solution::working_solution::WorkingSolution;

use super::{
    ruin_context::RuinContext, ruin_radial::RuinRadial, ruin_random::RuinRandom,
    ruin_relation::RuinRelation, ruin_solution::RuinSolution,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuinStrategy {
    Random,
    Radial,
    Relation,
}

impl RuinStrategy {
    pub const ALL: [RuinStrategy; 3] = [RuinStrategy::Random, RuinStrategy::Radial, RuinStrategy::Relation];
}

impl Display for RuinStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Random => write!(f, "Random"),
            Self::Radial => write!(f, "Radial"),
            Self::Relation => write!(f, "Relation"),
        }
    }
}

impl RuinSolution for RuinStrategy {
    fn ruin_solution<R>(&self, solution: &mut WorkingSolution, context: RuinContext<R>)
    where
        R: rand::Rng,
    {
        match self {
            RuinStrategy::Random => RuinRandom.ruin_solution(solution, context),
            RuinStrategy::Radial => RuinRadial.ruin_solution(solution, context),
            RuinStrategy::Relation => RuinRelation.ruin_solution(solution, context),
        }
    }
}
