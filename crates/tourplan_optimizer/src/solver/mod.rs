pub mod accepted_solution;
pub mod annealing;
pub mod auto_filter;
pub mod constraints;
pub mod construction;
pub mod cost_model;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod evolution;
pub mod insertion;
pub mod ledger;
pub mod ls;
pub mod optimization;
pub mod optimization_result;
pub mod properties;
pub mod recreate;
pub mod ruin;
pub mod score;
pub mod solution;
#[allow(clippy::module_inception)]
pub mod solver;
pub mod solver_params;
pub mod statistics;
pub mod violation;
