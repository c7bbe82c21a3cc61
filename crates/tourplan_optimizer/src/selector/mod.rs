pub mod select_binary_tournament;
pub mod select_solution;
