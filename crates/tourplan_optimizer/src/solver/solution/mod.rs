pub mod population;
pub mod route;
pub mod view;
pub mod working_solution;
