pub mod calendar;
pub mod error;
pub mod load;
pub mod location;
pub mod node;
pub mod node_location_index;
pub mod optimization_problem;
pub mod qualification;
pub mod relation;
pub mod resource;
pub mod shift;
pub mod travel_matrix;
