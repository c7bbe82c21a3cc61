pub mod capacity_constraint;
pub mod compactness_constraint;
pub mod constraint;
pub mod double_booking_constraint;
pub mod global_constraint;
pub mod qualification_constraint;
pub mod relation_constraint;
pub mod resource_activation_constraint;
pub mod route_constraint;
pub mod route_distance_constraint;
pub mod time_window_constraint;
pub mod transport_cost_constraint;
pub mod unassigned_node_constraint;
pub mod working_hours_constraint;
