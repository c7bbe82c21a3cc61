use jiff::SignedDuration;

use crate::{
    problem::{optimization_problem::OptimizationProblem, shift::ShiftIdx},
    solver::{cost_model::CostVector, solution::route::RouteSchedule, violation::ViolationSet},
};

use super::{
    capacity_constraint::CapacityConstraint, compactness_constraint::CompactnessConstraint,
    qualification_constraint::QualificationConstraint,
    route_distance_constraint::RouteDistanceConstraint,
    time_window_constraint::TimeWindowConstraint,
    transport_cost_constraint::TransportCostConstraint,
    working_hours_constraint::WorkingHoursConstraint,
};

/// Everything a route level constraint may look at.
pub struct RouteContext<'a> {
    pub problem: &'a OptimizationProblem,
    pub shift: ShiftIdx,
    pub schedule: &'a RouteSchedule,
    pub early_tolerance: SignedDuration,
}

pub trait RouteConstraint {
    /// Adds this constraint's components to `costs` and flags the offending visits in `marks`.
    fn evaluate(&self, context: &RouteContext, costs: &mut CostVector, marks: &mut [ViolationSet]);
}

#[derive(Clone)]
pub enum RouteConstraintType {
    TransportCost(TransportCostConstraint),
    TimeWindow(TimeWindowConstraint),
    WorkingHours(WorkingHoursConstraint),
    RouteDistance(RouteDistanceConstraint),
    Capacity(CapacityConstraint),
    Qualification(QualificationConstraint),
    Compactness(CompactnessConstraint),
}

impl RouteConstraintType {
    pub fn constraint_name(&self) -> &'static str {
        match self {
            RouteConstraintType::TransportCost(_) => "transport_cost",
            RouteConstraintType::TimeWindow(_) => "time_window",
            RouteConstraintType::WorkingHours(_) => "working_hours",
            RouteConstraintType::RouteDistance(_) => "route_distance",
            RouteConstraintType::Capacity(_) => "capacity",
            RouteConstraintType::Qualification(_) => "qualification",
            RouteConstraintType::Compactness(_) => "compactness",
        }
    }
}

impl RouteConstraint for RouteConstraintType {
    fn evaluate(&self, context: &RouteContext, costs: &mut CostVector, marks: &mut [ViolationSet]) {
        match self {
            RouteConstraintType::TransportCost(c) => c.evaluate(context, costs, marks),
            RouteConstraintType::TimeWindow(c) => c.evaluate(context, costs, marks),
            RouteConstraintType::WorkingHours(c) => c.evaluate(context, costs, marks),
            RouteConstraintType::RouteDistance(c) => c.evaluate(context, costs, marks),
            RouteConstraintType::Capacity(c) => c.evaluate(context, costs, marks),
            RouteConstraintType::Qualification(c) => c.evaluate(context, costs, marks),
            RouteConstraintType::Compactness(c) => c.evaluate(context, costs, marks),
        }
    }
}
