use crate::solver::{
    cost_model::{CostComponent, CostVector},
    violation::{ViolationClass, ViolationSet},
};

use super::route_constraint::{RouteConstraint, RouteContext};

/// Minutes late against the opening hours, and idle minutes beyond the early arrival tolerance.
#[derive(Clone)]
pub struct TimeWindowConstraint;

impl RouteConstraint for TimeWindowConstraint {
    fn evaluate(&self, context: &RouteContext, costs: &mut CostVector, marks: &mut [ViolationSet]) {
        for (visit, mark) in context.schedule.visits.iter().zip(marks.iter_mut()) {
            if visit.lateness.is_positive() {
                costs.add_soft(CostComponent::Lateness, visit.lateness.as_secs_f64() / 60.0);
                mark.insert(ViolationClass::LateArrival);
            }

            if visit.waiting > context.early_tolerance {
                let idle = visit.waiting - context.early_tolerance;
                costs.add_soft(CostComponent::Earliness, idle.as_secs_f64() / 60.0);
                mark.insert(ViolationClass::EarlyArrival);
            }
        }
    }
}
