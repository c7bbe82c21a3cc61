use crate::solver::{
    cost_model::{CostComponent, CostVector},
    violation::{ViolationClass, ViolationSet},
};

use super::route_constraint::{RouteConstraint, RouteContext};

#[derive(Clone)]
pub struct RouteDistanceConstraint;

impl RouteConstraint for RouteDistanceConstraint {
    fn evaluate(&self, context: &RouteContext, costs: &mut CostVector, marks: &mut [ViolationSet]) {
        let Some(max_km) = context.problem.resource_of(context.shift).max_distance_km() else {
            return;
        };

        let km = context.schedule.distance / 1000.0;
        if km <= max_km {
            return;
        }

        costs.add_soft(CostComponent::RouteDistanceExceeded, km - max_km);

        let max_meters = max_km * 1000.0;
        let mut flagged = false;
        for (visit, mark) in context.schedule.visits.iter().zip(marks.iter_mut()) {
            if visit.cumulative_distance > max_meters {
                mark.insert(ViolationClass::RouteDistanceExceeded);
                flagged = true;
            }
        }
        if !flagged && let Some(last) = marks.last_mut() {
            last.insert(ViolationClass::RouteDistanceExceeded);
        }
    }
}
