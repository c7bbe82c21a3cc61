use crate::solver::{
    cost_model::{CostComponent, CostVector},
    violation::ViolationSet,
};

use super::route_constraint::{RouteConstraint, RouteContext};

/// Reads the ledger trace computed with the schedule. Overload is hard.
#[derive(Clone)]
pub struct CapacityConstraint;

impl RouteConstraint for CapacityConstraint {
    fn evaluate(&self, context: &RouteContext, costs: &mut CostVector, _marks: &mut [ViolationSet]) {
        let Some(trace) = &context.schedule.ledger else {
            return;
        };

        if trace.overload > 0.0 {
            costs.add_hard(CostComponent::CapacityOverload, trace.overload);
        }
        if trace.unfulfilled > 0.0 {
            costs.add_soft(CostComponent::UnfulfilledLoad, trace.unfulfilled);
        }
        if trace.overtime.is_positive() {
            costs.add_soft(CostComponent::LoadOvertime, trace.overtime.as_secs_f64() / 60.0);
        }
    }
}
