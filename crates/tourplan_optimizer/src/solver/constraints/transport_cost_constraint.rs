use crate::solver::{
    cost_model::{CostComponent, CostVector},
    violation::ViolationSet,
};

use super::route_constraint::{RouteConstraint, RouteContext};

#[derive(Clone)]
pub struct TransportCostConstraint;

impl RouteConstraint for TransportCostConstraint {
    fn evaluate(&self, context: &RouteContext, costs: &mut CostVector, _marks: &mut [ViolationSet]) {
        let resource = context.problem.resource_of(context.shift);
        let km = context.schedule.distance / 1000.0;
        let hours = context.schedule.duration().as_secs_f64() / 3600.0;

        costs.add_soft(CostComponent::Distance, km * resource.cost_per_km());
        costs.add_soft(CostComponent::Time, hours * resource.cost_per_hour());
        costs.add_soft(
            CostComponent::Stops,
            context.schedule.visits.len() as f64 * resource.cost_per_stop(),
        );
        costs.add_soft(CostComponent::Co2, km * resource.co2_per_km());
    }
}
