use crate::{
    problem::resource::ResourceIdx,
    solver::{
        cost_model::{CostComponent, CostVector},
        solution::view::{EvaluationScope, MarkSink, SolutionView},
    },
};

use super::global_constraint::GlobalConstraint;

/// Fixed cost of every resource with at least one visit in any of its shifts.
#[derive(Clone)]
pub struct ResourceActivationConstraint;

impl GlobalConstraint for ResourceActivationConstraint {
    fn evaluate<V: SolutionView, M: MarkSink>(
        &self,
        view: &V,
        scope: EvaluationScope,
        costs: &mut CostVector,
        _marks: &mut M,
    ) {
        let problem = view.problem();
        let resources: Vec<ResourceIdx> = match scope {
            EvaluationScope::Full => ResourceIdx::range(problem.resources().len()).collect(),
            EvaluationScope::Partial { shifts, .. } => {
                let mut resources = shifts
                    .iter()
                    .map(|&shift| problem.shift(shift).resource())
                    .collect::<Vec<_>>();
                resources.sort_unstable();
                resources.dedup();
                resources
            }
        };

        for resource in resources {
            let fixed_cost = problem.resource(resource).fixed_cost();
            if fixed_cost <= 0.0 {
                continue;
            }

            let used = problem
                .shifts_of(resource)
                .iter()
                .any(|&shift| !view.route_visits(shift).is_empty());
            if used {
                costs.add_soft(CostComponent::ResourceActivation, fixed_cost);
            }
        }
    }
}
