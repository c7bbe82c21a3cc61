use crate::solver::{
    cost_model::{CostComponent, CostVector},
    violation::{ViolationClass, ViolationSet},
};

use super::route_constraint::{RouteConstraint, RouteContext};

/// Applies the precomputed node/shift match summaries of the visited nodes.
#[derive(Clone)]
pub struct QualificationConstraint;

impl RouteConstraint for QualificationConstraint {
    fn evaluate(&self, context: &RouteContext, costs: &mut CostVector, marks: &mut [ViolationSet]) {
        for (visit, mark) in context.schedule.visits.iter().zip(marks.iter_mut()) {
            let summary = context.problem.match_summary(visit.node, context.shift);

            if !summary.feasible {
                if summary.zone_satisfied {
                    costs.add_hard(CostComponent::SkillMismatch, 1.0);
                    mark.insert(ViolationClass::ResourceMismatch);
                } else {
                    costs.add_hard(CostComponent::ZoneMismatch, 1.0);
                    mark.insert(ViolationClass::ZoneMismatch);
                }
                continue;
            }

            if summary.skill_cost > 0.0 {
                costs.add_soft(CostComponent::SkillMismatch, summary.skill_cost);
            }
            if !summary.skill_satisfied {
                mark.insert(ViolationClass::ResourceMismatch);
            }

            if summary.zone_cost > 0.0 {
                costs.add_soft(CostComponent::ZoneMismatch, summary.zone_cost);
            }
            if !summary.zone_satisfied {
                mark.insert(ViolationClass::ZoneMismatch);
            }
        }
    }
}
