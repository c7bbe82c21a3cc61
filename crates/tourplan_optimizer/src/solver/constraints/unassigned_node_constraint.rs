use crate::{
    problem::{node::NodeIdx, shift::ShiftIdx},
    solver::{
        cost_model::{CostComponent, CostVector},
        solution::view::{EvaluationScope, MarkSink, SolutionView},
        violation::ViolationClass,
    },
};

use super::global_constraint::GlobalConstraint;

/// Importance of every mandatory node left out. The weight carries the unassigned penalty.
#[derive(Clone)]
pub struct UnassignedNodeConstraint;

impl UnassignedNodeConstraint {
    fn evaluate_node<V: SolutionView, M: MarkSink>(
        view: &V,
        node: NodeIdx,
        costs: &mut CostVector,
        marks: &mut M,
    ) {
        if view.is_excluded(node) || view.is_assigned(node) {
            return;
        }

        let problem = view.problem();
        if !problem.node(node).is_optional() {
            costs.add_soft(CostComponent::Unassigned, problem.node(node).importance() as f64);
        }
        if problem.candidate_shifts(node).is_empty() {
            Self::mark_rejections(view, node, marks);
        }
    }

    /// Marks the classes that rule out every shift for `node`.
    fn mark_rejections<V: SolutionView, M: MarkSink>(view: &V, node: NodeIdx, marks: &mut M) {
        let problem = view.problem();
        if problem.num_shifts() == 0 {
            marks.mark(node, ViolationClass::ResourceMismatch);
            return;
        }

        for shift in ShiftIdx::range(problem.num_shifts()) {
            let summary = problem.match_summary(node, shift);
            if !summary.zone_satisfied {
                marks.mark(node, ViolationClass::ZoneMismatch);
            }
            if !summary.skill_satisfied {
                marks.mark(node, ViolationClass::ResourceMismatch);
            }
        }
    }
}

impl GlobalConstraint for UnassignedNodeConstraint {
    fn evaluate<V: SolutionView, M: MarkSink>(
        &self,
        view: &V,
        scope: EvaluationScope,
        costs: &mut CostVector,
        marks: &mut M,
    ) {
        match scope {
            EvaluationScope::Full => {
                for node in NodeIdx::range(view.problem().num_nodes()) {
                    Self::evaluate_node(view, node, costs, marks);
                }
            }
            EvaluationScope::Partial { nodes, .. } => {
                for &node in nodes {
                    Self::evaluate_node(view, node, costs, marks);
                }
            }
        }
    }
}
