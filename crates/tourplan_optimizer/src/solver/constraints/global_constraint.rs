use crate::solver::{
    cost_model::CostVector,
    solution::view::{EvaluationScope, MarkSink, SolutionView},
};

use super::{
    double_booking_constraint::DoubleBookingConstraint,
    relation_constraint::RelationConstraint,
    resource_activation_constraint::ResourceActivationConstraint,
    unassigned_node_constraint::UnassignedNodeConstraint,
};

pub trait GlobalConstraint {
    fn evaluate<V: SolutionView, M: MarkSink>(
        &self,
        view: &V,
        scope: EvaluationScope,
        costs: &mut CostVector,
        marks: &mut M,
    );
}

#[derive(Clone)]
pub enum GlobalConstraintType {
    Relation(RelationConstraint),
    UnassignedNode(UnassignedNodeConstraint),
    ResourceActivation(ResourceActivationConstraint),
    DoubleBooking(DoubleBookingConstraint),
}

impl GlobalConstraintType {
    pub fn constraint_name(&self) -> &'static str {
        match self {
            Self::Relation(_) => "relation",
            Self::UnassignedNode(_) => "unassigned_node",
            Self::ResourceActivation(_) => "resource_activation",
            Self::DoubleBooking(_) => "double_booking",
        }
    }
}

impl GlobalConstraint for GlobalConstraintType {
    fn evaluate<V: SolutionView, M: MarkSink>(
        &self,
        view: &V,
        scope: EvaluationScope,
        costs: &mut CostVector,
        marks: &mut M,
    ) {
        match self {
            Self::Relation(c) => c.evaluate(view, scope, costs, marks),
            Self::UnassignedNode(c) => c.evaluate(view, scope, costs, marks),
            Self::ResourceActivation(c) => c.evaluate(view, scope, costs, marks),
            Self::DoubleBooking(c) => c.evaluate(view, scope, costs, marks),
        }
    }
}
