use std::sync::Arc;

use jiff::SignedDuration;

use crate::problem::optimization_problem::OptimizationProblem;

use super::{
    constraints::{
        capacity_constraint::CapacityConstraint,
        compactness_constraint::CompactnessConstraint,
        constraint::Constraint,
        double_booking_constraint::DoubleBookingConstraint,
        global_constraint::{GlobalConstraint, GlobalConstraintType},
        qualification_constraint::QualificationConstraint,
        relation_constraint::RelationConstraint,
        resource_activation_constraint::ResourceActivationConstraint,
        route_constraint::{RouteConstraint, RouteConstraintType, RouteContext},
        route_distance_constraint::RouteDistanceConstraint,
        time_window_constraint::TimeWindowConstraint,
        transport_cost_constraint::TransportCostConstraint,
        unassigned_node_constraint::UnassignedNodeConstraint,
        working_hours_constraint::WorkingHoursConstraint,
    },
    cost_model::{CostComponent, CostVector, Weights},
    solution::view::{EvaluationScope, MarkSink, SolutionView},
    solver_params::SolverParams,
    violation::ViolationSet,
};

/// The single cost entry point shared by construction, annealing and evolution.
pub struct Evaluator {
    problem: Arc<OptimizationProblem>,
    weights: Weights,
    early_tolerance: SignedDuration,
    constraints: Vec<Constraint>,
}

impl Evaluator {
    pub fn new(problem: Arc<OptimizationProblem>, params: &SolverParams) -> Self {
        let mut weights = params.weights;
        weights.set(
            CostComponent::Unassigned,
            weights.get(CostComponent::Unassigned) * params.unassigned_penalty,
        );

        let mut constraints = vec![
            Constraint::Route(RouteConstraintType::TransportCost(TransportCostConstraint)),
            Constraint::Route(RouteConstraintType::TimeWindow(TimeWindowConstraint)),
            Constraint::Route(RouteConstraintType::WorkingHours(WorkingHoursConstraint)),
            Constraint::Route(RouteConstraintType::RouteDistance(RouteDistanceConstraint)),
            Constraint::Route(RouteConstraintType::Qualification(QualificationConstraint)),
        ];

        if problem.has_loads() {
            constraints.push(Constraint::Route(RouteConstraintType::Capacity(
                CapacityConstraint,
            )));
        }

        if weights.get(CostComponent::Compactness) > 0.0 {
            constraints.push(Constraint::Route(RouteConstraintType::Compactness(
                CompactnessConstraint,
            )));
        }

        if !problem.relations().is_empty() {
            constraints.push(Constraint::Global(GlobalConstraintType::Relation(
                RelationConstraint,
            )));
        }

        constraints.push(Constraint::Global(GlobalConstraintType::UnassignedNode(
            UnassignedNodeConstraint,
        )));
        constraints.push(Constraint::Global(
            GlobalConstraintType::ResourceActivation(ResourceActivationConstraint),
        ));

        if problem.shifts().iter().any(|shift| shift.next().is_some()) {
            constraints.push(Constraint::Global(GlobalConstraintType::DoubleBooking(
                DoubleBookingConstraint,
            )));
        }

        Evaluator {
            problem,
            weights,
            early_tolerance: params.auto_filter.early_arrival_tolerance,
            constraints,
        }
    }

    pub fn problem(&self) -> &OptimizationProblem {
        &self.problem
    }

    /// Effective weights, the unassigned penalty already folded in.
    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn early_tolerance(&self) -> SignedDuration {
        self.early_tolerance
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn evaluate_route(
        &self,
        context: &RouteContext,
        costs: &mut CostVector,
        marks: &mut [ViolationSet],
    ) {
        for constraint in &self.constraints {
            if let Constraint::Route(constraint) = constraint {
                constraint.evaluate(context, costs, marks);
            }
        }
    }

    pub fn evaluate_global<V: SolutionView, M: MarkSink>(
        &self,
        view: &V,
        scope: EvaluationScope,
        costs: &mut CostVector,
        marks: &mut M,
    ) {
        for constraint in &self.constraints {
            if let Constraint::Global(constraint) = constraint {
                constraint.evaluate(view, scope, costs, marks);
            }
        }
    }
}
