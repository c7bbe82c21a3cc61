use crate::{
    problem::{
        location::LocationIdx, node::NodeIdx, optimization_problem::OptimizationProblem,
        relation::PlacementLookup, shift::ShiftIdx,
    },
    solver::violation::{ViolationClass, ViolationSet},
};

use super::route::RouteSchedule;

/// Read access to a solution, either a committed one or one with pending route changes.
pub trait SolutionView: PlacementLookup {
    fn problem(&self) -> &OptimizationProblem;

    fn route_visits(&self, shift: ShiftIdx) -> &[NodeIdx];

    fn route_schedule(&self, shift: ShiftIdx) -> &RouteSchedule;

    fn is_assigned(&self, node: NodeIdx) -> bool;

    /// Filtered by the auto-filter or never plannable.
    fn is_excluded(&self, node: NodeIdx) -> bool;
}

/// Which part of a solution a global constraint has to look at.
#[derive(Debug, Clone, Copy)]
pub enum EvaluationScope<'a> {
    Full,
    Partial {
        shifts: &'a [ShiftIdx],
        nodes: &'a [NodeIdx],
    },
}

pub trait MarkSink {
    fn mark(&mut self, node: NodeIdx, class: ViolationClass);
}

/// Per node marks indexed by `NodeIdx`.
impl MarkSink for Vec<ViolationSet> {
    fn mark(&mut self, node: NodeIdx, class: ViolationClass) {
        self[node.get()].insert(class);
    }
}

pub struct DiscardMarks;

impl MarkSink for DiscardMarks {
    fn mark(&mut self, _node: NodeIdx, _class: ViolationClass) {}
}

/// Where the route of `shift` starts.
///
/// After a shift that ends with an overnight stay the resource starts where
/// it stopped; an empty route in between carries the stay location forward.
pub fn start_location<F>(problem: &OptimizationProblem, shift: ShiftIdx, last_visit: &F) -> LocationIdx
where
    F: Fn(ShiftIdx) -> Option<NodeIdx>,
{
    let current = problem.shift(shift);
    match current.previous() {
        Some(previous) if problem.shift(previous).ends_with_stay() => match last_visit(previous) {
            Some(node) => problem.node_location(node),
            None => start_location(problem, previous, last_visit),
        },
        _ => problem.resource_location(current.resource()),
    }
}
