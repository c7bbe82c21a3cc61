use std::{collections::BTreeSet, sync::Arc};

use fixedbitset::FixedBitSet;
use fxhash::FxHashMap;

use crate::{
    problem::{
        node::NodeIdx,
        optimization_problem::OptimizationProblem,
        relation::{PlacementLookup, VisitPlacement},
        shift::ShiftIdx,
    },
    solver::{
        cost_model::CostVector,
        evaluator::Evaluator,
        score::{Score, ScoreAnalysis},
        violation::ViolationSet,
    },
};

use super::{
    route::{RouteSchedule, WorkingRoute, assess},
    view::{DiscardMarks, EvaluationScope, SolutionView, start_location},
};

/// New visit sequences for a set of shifts.
pub type RouteChanges = [(ShiftIdx, Vec<NodeIdx>)];

/// One route per shift plus the nodes left out, with cached costs.
#[derive(Clone)]
pub struct WorkingSolution {
    evaluator: Arc<Evaluator>,
    routes: Vec<WorkingRoute>,
    positions: Vec<Option<(ShiftIdx, usize)>>,
    unassigned: BTreeSet<NodeIdx>,
    excluded: FixedBitSet,
    global_costs: CostVector,
    global_marks: Vec<ViolationSet>,
    costs: CostVector,
    score: Score,
}

impl WorkingSolution {
    pub fn new(evaluator: Arc<Evaluator>) -> Self {
        let problem = evaluator.problem();
        let num_nodes = problem.num_nodes();

        let routes = ShiftIdx::range(problem.num_shifts())
            .map(|shift| {
                let start = start_location(problem, shift, &|_| None);
                WorkingRoute::empty(problem, shift, start)
            })
            .collect();

        let mut excluded = FixedBitSet::with_capacity(num_nodes);
        for &node in problem.nodes_without_hours() {
            excluded.insert(node.get());
        }

        let unassigned = NodeIdx::range(num_nodes)
            .filter(|node| !excluded.contains(node.get()))
            .collect();

        let mut solution = WorkingSolution {
            routes,
            positions: vec![None; num_nodes],
            unassigned,
            excluded,
            global_costs: CostVector::ZERO,
            global_marks: vec![ViolationSet::EMPTY; num_nodes],
            costs: CostVector::ZERO,
            score: Score::ZERO,
            evaluator,
        };
        solution.refresh();
        solution
    }

    /// Builds a solution from explicit visit sequences, skipping nodes that cannot be planned.
    ///
    /// Sequences for the same shift are concatenated. Nodes already placed, excluded, or
    /// incompatible with the shift stay unassigned.
    pub fn from_assignment(evaluator: Arc<Evaluator>, assignment: Vec<(ShiftIdx, Vec<NodeIdx>)>) -> Self {
        let mut solution = WorkingSolution::new(evaluator);
        let num_nodes = solution.problem().num_nodes();
        let mut seen = FixedBitSet::with_capacity(num_nodes);
        let mut changes: Vec<(ShiftIdx, Vec<NodeIdx>)> = Vec::new();

        for (shift, visits) in assignment {
            if shift.get() >= solution.routes.len() {
                continue;
            }

            let index = match changes.iter().position(|(planned, _)| *planned == shift) {
                Some(index) => index,
                None => {
                    changes.push((shift, Vec::with_capacity(visits.len())));
                    changes.len() - 1
                }
            };

            for node in visits {
                if node.get() < num_nodes
                    && !solution.is_excluded(node)
                    && solution.problem().is_compatible(node, shift)
                    && !seen.put(node.get())
                {
                    changes[index].1.push(node);
                }
            }
        }

        solution.apply_changes(&changes);
        solution
    }

    pub fn problem(&self) -> &OptimizationProblem {
        self.evaluator.problem()
    }

    pub fn evaluator(&self) -> &Arc<Evaluator> {
        &self.evaluator
    }

    pub fn routes(&self) -> &[WorkingRoute] {
        &self.routes
    }

    pub fn route(&self, shift: ShiftIdx) -> &WorkingRoute {
        &self.routes[shift.get()]
    }

    pub fn non_empty_routes_iter(&self) -> impl Iterator<Item = &WorkingRoute> {
        self.routes.iter().filter(|route| !route.is_empty())
    }

    pub fn unassigned(&self) -> &BTreeSet<NodeIdx> {
        &self.unassigned
    }

    pub fn is_excluded(&self, node: NodeIdx) -> bool {
        self.excluded.contains(node.get())
    }

    pub fn excluded_nodes(&self) -> impl Iterator<Item = NodeIdx> + '_ {
        self.excluded.ones().map(NodeIdx::new)
    }

    pub fn position_of(&self, node: NodeIdx) -> Option<(ShiftIdx, usize)> {
        self.positions[node.get()]
    }

    pub fn assigned_nodes(&self) -> impl Iterator<Item = NodeIdx> + '_ {
        self.routes.iter().flat_map(|route| route.visits().iter().copied())
    }

    pub fn num_assigned(&self) -> usize {
        self.positions.iter().filter(|position| position.is_some()).count()
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn costs(&self) -> &CostVector {
        &self.costs
    }

    pub fn analysis(&self) -> ScoreAnalysis {
        self.costs.analysis(self.evaluator.weights())
    }

    /// Visit sequences of every shift, in shift order.
    pub fn assignment(&self) -> Vec<(ShiftIdx, Vec<NodeIdx>)> {
        self.routes
            .iter()
            .map(|route| (route.shift(), route.visits().to_vec()))
            .collect()
    }

    pub fn is_identical(&self, other: &WorkingSolution) -> bool {
        self.routes
            .iter()
            .zip(&other.routes)
            .all(|(a, b)| a.visits() == b.visits())
    }

    /// Violation classes per node from the last evaluation.
    pub fn node_violations(&self) -> Vec<ViolationSet> {
        let mut violations = self.global_marks.clone();
        for route in &self.routes {
            for (node, marks) in route.visits().iter().zip(&route.assessment().marks) {
                violations[node.get()] = violations[node.get()].union(*marks);
            }
        }
        violations
    }

    /// Score difference `changed - current` without touching this solution.
    pub fn evaluate_changes(&self, changes: &RouteChanges) -> Score {
        let patched = self.patch(changes);
        let weights = self.evaluator.weights();

        let mut before = CostVector::ZERO;
        let mut after = CostVector::ZERO;
        for route in &patched.routes {
            before += self.route(route.shift()).costs();
            after += route.costs();
        }

        let shifts = patched.routes.iter().map(WorkingRoute::shift).collect::<Vec<_>>();
        let mut nodes = patched
            .routes
            .iter()
            .flat_map(|route| {
                route
                    .visits()
                    .iter()
                    .chain(self.route(route.shift()).visits())
                    .copied()
            })
            .collect::<Vec<_>>();
        nodes.sort_unstable();
        nodes.dedup();

        let scope = EvaluationScope::Partial {
            shifts: &shifts,
            nodes: &nodes,
        };
        self.evaluator
            .evaluate_global(self, scope, &mut before, &mut DiscardMarks);
        self.evaluator
            .evaluate_global(&patched, scope, &mut after, &mut DiscardMarks);

        after.score(weights) - before.score(weights)
    }

    pub fn apply_changes(&mut self, changes: &RouteChanges) {
        if changes.is_empty() {
            return;
        }

        let patched = self.patch(changes).routes;

        let mut touched = Vec::new();
        let mut shifts = Vec::with_capacity(patched.len());
        for route in patched {
            let shift = route.shift();
            touched.extend_from_slice(route.visits());
            let old = std::mem::replace(&mut self.routes[shift.get()], route);
            touched.extend(old.visits);
            shifts.push(shift);
        }

        for &node in &touched {
            self.positions[node.get()] = None;
        }
        for shift in shifts {
            for (position, &node) in self.routes[shift.get()].visits().iter().enumerate() {
                self.positions[node.get()] = Some((shift, position));
                self.unassigned.remove(&node);
            }
        }
        for node in touched {
            if self.positions[node.get()].is_none() && !self.is_excluded(node) {
                self.unassigned.insert(node);
            }
        }

        self.refresh();
    }

    pub fn insert(&mut self, node: NodeIdx, shift: ShiftIdx, position: usize) {
        debug_assert!(!self.is_excluded(node));
        let changes = self.insertion_changes(node, shift, position);
        self.apply_changes(&changes);
    }

    /// Route changes for moving `node` to `position` of `shift`, removing it from its current route.
    pub fn insertion_changes(&self, node: NodeIdx, shift: ShiftIdx, position: usize) -> Vec<(ShiftIdx, Vec<NodeIdx>)> {
        let mut changes = Vec::with_capacity(2);
        let mut visits = self.route(shift).visits().to_vec();

        if let Some((current, index)) = self.position_of(node) {
            if current == shift {
                visits.remove(index);
            } else {
                let mut previous = self.route(current).visits().to_vec();
                previous.remove(index);
                changes.push((current, previous));
            }
        }

        visits.insert(position.min(visits.len()), node);
        changes.push((shift, visits));
        changes
    }

    pub fn remove(&mut self, node: NodeIdx) -> bool {
        let Some((shift, index)) = self.position_of(node) else {
            return false;
        };

        let mut visits = self.route(shift).visits().to_vec();
        visits.remove(index);
        self.apply_changes(&[(shift, visits)]);
        true
    }

    pub fn remove_many(&mut self, nodes: &[NodeIdx]) {
        let mut changed: FxHashMap<ShiftIdx, Vec<NodeIdx>> = FxHashMap::default();
        for &node in nodes {
            if let Some((shift, _)) = self.position_of(node) {
                changed
                    .entry(shift)
                    .or_insert_with(|| self.route(shift).visits().to_vec())
                    .retain(|&visit| visit != node);
            }
        }

        let mut changes = changed.into_iter().collect::<Vec<_>>();
        changes.sort_unstable_by_key(|(shift, _)| *shift);
        self.apply_changes(&changes);
    }

    /// Takes the node out of the optimization.
    pub fn exclude(&mut self, node: NodeIdx) {
        self.remove(node);
        self.unassigned.remove(&node);
        self.excluded.insert(node.get());
        self.refresh();
    }

    /// Puts a previously excluded node back in the unassigned pool.
    pub fn restore(&mut self, node: NodeIdx) -> bool {
        if !self.is_excluded(node) || !self.problem().has_opening_hours(node) {
            return false;
        }

        self.excluded.set(node.get(), false);
        self.unassigned.insert(node);
        self.refresh();
        true
    }

    fn patch(&self, changes: &RouteChanges) -> PatchedSolution<'_> {
        let problem = self.problem();
        let mut planned = changes.to_vec();

        // Overnight stays move the start of the following shift.
        let mut index = 0;
        while index < planned.len() {
            let shift = problem.shift(planned[index].0);
            if shift.ends_with_stay()
                && let Some(next) = shift.next()
                && !planned.iter().any(|(planned_shift, _)| *planned_shift == next)
            {
                planned.push((next, self.route(next).visits().to_vec()));
            }
            index += 1;
        }

        let last_visit = |shift: ShiftIdx| {
            planned
                .iter()
                .find(|(planned_shift, _)| *planned_shift == shift)
                .map_or_else(
                    || self.route(shift).last_visit(),
                    |(_, visits)| visits.last().copied(),
                )
        };

        let routes = planned
            .iter()
            .map(|(shift, visits)| {
                let start = start_location(problem, *shift, &last_visit);
                WorkingRoute {
                    shift: *shift,
                    visits: visits.clone(),
                    assessment: assess(&self.evaluator, *shift, start, visits),
                }
            })
            .collect::<Vec<_>>();

        let mut positions = FxHashMap::default();
        for (route_index, route) in routes.iter().enumerate() {
            for (position, &node) in route.visits().iter().enumerate() {
                positions.insert(node, (route_index, position));
            }
        }

        PatchedSolution {
            base: self,
            routes,
            positions,
        }
    }

    fn refresh(&mut self) {
        let mut global_costs = CostVector::ZERO;
        let mut global_marks = vec![ViolationSet::EMPTY; self.positions.len()];
        self.evaluator.evaluate_global(
            &*self,
            EvaluationScope::Full,
            &mut global_costs,
            &mut global_marks,
        );

        let mut costs = global_costs;
        for route in &self.routes {
            costs += route.costs();
        }

        self.score = costs.score(self.evaluator.weights());
        self.costs = costs;
        self.global_costs = global_costs;
        self.global_marks = global_marks;
    }
}

impl PlacementLookup for WorkingSolution {
    fn placement(&self, node: NodeIdx) -> Option<VisitPlacement> {
        let (shift, position) = self.positions[node.get()]?;
        let visit = &self.route(shift).schedule().visits[position];
        Some(VisitPlacement {
            resource: self.problem().shift(shift).resource(),
            shift,
            start: visit.start,
            departure: visit.departure,
        })
    }
}

impl SolutionView for WorkingSolution {
    fn problem(&self) -> &OptimizationProblem {
        self.evaluator.problem()
    }

    fn route_visits(&self, shift: ShiftIdx) -> &[NodeIdx] {
        self.route(shift).visits()
    }

    fn route_schedule(&self, shift: ShiftIdx) -> &RouteSchedule {
        self.route(shift).schedule()
    }

    fn is_assigned(&self, node: NodeIdx) -> bool {
        self.positions[node.get()].is_some()
    }

    fn is_excluded(&self, node: NodeIdx) -> bool {
        self.excluded.contains(node.get())
    }
}

/// A solution with some routes replaced, used to price moves before committing them.
struct PatchedSolution<'a> {
    base: &'a WorkingSolution,
    routes: Vec<WorkingRoute>,
    positions: FxHashMap<NodeIdx, (usize, usize)>,
}

impl PatchedSolution<'_> {
    fn patched_route(&self, shift: ShiftIdx) -> Option<&WorkingRoute> {
        self.routes.iter().find(|route| route.shift() == shift)
    }
}

impl PlacementLookup for PatchedSolution<'_> {
    fn placement(&self, node: NodeIdx) -> Option<VisitPlacement> {
        if let Some(&(route_index, position)) = self.positions.get(&node) {
            let route = &self.routes[route_index];
            let visit = &route.schedule().visits[position];
            return Some(VisitPlacement {
                resource: self.base.problem().shift(route.shift()).resource(),
                shift: route.shift(),
                start: visit.start,
                departure: visit.departure,
            });
        }

        let (shift, _) = self.base.position_of(node)?;
        if self.patched_route(shift).is_some() {
            return None;
        }
        self.base.placement(node)
    }
}

impl SolutionView for PatchedSolution<'_> {
    fn problem(&self) -> &OptimizationProblem {
        self.base.problem()
    }

    fn route_visits(&self, shift: ShiftIdx) -> &[NodeIdx] {
        self.patched_route(shift)
            .map_or_else(|| self.base.route_visits(shift), WorkingRoute::visits)
    }

    fn route_schedule(&self, shift: ShiftIdx) -> &RouteSchedule {
        self.patched_route(shift)
            .map_or_else(|| self.base.route_schedule(shift), WorkingRoute::schedule)
    }

    fn is_assigned(&self, node: NodeIdx) -> bool {
        if self.positions.contains_key(&node) {
            return true;
        }
        match self.base.position_of(node) {
            Some((shift, _)) => self.patched_route(shift).is_none(),
            None => false,
        }
    }

    fn is_excluded(&self, node: NodeIdx) -> bool {
        self.base.is_excluded(node)
    }
}
