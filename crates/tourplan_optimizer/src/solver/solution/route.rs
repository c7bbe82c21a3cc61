use jiff::{SignedDuration, Timestamp};

use crate::{
    problem::{
        calendar::{VisitSchedule, schedule_visit},
        location::LocationIdx,
        node::NodeIdx,
        optimization_problem::OptimizationProblem,
        shift::ShiftIdx,
    },
    solver::{
        constraints::route_constraint::RouteContext,
        cost_model::CostVector,
        evaluator::Evaluator,
        ledger::{LedgerTrace, LoadLedger},
        violation::ViolationSet,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledVisit {
    pub node: NodeIdx,
    pub arrival: Timestamp,
    pub start: Timestamp,
    pub departure: Timestamp,
    pub waiting: SignedDuration,
    pub lateness: SignedDuration,
    /// Meters driven from the previous stop.
    pub travel_distance: f64,
    /// Meters driven since the route start, on arrival.
    pub cumulative_distance: f64,
}

/// Timing, distances and stock along one route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSchedule {
    pub visits: Vec<ScheduledVisit>,
    pub start_location: LocationIdx,
    pub departure_time: Timestamp,
    pub end_location: LocationIdx,
    pub end_time: Timestamp,
    /// Meters, including the return leg.
    pub distance: f64,
    pub ledger: Option<LedgerTrace>,
}

impl RouteSchedule {
    pub fn empty(problem: &OptimizationProblem, shift: ShiftIdx, start_location: LocationIdx) -> Self {
        let start = problem.shift(shift).interval().start();
        RouteSchedule {
            visits: Vec::new(),
            start_location,
            departure_time: start,
            end_location: start_location,
            end_time: start,
            distance: 0.0,
            ledger: None,
        }
    }

    pub fn duration(&self) -> SignedDuration {
        self.end_time.duration_since(self.departure_time)
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }
}

fn plan_visit(
    problem: &OptimizationProblem,
    node: NodeIdx,
    arrival: Timestamp,
) -> VisitSchedule {
    schedule_visit(
        problem.node_calendar(node),
        arrival,
        problem.node(node).visit_duration(),
    )
    .unwrap_or(VisitSchedule {
        start: arrival,
        waiting: SignedDuration::ZERO,
        lateness: SignedDuration::ZERO,
    })
}

/// Walks the visits in order from the shift start.
///
/// Departure is postponed so the resource does not idle in front of the
/// first stop. Routes ending with an overnight stay or without a return
/// finish at their last visit.
pub fn compute_schedule(
    problem: &OptimizationProblem,
    shift_id: ShiftIdx,
    start_location: LocationIdx,
    visits: &[NodeIdx],
) -> RouteSchedule {
    let Some(&first) = visits.first() else {
        return RouteSchedule::empty(problem, shift_id, start_location);
    };

    let shift = problem.shift(shift_id);
    let resource_id = shift.resource();
    let resource = problem.resource(resource_id);

    let mut departure_time = shift.interval().start();
    let first_arrival = departure_time
        + problem.travel_duration(resource_id, start_location, problem.node_location(first));
    let first_plan = plan_visit(problem, first, first_arrival);
    if first_plan.waiting.is_positive() {
        departure_time += first_plan.waiting;
    }

    let mut scheduled = Vec::with_capacity(visits.len());
    let mut location = start_location;
    let mut time = departure_time;
    let mut distance = 0.0;

    for &node in visits {
        let to = problem.node_location(node);
        let travel_distance = problem.distance(location, to);
        let arrival = time + resource.travel_duration(travel_distance);
        distance += travel_distance;

        let plan = plan_visit(problem, node, arrival);
        let departure = plan.start + problem.node(node).visit_duration();

        scheduled.push(ScheduledVisit {
            node,
            arrival,
            start: plan.start,
            departure,
            waiting: plan.waiting,
            lateness: plan.lateness,
            travel_distance,
            cumulative_distance: distance,
        });

        location = to;
        time = departure;
    }

    let end_location = if shift.ends_with_stay() || !resource.return_to_start() {
        location
    } else {
        problem.resource_location(resource_id)
    };
    let return_distance = problem.distance(location, end_location);
    distance += return_distance;
    let end_time = time + resource.travel_duration(return_distance);

    let ledger = problem.has_loads().then(|| {
        let ledger_visits = scheduled
            .iter()
            .map(|visit| (visit.node, visit.start, problem.node_loads(visit.node)))
            .collect::<Vec<_>>();
        LoadLedger::new(problem.depot(resource_id)).run(&ledger_visits, end_time)
    });

    RouteSchedule {
        visits: scheduled,
        start_location,
        departure_time,
        end_location,
        end_time,
        distance,
        ledger,
    }
}

/// Schedule plus the route level costs and per visit violations derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteAssessment {
    pub schedule: RouteSchedule,
    pub costs: CostVector,
    pub marks: Vec<ViolationSet>,
}

pub fn assess(
    evaluator: &Evaluator,
    shift: ShiftIdx,
    start_location: LocationIdx,
    visits: &[NodeIdx],
) -> RouteAssessment {
    let problem = evaluator.problem();
    let schedule = compute_schedule(problem, shift, start_location, visits);
    let mut costs = CostVector::ZERO;
    let mut marks = vec![ViolationSet::EMPTY; visits.len()];

    if !visits.is_empty() {
        let context = RouteContext {
            problem,
            shift,
            schedule: &schedule,
            early_tolerance: evaluator.early_tolerance(),
        };
        evaluator.evaluate_route(&context, &mut costs, &mut marks);
    }

    RouteAssessment {
        schedule,
        costs,
        marks,
    }
}

/// One shift's ordered visits with their cached assessment.
#[derive(Debug, Clone)]
pub struct WorkingRoute {
    pub(crate) shift: ShiftIdx,
    pub(crate) visits: Vec<NodeIdx>,
    pub(crate) assessment: RouteAssessment,
}

impl WorkingRoute {
    pub fn empty(problem: &OptimizationProblem, shift: ShiftIdx, start_location: LocationIdx) -> Self {
        WorkingRoute {
            shift,
            visits: Vec::new(),
            assessment: RouteAssessment {
                schedule: RouteSchedule::empty(problem, shift, start_location),
                costs: CostVector::ZERO,
                marks: Vec::new(),
            },
        }
    }

    pub fn shift(&self) -> ShiftIdx {
        self.shift
    }

    pub fn visits(&self) -> &[NodeIdx] {
        &self.visits
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    pub fn assessment(&self) -> &RouteAssessment {
        &self.assessment
    }

    pub fn schedule(&self) -> &RouteSchedule {
        &self.assessment.schedule
    }

    pub fn costs(&self) -> &CostVector {
        &self.assessment.costs
    }

    pub fn position_of(&self, node: NodeIdx) -> Option<usize> {
        self.visits.iter().position(|&visit| visit == node)
    }

    pub fn last_visit(&self) -> Option<NodeIdx> {
        self.visits.last().copied()
    }
}
