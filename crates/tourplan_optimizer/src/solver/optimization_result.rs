use fxhash::FxHashMap;
use jiff::{SignedDuration, Timestamp};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    export::route_report::{GoodLevel, visit_levels},
    problem::{
        location::{Coordinate, LocationIdx},
        node::NodeIdx,
        optimization_problem::OptimizationProblem,
    },
};

use super::{
    events::FilterEvent,
    score::{Score, ScoreAnalysis},
    solution::working_solution::WorkingSolution,
    statistics::ScoreEvolutionRow,
    violation::ViolationClass,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VisitResult {
    pub node_id: String,
    pub coordinate: Coordinate,
    pub arrival: Timestamp,
    pub start: Timestamp,
    pub departure: Timestamp,
    pub lateness: SignedDuration,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub loads: Vec<GoodLevel>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RouteResult {
    pub resource_id: String,
    pub working_hours_index: usize,
    pub start: Timestamp,
    pub end: Timestamp,
    pub distance_km: f64,
    pub start_coordinate: Coordinate,
    pub end_coordinate: Coordinate,
    pub visits: Vec<VisitResult>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum UnassignedReason {
    Filtered { reasons: Vec<ViolationClass> },
    NoOpeningHours,
    Infeasible,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UnassignedNode {
    pub node_id: String,
    pub reason: UnassignedReason,
}

/// Final answer of a run.
#[derive(Clone, Debug, Serialize, JsonSchema)]
pub struct OptimizationResult {
    pub run_id: Uuid,
    pub score: Score,
    pub analysis: ScoreAnalysis,
    pub routes: Vec<RouteResult>,
    pub unassigned: Vec<UnassignedNode>,
    pub filter_history: Vec<FilterEvent>,
    pub score_evolution: Vec<ScoreEvolutionRow>,
    pub generations: usize,
    pub duration: SignedDuration,
}

impl OptimizationResult {
    /// `filtered` holds the reasons of every node currently taken out by the auto-filter.
    pub fn from_solution(
        run_id: Uuid,
        solution: &WorkingSolution,
        filtered: &FxHashMap<NodeIdx, Vec<ViolationClass>>,
        filter_history: Vec<FilterEvent>,
        score_evolution: Vec<ScoreEvolutionRow>,
        generations: usize,
        duration: SignedDuration,
    ) -> Self {
        let problem = solution.problem();

        let routes = solution
            .non_empty_routes_iter()
            .map(|route| {
                let shift = problem.shift(route.shift());
                let schedule = route.schedule();
                let visits = schedule
                    .visits
                    .iter()
                    .enumerate()
                    .map(|(index, visit)| VisitResult {
                        node_id: problem.node(visit.node).id().to_owned(),
                        coordinate: *problem.node(visit.node).coordinate(),
                        arrival: visit.arrival,
                        start: visit.start,
                        departure: visit.departure,
                        lateness: visit.lateness,
                        loads: schedule
                            .ledger
                            .as_ref()
                            .map(|trace| visit_levels(problem, trace, index))
                            .unwrap_or_default(),
                    })
                    .collect();

                RouteResult {
                    resource_id: problem.resource(shift.resource()).id().to_owned(),
                    working_hours_index: shift.working_hours_index(),
                    start: schedule.departure_time,
                    end: schedule.end_time,
                    distance_km: schedule.distance / 1000.0,
                    start_coordinate: coordinate_of(problem, schedule.start_location),
                    end_coordinate: coordinate_of(problem, schedule.end_location),
                    visits,
                }
            })
            .collect();

        let mut unassigned = solution
            .unassigned()
            .iter()
            .map(|&node| UnassignedNode {
                node_id: problem.node(node).id().to_owned(),
                reason: UnassignedReason::Infeasible,
            })
            .chain(solution.excluded_nodes().map(|node| UnassignedNode {
                node_id: problem.node(node).id().to_owned(),
                reason: if !problem.has_opening_hours(node) {
                    UnassignedReason::NoOpeningHours
                } else {
                    UnassignedReason::Filtered {
                        reasons: filtered.get(&node).cloned().unwrap_or_default(),
                    }
                },
            }))
            .collect::<Vec<_>>();
        unassigned.sort_by(|a, b| a.node_id.cmp(&b.node_id));

        OptimizationResult {
            run_id,
            score: solution.score(),
            analysis: solution.analysis(),
            routes,
            unassigned,
            filter_history,
            score_evolution,
            generations,
            duration,
        }
    }

    pub fn num_assigned(&self) -> usize {
        self.routes.iter().map(|route| route.visits.len()).sum()
    }

    pub fn route_of(&self, node_id: &str) -> Option<&RouteResult> {
        self.routes
            .iter()
            .find(|route| route.visits.iter().any(|visit| visit.node_id == node_id))
    }

    pub fn unassigned_reason(&self, node_id: &str) -> Option<&UnassignedReason> {
        self.unassigned
            .iter()
            .find(|node| node.node_id == node_id)
            .map(|node| &node.reason)
    }
}

fn coordinate_of(problem: &OptimizationProblem, location: LocationIdx) -> Coordinate {
    let location = problem.location(location);
    Coordinate::new(location.lat(), location.lon())
}
