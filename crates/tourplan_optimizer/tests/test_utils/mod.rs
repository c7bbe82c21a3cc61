use std::sync::Arc;

use tourplan_optimizer::{
    problem::{
        calendar::CalendarInterval,
        location::Coordinate,
        node::{Node, NodeBuilder},
        optimization_problem::{OptimizationProblem, OptimizationProblemBuilder},
        relation::Relation,
        resource::{Resource, ResourceBuilder, WorkingHours},
    },
    solver::{
        error::SolverError,
        events::SolverEvent,
        optimization::{Element, Optimization},
        optimization_result::OptimizationResult,
        properties::PropertyMap,
        solver::Solver,
        solver_params::SolverParams,
    },
};

pub const DAYS: [(&str, &str); 2] = [
    ("2025-06-10T06:00:00Z", "2025-06-10T20:00:00Z"),
    ("2025-06-11T06:00:00Z", "2025-06-11T20:00:00Z"),
];

pub fn day(index: usize) -> CalendarInterval {
    CalendarInterval::from_iso(DAYS[index].0, DAYS[index].1).unwrap()
}

/// Node open on the first day.
pub fn node(id: &str, lat: f64, lon: f64) -> NodeBuilder {
    let mut builder = NodeBuilder::new(id, Coordinate::new(lat, lon));
    builder.add_opening_hours(day(0));
    builder
}

/// Resource working on the given days.
pub fn resource(id: &str, lat: f64, lon: f64, days: &[usize]) -> ResourceBuilder {
    let mut builder = ResourceBuilder::new(id, Coordinate::new(lat, lon));
    for &index in days {
        builder.add_working_hours(WorkingHours::new(day(index)));
    }
    builder
}

/// Small search budget for tests.
pub fn quick_properties(generations: usize) -> PropertyMap {
    PropertyMap::new()
        .with("ExitCondition.Generations", generations)
        .with("Annealing.Iterations", 200)
        .with("Annealing.Repetitions", 1)
        .with("Evolution.PopulationSize", 4)
        .with("Evolution.LocalSearchIterations", 30)
}

pub fn create_problem(nodes: Vec<Node>, resources: Vec<Resource>, relations: Vec<Relation>) -> OptimizationProblem {
    let mut builder = OptimizationProblemBuilder::default();
    builder
        .set_nodes(nodes)
        .set_resources(resources)
        .set_relations(relations);
    builder.build().unwrap()
}

pub fn solve(problem: OptimizationProblem, properties: &PropertyMap) -> OptimizationResult {
    let (params, _) = SolverParams::from_properties(properties).unwrap();
    Solver::new(Arc::new(problem), params).solve().unwrap()
}

/// Runs through the facade and returns the result with every event of the run.
pub async fn run_elements(
    elements: Vec<Element>,
) -> (Result<OptimizationResult, SolverError>, Vec<SolverEvent>) {
    let mut optimization = Optimization::new();
    optimization.add_elements(elements).unwrap();
    let mut receiver = optimization.subscribe();

    let result = optimization.start_run_async().unwrap().await;

    let mut events = Vec::new();
    while let Some(event) = receiver.recv().await {
        events.push(event);
    }

    (result, events)
}
