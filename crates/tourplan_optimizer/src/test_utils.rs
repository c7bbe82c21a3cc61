use std::sync::Arc;

use jiff::SignedDuration;

use crate::{
    problem::{
        calendar::CalendarInterval,
        location::Coordinate,
        node::{Node, NodeBuilder, NodeIdx},
        optimization_problem::{OptimizationProblem, OptimizationProblemBuilder},
        qualification::{Qualification, Requirement},
        relation::Relation,
        resource::{Resource, ResourceBuilder, WorkingHours},
        shift::ShiftIdx,
    },
    solver::{
        evaluator::Evaluator, solution::working_solution::WorkingSolution,
        solver_params::SolverParams,
    },
};

pub const DAY_ONE: (&str, &str) = ("2025-06-10T06:00:00Z", "2025-06-10T20:00:00Z");
pub const DAY_TWO: (&str, &str) = ("2025-06-11T06:00:00Z", "2025-06-11T20:00:00Z");

pub struct TestNode {
    id: String,
    coordinate: Coordinate,
    opening: (String, String),
    duration: SignedDuration,
    requirements: Vec<Requirement>,
}

impl TestNode {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        TestNode {
            id: id.into(),
            coordinate: Coordinate::new(lat, lon),
            opening: (DAY_ONE.0.to_owned(), DAY_ONE.1.to_owned()),
            duration: SignedDuration::ZERO,
            requirements: Vec::new(),
        }
    }

    pub fn opening(mut self, start: &str, end: &str) -> Self {
        self.opening = (start.to_owned(), end.to_owned());
        self
    }

    pub fn duration(mut self, duration: SignedDuration) -> Self {
        self.duration = duration;
        self
    }

    pub fn requirement(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    fn build(self) -> Node {
        let mut builder = NodeBuilder::new(self.id, self.coordinate);
        builder
            .add_opening_hours(CalendarInterval::from_iso(&self.opening.0, &self.opening.1).unwrap())
            .set_visit_duration(self.duration);
        for requirement in self.requirements {
            builder.add_requirement(requirement);
        }
        builder.build()
    }
}

pub fn interval(hours: (&str, &str)) -> CalendarInterval {
    CalendarInterval::from_iso(hours.0, hours.1).unwrap()
}

pub fn resource_at(id: &str, lat: f64, lon: f64, working_hours: &[(&str, &str)]) -> Resource {
    let mut builder = ResourceBuilder::new(id, Coordinate::new(lat, lon));
    for &hours in working_hours {
        builder.add_working_hours(WorkingHours::new(interval(hours)));
    }
    builder.build()
}

/// Two days, staying overnight after the first.
pub fn resource_with_stay(id: &str, lat: f64, lon: f64) -> Resource {
    let mut builder = ResourceBuilder::new(id, Coordinate::new(lat, lon));
    builder
        .add_working_hours(WorkingHours::new(interval(DAY_ONE).with_stay(true)))
        .add_working_hours(WorkingHours::new(interval(DAY_TWO)));
    builder.build()
}

pub fn create_problem(nodes: Vec<TestNode>, resources: Vec<Resource>) -> OptimizationProblem {
    create_problem_with_relations(nodes, resources, Vec::new())
}

pub fn create_problem_with_relations(
    nodes: Vec<TestNode>,
    resources: Vec<Resource>,
    relations: Vec<Relation>,
) -> OptimizationProblem {
    let mut builder = OptimizationProblemBuilder::default();
    builder
        .set_nodes(nodes.into_iter().map(TestNode::build).collect())
        .set_resources(resources)
        .set_relations(relations);
    builder.build().unwrap()
}

pub fn create_evaluator(problem: OptimizationProblem) -> Arc<Evaluator> {
    Arc::new(Evaluator::new(Arc::new(problem), &SolverParams::default()))
}

/// `n` nodes east of a single resource, all in shift 0 in index order.
pub fn line_solution(n: usize) -> WorkingSolution {
    let problem = create_problem(
        (0..n)
            .map(|i| TestNode::new(format!("N{i}"), 50.0, 6.0 + 0.01 * (i + 1) as f64))
            .collect(),
        vec![resource_at("R", 50.0, 6.0, &[DAY_ONE])],
    );

    WorkingSolution::from_assignment(
        create_evaluator(problem),
        vec![(ShiftIdx::new(0), (0..n).map(NodeIdx::new).collect())],
    )
}

/// One node needing expertise 8, resources offering 10, 2 and 5. Only shift 0 qualifies.
pub fn expertise_problem() -> OptimizationProblem {
    let resource = |id: &str, lat: f64, lon: f64, level: u32| {
        let mut builder = ResourceBuilder::new(id, Coordinate::new(lat, lon));
        builder.add_working_hours(
            WorkingHours::new(interval(DAY_ONE))
                .with_qualification(Qualification::leveled("Expertise", level)),
        );
        builder.build()
    };

    create_problem(
        vec![TestNode::new("Job", 50.5, 6.5).requirement(Requirement::min_level("Expertise", 8, true))],
        vec![
            resource("Senior", 50.0, 6.0, 10),
            resource("Junior", 50.5, 6.5, 2),
            resource("Regular", 50.4, 6.4, 5),
        ],
    )
}
