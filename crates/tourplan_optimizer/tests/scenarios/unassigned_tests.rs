use tourplan_optimizer::{
    problem::{
        location::Coordinate,
        node::NodeBuilder,
        optimization_problem::OptimizationProblem,
        qualification::{Qualification, Requirement, ZoneCode},
        resource::{ResourceBuilder, WorkingHours},
    },
    solver::{optimization_result::UnassignedReason, violation::ViolationClass},
};

use crate::test_utils;

fn problem_with_crane_job() -> OptimizationProblem {
    let mut crane_job = test_utils::node("Crane", 50.05, 6.05);
    crane_job.add_requirement(Requirement::of_type("Crane", true));

    test_utils::create_problem(
        vec![test_utils::node("Regular", 50.02, 6.02).build(), crane_job.build()],
        vec![test_utils::resource("Van", 50.0, 6.0, &[0]).build()],
        Vec::new(),
    )
}

#[test]
fn test_unqualified_node_stays_unassigned() {
    let result = test_utils::solve(problem_with_crane_job(), &test_utils::quick_properties(5));

    assert_eq!(result.score.hard_score, 0.0);
    assert!(result.route_of("Regular").is_some());
    assert_eq!(
        result.unassigned_reason("Crane"),
        Some(&UnassignedReason::Infeasible)
    );
}

#[test]
fn test_auto_filter_removes_unqualified_node() {
    let properties = test_utils::quick_properties(8)
        .with("AutoFilter", true)
        .with("AutoFilter.Threshold", 2.0)
        .with("AutoFilter.Decay", 1.0)
        .with("AutoFilter.WarmupGenerations", 1);

    let result = test_utils::solve(problem_with_crane_job(), &properties);

    assert_eq!(
        result.unassigned_reason("Crane"),
        Some(&UnassignedReason::Filtered {
            reasons: vec![ViolationClass::ResourceMismatch]
        })
    );
    assert_eq!(result.filter_history.len(), 1);
    assert_eq!(result.filter_history[0].node_id, "Crane");
    assert!(result.route_of("Regular").is_some());
}

#[test]
fn test_auto_filter_removes_node_outside_every_zone() {
    let mut job = test_utils::node("Remote", 50.05, 6.05);
    job.add_requirement(Requirement::zone(vec![ZoneCode::ZoneNumber(7)], true));

    let mut van = ResourceBuilder::new("Van", Coordinate::new(50.0, 6.0));
    van.add_working_hours(
        WorkingHours::new(test_utils::day(0)).with_qualification(Qualification::zone(ZoneCode::ZoneNumber(3))),
    );

    let problem = test_utils::create_problem(
        vec![test_utils::node("Local", 50.02, 6.02).build(), job.build()],
        vec![van.build()],
        Vec::new(),
    );
    let properties = test_utils::quick_properties(8)
        .with("AutoFilter", true)
        .with("SelectiveAutoFilter.ZoneMismatch", true)
        .with("AutoFilter.Threshold", 2.0)
        .with("AutoFilter.Decay", 1.0)
        .with("AutoFilter.WarmupGenerations", 1);

    let result = test_utils::solve(problem, &properties);

    assert_eq!(
        result.unassigned_reason("Remote"),
        Some(&UnassignedReason::Filtered {
            reasons: vec![ViolationClass::ZoneMismatch]
        })
    );
    assert_eq!(result.filter_history.len(), 1);
    assert_eq!(result.filter_history[0].node_id, "Remote");
    assert!(result.route_of("Local").is_some());
}

#[test]
fn test_node_without_opening_hours_is_reported() {
    let closed = NodeBuilder::new("Closed", Coordinate::new(50.01, 6.01)).build();

    let problem = test_utils::create_problem(
        vec![closed, test_utils::node("Open", 50.02, 6.02).build()],
        vec![test_utils::resource("Van", 50.0, 6.0, &[0]).build()],
        Vec::new(),
    );

    let result = test_utils::solve(problem, &test_utils::quick_properties(0));
    assert_eq!(
        result.unassigned_reason("Closed"),
        Some(&UnassignedReason::NoOpeningHours)
    );
    assert!(result.route_of("Open").is_some());
}
