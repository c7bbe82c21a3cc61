use jiff::SignedDuration;
use tourplan_optimizer::problem::{optimization_problem::OptimizationProblem, relation::Relation};

use crate::test_utils;

fn koeln_aachen(relations: Vec<Relation>) -> OptimizationProblem {
    let mut koeln = test_utils::node("Koeln", 50.9375, 6.9603);
    koeln.add_opening_hours(test_utils::day(1));
    let mut aachen = test_utils::node("Aachen", 50.7753, 6.0839);
    aachen.add_opening_hours(test_utils::day(1));

    test_utils::create_problem(
        vec![koeln.build(), aachen.build()],
        vec![test_utils::resource("Driver", 50.85, 6.5, &[0, 1]).build()],
        relations,
    )
}

#[test]
fn test_same_route_relation_keeps_one_working_day() {
    let problem = koeln_aachen(vec![Relation::same_route("Koeln", "Aachen").hard()]);

    let result = test_utils::solve(problem, &test_utils::quick_properties(10));

    assert!(result.unassigned.is_empty());
    assert_eq!(result.score.hard_score, 0.0);

    let koeln = result.route_of("Koeln").unwrap();
    let aachen = result.route_of("Aachen").unwrap();
    assert_eq!(koeln.working_hours_index, aachen.working_hours_index);
    assert_eq!(result.routes.len(), 1);
}

#[test]
fn test_soft_same_route_relation_keeps_one_working_day() {
    let problem = koeln_aachen(vec![Relation::same_route("Koeln", "Aachen")]);

    let result = test_utils::solve(problem, &test_utils::quick_properties(10));

    assert!(result.unassigned.is_empty());
    assert_eq!(result.score.hard_score, 0.0);

    let koeln = result.route_of("Koeln").unwrap();
    let aachen = result.route_of("Aachen").unwrap();
    assert_eq!(koeln.working_hours_index, aachen.working_hours_index);
    assert_eq!(result.routes.len(), 1);
}

#[test]
fn test_time_window_relation_orders_visits() {
    let problem = koeln_aachen(vec![
        Relation::time_window(
            "Aachen",
            "Koeln",
            SignedDuration::from_mins(30),
            SignedDuration::from_hours(6),
        )
        .hard(),
    ]);

    let result = test_utils::solve(problem, &test_utils::quick_properties(10));
    assert_eq!(result.score.hard_score, 0.0);

    let visit = |id: &str| {
        result
            .routes
            .iter()
            .flat_map(|route| route.visits.iter())
            .find(|visit| visit.node_id == id)
            .unwrap()
            .clone()
    };
    let gap = visit("Koeln").arrival.duration_since(visit("Aachen").arrival);
    assert!(gap >= SignedDuration::from_mins(30));
    assert!(gap <= SignedDuration::from_hours(6));
}
