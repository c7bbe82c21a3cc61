use tourplan_optimizer::{
    json::types::Snapshot,
    problem::relation::Relation,
    solver::{optimization::Element, properties::PropertyMap},
};

use crate::test_utils;

fn snapshot() -> Snapshot {
    Snapshot {
        nodes: vec![
            test_utils::node("A", 50.01, 6.01).build(),
            test_utils::node("B", 50.02, 6.03).build(),
            test_utils::node("C", 50.04, 6.02).build(),
        ],
        resources: vec![test_utils::resource("Van", 50.0, 6.0, &[0, 1]).build()],
        relations: vec![Relation::same_route("A", "B")],
        properties: PropertyMap::new().with("ExitCondition.Generations", 0),
        solution: None,
    }
}

#[test]
fn test_snapshot_json_round_trip() {
    let original = snapshot();

    let json = original.to_json().unwrap();
    let loaded = Snapshot::from_json(&json).unwrap();

    assert_eq!(loaded, original);
}

#[test]
fn test_ignore_solution_reproduces_elements() {
    let mut original = snapshot();
    let result = test_utils::solve(
        test_utils::create_problem(
            original.nodes.clone(),
            original.resources.clone(),
            original.relations.clone(),
        ),
        &original.properties,
    );
    original = original.with_result(&result);
    assert!(original.solution.is_some());

    let reloaded = Snapshot::from_json(&original.to_json().unwrap()).unwrap();
    let (elements, solution) = reloaded.clone().into_elements(true);
    assert!(solution.is_none());

    let nodes = elements
        .iter()
        .filter_map(|element| match element {
            Element::Node(node) => Some(node.clone()),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(nodes, original.nodes);
    assert_eq!(
        elements
            .iter()
            .filter(|element| matches!(element, Element::Resource(_)))
            .count(),
        1
    );

    let (_, solution) = reloaded.into_elements(false);
    assert_eq!(solution, original.solution);
}

#[test]
fn test_stored_solution_resolves_to_same_routes() {
    let original = snapshot();
    let problem = test_utils::create_problem(
        original.nodes.clone(),
        original.resources.clone(),
        original.relations.clone(),
    );
    let result = test_utils::solve(
        test_utils::create_problem(
            original.nodes.clone(),
            original.resources.clone(),
            original.relations.clone(),
        ),
        &original.properties,
    );

    let stored = original.with_result(&result).solution.unwrap();
    let (assignment, warnings) = stored.resolve(&problem);

    assert!(warnings.is_empty());
    assert_eq!(
        assignment.iter().map(|(_, visits)| visits.len()).sum::<usize>(),
        3
    );
}
