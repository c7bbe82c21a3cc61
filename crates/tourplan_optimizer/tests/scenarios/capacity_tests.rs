use tourplan_optimizer::{
    export::route_report::route_reports,
    problem::{
        load::{Load, LoadCapacity, NodeDepot, ResourceDepot},
        node::Node,
    },
    solver::optimization_result::UnassignedReason,
};

use crate::test_utils;

fn pickup(id: &str, lon: f64, good: &str, quantity: f64) -> Node {
    let mut builder = test_utils::node(id, 50.0, lon);
    builder.set_depot(NodeDepot {
        loads: vec![Load::supply(good, quantity)],
    });
    builder.build()
}

#[test]
fn test_combined_load_never_exceeds_total_capacity() {
    let mut truck = test_utils::resource("Truck", 50.0, 6.0, &[0]);
    truck.set_depot(
        ResourceDepot::new(15.0)
            .with_capacity(LoadCapacity::new("Fridge", 15.0))
            .with_capacity(LoadCapacity::new("TV", 15.0)),
    );

    let problem = test_utils::create_problem(
        vec![
            pickup("Fridges", 6.05, "Fridge", 10.0),
            pickup("TVs", 6.1, "TV", 8.0),
        ],
        vec![truck.build()],
        Vec::new(),
    );

    let result = test_utils::solve(problem, &test_utils::quick_properties(10));

    assert_eq!(result.score.hard_score, 0.0);
    assert_eq!(result.num_assigned(), 1);
    assert_eq!(result.unassigned.len(), 1);
    assert_eq!(result.unassigned[0].reason, UnassignedReason::Infeasible);

    for report in route_reports(&result) {
        for row in &report.rows {
            let total: f64 = row.levels.iter().map(|level| level.after).sum();
            assert!(total <= 15.0 + 1e-9, "{} carries {total}", row.node_id);
        }
    }
}

#[test]
fn test_delivery_after_pickup_frees_space() {
    let mut truck = test_utils::resource("Truck", 50.0, 6.0, &[0]);
    truck.set_depot(
        ResourceDepot::new(15.0)
            .with_capacity(LoadCapacity::new("Fridge", 15.0).with_initial_level(10.0))
            .with_capacity(LoadCapacity::new("TV", 15.0)),
    );

    let mut delivery = test_utils::node("Customer", 50.0, 6.05);
    delivery.set_depot(NodeDepot {
        loads: vec![Load::request("Fridge", 10.0)],
    });

    let problem = test_utils::create_problem(
        vec![delivery.build(), pickup("TVs", 6.1, "TV", 8.0)],
        vec![truck.build()],
        Vec::new(),
    );

    let result = test_utils::solve(problem, &test_utils::quick_properties(10));

    assert_eq!(result.score.hard_score, 0.0);
    assert!(result.unassigned.is_empty());

    let reports = route_reports(&result);
    let route = &reports[0];
    assert_eq!(route.rows[0].node_id, "Customer");
    assert_eq!(route.final_level("TV"), Some(8.0));
    assert_eq!(route.final_level("Fridge"), Some(0.0));
}
