use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;

use tourplan_optimizer::{
    json::types::{RouteSnapshot, Snapshot, SolutionSnapshot},
    problem::{
        location::Coordinate,
        qualification::{Qualification, Requirement},
        resource::{ResourceBuilder, WorkingHours},
    },
    solver::{
        error::SolverError,
        events::{SolverEvent, StatusCode},
        optimization::{Element, Optimization, OptimizationState},
        optimization_result::OptimizationResult,
        properties::PropertyMap,
    },
};

use crate::test_utils;

fn elements(properties: PropertyMap) -> Vec<Element> {
    vec![
        Element::Node(test_utils::node("A", 50.01, 6.01).build()),
        Element::Node(test_utils::node("B", 50.03, 6.02).build()),
        Element::Node(test_utils::node("C", 50.02, 6.05).build()),
        Element::Resource(test_utils::resource("Van", 50.0, 6.0, &[0]).build()),
        Element::Properties(properties),
    ]
}

fn status_codes(events: &[SolverEvent]) -> Vec<StatusCode> {
    events
        .iter()
        .filter_map(|event| match event {
            SolverEvent::Status(status) => Some(status.code),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_run_emits_lifecycle_events() {
    let (result, events) = test_utils::run_elements(elements(
        test_utils::quick_properties(3).with("Unknown.Key", 1),
    ))
    .await;

    let result = result.unwrap();
    assert_eq!(result.num_assigned(), 3);
    assert_eq!(
        status_codes(&events),
        vec![
            StatusCode::Started,
            StatusCode::ConstructionFinished,
            StatusCode::AnnealingFinished,
            StatusCode::Completed,
        ]
    );

    assert!(events.iter().any(|event| matches!(
        event,
        SolverEvent::Warning(warning) if warning.code == "UnknownProperty"
    )));

    let generations = events
        .iter()
        .filter_map(|event| match event {
            SolverEvent::Progress(progress) => Some(progress.generation),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(generations, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_pure_construction_skips_search() {
    let (result, events) =
        test_utils::run_elements(elements(test_utils::quick_properties(0))).await;

    assert_eq!(result.unwrap().generations, 0);
    assert_eq!(
        status_codes(&events),
        vec![
            StatusCode::Started,
            StatusCode::ConstructionFinished,
            StatusCode::Completed,
        ]
    );
}

#[tokio::test]
async fn test_configuration_error_fails_run() {
    let mut elements = elements(test_utils::quick_properties(3));
    elements.push(Element::Resource(
        ResourceBuilder::new("Idle", Coordinate::new(50.0, 6.0)).build(),
    ));

    let (result, events) = test_utils::run_elements(elements).await;

    assert!(matches!(result, Err(SolverError::Configuration(_))));
    assert!(events.iter().any(|event| matches!(event, SolverEvent::Error(_))));
    assert_eq!(
        status_codes(&events),
        vec![StatusCode::Started, StatusCode::Failed]
    );
}

#[tokio::test]
async fn test_cancel_resolves_cancelled() {
    let mut optimization = Optimization::new();
    optimization
        .add_elements(elements(
            test_utils::quick_properties(1_000_000).with("Annealing.Iterations", 1_000_000),
        ))
        .unwrap();

    let handle = optimization.start_run_async().unwrap();
    handle.cancel();

    assert_eq!(handle.await.unwrap_err(), SolverError::Cancelled);
    assert_eq!(optimization.state(), OptimizationState::Cancelled);
}

#[tokio::test]
async fn test_timeout_cancels_run() {
    let mut optimization = Optimization::new();
    optimization
        .add_elements(elements(test_utils::quick_properties(1_000_000)))
        .unwrap();

    let result = optimization
        .start_run_async()
        .unwrap()
        .with_timeout(Duration::from_millis(200))
        .await;

    assert_eq!(result.unwrap_err(), SolverError::Cancelled);
}

#[tokio::test]
async fn test_callbacks_receive_events() {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);

    let mut optimization = Optimization::new();
    optimization
        .add_elements(elements(test_utils::quick_properties(0)))
        .unwrap();
    optimization.on_event(move |event| sink.lock().push(event.clone()));

    optimization.start_run_async().unwrap().await.unwrap();

    // The dispatcher may still be forwarding the last events.
    for _ in 0..50 {
        if status_codes(&received.lock()).contains(&StatusCode::Completed) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(status_codes(&received.lock()).contains(&StatusCode::Completed));
}

#[tokio::test]
async fn test_snapshot_solution_seeds_run() {
    let snapshot = Snapshot {
        nodes: vec![
            test_utils::node("A", 50.01, 6.01).build(),
            test_utils::node("B", 50.03, 6.02).build(),
        ],
        resources: vec![test_utils::resource("Van", 50.0, 6.0, &[0]).build()],
        relations: Vec::new(),
        properties: test_utils::quick_properties(0),
        solution: Some(SolutionSnapshot {
            routes: vec![RouteSnapshot {
                resource_id: "Van".to_owned(),
                working_hours_index: 0,
                node_ids: vec!["B".to_owned(), "A".to_owned(), "Ghost".to_owned()],
            }],
        }),
    };

    let mut optimization = Optimization::new();
    optimization.load_snapshot(snapshot, false).unwrap();
    let mut receiver = optimization.subscribe();

    let result = optimization.start_run_async().unwrap().await.unwrap();
    let order = result.routes[0]
        .visits
        .iter()
        .map(|visit| visit.node_id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(order, vec!["B", "A"]);

    let mut mismatch_warnings = 0;
    while let Some(event) = receiver.recv().await {
        if matches!(&event, SolverEvent::Warning(warning) if warning.code == "StoredSolutionMismatch") {
            mismatch_warnings += 1;
        }
    }
    assert_eq!(mismatch_warnings, 1);
}

fn mismatch_warnings(events: &[SolverEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, SolverEvent::Warning(warning) if warning.code == "StoredSolutionMismatch"))
        .count()
}

async fn run_snapshot(snapshot: Snapshot) -> (OptimizationResult, Vec<SolverEvent>) {
    let mut optimization = Optimization::new();
    optimization.load_snapshot(snapshot, false).unwrap();
    let mut receiver = optimization.subscribe();

    let result = optimization.start_run_async().unwrap().await.unwrap();
    let mut events = Vec::new();
    while let Some(event) = receiver.recv().await {
        events.push(event);
    }
    (result, events)
}

#[tokio::test]
async fn test_stored_route_to_unqualified_resource_is_rejected() {
    let mut repair = test_utils::node("Repair", 50.5, 6.5);
    repair.add_requirement(Requirement::min_level("Expertise", 8, true));

    let leveled = |id: &str, lat: f64, lon: f64, level: u32| {
        let mut builder = ResourceBuilder::new(id, Coordinate::new(lat, lon));
        builder.add_working_hours(
            WorkingHours::new(test_utils::day(0)).with_qualification(Qualification::leveled("Expertise", level)),
        );
        builder.build()
    };

    let snapshot = Snapshot {
        nodes: vec![repair.build()],
        resources: vec![leveled("Level10", 50.0, 6.0, 10), leveled("Level2", 50.5, 6.5, 2)],
        relations: Vec::new(),
        properties: test_utils::quick_properties(0),
        solution: Some(SolutionSnapshot {
            routes: vec![RouteSnapshot {
                resource_id: "Level2".to_owned(),
                working_hours_index: 0,
                node_ids: vec!["Repair".to_owned()],
            }],
        }),
    };

    let (result, events) = run_snapshot(snapshot).await;

    assert_eq!(result.score.hard_score, 0.0);
    assert!(
        result
            .route_of("Repair")
            .is_none_or(|route| route.resource_id == "Level10")
    );
    assert_eq!(mismatch_warnings(&events), 1);
}

#[tokio::test]
async fn test_repeated_stored_routes_keep_every_node() {
    let snapshot = Snapshot {
        nodes: vec![
            test_utils::node("A", 50.01, 6.01).build(),
            test_utils::node("B", 50.03, 6.02).build(),
            test_utils::node("C", 50.02, 6.05).build(),
        ],
        resources: vec![test_utils::resource("Van", 50.0, 6.0, &[0]).build()],
        relations: Vec::new(),
        properties: test_utils::quick_properties(0),
        solution: Some(SolutionSnapshot {
            routes: vec![
                RouteSnapshot {
                    resource_id: "Van".to_owned(),
                    working_hours_index: 0,
                    node_ids: vec!["A".to_owned(), "B".to_owned(), "C".to_owned()],
                },
                RouteSnapshot {
                    resource_id: "Van".to_owned(),
                    working_hours_index: 0,
                    node_ids: vec!["B".to_owned()],
                },
            ],
        }),
    };

    let (result, events) = run_snapshot(snapshot).await;

    let planned = result.routes.iter().map(|route| route.visits.len()).sum::<usize>();
    assert_eq!(planned + result.unassigned.len(), 3);
    for id in ["A", "B", "C"] {
        assert!(result.route_of(id).is_some() || result.unassigned_reason(id).is_some());
    }
    // one warning for the repeated shift, one for B planned twice
    assert_eq!(mismatch_warnings(&events), 2);
}
