use tourplan_optimizer::problem::{
    location::Coordinate,
    qualification::{Qualification, Requirement},
    resource::{Resource, ResourceBuilder, WorkingHours},
};

use crate::test_utils;

fn leveled_resource(id: &str, lat: f64, lon: f64, level: u32) -> Resource {
    let mut builder = ResourceBuilder::new(id, Coordinate::new(lat, lon));
    builder.add_working_hours(
        WorkingHours::new(test_utils::day(0)).with_qualification(Qualification::leveled("Expertise", level)),
    );
    builder.build()
}

#[test]
fn test_minimum_expertise_picks_only_qualified_resource() {
    let mut job = test_utils::node("Repair", 50.5, 6.5);
    job.add_requirement(Requirement::min_level("Expertise", 8, true));

    let problem = test_utils::create_problem(
        vec![job.build()],
        vec![
            leveled_resource("Level10", 50.0, 6.0, 10),
            leveled_resource("Level2", 50.5, 6.5, 2),
            leveled_resource("Level5", 50.45, 6.45, 5),
        ],
        Vec::new(),
    );

    let result = test_utils::solve(problem, &test_utils::quick_properties(5));

    assert_eq!(result.score.hard_score, 0.0);
    assert_eq!(result.route_of("Repair").unwrap().resource_id, "Level10");
}

#[test]
fn test_soft_requirement_outweighs_short_detour() {
    let mut job = test_utils::node("Install", 50.5, 6.5);
    job.add_requirement(Requirement::of_type("Electrician", false));

    let mut electrician = ResourceBuilder::new("Electrician", Coordinate::new(50.495, 6.495));
    electrician.add_working_hours(
        WorkingHours::new(test_utils::day(0)).with_qualification(Qualification::of_type("Electrician")),
    );

    let problem = test_utils::create_problem(
        vec![job.build()],
        vec![
            test_utils::resource("Helper", 50.5, 6.5, &[0]).build(),
            electrician.build(),
        ],
        Vec::new(),
    );

    let result = test_utils::solve(problem, &test_utils::quick_properties(5));
    assert_eq!(result.route_of("Install").unwrap().resource_id, "Electrician");
}
