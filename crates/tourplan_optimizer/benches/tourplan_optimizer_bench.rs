use std::{hint::black_box, sync::Arc};

use criterion::{Criterion, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use tourplan_optimizer::{
    problem::{
        calendar::CalendarInterval,
        location::Coordinate,
        node::NodeBuilder,
        optimization_problem::{OptimizationProblem, OptimizationProblemBuilder},
        qualification::{Qualification, Requirement},
        resource::{ResourceBuilder, WorkingHours},
    },
    solver::{
        construction::construct_solution::construct_solution, evaluator::Evaluator,
        properties::PropertyMap, solver::Solver, solver_params::SolverParams,
    },
};

const DAYS: [(&str, &str); 2] = [
    ("2025-06-10T06:00:00Z", "2025-06-10T20:00:00Z"),
    ("2025-06-11T06:00:00Z", "2025-06-11T20:00:00Z"),
];

fn day(index: usize) -> CalendarInterval {
    CalendarInterval::from_iso(DAYS[index].0, DAYS[index].1).unwrap()
}

/// Random nodes around Cologne, every fifth one needing expertise.
fn generate_problem(num_nodes: usize, num_resources: usize) -> OptimizationProblem {
    let mut rng = SmallRng::seed_from_u64(42);

    let nodes = (0..num_nodes)
        .map(|i| {
            let mut builder = NodeBuilder::new(
                format!("N{i}"),
                Coordinate::new(
                    50.9 + rng.random_range(-0.3..0.3),
                    6.9 + rng.random_range(-0.4..0.4),
                ),
            );
            builder
                .add_opening_hours(day(i % 2))
                .set_visit_duration(jiff::SignedDuration::from_mins(20));
            if i % 5 == 0 {
                builder.add_requirement(Requirement::min_level("Expertise", 5, true));
            }
            builder.build()
        })
        .collect();

    let resources = (0..num_resources)
        .map(|i| {
            let mut builder = ResourceBuilder::new(format!("R{i}"), Coordinate::new(50.9, 6.9));
            for index in 0..DAYS.len() {
                builder.add_working_hours(
                    WorkingHours::new(day(index))
                        .with_qualification(Qualification::leveled("Expertise", 3 + 2 * i as u32)),
                );
            }
            builder.build()
        })
        .collect();

    let mut builder = OptimizationProblemBuilder::default();
    builder.set_nodes(nodes).set_resources(resources);
    builder.build().unwrap()
}

fn construction_benchmark(c: &mut Criterion) {
    let problem = Arc::new(generate_problem(60, 4));
    let evaluator = Arc::new(Evaluator::new(problem, &SolverParams::default()));

    let mut group = c.benchmark_group("construction");
    group.bench_function("construct 60 nodes", |b| {
        b.iter(|| construct_solution(black_box(Arc::clone(&evaluator)), false))
    });
    group.bench_function("construct 60 nodes (performance mode)", |b| {
        b.iter(|| construct_solution(black_box(Arc::clone(&evaluator)), true))
    });
    group.finish();
}

fn search_benchmark(c: &mut Criterion) {
    let problem = Arc::new(generate_problem(30, 3));
    let (params, _) = SolverParams::from_properties(
        &PropertyMap::new()
            .with("ExitCondition.Generations", 5)
            .with("Annealing.Iterations", 300)
            .with("Annealing.Repetitions", 1)
            .with("Evolution.PopulationSize", 4),
    )
    .unwrap();

    let mut group = c.benchmark_group("search");
    group.sample_size(10);
    group.bench_function("solve 30 nodes, 5 generations", |b| {
        b.iter(|| {
            Solver::new(Arc::clone(&problem), params.clone())
                .solve()
                .unwrap()
        })
    });
    group.finish();
}

criterion_group!(benches, construction_benchmark, search_benchmark);
criterion_main!(benches);
