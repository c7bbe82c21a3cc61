use std::{cmp::Reverse, sync::Arc};

use jiff::Timestamp;
use tracing::{Level, debug, instrument};

use crate::{
    problem::node::NodeIdx,
    solver::{
        evaluator::Evaluator,
        insertion::{best_insertion, candidate_shifts, keeps_hard_feasibility},
        solution::working_solution::WorkingSolution,
    },
};

/// Deterministic visiting order: important nodes first, then the tightest opening hours.
pub fn construction_order(solution: &WorkingSolution) -> Vec<NodeIdx> {
    let problem = solution.problem();
    let mut nodes = solution.unassigned().iter().copied().collect::<Vec<_>>();
    nodes.sort_by_cached_key(|&node| {
        let earliest_end = problem
            .node_calendar(node)
            .first()
            .map_or(Timestamp::MAX, |interval| interval.end());
        (
            Reverse(problem.node(node).importance()),
            earliest_end,
            problem.node(node).id().to_owned(),
        )
    });
    nodes
}

/// Greedy construction.
///
/// Each node is first offered to its nearest compatible shift, then to the
/// cheapest placement over every candidate shift. Placements adding a hard
/// violation are refused and the node stays unassigned.
#[instrument(skip_all, level = Level::DEBUG)]
pub fn construct_solution(evaluator: Arc<Evaluator>, performance_mode: bool) -> WorkingSolution {
    let mut solution = WorkingSolution::new(evaluator);
    let order = construction_order(&solution);

    for node in order {
        let shifts = candidate_shifts(&solution, node, performance_mode);
        let Some(&nearest) = shifts.first() else {
            continue;
        };

        let placement = best_insertion(&solution, node, &[nearest])
            .filter(|(score, _)| keeps_hard_feasibility(score))
            .or_else(|| {
                best_insertion(&solution, node, shifts)
                    .filter(|(score, _)| keeps_hard_feasibility(score))
            });

        if let Some((_, insertion)) = placement {
            solution.insert(insertion.node, insertion.shift, insertion.position);
        }
    }

    debug!(
        assigned = solution.num_assigned(),
        unassigned = solution.unassigned().len(),
        score = ?solution.score(),
        "Construction finished"
    );

    solution
}
