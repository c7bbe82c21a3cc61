use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::problem::{node::NodeIdx, shift::ShiftIdx};

use super::{score::Score, solution::working_solution::WorkingSolution};

/// Shifts considered per node in performance mode.
const PERFORMANCE_MODE_SHIFTS: usize = 3;

const HARD_EPSILON: f64 = 1e-9;

/// True when a move does not add any hard violation.
pub fn keeps_hard_feasibility(delta: &Score) -> bool {
    delta.hard_score <= HARD_EPSILON
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion {
    pub node: NodeIdx,
    pub shift: ShiftIdx,
    pub position: usize,
}

pub fn candidate_shifts(solution: &WorkingSolution, node: NodeIdx, performance_mode: bool) -> &[ShiftIdx] {
    let candidates = solution.problem().candidate_shifts(node);
    if performance_mode {
        &candidates[..candidates.len().min(PERFORMANCE_MODE_SHIFTS)]
    } else {
        candidates
    }
}

pub fn for_each_insertion(
    solution: &WorkingSolution,
    node: NodeIdx,
    shifts: &[ShiftIdx],
    mut f: impl FnMut(Insertion),
) {
    for &shift in shifts {
        let len = solution.route(shift).len();
        let skip = solution.position_of(node).is_some_and(|(current, _)| current == shift);
        let positions = if skip { len.saturating_sub(1) } else { len };
        for position in 0..=positions {
            f(Insertion {
                node,
                shift,
                position,
            });
        }
    }
}

fn best_in_shift(solution: &WorkingSolution, node: NodeIdx, shift: ShiftIdx) -> Option<(Score, Insertion)> {
    let mut best: Option<(Score, Insertion)> = None;
    for_each_insertion(solution, node, &[shift], |insertion| {
        let changes = solution.insertion_changes(insertion.node, insertion.shift, insertion.position);
        let score = solution.evaluate_changes(&changes);
        if best.is_none_or(|(best_score, _)| score < best_score) {
            best = Some((score, insertion));
        }
    });
    best
}

/// Cheapest placement of `node` over `shifts`, ties broken on the lowest shift then position.
///
/// Shifts are priced in parallel; the reduction is a total order so the
/// result does not depend on scheduling.
pub fn best_insertion(
    solution: &WorkingSolution,
    node: NodeIdx,
    shifts: &[ShiftIdx],
) -> Option<(Score, Insertion)> {
    shifts
        .par_iter()
        .filter_map(|&shift| best_in_shift(solution, node, shift))
        .min_by(|(a, first), (b, second)| {
            a.cmp(b)
                .then_with(|| first.shift.cmp(&second.shift))
                .then_with(|| first.position.cmp(&second.position))
        })
}
