use crate::{
    problem::shift::ShiftIdx,
    solver::{
        cost_model::{CostComponent, CostVector},
        solution::view::{EvaluationScope, MarkSink, SolutionView},
        violation::ViolationClass,
    },
};

use super::global_constraint::GlobalConstraint;

/// Hard minutes a route runs into the departure of the same resource's next route.
#[derive(Clone)]
pub struct DoubleBookingConstraint;

impl DoubleBookingConstraint {
    fn evaluate_pair<V: SolutionView, M: MarkSink>(
        view: &V,
        shift: ShiftIdx,
        next: ShiftIdx,
        costs: &mut CostVector,
        marks: &mut M,
    ) {
        let (Some(&last), Some(&first)) = (
            view.route_visits(shift).last(),
            view.route_visits(next).first(),
        ) else {
            return;
        };

        let end = view.route_schedule(shift).end_time;
        let departure = view.route_schedule(next).departure_time;
        if end <= departure {
            return;
        }

        costs.add_hard(
            CostComponent::DoubleBooking,
            end.duration_since(departure).as_secs_f64() / 60.0,
        );
        marks.mark(last, ViolationClass::DoubleBooking);
        marks.mark(first, ViolationClass::DoubleBooking);
    }
}

impl GlobalConstraint for DoubleBookingConstraint {
    fn evaluate<V: SolutionView, M: MarkSink>(
        &self,
        view: &V,
        scope: EvaluationScope,
        costs: &mut CostVector,
        marks: &mut M,
    ) {
        let problem = view.problem();
        let firsts: Vec<ShiftIdx> = match scope {
            EvaluationScope::Full => ShiftIdx::range(problem.num_shifts()).collect(),
            EvaluationScope::Partial { shifts, .. } => {
                let mut firsts = shifts
                    .iter()
                    .flat_map(|&shift| [Some(shift), problem.shift(shift).previous()])
                    .flatten()
                    .collect::<Vec<_>>();
                firsts.sort_unstable();
                firsts.dedup();
                firsts
            }
        };

        for shift in firsts {
            if let Some(next) = problem.shift(shift).next() {
                Self::evaluate_pair(view, shift, next, costs, marks);
            }
        }
    }
}
