use jiff::SignedDuration;

use crate::solver::{
    cost_model::{CostComponent, CostVector},
    violation::{ViolationClass, ViolationSet},
};

use super::route_constraint::{RouteConstraint, RouteContext};

#[derive(Clone)]
pub struct WorkingHoursConstraint;

impl RouteConstraint for WorkingHoursConstraint {
    fn evaluate(&self, context: &RouteContext, costs: &mut CostVector, marks: &mut [ViolationSet]) {
        let shift = context.problem.shift(context.shift);
        let resource = context.problem.resource_of(context.shift);
        let schedule = context.schedule;
        let shift_end = shift.interval().end();

        let mut exceeded = SignedDuration::ZERO;
        if schedule.end_time > shift_end {
            exceeded += schedule.end_time.duration_since(shift_end);
        }
        if let Some(max_duration) = resource.max_duration()
            && schedule.duration() > max_duration
        {
            exceeded += schedule.duration() - max_duration;
        }

        if !exceeded.is_positive() {
            return;
        }

        costs.add_soft(CostComponent::WorkingHoursExceeded, exceeded.as_secs_f64() / 60.0);

        let limit = match resource.max_duration() {
            Some(max_duration) => shift_end.min(schedule.departure_time + max_duration),
            None => shift_end,
        };
        let mut flagged = false;
        for (visit, mark) in schedule.visits.iter().zip(marks.iter_mut()) {
            if visit.departure > limit {
                mark.insert(ViolationClass::WorkingHoursExceeded);
                flagged = true;
            }
        }

        // Only the return leg is over: blame the last stop.
        if !flagged && let Some(last) = marks.last_mut() {
            last.insert(ViolationClass::WorkingHoursExceeded);
        }
    }
}
