use crate::define_index_newtype;

use super::{calendar::CalendarInterval, resource::ResourceIdx};

define_index_newtype!(ShiftIdx, Shift);

/// A resource during one working hours interval. Every shift owns exactly one route.
#[derive(Debug, Clone)]
pub struct Shift {
    pub(crate) resource: ResourceIdx,
    pub(crate) working_hours_index: usize,
    pub(crate) interval: CalendarInterval,
    pub(crate) previous: Option<ShiftIdx>,
    pub(crate) next: Option<ShiftIdx>,
}

impl Shift {
    pub fn resource(&self) -> ResourceIdx {
        self.resource
    }

    pub fn working_hours_index(&self) -> usize {
        self.working_hours_index
    }

    pub fn interval(&self) -> &CalendarInterval {
        &self.interval
    }

    /// Previous shift of the same resource.
    pub fn previous(&self) -> Option<ShiftIdx> {
        self.previous
    }

    /// Next shift of the same resource.
    pub fn next(&self) -> Option<ShiftIdx> {
        self.next
    }

    /// The resource stays at the last visit instead of returning after this shift.
    pub fn ends_with_stay(&self) -> bool {
        self.interval.available_for_stay() && self.next.is_some()
    }
}
