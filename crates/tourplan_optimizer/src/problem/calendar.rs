use std::cmp;

use jiff::{SignedDuration, Timestamp, Zoned, tz::TimeZone};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::error::CalendarError;

/// Opening or working hours interval. `start < end` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "RawCalendarInterval")]
pub struct CalendarInterval {
    start: Timestamp,
    end: Timestamp,
    #[serde(default)]
    available_for_stay: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

#[derive(Deserialize, JsonSchema)]
struct RawCalendarInterval {
    start: Timestamp,
    end: Timestamp,
    #[serde(default)]
    available_for_stay: bool,
    #[serde(default)]
    time_zone: Option<String>,
}

impl TryFrom<RawCalendarInterval> for CalendarInterval {
    type Error = CalendarError;

    fn try_from(raw: RawCalendarInterval) -> Result<Self, Self::Error> {
        let mut interval = CalendarInterval::new(raw.start, raw.end)?;
        interval.available_for_stay = raw.available_for_stay;
        if let Some(time_zone) = raw.time_zone {
            interval = interval.with_time_zone(time_zone)?;
        }
        Ok(interval)
    }
}

impl CalendarInterval {
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, CalendarError> {
        if start >= end {
            return Err(CalendarError::EmptyInterval { start, end });
        }

        Ok(CalendarInterval {
            start,
            end,
            available_for_stay: false,
            time_zone: None,
        })
    }

    pub fn from_iso(start: &str, end: &str) -> Result<Self, CalendarError> {
        let start: Timestamp = start
            .parse()
            .map_err(|_| CalendarError::InvalidTimestamp(start.to_owned()))?;
        let end: Timestamp = end
            .parse()
            .map_err(|_| CalendarError::InvalidTimestamp(end.to_owned()))?;
        CalendarInterval::new(start, end)
    }

    pub fn with_stay(mut self, available_for_stay: bool) -> Self {
        self.available_for_stay = available_for_stay;
        self
    }

    pub fn with_time_zone(mut self, name: impl Into<String>) -> Result<Self, CalendarError> {
        let name = name.into();
        if TimeZone::get(&name).is_err() {
            return Err(CalendarError::UnknownTimeZone(name));
        }
        self.time_zone = Some(name);
        Ok(self)
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn duration(&self) -> SignedDuration {
        self.end.duration_since(self.start)
    }

    pub fn available_for_stay(&self) -> bool {
        self.available_for_stay
    }

    pub fn time_zone_name(&self) -> Option<&str> {
        self.time_zone.as_deref()
    }

    /// Local wall clock view of an instant in this interval's zone, UTC when none is set.
    pub fn localize(&self, instant: Timestamp) -> Zoned {
        let tz = self
            .time_zone
            .as_deref()
            .and_then(|name| TimeZone::get(name).ok())
            .unwrap_or(TimeZone::UTC);
        instant.to_zoned(tz)
    }

    pub fn contains(&self, instant: Timestamp) -> bool {
        self.start <= instant && instant <= self.end
    }
}

pub fn overlaps(a: &CalendarInterval, b: &CalendarInterval) -> bool {
    a.start < b.end && b.start < a.end
}

/// Implemented by anything that owns opening or working hours.
pub trait Scheduled {
    fn calendar(&self) -> impl Iterator<Item = &CalendarInterval>;
}

/// Intervals of an entity ordered by start.
pub fn intervals_of<S: Scheduled>(entity: &S) -> Vec<CalendarInterval> {
    let mut intervals = entity.calendar().cloned().collect::<Vec<_>>();
    intervals.sort_by_key(|interval| (interval.start, interval.end));
    intervals
}

/// Earliest instant at or after `after` where a visit of `duration` fits entirely inside one interval.
/// Expects `intervals` ordered by start.
pub fn next_feasible_start(
    intervals: &[CalendarInterval],
    after: Timestamp,
    duration: SignedDuration,
) -> Option<Timestamp> {
    intervals.iter().find_map(|interval| {
        let start = cmp::max(after, interval.start);
        if start + duration <= interval.end {
            Some(start)
        } else {
            None
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitSchedule {
    pub start: Timestamp,
    pub waiting: SignedDuration,
    pub lateness: SignedDuration,
}

impl VisitSchedule {
    pub fn is_late(&self) -> bool {
        self.lateness.is_positive()
    }
}

/// Places a visit arriving at `arrival` into the calendar.
///
/// When no interval can hold the visit, the visit starts at the least late
/// position and the overshoot past the interval end is reported as lateness.
/// Returns `None` for an empty calendar.
pub fn schedule_visit(
    intervals: &[CalendarInterval],
    arrival: Timestamp,
    duration: SignedDuration,
) -> Option<VisitSchedule> {
    if let Some(start) = next_feasible_start(intervals, arrival, duration) {
        return Some(VisitSchedule {
            start,
            waiting: start.duration_since(arrival),
            lateness: SignedDuration::ZERO,
        });
    }

    intervals
        .iter()
        .map(|interval| {
            let start = cmp::max(arrival, interval.start);
            let lateness = (start + duration).duration_since(interval.end);
            VisitSchedule {
                start,
                waiting: start.duration_since(arrival),
                lateness,
            }
        })
        .min_by_key(|schedule| (schedule.lateness + schedule.waiting, schedule.start))
}
