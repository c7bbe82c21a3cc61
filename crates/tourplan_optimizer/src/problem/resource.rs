use jiff::SignedDuration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::define_index_newtype;

use super::{
    calendar::{CalendarInterval, Scheduled},
    load::ResourceDepot,
    location::Coordinate,
    qualification::{Qualification, Requirement},
};

define_index_newtype!(ResourceIdx, Resource);

/// One working hours interval of a resource with the capabilities it carries during it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkingHours {
    pub interval: CalendarInterval,
    #[serde(default)]
    pub qualifications: Vec<Qualification>,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

impl WorkingHours {
    pub fn new(interval: CalendarInterval) -> Self {
        WorkingHours {
            interval,
            qualifications: Vec::new(),
            requirements: Vec::new(),
        }
    }

    pub fn with_qualification(mut self, qualification: Qualification) -> Self {
        self.qualifications.push(qualification);
        self
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Resource {
    id: String,
    start: Coordinate,
    working_hours: Vec<WorkingHours>,
    /// Per working hours interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_duration: Option<SignedDuration>,
    /// Per working hours interval, in kilometers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_distance_km: Option<f64>,
    #[serde(default = "default_cost_per_km")]
    cost_per_km: f64,
    #[serde(default = "default_cost_per_hour")]
    cost_per_hour: f64,
    #[serde(default)]
    cost_per_stop: f64,
    #[serde(default = "default_speed")]
    average_speed_kmh: f64,
    #[serde(default)]
    fixed_cost: f64,
    #[serde(default)]
    co2_per_km: f64,
    #[serde(default = "default_return")]
    return_to_start: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    depot: Option<ResourceDepot>,
}

fn default_cost_per_km() -> f64 {
    1.0
}

fn default_cost_per_hour() -> f64 {
    1.0
}

fn default_speed() -> f64 {
    50.0
}

fn default_return() -> bool {
    true
}

impl Resource {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn start(&self) -> &Coordinate {
        &self.start
    }

    pub fn working_hours(&self) -> &[WorkingHours] {
        &self.working_hours
    }

    pub fn max_duration(&self) -> Option<SignedDuration> {
        self.max_duration
    }

    pub fn max_distance_km(&self) -> Option<f64> {
        self.max_distance_km
    }

    pub fn cost_per_km(&self) -> f64 {
        self.cost_per_km
    }

    pub fn cost_per_hour(&self) -> f64 {
        self.cost_per_hour
    }

    pub fn cost_per_stop(&self) -> f64 {
        self.cost_per_stop
    }

    pub fn average_speed_kmh(&self) -> f64 {
        self.average_speed_kmh
    }

    pub fn fixed_cost(&self) -> f64 {
        self.fixed_cost
    }

    pub fn co2_per_km(&self) -> f64 {
        self.co2_per_km
    }

    pub fn return_to_start(&self) -> bool {
        self.return_to_start
    }

    pub fn depot(&self) -> Option<&ResourceDepot> {
        self.depot.as_ref()
    }

    /// Travel time for a distance at the average speed.
    pub fn travel_duration(&self, distance_meters: f64) -> SignedDuration {
        if distance_meters <= 0.0 {
            return SignedDuration::ZERO;
        }
        let hours = distance_meters / 1000.0 / self.average_speed_kmh;
        SignedDuration::from_secs_f64(hours * 3600.0)
    }
}

pub struct ResourceBuilder {
    id: String,
    start: Coordinate,
    working_hours: Vec<WorkingHours>,
    max_duration: Option<SignedDuration>,
    max_distance_km: Option<f64>,
    cost_per_km: Option<f64>,
    cost_per_hour: Option<f64>,
    cost_per_stop: Option<f64>,
    average_speed_kmh: Option<f64>,
    fixed_cost: Option<f64>,
    co2_per_km: Option<f64>,
    return_to_start: Option<bool>,
    depot: Option<ResourceDepot>,
}

impl ResourceBuilder {
    pub fn new(id: impl Into<String>, start: Coordinate) -> Self {
        ResourceBuilder {
            id: id.into(),
            start,
            working_hours: Vec::new(),
            max_duration: None,
            max_distance_km: None,
            cost_per_km: None,
            cost_per_hour: None,
            cost_per_stop: None,
            average_speed_kmh: None,
            fixed_cost: None,
            co2_per_km: None,
            return_to_start: None,
            depot: None,
        }
    }

    pub fn add_working_hours(&mut self, working_hours: WorkingHours) -> &mut ResourceBuilder {
        self.working_hours.push(working_hours);
        self
    }

    pub fn set_max_duration(&mut self, duration: SignedDuration) -> &mut ResourceBuilder {
        self.max_duration = Some(duration);
        self
    }

    pub fn set_max_distance_km(&mut self, distance: f64) -> &mut ResourceBuilder {
        self.max_distance_km = Some(distance);
        self
    }

    pub fn set_cost_per_km(&mut self, cost: f64) -> &mut ResourceBuilder {
        self.cost_per_km = Some(cost);
        self
    }

    pub fn set_cost_per_hour(&mut self, cost: f64) -> &mut ResourceBuilder {
        self.cost_per_hour = Some(cost);
        self
    }

    pub fn set_cost_per_stop(&mut self, cost: f64) -> &mut ResourceBuilder {
        self.cost_per_stop = Some(cost);
        self
    }

    pub fn set_average_speed_kmh(&mut self, speed: f64) -> &mut ResourceBuilder {
        self.average_speed_kmh = Some(speed);
        self
    }

    pub fn set_fixed_cost(&mut self, cost: f64) -> &mut ResourceBuilder {
        self.fixed_cost = Some(cost);
        self
    }

    pub fn set_co2_per_km(&mut self, co2: f64) -> &mut ResourceBuilder {
        self.co2_per_km = Some(co2);
        self
    }

    pub fn set_return_to_start(&mut self, value: bool) -> &mut ResourceBuilder {
        self.return_to_start = Some(value);
        self
    }

    pub fn set_depot(&mut self, depot: ResourceDepot) -> &mut ResourceBuilder {
        self.depot = Some(depot);
        self
    }

    pub fn build(self) -> Resource {
        Resource {
            id: self.id,
            start: self.start,
            working_hours: self.working_hours,
            max_duration: self.max_duration,
            max_distance_km: self.max_distance_km,
            cost_per_km: self.cost_per_km.unwrap_or_else(default_cost_per_km),
            cost_per_hour: self.cost_per_hour.unwrap_or_else(default_cost_per_hour),
            cost_per_stop: self.cost_per_stop.unwrap_or(0.0),
            average_speed_kmh: self.average_speed_kmh.unwrap_or_else(default_speed),
            fixed_cost: self.fixed_cost.unwrap_or(0.0),
            co2_per_km: self.co2_per_km.unwrap_or(0.0),
            return_to_start: self.return_to_start.unwrap_or_else(default_return),
            depot: self.depot,
        }
    }
}

impl Scheduled for Resource {
    fn calendar(&self) -> impl Iterator<Item = &CalendarInterval> {
        self.working_hours.iter().map(|working_hours| &working_hours.interval)
    }
}
