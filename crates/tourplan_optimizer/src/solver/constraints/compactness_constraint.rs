use crate::{
    problem::location::Location,
    solver::{
        cost_model::{CostComponent, CostVector},
        violation::ViolationSet,
    },
};

use super::route_constraint::{RouteConstraint, RouteContext};

/// Mean distance in km between the visits and their centroid.
#[derive(Clone)]
pub struct CompactnessConstraint;

impl RouteConstraint for CompactnessConstraint {
    fn evaluate(&self, context: &RouteContext, costs: &mut CostVector, _marks: &mut [ViolationSet]) {
        let visits = &context.schedule.visits;
        if visits.len() < 2 {
            return;
        }

        let locations = visits
            .iter()
            .map(|visit| context.problem.location(context.problem.node_location(visit.node)))
            .collect::<Vec<_>>();

        let count = locations.len() as f64;
        let (lat, lon) = locations.iter().fold((0.0, 0.0), |(lat, lon), location| {
            (lat + location.lat(), lon + location.lon())
        });
        let centroid = Location::from_lat_lon(lat / count, lon / count);

        let spread = locations
            .iter()
            .map(|location| location.haversine_distance(&centroid))
            .sum::<f64>()
            / count;

        costs.add_soft(CostComponent::Compactness, spread / 1000.0);
    }
}
