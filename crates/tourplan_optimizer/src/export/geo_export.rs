use geo::{Coord, LineString};
use serde::Serialize;

use crate::{problem::location::Coordinate, solver::optimization_result::OptimizationResult};

/// Polyline of one route for map rendering.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RouteGeometry {
    pub resource_id: String,
    pub working_hours_index: usize,
    pub line: LineString<f64>,
}

fn to_coord(coordinate: &Coordinate) -> Coord<f64> {
    Coord {
        x: coordinate.lon,
        y: coordinate.lat,
    }
}

/// Start, visits and end of every route, as lon/lat line strings.
pub fn route_geometries(result: &OptimizationResult) -> Vec<RouteGeometry> {
    result
        .routes
        .iter()
        .map(|route| {
            let mut coords = Vec::with_capacity(route.visits.len() + 2);
            coords.push(to_coord(&route.start_coordinate));
            coords.extend(route.visits.iter().map(|visit| to_coord(&visit.coordinate)));
            if route.end_coordinate != route.visits.last().map_or(route.start_coordinate, |visit| visit.coordinate) {
                coords.push(to_coord(&route.end_coordinate));
            }

            RouteGeometry {
                resource_id: route.resource_id.clone(),
                working_hours_index: route.working_hours_index,
                line: LineString::new(coords),
            }
        })
        .collect()
}
