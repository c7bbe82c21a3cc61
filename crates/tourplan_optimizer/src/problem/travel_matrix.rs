use super::location::{Location, LocationIdx};

/// Flat haversine distance matrix in meters. `index = from * num_locations + to`.
pub struct TravelMatrix {
    distances: Vec<f64>,
    num_locations: usize,
}

impl TravelMatrix {
    pub fn from_locations(locations: &[Location]) -> Self {
        let num_locations = locations.len();
        let mut distances = vec![0.0; num_locations * num_locations];

        for (i, from) in locations.iter().enumerate() {
            for (j, to) in locations.iter().enumerate().skip(i + 1) {
                let distance = from.haversine_distance(to);
                distances[i * num_locations + j] = distance;
                distances[j * num_locations + i] = distance;
            }
        }

        TravelMatrix {
            distances,
            num_locations,
        }
    }

    #[inline(always)]
    pub fn distance(&self, from: LocationIdx, to: LocationIdx) -> f64 {
        self.distances[from.get() * self.num_locations + to.get()]
    }

    pub fn num_locations(&self) -> usize {
        self.num_locations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_distances() {
        let matrix = TravelMatrix::from_locations(&[
            Location::from_lat_lon(50.9333, 6.95),
            Location::from_lat_lon(50.775346, 6.083887),
            Location::from_lat_lon(51.2277, 6.7735),
        ]);

        assert_eq!(matrix.num_locations(), 3);
        assert_eq!(matrix.distance(0.into(), 0.into()), 0.0);
        assert_eq!(
            matrix.distance(0.into(), 2.into()),
            matrix.distance(2.into(), 0.into())
        );
        assert!(matrix.distance(0.into(), 1.into()) > 0.0);
    }
}
