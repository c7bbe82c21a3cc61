use rstar::primitives::GeomWithData;
use rstar::{AABB, Envelope, PointDistance, RTree, RTreeObject};

use super::location::Location;
use super::node::NodeIdx;

/// Lon/lat point measured with great-circle distance.
pub struct IndexedPoint {
    location: Location,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.location.lon(), self.location.lat()])
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(
        &self,
        point: &<Self::Envelope as Envelope>::Point,
    ) -> <<Self::Envelope as Envelope>::Point as rstar::Point>::Scalar {
        let distance = self
            .location
            .haversine_distance(&Location::from_lat_lon(point[1], point[0]));
        distance * distance
    }
}

pub type NodeLocationIndexObject = GeomWithData<IndexedPoint, NodeIdx>;

pub struct NodeLocationIndex {
    tree: RTree<NodeLocationIndexObject>,
}

impl NodeLocationIndex {
    pub fn new<'a>(locations: impl Iterator<Item = (NodeIdx, &'a Location)>) -> Self {
        let tree = RTree::bulk_load(
            locations
                .map(|(node, location)| {
                    NodeLocationIndexObject::new(
                        IndexedPoint {
                            location: location.clone(),
                        },
                        node,
                    )
                })
                .collect(),
        );

        NodeLocationIndex { tree }
    }

    /// Nodes ordered by increasing distance to `location`.
    pub fn nearest_neighbor_iter<'a>(
        &'a self,
        location: &Location,
    ) -> impl Iterator<Item = NodeIdx> + 'a {
        self.tree
            .nearest_neighbor_iter(&[location.lon(), location.lat()])
            .map(|geom_with_data| geom_with_data.data)
    }
}
