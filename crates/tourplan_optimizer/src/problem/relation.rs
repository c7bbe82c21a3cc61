use jiff::{SignedDuration, Timestamp};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{node::NodeIdx, qualification::MatchOutcome, resource::ResourceIdx, shift::ShiftIdx};

/// Which instant of a visit a time relation is anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Juncture {
    /// Start of service.
    #[default]
    Arrival,
    /// End of service.
    Departure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum RelationKind {
    SameResource,
    SameRoute,
    /// `related anchor - master anchor` must fall inside `[min_deviation, max_deviation]`.
    TimeWindow {
        min_deviation: SignedDuration,
        max_deviation: SignedDuration,
        #[serde(default)]
        master_juncture: Juncture,
        #[serde(default)]
        related_juncture: Juncture,
        /// Compare the absolute deviation, ignoring which node comes first.
        #[serde(default)]
        absolute: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Relation {
    pub master: String,
    pub related: String,
    pub kind: RelationKind,
    #[serde(default)]
    pub hard: bool,
}

impl Relation {
    pub fn same_route(master: impl Into<String>, related: impl Into<String>) -> Self {
        Relation {
            master: master.into(),
            related: related.into(),
            kind: RelationKind::SameRoute,
            hard: false,
        }
    }

    pub fn same_resource(master: impl Into<String>, related: impl Into<String>) -> Self {
        Relation {
            master: master.into(),
            related: related.into(),
            kind: RelationKind::SameResource,
            hard: false,
        }
    }

    pub fn time_window(
        master: impl Into<String>,
        related: impl Into<String>,
        min_deviation: SignedDuration,
        max_deviation: SignedDuration,
    ) -> Self {
        Relation {
            master: master.into(),
            related: related.into(),
            kind: RelationKind::TimeWindow {
                min_deviation,
                max_deviation,
                master_juncture: Juncture::Arrival,
                related_juncture: Juncture::Arrival,
                absolute: false,
            },
            hard: false,
        }
    }

    pub fn hard(mut self) -> Self {
        self.hard = true;
        self
    }
}

/// Where and when a node is currently visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitPlacement {
    pub resource: ResourceIdx,
    pub shift: ShiftIdx,
    pub start: Timestamp,
    pub departure: Timestamp,
}

impl VisitPlacement {
    fn anchor(&self, juncture: Juncture) -> Timestamp {
        match juncture {
            Juncture::Arrival => self.start,
            Juncture::Departure => self.departure,
        }
    }
}

pub trait PlacementLookup {
    fn placement(&self, node: NodeIdx) -> Option<VisitPlacement>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRelation {
    pub master: NodeIdx,
    pub related: NodeIdx,
    pub kind: RelationKind,
    pub hard: bool,
}

impl CompiledRelation {
    pub fn other(&self, node: NodeIdx) -> NodeIdx {
        if node == self.master {
            self.related
        } else {
            self.master
        }
    }
}

/// Relations stored in a side table with a reverse index from node to relation.
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    relations: Vec<CompiledRelation>,
    by_node: Vec<SmallVec<[usize; 2]>>,
}

impl RelationGraph {
    pub fn new(num_nodes: usize) -> Self {
        RelationGraph {
            relations: Vec::new(),
            by_node: vec![SmallVec::new(); num_nodes],
        }
    }

    pub fn add(&mut self, relation: CompiledRelation) {
        let index = self.relations.len();
        self.by_node[relation.master.get()].push(index);
        self.by_node[relation.related.get()].push(index);
        self.relations.push(relation);
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn relations(&self) -> &[CompiledRelation] {
        &self.relations
    }

    pub fn relation(&self, index: usize) -> &CompiledRelation {
        &self.relations[index]
    }

    pub fn relations_of(&self, node: NodeIdx) -> &[usize] {
        &self.by_node[node.get()]
    }

    pub fn neighbours(&self, node: NodeIdx) -> impl Iterator<Item = NodeIdx> + '_ {
        self.relations_of(node)
            .iter()
            .map(move |&index| self.relations[index].other(node))
    }

    pub fn has_relations(&self, node: NodeIdx) -> bool {
        !self.by_node[node.get()].is_empty()
    }
}

/// Checks a relation against the current placements.
///
/// A relation with an unplanned side is not evaluated; the unassigned
/// penalty already covers that node.
pub fn check_relation(relation: &CompiledRelation, lookup: &impl PlacementLookup) -> MatchOutcome {
    let (Some(master), Some(related)) = (
        lookup.placement(relation.master),
        lookup.placement(relation.related),
    ) else {
        return MatchOutcome::SATISFIED;
    };

    let cost = match &relation.kind {
        RelationKind::SameResource => {
            if master.resource == related.resource {
                0.0
            } else {
                1.0
            }
        }
        RelationKind::SameRoute => {
            if master.shift == related.shift {
                0.0
            } else {
                1.0
            }
        }
        RelationKind::TimeWindow {
            min_deviation,
            max_deviation,
            master_juncture,
            related_juncture,
            absolute,
        } => {
            let mut deviation = related
                .anchor(*related_juncture)
                .duration_since(master.anchor(*master_juncture));
            if *absolute {
                deviation = deviation.abs();
            }

            let overshoot = if deviation < *min_deviation {
                *min_deviation - deviation
            } else if deviation > *max_deviation {
                deviation - *max_deviation
            } else {
                SignedDuration::ZERO
            };

            overshoot.as_secs_f64() / 60.0
        }
    };

    if cost > 0.0 {
        MatchOutcome {
            feasible: !relation.hard,
            satisfied: false,
            cost,
        }
    } else {
        MatchOutcome::SATISFIED
    }
}

#[cfg(test)]
mod tests {
    use fxhash::FxHashMap;

    use super::*;

    struct Placements(FxHashMap<NodeIdx, VisitPlacement>);

    impl PlacementLookup for Placements {
        fn placement(&self, node: NodeIdx) -> Option<VisitPlacement> {
            self.0.get(&node).copied()
        }
    }

    fn placement(resource: usize, shift: usize, start: &str, minutes: i64) -> VisitPlacement {
        let start: Timestamp = start.parse().unwrap();
        VisitPlacement {
            resource: ResourceIdx::new(resource),
            shift: ShiftIdx::new(shift),
            start,
            departure: start + SignedDuration::from_mins(minutes),
        }
    }

    fn relation(kind: RelationKind, hard: bool) -> CompiledRelation {
        CompiledRelation {
            master: NodeIdx::new(0),
            related: NodeIdx::new(1),
            kind,
            hard,
        }
    }

    #[test]
    fn test_same_route() {
        let mut placements = FxHashMap::default();
        placements.insert(NodeIdx::new(0), placement(0, 0, "2025-06-10T08:00:00Z", 10));
        placements.insert(NodeIdx::new(1), placement(0, 1, "2025-06-11T08:00:00Z", 10));
        let lookup = Placements(placements);

        let same_route = check_relation(&relation(RelationKind::SameRoute, false), &lookup);
        assert!(same_route.feasible);
        assert!(!same_route.satisfied);
        assert_eq!(same_route.cost, 1.0);

        let same_resource = check_relation(&relation(RelationKind::SameResource, true), &lookup);
        assert!(same_resource.satisfied);

        let hard_route = check_relation(&relation(RelationKind::SameRoute, true), &lookup);
        assert!(!hard_route.feasible);
    }

    #[test]
    fn test_time_window_overshoot() {
        let mut placements = FxHashMap::default();
        placements.insert(NodeIdx::new(0), placement(0, 0, "2025-06-10T08:00:00Z", 30));
        placements.insert(NodeIdx::new(1), placement(1, 1, "2025-06-10T10:00:00Z", 30));
        let lookup = Placements(placements);

        let kind = RelationKind::TimeWindow {
            min_deviation: SignedDuration::ZERO,
            max_deviation: SignedDuration::from_hours(1),
            master_juncture: Juncture::Departure,
            related_juncture: Juncture::Arrival,
            absolute: false,
        };
        let outcome = check_relation(&relation(kind, false), &lookup);
        assert_eq!(outcome.cost, 30.0);

        let kind = RelationKind::TimeWindow {
            min_deviation: SignedDuration::from_hours(3),
            max_deviation: SignedDuration::from_hours(4),
            master_juncture: Juncture::Arrival,
            related_juncture: Juncture::Arrival,
            absolute: true,
        };
        let outcome = check_relation(&relation(kind, false), &lookup);
        assert_eq!(outcome.cost, 60.0);
    }

    #[test]
    fn test_unplanned_side_is_ignored() {
        let mut placements = FxHashMap::default();
        placements.insert(NodeIdx::new(0), placement(0, 0, "2025-06-10T08:00:00Z", 30));
        let lookup = Placements(placements);

        assert_eq!(
            check_relation(&relation(RelationKind::SameRoute, true), &lookup),
            MatchOutcome::SATISFIED
        );
    }

    #[test]
    fn test_reverse_index() {
        let mut graph = RelationGraph::new(3);
        graph.add(relation(RelationKind::SameRoute, false));
        graph.add(CompiledRelation {
            master: NodeIdx::new(2),
            related: NodeIdx::new(1),
            kind: RelationKind::SameResource,
            hard: false,
        });

        assert_eq!(graph.relations_of(NodeIdx::new(1)), &[0, 1]);
        assert_eq!(
            graph.neighbours(NodeIdx::new(1)).collect::<Vec<_>>(),
            vec![NodeIdx::new(0), NodeIdx::new(2)]
        );
        assert!(graph.has_relations(NodeIdx::new(0)));
    }
}
