use fixedbitset::FixedBitSet;
use fxhash::{FxHashMap, FxHashSet};
use jiff::SignedDuration;
use smallvec::SmallVec;
use tracing::{debug, instrument};

use crate::utils::enumerate_idx::EnumerateIdx;

use super::{
    calendar::{CalendarInterval, intervals_of, overlaps},
    error::ConfigurationError,
    load::{Good, GoodIdx, LoadKind},
    location::{Location, LocationIdx},
    node::{Node, NodeIdx},
    node_location_index::NodeLocationIndex,
    qualification::{MatchSummary, QualificationDictionary, find_contradiction},
    relation::{CompiledRelation, Relation, RelationGraph},
    resource::{Resource, ResourceIdx},
    shift::{Shift, ShiftIdx},
    travel_matrix::TravelMatrix,
};

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledLoad {
    pub good: GoodIdx,
    pub kind: LoadKind,
    pub fuzzy: bool,
    pub priority: u32,
}

/// Resource capacity pools laid out per good of the problem.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDepot {
    pub initial_levels: SmallVec<[f64; 4]>,
    pub max_capacities: SmallVec<[f64; 4]>,
    pub space_factors: SmallVec<[f64; 4]>,
    pub total_capacity: f64,
}

impl CompiledDepot {
    pub fn initial_volume(&self) -> f64 {
        self.initial_levels
            .iter()
            .zip(&self.space_factors)
            .map(|(level, factor)| level * factor)
            .sum()
    }
}

/// Validated, indexed and read-only view of everything a run needs.
pub struct OptimizationProblem {
    nodes: Vec<Node>,
    resources: Vec<Resource>,
    shifts: Vec<Shift>,
    shifts_by_resource: Vec<Vec<ShiftIdx>>,
    node_calendars: Vec<Vec<CalendarInterval>>,
    locations: Vec<Location>,
    travel_matrix: TravelMatrix,
    goods: Vec<Good>,
    node_loads: Vec<Vec<CompiledLoad>>,
    depots: Vec<CompiledDepot>,
    relations: RelationGraph,
    raw_relations: Vec<Relation>,
    dictionary: QualificationDictionary,
    /// Flat `node * num_shifts + shift` matcher summaries.
    matches: Vec<MatchSummary>,
    /// Compatible shifts per node, nearest resource start first.
    candidate_shifts: Vec<Vec<ShiftIdx>>,
    compatible: Vec<FixedBitSet>,
    node_location_index: NodeLocationIndex,
    nodes_without_hours: Vec<NodeIdx>,
    node_ids: FxHashMap<String, NodeIdx>,
    resource_ids: FxHashMap<String, ResourceIdx>,
    has_loads: bool,
}

impl OptimizationProblem {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, node: NodeIdx) -> &Node {
        &self.nodes[node]
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn resource(&self, resource: ResourceIdx) -> &Resource {
        &self.resources[resource]
    }

    pub fn shifts(&self) -> &[Shift] {
        &self.shifts
    }

    pub fn shift(&self, shift: ShiftIdx) -> &Shift {
        &self.shifts[shift]
    }

    pub fn num_shifts(&self) -> usize {
        self.shifts.len()
    }

    pub fn shifts_of(&self, resource: ResourceIdx) -> &[ShiftIdx] {
        &self.shifts_by_resource[resource.get()]
    }

    pub fn resource_of(&self, shift: ShiftIdx) -> &Resource {
        &self.resources[self.shifts[shift].resource]
    }

    /// Opening hours of a node ordered by start.
    pub fn node_calendar(&self, node: NodeIdx) -> &[CalendarInterval] {
        &self.node_calendars[node.get()]
    }

    pub fn location(&self, location: LocationIdx) -> &Location {
        &self.locations[location]
    }

    pub fn node_location(&self, node: NodeIdx) -> LocationIdx {
        LocationIdx::new(node.get())
    }

    pub fn resource_location(&self, resource: ResourceIdx) -> LocationIdx {
        LocationIdx::new(self.nodes.len() + resource.get())
    }

    #[inline(always)]
    pub fn distance(&self, from: LocationIdx, to: LocationIdx) -> f64 {
        self.travel_matrix.distance(from, to)
    }

    pub fn travel_duration(&self, resource: ResourceIdx, from: LocationIdx, to: LocationIdx) -> SignedDuration {
        self.resources[resource].travel_duration(self.distance(from, to))
    }

    pub fn goods(&self) -> &[Good] {
        &self.goods
    }

    pub fn node_loads(&self, node: NodeIdx) -> &[CompiledLoad] {
        &self.node_loads[node.get()]
    }

    pub fn depot(&self, resource: ResourceIdx) -> &CompiledDepot {
        &self.depots[resource.get()]
    }

    pub fn has_loads(&self) -> bool {
        self.has_loads
    }

    pub fn relations(&self) -> &RelationGraph {
        &self.relations
    }

    pub fn raw_relations(&self) -> &[Relation] {
        &self.raw_relations
    }

    pub fn dictionary(&self) -> &QualificationDictionary {
        &self.dictionary
    }

    pub fn match_summary(&self, node: NodeIdx, shift: ShiftIdx) -> &MatchSummary {
        &self.matches[node.get() * self.shifts.len() + shift.get()]
    }

    /// Hard requirements on both sides hold and the node can be scheduled at all.
    pub fn is_compatible(&self, node: NodeIdx, shift: ShiftIdx) -> bool {
        self.compatible[node.get()].contains(shift.get())
    }

    pub fn candidate_shifts(&self, node: NodeIdx) -> &[ShiftIdx] {
        &self.candidate_shifts[node.get()]
    }

    pub fn node_location_index(&self) -> &NodeLocationIndex {
        &self.node_location_index
    }

    pub fn nodes_without_hours(&self) -> &[NodeIdx] {
        &self.nodes_without_hours
    }

    pub fn has_opening_hours(&self, node: NodeIdx) -> bool {
        !self.node_calendars[node.get()].is_empty()
    }

    pub fn node_by_id(&self, id: &str) -> Option<NodeIdx> {
        self.node_ids.get(id).copied()
    }

    pub fn resource_by_id(&self, id: &str) -> Option<ResourceIdx> {
        self.resource_ids.get(id).copied()
    }

    pub fn shift_of(&self, resource: ResourceIdx, working_hours_index: usize) -> Option<ShiftIdx> {
        self.shifts_of(resource)
            .iter()
            .copied()
            .find(|&shift| self.shifts[shift].working_hours_index == working_hours_index)
    }
}

#[derive(Default)]
pub struct OptimizationProblemBuilder {
    nodes: Vec<Node>,
    resources: Vec<Resource>,
    relations: Vec<Relation>,
}

impl OptimizationProblemBuilder {
    pub fn add_node(&mut self, node: Node) -> &mut OptimizationProblemBuilder {
        self.nodes.push(node);
        self
    }

    pub fn add_resource(&mut self, resource: Resource) -> &mut OptimizationProblemBuilder {
        self.resources.push(resource);
        self
    }

    pub fn add_relation(&mut self, relation: Relation) -> &mut OptimizationProblemBuilder {
        self.relations.push(relation);
        self
    }

    pub fn set_nodes(&mut self, nodes: Vec<Node>) -> &mut OptimizationProblemBuilder {
        self.nodes = nodes;
        self
    }

    pub fn set_resources(&mut self, resources: Vec<Resource>) -> &mut OptimizationProblemBuilder {
        self.resources = resources;
        self
    }

    pub fn set_relations(&mut self, relations: Vec<Relation>) -> &mut OptimizationProblemBuilder {
        self.relations = relations;
        self
    }

    #[instrument(skip_all, level = "debug")]
    pub fn build(self) -> Result<OptimizationProblem, ConfigurationError> {
        let node_ids = index_nodes(&self.nodes)?;
        let resource_ids = index_resources(&self.resources)?;

        for node in &self.nodes {
            validate_node(node)?;
        }
        for resource in &self.resources {
            validate_resource(resource)?;
        }

        let (shifts, shifts_by_resource) = build_shifts(&self.resources);

        let node_calendars = self
            .nodes
            .iter()
            .map(intervals_of)
            .collect::<Vec<_>>();
        let nodes_without_hours = node_calendars
            .iter()
            .enumerate_idx::<NodeIdx>()
            .filter(|(_, calendar)| calendar.is_empty())
            .map(|(node, _)| node)
            .collect::<Vec<_>>();

        let locations = self
            .nodes
            .iter()
            .map(|node| Location::from(node.coordinate()))
            .chain(
                self.resources
                    .iter()
                    .map(|resource| Location::from(resource.start())),
            )
            .collect::<Vec<_>>();
        let travel_matrix = TravelMatrix::from_locations(&locations);
        let node_location_index = NodeLocationIndex::new(
            locations
                .iter()
                .take(self.nodes.len())
                .enumerate()
                .map(|(index, location)| (NodeIdx::new(index), location)),
        );

        let (goods, node_loads, depots) = compile_loads(&self.nodes, &self.resources);

        let mut relations = RelationGraph::new(self.nodes.len());
        for relation in &self.relations {
            let master = *node_ids
                .get(&relation.master)
                .ok_or_else(|| ConfigurationError::UnknownRelationNode(relation.master.clone()))?;
            let related = *node_ids
                .get(&relation.related)
                .ok_or_else(|| ConfigurationError::UnknownRelationNode(relation.related.clone()))?;
            if master == related {
                return Err(ConfigurationError::SelfRelation(relation.master.clone()));
            }
            relations.add(CompiledRelation {
                master,
                related,
                kind: relation.kind.clone(),
                hard: relation.hard,
            });
        }

        let mut dictionary = QualificationDictionary::default();
        for node in &self.nodes {
            dictionary.register_offer(node.qualifications());
            dictionary.register_requirements(node.requirements());
        }
        for resource in &self.resources {
            for working_hours in resource.working_hours() {
                dictionary.register_offer(&working_hours.qualifications);
                dictionary.register_requirements(&working_hours.requirements);
            }
        }

        let shift_offers = shifts
            .iter()
            .map(|shift| {
                let working_hours =
                    &self.resources[shift.resource].working_hours()[shift.working_hours_index];
                (
                    dictionary.compile_offer(&working_hours.qualifications),
                    dictionary.compile_requirements(&working_hours.requirements),
                )
            })
            .collect::<Vec<_>>();

        let mut matches = Vec::with_capacity(self.nodes.len() * shifts.len());
        let mut compatible = Vec::with_capacity(self.nodes.len());
        let mut candidate_shifts = Vec::with_capacity(self.nodes.len());

        for (node_id, node) in self.nodes.iter().enumerate_idx::<NodeIdx>() {
            let node_requirements = dictionary.compile_requirements(node.requirements());
            let node_offer = dictionary.compile_offer(node.qualifications());
            let mut bits = FixedBitSet::with_capacity(shifts.len());

            for shift_id in ShiftIdx::range(shifts.len()) {
                let (shift_offer, shift_requirements) = &shift_offers[shift_id.get()];
                let summary = node_requirements
                    .match_offer(shift_offer, &dictionary)
                    .merge(shift_requirements.match_offer(&node_offer, &dictionary));

                if summary.feasible && !node_calendars[node_id.get()].is_empty() {
                    bits.insert(shift_id.get());
                }
                matches.push(summary);
            }

            let node_location = LocationIdx::new(node_id.get());
            let mut candidates = bits.ones().map(ShiftIdx::new).collect::<Vec<_>>();
            candidates.sort_by(|&a, &b| {
                let from_a = LocationIdx::new(self.nodes.len() + shifts[a].resource.get());
                let from_b = LocationIdx::new(self.nodes.len() + shifts[b].resource.get());
                travel_matrix
                    .distance(from_a, node_location)
                    .total_cmp(&travel_matrix.distance(from_b, node_location))
                    .then_with(|| {
                        let overlap_a = time_overlap(&node_calendars[node_id.get()], &shifts[a]);
                        let overlap_b = time_overlap(&node_calendars[node_id.get()], &shifts[b]);
                        overlap_b.cmp(&overlap_a)
                    })
                    .then_with(|| a.cmp(&b))
            });

            compatible.push(bits);
            candidate_shifts.push(candidates);
        }

        debug!(
            nodes = self.nodes.len(),
            resources = self.resources.len(),
            shifts = shifts.len(),
            relations = relations.len(),
            goods = goods.len(),
            "Problem indexed"
        );

        Ok(OptimizationProblem {
            has_loads: node_loads.iter().any(|loads| !loads.is_empty()),
            nodes: self.nodes,
            resources: self.resources,
            shifts,
            shifts_by_resource,
            node_calendars,
            locations,
            travel_matrix,
            goods,
            node_loads,
            depots,
            relations,
            raw_relations: self.relations,
            dictionary,
            matches,
            candidate_shifts,
            compatible,
            node_location_index,
            nodes_without_hours,
            node_ids,
            resource_ids,
        })
    }
}

fn time_overlap(calendar: &[CalendarInterval], shift: &Shift) -> bool {
    calendar
        .iter()
        .any(|interval| overlaps(interval, &shift.interval))
}

fn index_nodes(nodes: &[Node]) -> Result<FxHashMap<String, NodeIdx>, ConfigurationError> {
    let mut ids = FxHashMap::default();
    for (index, node) in nodes.iter().enumerate_idx::<NodeIdx>() {
        if ids.insert(node.id().to_owned(), index).is_some() {
            return Err(ConfigurationError::DuplicateNode(node.id().to_owned()));
        }
    }
    Ok(ids)
}

fn index_resources(
    resources: &[Resource],
) -> Result<FxHashMap<String, ResourceIdx>, ConfigurationError> {
    let mut ids = FxHashMap::default();
    for (index, resource) in resources.iter().enumerate_idx::<ResourceIdx>() {
        if ids.insert(resource.id().to_owned(), index).is_some() {
            return Err(ConfigurationError::DuplicateResource(
                resource.id().to_owned(),
            ));
        }
    }
    Ok(ids)
}

fn validate_node(node: &Node) -> Result<(), ConfigurationError> {
    let invalid = |field| ConfigurationError::InvalidNode {
        node: node.id().to_owned(),
        field,
    };

    if !node.coordinate().is_valid() {
        return Err(invalid("coordinate"));
    }
    if node.visit_duration().is_negative() {
        return Err(invalid("visit duration"));
    }
    if node.importance() == 0 {
        return Err(invalid("importance"));
    }
    if let Some(tag) = find_contradiction(node.requirements()) {
        return Err(ConfigurationError::ContradictoryRequirements {
            owner: node.id().to_owned(),
            tag,
        });
    }
    if let Some(depot) = node.depot() {
        for load in &depot.loads {
            load.validate()
                .map_err(|reason| ConfigurationError::InvalidLoad {
                    node: node.id().to_owned(),
                    good: load.good.clone(),
                    reason,
                })?;
        }
    }
    Ok(())
}

fn validate_resource(resource: &Resource) -> Result<(), ConfigurationError> {
    let invalid = |field| ConfigurationError::InvalidResource {
        resource: resource.id().to_owned(),
        field,
    };

    if resource.working_hours().is_empty() {
        return Err(ConfigurationError::NoWorkingHours(resource.id().to_owned()));
    }
    if !resource.start().is_valid() {
        return Err(invalid("start coordinate"));
    }
    if !(resource.average_speed_kmh().is_finite() && resource.average_speed_kmh() > 0.0) {
        return Err(invalid("average speed"));
    }
    for (field, value) in [
        ("cost per km", resource.cost_per_km()),
        ("cost per hour", resource.cost_per_hour()),
        ("cost per stop", resource.cost_per_stop()),
        ("fixed cost", resource.fixed_cost()),
        ("co2 per km", resource.co2_per_km()),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(invalid(field));
        }
    }
    if resource.max_duration().is_some_and(|d| !d.is_positive()) {
        return Err(invalid("max duration"));
    }
    if resource
        .max_distance_km()
        .is_some_and(|d| !d.is_finite() || d <= 0.0)
    {
        return Err(invalid("max distance"));
    }

    let working_hours = resource.working_hours();
    for (first, a) in working_hours.iter().enumerate() {
        for (second, b) in working_hours.iter().enumerate().skip(first + 1) {
            if overlaps(&a.interval, &b.interval) {
                return Err(ConfigurationError::OverlappingWorkingHours {
                    resource: resource.id().to_owned(),
                    first,
                    second,
                });
            }
        }
        if let Some(tag) = find_contradiction(&a.requirements) {
            return Err(ConfigurationError::ContradictoryRequirements {
                owner: resource.id().to_owned(),
                tag,
            });
        }
    }

    if let Some(depot) = resource.depot() {
        if !depot.total_capacity.is_finite() || depot.total_capacity < 0.0 {
            return Err(ConfigurationError::InvalidCapacity {
                resource: resource.id().to_owned(),
                good: String::from("*"),
                reason: "total capacity must be a non-negative number",
            });
        }
        let mut seen = FxHashSet::default();
        for capacity in &depot.capacities {
            capacity
                .validate()
                .map_err(|reason| ConfigurationError::InvalidCapacity {
                    resource: resource.id().to_owned(),
                    good: capacity.good.clone(),
                    reason,
                })?;
            if !seen.insert(capacity.good.as_str()) {
                return Err(ConfigurationError::InvalidCapacity {
                    resource: resource.id().to_owned(),
                    good: capacity.good.clone(),
                    reason: "good declared twice",
                });
            }
        }
        if depot.initial_volume() > depot.total_capacity {
            return Err(ConfigurationError::InvalidCapacity {
                resource: resource.id().to_owned(),
                good: String::from("*"),
                reason: "initial levels exceed total capacity",
            });
        }
    }

    Ok(())
}

fn build_shifts(resources: &[Resource]) -> (Vec<Shift>, Vec<Vec<ShiftIdx>>) {
    let mut shifts = Vec::new();
    let mut shifts_by_resource = Vec::with_capacity(resources.len());

    for (resource_id, resource) in resources.iter().enumerate_idx::<ResourceIdx>() {
        let mut order = (0..resource.working_hours().len()).collect::<Vec<_>>();
        order.sort_by_key(|&index| resource.working_hours()[index].interval.start());

        let first = shifts.len();
        let mut ids = Vec::with_capacity(order.len());
        for (position, &working_hours_index) in order.iter().enumerate() {
            let id = ShiftIdx::new(first + position);
            shifts.push(Shift {
                resource: resource_id,
                working_hours_index,
                interval: resource.working_hours()[working_hours_index]
                    .interval
                    .clone(),
                previous: position.checked_sub(1).map(|p| ShiftIdx::new(first + p)),
                next: (position + 1 < order.len()).then(|| ShiftIdx::new(first + position + 1)),
            });
            ids.push(id);
        }
        shifts_by_resource.push(ids);
    }

    (shifts, shifts_by_resource)
}

type CompiledLoads = (Vec<Good>, Vec<Vec<CompiledLoad>>, Vec<CompiledDepot>);

fn compile_loads(nodes: &[Node], resources: &[Resource]) -> CompiledLoads {
    let mut goods: Vec<Good> = Vec::new();
    let mut good_ids: FxHashMap<String, GoodIdx> = FxHashMap::default();
    let mut good_of = |name: &str| -> GoodIdx {
        if let Some(&id) = good_ids.get(name) {
            return id;
        }
        let id = GoodIdx::new(goods.len());
        goods.push(Good::new(name));
        good_ids.insert(name.to_owned(), id);
        id
    };

    let mut node_loads = Vec::with_capacity(nodes.len());
    for node in nodes {
        let loads = node
            .depot()
            .map(|depot| {
                depot
                    .loads
                    .iter()
                    .map(|load| CompiledLoad {
                        good: good_of(&load.good),
                        kind: load.kind.clone(),
                        fuzzy: load.fuzzy,
                        priority: load.priority.max(1),
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        node_loads.push(loads);
    }

    let capacities = resources
        .iter()
        .map(|resource| {
            resource
                .depot()
                .map(|depot| {
                    depot
                        .capacities
                        .iter()
                        .map(|capacity| (good_of(&capacity.good), capacity.clone()))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        })
        .collect::<Vec<_>>();

    let num_goods = goods.len();
    let depots = resources
        .iter()
        .zip(capacities)
        .map(|(resource, capacities)| {
            let mut depot = CompiledDepot {
                initial_levels: SmallVec::from_elem(0.0, num_goods),
                max_capacities: SmallVec::from_elem(0.0, num_goods),
                space_factors: SmallVec::from_elem(1.0, num_goods),
                total_capacity: resource
                    .depot()
                    .map(|depot| depot.total_capacity)
                    .unwrap_or(0.0),
            };
            for (good, capacity) in capacities {
                depot.initial_levels[good.get()] = capacity.initial_level;
                depot.max_capacities[good.get()] = capacity.max_capacity;
                depot.space_factors[good.get()] = capacity.space_factor;
            }
            depot
        })
        .collect::<Vec<_>>();

    (goods, node_loads, depots)
}
