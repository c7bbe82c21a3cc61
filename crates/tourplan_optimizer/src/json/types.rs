use std::path::Path;

use fxhash::FxHashSet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    problem::{
        node::{Node, NodeIdx},
        optimization_problem::OptimizationProblem,
        relation::Relation,
        resource::Resource,
        shift::ShiftIdx,
    },
    solver::{optimization::Element, optimization_result::OptimizationResult, properties::PropertyMap},
};

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("cannot access snapshot file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// Stored run input, optionally with the routes of a previous run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename = "Snapshot")]
pub struct Snapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub relations: Vec<Relation>,
    #[serde(default)]
    pub properties: PropertyMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<SolutionSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SolutionSnapshot {
    pub routes: Vec<RouteSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RouteSnapshot {
    pub resource_id: String,
    #[serde(default)]
    pub working_hours_index: usize,
    pub node_ids: Vec<String>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let contents = std::fs::read_to_string(path)?;
        Snapshot::from_json(&contents)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Replaces the stored solution with the routes of `result`.
    pub fn with_result(mut self, result: &OptimizationResult) -> Self {
        self.solution = Some(SolutionSnapshot::from(result));
        self
    }

    /// Elements in ingestion order plus the stored solution unless `ignore_solution` is set.
    pub fn into_elements(self, ignore_solution: bool) -> (Vec<Element>, Option<SolutionSnapshot>) {
        let mut elements = Vec::with_capacity(self.nodes.len() + self.resources.len() + self.relations.len() + 1);
        elements.extend(self.nodes.into_iter().map(Element::Node));
        elements.extend(self.resources.into_iter().map(Element::Resource));
        elements.extend(self.relations.into_iter().map(Element::Relation));
        elements.push(Element::Properties(self.properties));

        let solution = if ignore_solution { None } else { self.solution };
        (elements, solution)
    }
}

impl From<&OptimizationResult> for SolutionSnapshot {
    fn from(result: &OptimizationResult) -> Self {
        SolutionSnapshot {
            routes: result
                .routes
                .iter()
                .map(|route| RouteSnapshot {
                    resource_id: route.resource_id.clone(),
                    working_hours_index: route.working_hours_index,
                    node_ids: route.visits.iter().map(|visit| visit.node_id.clone()).collect(),
                })
                .collect(),
        }
    }
}

impl SolutionSnapshot {
    /// Index form of the stored routes. Entries the problem cannot take are dropped and returned as warnings.
    ///
    /// Repeated entries for one shift are appended to the first one. A node keeps its first
    /// placement only, and nodes the shift cannot serve under hard requirements stay unassigned.
    pub fn resolve(&self, problem: &OptimizationProblem) -> (Vec<(ShiftIdx, Vec<NodeIdx>)>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut assignment: Vec<(ShiftIdx, Vec<NodeIdx>)> = Vec::with_capacity(self.routes.len());
        let mut placed = FxHashSet::default();

        for route in &self.routes {
            let Some(shift) = problem
                .resource_by_id(&route.resource_id)
                .and_then(|resource| problem.shift_of(resource, route.working_hours_index))
            else {
                warnings.push(format!(
                    "unknown shift {} #{} in stored solution",
                    route.resource_id, route.working_hours_index
                ));
                continue;
            };

            let index = match assignment.iter().position(|(planned, _)| *planned == shift) {
                Some(index) => {
                    warnings.push(format!(
                        "shift {} #{} appears more than once in stored solution, visits are appended",
                        route.resource_id, route.working_hours_index
                    ));
                    index
                }
                None => {
                    assignment.push((shift, Vec::with_capacity(route.node_ids.len())));
                    assignment.len() - 1
                }
            };

            for node_id in &route.node_ids {
                let Some(node) = problem.node_by_id(node_id) else {
                    warnings.push(format!("unknown node {node_id} in stored solution"));
                    continue;
                };
                if !placed.insert(node) {
                    warnings.push(format!("node {node_id} is planned more than once in stored solution"));
                    continue;
                }
                if problem.has_opening_hours(node) && !problem.is_compatible(node, shift) {
                    warnings.push(format!(
                        "node {node_id} cannot be served by {} #{} and stays unassigned",
                        route.resource_id, route.working_hours_index
                    ));
                    continue;
                }
                assignment[index].1.push(node);
            }
        }

        (assignment, warnings)
    }
}
