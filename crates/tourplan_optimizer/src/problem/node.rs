use jiff::SignedDuration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::define_index_newtype;

use super::{
    calendar::{CalendarInterval, Scheduled},
    load::NodeDepot,
    location::Coordinate,
    qualification::{Qualification, Requirement},
};

define_index_newtype!(NodeIdx, Node);

/// A stop to be visited inside one of its opening hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Node {
    id: String,
    coordinate: Coordinate,
    #[serde(default)]
    opening_hours: Vec<CalendarInterval>,
    #[serde(default)]
    visit_duration: SignedDuration,
    #[serde(default = "default_importance")]
    importance: u32,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    requirements: Vec<Requirement>,
    #[serde(default)]
    qualifications: Vec<Qualification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    depot: Option<NodeDepot>,
}

fn default_importance() -> u32 {
    1
}

impl Node {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }

    pub fn opening_hours(&self) -> &[CalendarInterval] {
        &self.opening_hours
    }

    pub fn visit_duration(&self) -> SignedDuration {
        self.visit_duration
    }

    pub fn importance(&self) -> u32 {
        self.importance
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn qualifications(&self) -> &[Qualification] {
        &self.qualifications
    }

    pub fn depot(&self) -> Option<&NodeDepot> {
        self.depot.as_ref()
    }

    pub fn add_requirement(&mut self, requirement: Requirement) {
        self.requirements.push(requirement);
    }

    pub fn add_qualification(&mut self, qualification: Qualification) {
        self.qualifications.push(qualification);
    }
}

impl Scheduled for Node {
    fn calendar(&self) -> impl Iterator<Item = &CalendarInterval> {
        self.opening_hours.iter()
    }
}

pub struct NodeBuilder {
    id: String,
    coordinate: Coordinate,
    opening_hours: Vec<CalendarInterval>,
    visit_duration: Option<SignedDuration>,
    importance: Option<u32>,
    optional: bool,
    requirements: Vec<Requirement>,
    qualifications: Vec<Qualification>,
    depot: Option<NodeDepot>,
}

impl NodeBuilder {
    pub fn new(id: impl Into<String>, coordinate: Coordinate) -> Self {
        NodeBuilder {
            id: id.into(),
            coordinate,
            opening_hours: Vec::new(),
            visit_duration: None,
            importance: None,
            optional: false,
            requirements: Vec::new(),
            qualifications: Vec::new(),
            depot: None,
        }
    }

    pub fn add_opening_hours(&mut self, interval: CalendarInterval) -> &mut NodeBuilder {
        self.opening_hours.push(interval);
        self
    }

    pub fn set_visit_duration(&mut self, duration: SignedDuration) -> &mut NodeBuilder {
        self.visit_duration = Some(duration);
        self
    }

    pub fn set_importance(&mut self, importance: u32) -> &mut NodeBuilder {
        self.importance = Some(importance);
        self
    }

    pub fn set_optional(&mut self, optional: bool) -> &mut NodeBuilder {
        self.optional = optional;
        self
    }

    pub fn add_requirement(&mut self, requirement: Requirement) -> &mut NodeBuilder {
        self.requirements.push(requirement);
        self
    }

    pub fn add_qualification(&mut self, qualification: Qualification) -> &mut NodeBuilder {
        self.qualifications.push(qualification);
        self
    }

    pub fn set_depot(&mut self, depot: NodeDepot) -> &mut NodeBuilder {
        self.depot = Some(depot);
        self
    }

    pub fn build(self) -> Node {
        Node {
            id: self.id,
            coordinate: self.coordinate,
            opening_hours: self.opening_hours,
            visit_duration: self.visit_duration.unwrap_or(SignedDuration::ZERO),
            importance: self.importance.unwrap_or_else(default_importance),
            optional: self.optional,
            requirements: self.requirements,
            qualifications: self.qualifications,
            depot: self.depot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let node = NodeBuilder::new("Koeln", Coordinate::new(50.9333, 6.95)).build();

        assert_eq!(node.id(), "Koeln");
        assert_eq!(node.importance(), 1);
        assert_eq!(node.visit_duration(), SignedDuration::ZERO);
        assert!(!node.is_optional());
        assert!(node.opening_hours().is_empty());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let node: Node = serde_json::from_str(
            r#"{
                "id": "Aachen",
                "coordinate": { "lat": 50.775346, "lon": 6.083887 },
                "opening_hours": [
                    { "start": "2025-06-10T08:00:00Z", "end": "2025-06-10T17:00:00Z" }
                ],
                "visit_duration": "PT30M",
                "requirements": [
                    { "type": "LeveledType", "tag": "Expertise", "level": 8 }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(node.visit_duration(), SignedDuration::from_mins(30));
        assert_eq!(node.opening_hours().len(), 1);
        assert!(node.requirements()[0].hard);
    }

    #[test]
    fn test_deserialize_rejects_inverted_interval() {
        let result: Result<Node, _> = serde_json::from_str(
            r#"{
                "id": "Aachen",
                "coordinate": { "lat": 50.775346, "lon": 6.083887 },
                "opening_hours": [
                    { "start": "2025-06-10T18:00:00Z", "end": "2025-06-10T17:00:00Z" }
                ]
            }"#,
        );
        assert!(result.is_err());
    }
}
