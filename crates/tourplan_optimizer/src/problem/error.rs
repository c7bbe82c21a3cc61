use jiff::Timestamp;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalendarError {
    #[error("interval start {start} must be before its end {end}")]
    EmptyInterval { start: Timestamp, end: Timestamp },

    #[error("invalid timestamp {0}")]
    InvalidTimestamp(String),

    #[error("unknown time zone {0}")]
    UnknownTimeZone(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error("resource {0} has no working hours")]
    NoWorkingHours(String),

    #[error("resource {resource} has overlapping working hours at index {first} and {second}")]
    OverlappingWorkingHours {
        resource: String,
        first: usize,
        second: usize,
    },

    #[error("{owner} has contradictory hard requirements on {tag}")]
    ContradictoryRequirements { owner: String, tag: String },

    #[error("invalid load capacity for good {good} on resource {resource}: {reason}")]
    InvalidCapacity {
        resource: String,
        good: String,
        reason: &'static str,
    },

    #[error("invalid load for good {good} on node {node}: {reason}")]
    InvalidLoad {
        node: String,
        good: String,
        reason: &'static str,
    },

    #[error("relation references unknown node {0}")]
    UnknownRelationNode(String),

    #[error("relation links node {0} to itself")]
    SelfRelation(String),

    #[error("duplicate node id {0}")]
    DuplicateNode(String),

    #[error("duplicate resource id {0}")]
    DuplicateResource(String),

    #[error("node {node} has an invalid {field}")]
    InvalidNode { node: String, field: &'static str },

    #[error("resource {resource} has an invalid {field}")]
    InvalidResource {
        resource: String,
        field: &'static str,
    },

    #[error("invalid value {value:?} for property {key}")]
    InvalidProperty { key: String, value: String },
}
