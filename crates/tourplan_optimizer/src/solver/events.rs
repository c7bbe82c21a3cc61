use jiff::{SignedDuration, Timestamp};
use schemars::JsonSchema;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use super::{score::Score, violation::ViolationClass};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, JsonSchema)]
pub enum StatusCode {
    Started,
    ConstructionFinished,
    AnnealingFinished,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, JsonSchema)]
pub enum FilterAction {
    Filtered,
    Restored,
}

/// Snapshot of the best solution after a generation.
#[derive(Clone, Debug, Serialize, JsonSchema)]
pub struct ProgressEvent {
    pub generation: usize,
    pub elapsed: SignedDuration,
    pub score: Score,
    pub unassigned: usize,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, JsonSchema)]
pub struct StatusEvent {
    pub code: StatusCode,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, JsonSchema)]
pub struct WarningEvent {
    pub code: String,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, JsonSchema)]
pub struct ErrorEvent {
    pub code: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, JsonSchema)]
pub struct FilterEvent {
    pub node_id: String,
    pub reasons: Vec<ViolationClass>,
    pub generation: usize,
    pub timestamp: Timestamp,
    pub action: FilterAction,
}

#[derive(Clone, Debug, Serialize, JsonSchema)]
#[serde(tag = "type")]
pub enum SolverEvent {
    Progress(ProgressEvent),
    Status(StatusEvent),
    Warning(WarningEvent),
    Error(ErrorEvent),
    NodeFiltered(FilterEvent),
}

impl SolverEvent {
    pub fn status(code: StatusCode, message: impl Into<String>) -> Self {
        SolverEvent::Status(StatusEvent {
            code,
            message: message.into(),
        })
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        SolverEvent::Warning(WarningEvent {
            code: code.into(),
            message: message.into(),
        })
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        SolverEvent::Error(ErrorEvent {
            code: code.into(),
            message: message.into(),
        })
    }
}

/// Single ordered stream of events for one run.
#[derive(Clone, Default)]
pub struct EventSink {
    sender: Option<UnboundedSender<SolverEvent>>,
}

impl EventSink {
    pub fn new(sender: UnboundedSender<SolverEvent>) -> Self {
        EventSink {
            sender: Some(sender),
        }
    }

    /// Drops events nobody listens to.
    pub fn disabled() -> Self {
        EventSink { sender: None }
    }

    pub fn emit(&self, event: SolverEvent) {
        if let Some(sender) = &self.sender {
            // The receiving side may be gone once the caller stopped listening.
            let _ = sender.send(event);
        }
    }
}
