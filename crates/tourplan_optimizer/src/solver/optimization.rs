use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    thread,
    time::Duration,
};

use parking_lot::Mutex;
use schemars::JsonSchema;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{
    json::types::{Snapshot, SolutionSnapshot},
    problem::{
        error::ConfigurationError,
        node::Node,
        optimization_problem::{OptimizationProblem, OptimizationProblemBuilder},
        relation::Relation,
        resource::Resource,
    },
};

use super::{
    error::SolverError,
    events::{EventSink, SolverEvent, StatusCode},
    optimization_result::OptimizationResult,
    properties::PropertyMap,
    solver::{RunControl, Solver},
    solver_params::SolverParams,
};

/// Input accepted while the optimization is being configured.
#[derive(Debug, Clone)]
pub enum Element {
    Node(Node),
    Resource(Resource),
    Relation(Relation),
    /// Merged into the properties added so far.
    Properties(PropertyMap),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, JsonSchema)]
pub enum OptimizationState {
    Configuring,
    Running,
    Completed,
    Failed,
    Cancelled,
}

type EventCallback = Box<dyn Fn(&SolverEvent) + Send + 'static>;

/// Collects the elements of one optimization and runs it in the background.
pub struct Optimization {
    state: Arc<Mutex<OptimizationState>>,
    builder: OptimizationProblemBuilder,
    properties: PropertyMap,
    initial_solution: Option<SolutionSnapshot>,
    subscribers: Vec<mpsc::UnboundedSender<SolverEvent>>,
    callbacks: Vec<EventCallback>,
}

impl Default for Optimization {
    fn default() -> Self {
        Optimization::new()
    }
}

impl Optimization {
    pub fn new() -> Self {
        Optimization {
            state: Arc::new(Mutex::new(OptimizationState::Configuring)),
            builder: OptimizationProblemBuilder::default(),
            properties: PropertyMap::new(),
            initial_solution: None,
            subscribers: Vec::new(),
            callbacks: Vec::new(),
        }
    }

    pub fn state(&self) -> OptimizationState {
        *self.state.lock()
    }

    fn ensure_configuring(&self) -> Result<(), SolverError> {
        if self.state() != OptimizationState::Configuring {
            return Err(SolverError::InvalidState(
                "elements can only be added before the run starts",
            ));
        }
        Ok(())
    }

    pub fn add_element(&mut self, element: Element) -> Result<(), SolverError> {
        self.ensure_configuring()?;

        match element {
            Element::Node(node) => {
                self.builder.add_node(node);
            }
            Element::Resource(resource) => {
                self.builder.add_resource(resource);
            }
            Element::Relation(relation) => {
                self.builder.add_relation(relation);
            }
            Element::Properties(properties) => self.properties.merge(properties),
        }

        Ok(())
    }

    pub fn add_elements(&mut self, elements: impl IntoIterator<Item = Element>) -> Result<(), SolverError> {
        elements
            .into_iter()
            .try_for_each(|element| self.add_element(element))
    }

    /// Seeds the search with stored routes instead of construction.
    pub fn set_initial_solution(&mut self, solution: SolutionSnapshot) -> Result<(), SolverError> {
        self.ensure_configuring()?;
        self.initial_solution = Some(solution);
        Ok(())
    }

    /// Adds every element of a snapshot. Its stored solution seeds the run unless `ignore_solution` is set.
    pub fn load_snapshot(&mut self, snapshot: Snapshot, ignore_solution: bool) -> Result<(), SolverError> {
        let (elements, solution) = snapshot.into_elements(ignore_solution);
        self.add_elements(elements)?;
        if let Some(solution) = solution {
            self.set_initial_solution(solution)?;
        }
        Ok(())
    }

    /// Events emitted before this call are not replayed.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SolverEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.push(sender);
        receiver
    }

    pub fn on_event<F>(&mut self, callback: F)
    where
        F: Fn(&SolverEvent) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Moves to `Running` and solves on a background thread.
    pub fn start_run_async(&mut self) -> Result<RunHandle, SolverError> {
        {
            let mut state = self.state.lock();
            if *state != OptimizationState::Configuring {
                return Err(SolverError::InvalidState("optimization was already started"));
            }
            *state = OptimizationState::Running;
        }

        let run_id = Uuid::new_v4();
        let control = Arc::new(RunControl::default());
        let (event_sender, event_receiver) = mpsc::unbounded_channel();
        let (result_sender, result_receiver) = oneshot::channel();

        let subscribers = std::mem::take(&mut self.subscribers);
        let callbacks = std::mem::take(&mut self.callbacks);
        let dispatcher = thread::Builder::new()
            .name("tourplan-events".to_owned())
            .spawn(move || dispatch_events(event_receiver, subscribers, callbacks));
        if let Err(error) = dispatcher {
            *self.state.lock() = OptimizationState::Failed;
            return Err(SolverError::WorkerFailed(error.to_string()));
        }

        let input = RunInput {
            builder: std::mem::take(&mut self.builder),
            properties: std::mem::take(&mut self.properties),
            initial_solution: self.initial_solution.take(),
        };
        let state = Arc::clone(&self.state);
        let thread_control = Arc::clone(&control);

        let solver_thread = thread::Builder::new()
            .name("tourplan-solver".to_owned())
            .spawn(move || {
                let events = EventSink::new(event_sender);
                let result = run_blocking(input, &events, thread_control, run_id);

                *state.lock() = match &result {
                    Ok(_) => OptimizationState::Completed,
                    Err(SolverError::Cancelled) => OptimizationState::Cancelled,
                    Err(_) => OptimizationState::Failed,
                };

                if result_sender.send(result).is_err() {
                    debug!("Run handle dropped before the result was ready");
                }
            });

        if let Err(error) = solver_thread {
            *self.state.lock() = OptimizationState::Failed;
            return Err(SolverError::WorkerFailed(error.to_string()));
        }

        Ok(RunHandle {
            receiver: result_receiver,
            control,
            run_id,
        })
    }
}

struct RunInput {
    builder: OptimizationProblemBuilder,
    properties: PropertyMap,
    initial_solution: Option<SolutionSnapshot>,
}

fn run_blocking(
    input: RunInput,
    events: &EventSink,
    control: Arc<RunControl>,
    run_id: Uuid,
) -> Result<OptimizationResult, SolverError> {
    events.emit(SolverEvent::status(
        StatusCode::Started,
        format!("run {run_id} started"),
    ));

    let RunInput {
        builder,
        properties,
        initial_solution,
    } = input;

    let (params, problem) = match prepare(builder, &properties, events) {
        Ok(prepared) => prepared,
        Err(configuration_error) => {
            error!(error = %configuration_error, "Invalid configuration");
            events.emit(SolverEvent::error(
                "ConfigurationError",
                configuration_error.to_string(),
            ));
            events.emit(SolverEvent::status(
                StatusCode::Failed,
                configuration_error.to_string(),
            ));
            return Err(SolverError::Configuration(configuration_error));
        }
    };

    let seed = initial_solution.as_ref().map(|solution| {
        let (assignment, warnings) = solution.resolve(&problem);
        for message in warnings {
            warn!(%message, "Stored solution does not match the problem");
            events.emit(SolverEvent::warning("StoredSolutionMismatch", message));
        }
        assignment
    });

    let mut solver = Solver::new(Arc::new(problem), params)
        .with_events(events.clone())
        .with_control(control)
        .with_run_id(run_id);
    if let Some(assignment) = seed {
        solver = solver.with_initial_solution(assignment);
    }

    solver.solve()
}

fn prepare(
    builder: OptimizationProblemBuilder,
    properties: &PropertyMap,
    events: &EventSink,
) -> Result<(SolverParams, OptimizationProblem), ConfigurationError> {
    let (params, warnings) = SolverParams::from_properties(properties)?;
    for message in warnings {
        events.emit(SolverEvent::warning("UnknownProperty", message));
    }

    let problem = builder.build()?;
    for &node in problem.nodes_without_hours() {
        let node_id = problem.node(node).id();
        warn!(node = %node_id, "Node without opening hours");
        events.emit(SolverEvent::warning(
            "NoOpeningHours",
            format!("node {node_id} has no opening hours and stays unassigned"),
        ));
    }

    Ok((params, problem))
}

fn dispatch_events(
    mut receiver: mpsc::UnboundedReceiver<SolverEvent>,
    mut subscribers: Vec<mpsc::UnboundedSender<SolverEvent>>,
    callbacks: Vec<EventCallback>,
) {
    while let Some(event) = receiver.blocking_recv() {
        for callback in &callbacks {
            callback(&event);
        }
        subscribers.retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

/// Resolves to the result of a started run. Dropping it cancels the run.
pub struct RunHandle {
    receiver: oneshot::Receiver<Result<OptimizationResult, SolverError>>,
    control: Arc<RunControl>,
    run_id: Uuid,
}

impl RunHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn cancel(&self) {
        self.control.cancel();
    }

    /// Re-activates a node the auto-filter took out, from the next generation on.
    pub fn restore_node(&self, node_id: impl Into<String>) {
        self.control.request_restore(node_id);
    }

    /// Waits at most `timeout`, cancelling the run when it expires.
    pub async fn with_timeout(self, timeout: Duration) -> Result<OptimizationResult, SolverError> {
        let control = Arc::clone(&self.control);
        match tokio::time::timeout(timeout, self).await {
            Ok(result) => result,
            Err(_) => {
                control.cancel();
                Err(SolverError::Cancelled)
            }
        }
    }
}

impl Future for RunHandle {
    type Output = Result<OptimizationResult, SolverError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(SolverError::ChannelClosed)))
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        self.control.cancel();
    }
}
