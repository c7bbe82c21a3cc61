use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use fxhash::FxHashMap;
use jiff::{SignedDuration, Timestamp};
use parking_lot::Mutex;
use rand::{SeedableRng, rngs::SmallRng};
use rayon::prelude::*;
use tracing::{Level, debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::problem::{node::NodeIdx, optimization_problem::OptimizationProblem, shift::ShiftIdx};

use super::{
    annealing::Annealing,
    auto_filter::AutoFilter,
    construction::construct_solution::construct_solution,
    error::SolverError,
    evaluator::Evaluator,
    events::{EventSink, FilterAction, FilterEvent, ProgressEvent, SolverEvent, StatusCode},
    evolution::{Evolution, EvolutionWorker},
    optimization_result::OptimizationResult,
    recreate::{
        best_insertion::{BestInsertion, BestInsertionSortStrategy},
        recreate_context::RecreateContext,
    },
    solution::working_solution::WorkingSolution,
    solver_params::{SolverParams, Termination},
    statistics::{ScoreEvolutionRow, SearchStatistics},
    violation::ViolationClass,
};

/// Shared between a running search and whoever controls it.
#[derive(Default)]
pub struct RunControl {
    cancelled: AtomicBool,
    restore_requests: Mutex<Vec<String>>,
}

impl RunControl {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn cancelled_flag(&self) -> &AtomicBool {
        &self.cancelled
    }

    /// Queued until the next generation starts.
    pub fn request_restore(&self, node_id: impl Into<String>) {
        self.restore_requests.lock().push(node_id.into());
    }

    fn take_restore_requests(&self) -> Vec<String> {
        std::mem::take(&mut *self.restore_requests.lock())
    }
}

struct SearchState {
    start: Timestamp,
    best: WorkingSolution,
    generation: usize,
    last_improvement: usize,
    last_progress: Option<Timestamp>,
    filter: AutoFilter,
    filtered: FxHashMap<NodeIdx, Vec<ViolationClass>>,
    filter_history: Vec<FilterEvent>,
    statistics: SearchStatistics,
}

impl SearchState {
    fn elapsed(&self) -> SignedDuration {
        Timestamp::now().duration_since(self.start)
    }

    fn record_best_score(&mut self) {
        let row = ScoreEvolutionRow {
            generation: self.generation,
            elapsed: self.elapsed(),
            score: self.best.score(),
        };
        self.statistics.add_best_score(row);
    }
}

/// Runs construction, annealing and evolution for one problem.
pub struct Solver {
    problem: Arc<OptimizationProblem>,
    params: SolverParams,
    events: EventSink,
    control: Arc<RunControl>,
    initial_assignment: Option<Vec<(ShiftIdx, Vec<NodeIdx>)>>,
    run_id: Uuid,
}

impl Solver {
    pub fn new(problem: Arc<OptimizationProblem>, params: SolverParams) -> Self {
        Solver {
            problem,
            params,
            events: EventSink::disabled(),
            control: Arc::new(RunControl::default()),
            initial_assignment: None,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn with_control(mut self, control: Arc<RunControl>) -> Self {
        self.control = control;
        self
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    /// Starts from these routes instead of running construction.
    pub fn with_initial_solution(mut self, assignment: Vec<(ShiftIdx, Vec<NodeIdx>)>) -> Self {
        self.initial_assignment = Some(assignment);
        self
    }

    pub fn control(&self) -> &Arc<RunControl> {
        &self.control
    }

    pub fn solve(&self) -> Result<OptimizationResult, SolverError> {
        let result = self.run();

        match &result {
            Ok(result) => self.events.emit(SolverEvent::status(
                StatusCode::Completed,
                format!(
                    "completed after {} generations, {} nodes assigned",
                    result.generations,
                    result.num_assigned()
                ),
            )),
            Err(SolverError::Cancelled) => self
                .events
                .emit(SolverEvent::status(StatusCode::Cancelled, "optimization cancelled")),
            Err(error) => {
                self.events.emit(SolverEvent::error("SolverFailed", error.to_string()));
                self.events
                    .emit(SolverEvent::status(StatusCode::Failed, error.to_string()));
            }
        }

        result
    }

    fn run(&self) -> Result<OptimizationResult, SolverError> {
        let start = Timestamp::now();
        let evaluator = Arc::new(Evaluator::new(Arc::clone(&self.problem), &self.params));

        let initial = self.initial_solution(Arc::clone(&evaluator));
        info!(
            score = ?initial.score(),
            unassigned = initial.unassigned().len(),
            "Initial solution ready"
        );
        self.events.emit(SolverEvent::status(
            StatusCode::ConstructionFinished,
            format!(
                "initial solution with {} assigned and {} unassigned nodes",
                initial.num_assigned(),
                initial.unassigned().len()
            ),
        ));

        let mut state = SearchState {
            start,
            best: initial,
            generation: 0,
            last_improvement: 0,
            last_progress: None,
            filter: AutoFilter::new(&self.params.auto_filter, self.problem.num_nodes()),
            filtered: FxHashMap::default(),
            filter_history: Vec::new(),
            statistics: SearchStatistics::default(),
        };
        state.record_best_score();

        if self.params.max_generations() == Some(0) {
            debug!("Generation budget is zero, returning the construction result");
            return Ok(self.finish(state));
        }

        if self.control.is_cancelled() {
            return Err(SolverError::Cancelled);
        }

        let number_of_threads = self.params.threads.number_of_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(number_of_threads)
            .thread_name(|index| format!("tourplan-worker-{index}"))
            .build()
            .map_err(|error| SolverError::WorkerFailed(error.to_string()))?;

        let deadline = self
            .params
            .max_duration()
            .and_then(|max| start.checked_add(max).ok());
        let mut workers =
            pool.install(|| self.run_annealing(&state.best, number_of_threads, deadline))?;
        if self.control.is_cancelled() {
            return Err(SolverError::Cancelled);
        }

        self.update_best(&mut state, &workers);
        self.events.emit(SolverEvent::status(
            StatusCode::AnnealingFinished,
            format!("annealing finished on {} workers", workers.len()),
        ));

        loop {
            if self.control.is_cancelled() {
                return Err(SolverError::Cancelled);
            }
            if self.should_terminate(&state) {
                break;
            }

            state.generation += 1;
            self.handle_restore_requests(&mut state, &mut workers);

            workers = pool.install(|| self.run_generation(workers))?;

            self.update_best(&mut state, &workers);
            state.record_best_score();
            self.report_progress(&mut state);
            self.apply_auto_filter(&mut state, &mut workers);
        }

        Ok(self.finish(state))
    }

    fn initial_solution(&self, evaluator: Arc<Evaluator>) -> WorkingSolution {
        match &self.initial_assignment {
            Some(assignment) => {
                debug!("Seeding the search with a supplied solution");
                let mut solution = WorkingSolution::from_assignment(evaluator, assignment.clone());
                // Nodes the seed leaves out are offered to the routes again.
                let mut rng = SmallRng::seed_from_u64(self.params.seed);
                BestInsertion::new(BestInsertionSortStrategy::Importance).recreate_solution(
                    &mut solution,
                    RecreateContext {
                        rng: &mut rng,
                        performance_mode: self.params.performance_mode,
                    },
                );
                solution
            }
            None => construct_solution(evaluator, self.params.performance_mode),
        }
    }

    #[instrument(skip_all, level = Level::DEBUG)]
    fn run_annealing(
        &self,
        initial: &WorkingSolution,
        number_of_threads: usize,
        deadline: Option<Timestamp>,
    ) -> Result<Vec<EvolutionWorker>, SolverError> {
        let annealing = Annealing::new(&self.params.annealing);
        let evolution = Arc::new(Evolution::new(
            &self.params.evolution,
            self.params.performance_mode,
        ));

        let outcomes = (0..number_of_threads)
            .into_par_iter()
            .map(|index| {
                catch_unwind(AssertUnwindSafe(|| {
                    let mut rng = SmallRng::seed_from_u64(self.params.seed.wrapping_add(index as u64));
                    let mut solution = initial.clone();
                    let statistics =
                        annealing.run(&mut solution, &mut rng, self.control.cancelled_flag(), deadline);
                    debug!(
                        worker = index,
                        iterations = statistics.iterations,
                        accepted = statistics.accepted,
                        improvements = statistics.improvements,
                        "Annealing done"
                    );

                    let population = evolution.seed_population(solution, &mut rng);
                    EvolutionWorker {
                        index,
                        rng,
                        population,
                        evolution: Arc::clone(&evolution),
                    }
                }))
                .map_err(panic_message)
            })
            .collect::<Vec<_>>();

        self.collect_workers(outcomes.into_iter().enumerate())
    }

    fn run_generation(&self, workers: Vec<EvolutionWorker>) -> Result<Vec<EvolutionWorker>, SolverError> {
        let outcomes = workers
            .into_par_iter()
            .map(|mut worker| {
                let index = worker.index;
                let outcome = catch_unwind(AssertUnwindSafe(move || {
                    worker.step();
                    worker
                }))
                .map_err(panic_message);
                (index, outcome)
            })
            .collect::<Vec<_>>();

        self.collect_workers(outcomes.into_iter())
    }

    /// Drops failed workers and reports them. Fails only when nothing is left.
    fn collect_workers(
        &self,
        outcomes: impl Iterator<Item = (usize, Result<EvolutionWorker, String>)>,
    ) -> Result<Vec<EvolutionWorker>, SolverError> {
        let mut workers = Vec::new();
        let mut last_failure = None;

        for (index, outcome) in outcomes {
            match outcome {
                Ok(worker) => workers.push(worker),
                Err(message) => {
                    error!(worker = index, %message, "Search worker failed");
                    self.events.emit(SolverEvent::error(
                        "WorkerFailed",
                        format!("worker {index} failed: {message}"),
                    ));
                    last_failure = Some(message);
                }
            }
        }

        if workers.is_empty() {
            return Err(SolverError::WorkerFailed(
                last_failure.unwrap_or_else(|| "no workers".to_owned()),
            ));
        }

        Ok(workers)
    }

    fn update_best(&self, state: &mut SearchState, workers: &[EvolutionWorker]) {
        let candidate = workers
            .iter()
            .filter_map(|worker| worker.population.best())
            .min_by_key(|accepted| accepted.score);

        if let Some(candidate) = candidate
            && candidate.score < state.best.score()
        {
            state.best = candidate.solution.clone();
            state.last_improvement = state.generation;
        }
    }

    fn should_terminate(&self, state: &SearchState) -> bool {
        self.params
            .terminations
            .iter()
            .any(|termination| match termination {
                Termination::Generations(max) => state.generation >= *max,
                Termination::Duration(max) => state.elapsed() >= *max,
                Termination::GenerationsWithoutImprovement(max) => {
                    state.generation - state.last_improvement >= *max
                }
            })
    }

    fn report_progress(&self, state: &mut SearchState) {
        let now = Timestamp::now();
        if let (Some(interval), Some(last)) = (self.params.progress_interval, state.last_progress)
            && now.duration_since(last) < interval
        {
            return;
        }
        state.last_progress = Some(now);

        let score = state.best.score();
        let unassigned = state.best.unassigned().len();
        self.events.emit(SolverEvent::Progress(ProgressEvent {
            generation: state.generation,
            elapsed: state.elapsed(),
            score,
            unassigned,
            message: format!(
                "generation {}: hard {:.2}, soft {:.2}, {} routes, {} unassigned",
                state.generation,
                score.hard_score,
                score.soft_score,
                state.best.non_empty_routes_iter().count(),
                unassigned
            ),
        }));
    }

    fn apply_auto_filter(&self, state: &mut SearchState, workers: &mut [EvolutionWorker]) {
        if !state.filter.is_enabled() {
            return;
        }

        let decisions = state.filter.observe(&state.best.node_violations());
        for decision in decisions {
            let node_id = self.problem.node(decision.node).id().to_owned();
            info!(node = %node_id, reasons = ?decision.reasons, "Filtering node");

            for worker in workers.iter_mut() {
                worker.exclude(decision.node);
            }
            state.best.exclude(decision.node);

            let event = FilterEvent {
                node_id,
                reasons: decision.reasons.clone(),
                generation: state.generation,
                timestamp: Timestamp::now(),
                action: FilterAction::Filtered,
            };
            state.filter_history.push(event.clone());
            state.filtered.insert(decision.node, decision.reasons);
            self.events.emit(SolverEvent::NodeFiltered(event));
        }
    }

    fn handle_restore_requests(&self, state: &mut SearchState, workers: &mut [EvolutionWorker]) {
        for node_id in self.control.take_restore_requests() {
            let restored = self
                .problem
                .node_by_id(&node_id)
                .filter(|&node| state.filter.restore(node));

            let Some(node) = restored else {
                warn!(node = %node_id, "Restore ignored, node is not filtered");
                self.events.emit(SolverEvent::warning(
                    "RestoreIgnored",
                    format!("node {node_id} is not filtered"),
                ));
                continue;
            };

            for worker in workers.iter_mut() {
                worker.restore(node);
            }
            state.best.restore(node);
            state.filtered.remove(&node);

            let event = FilterEvent {
                node_id,
                reasons: Vec::new(),
                generation: state.generation,
                timestamp: Timestamp::now(),
                action: FilterAction::Restored,
            };
            state.filter_history.push(event.clone());
            self.events.emit(SolverEvent::NodeFiltered(event));
        }
    }

    fn finish(&self, state: SearchState) -> OptimizationResult {
        let duration = state.elapsed();
        info!(
            generations = state.generation,
            score = ?state.best.score(),
            "Search finished"
        );

        OptimizationResult::from_solution(
            self.run_id,
            &state.best,
            &state.filtered,
            state.filter_history,
            state.statistics.into_score_evolution(),
            state.generation,
            duration,
        )
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        problem::optimization_problem::OptimizationProblem,
        solver::{
            error::SolverError,
            solver_params::{SolverParams, Termination},
        },
        test_utils::{self, TestNode},
    };

    use super::Solver;

    fn small_problem() -> OptimizationProblem {
        test_utils::create_problem(
            (0..8)
                .map(|i| TestNode::new(format!("N{i}"), 50.0 + (i % 4) as f64 * 0.03, 6.0 + (i / 4) as f64 * 0.05))
                .collect(),
            vec![
                test_utils::resource_at("R1", 50.0, 6.0, &[test_utils::DAY_ONE]),
                test_utils::resource_at("R2", 50.1, 6.1, &[test_utils::DAY_ONE]),
            ],
        )
    }

    fn quick_params(generations: usize) -> SolverParams {
        let mut params = SolverParams {
            terminations: vec![Termination::Generations(generations)],
            ..SolverParams::default()
        };
        params.annealing.iterations = 100;
        params.annealing.repetitions = 1;
        params.evolution.population_size = 3;
        params.evolution.local_search_iterations = 20;
        params
    }

    #[test]
    fn test_pure_construction() {
        let solver = Solver::new(Arc::new(small_problem()), quick_params(0));
        let result = solver.solve().unwrap();

        assert_eq!(result.generations, 0);
        assert_eq!(result.num_assigned(), 8);
        assert_eq!(result.score_evolution.len(), 1);
    }

    #[test]
    fn test_search_never_worse_than_construction() {
        let construction = Solver::new(Arc::new(small_problem()), quick_params(0))
            .solve()
            .unwrap();
        let searched = Solver::new(Arc::new(small_problem()), quick_params(5))
            .solve()
            .unwrap();

        assert_eq!(searched.generations, 5);
        assert!(searched.score <= construction.score);
        assert!(
            searched
                .score_evolution
                .windows(2)
                .all(|pair| pair[1].score <= pair[0].score)
        );
    }

    #[test]
    fn test_same_seed_same_result() {
        let first = Solver::new(Arc::new(small_problem()), quick_params(3))
            .solve()
            .unwrap();
        let second = Solver::new(Arc::new(small_problem()), quick_params(3))
            .solve()
            .unwrap();

        assert_eq!(first.score, second.score);
        assert_eq!(first.routes, second.routes);
    }

    #[test]
    fn test_cancelled_before_search() {
        let solver = Solver::new(Arc::new(small_problem()), quick_params(10));
        solver.control().cancel();

        assert_eq!(solver.solve().unwrap_err(), SolverError::Cancelled);
    }
}
