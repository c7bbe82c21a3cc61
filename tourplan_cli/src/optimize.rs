use std::{fs, path::PathBuf, time::Duration};

use clap::Args;
use comfy_table::Table;
use indicatif::{ProgressBar, ProgressStyle};
use tourplan_optimizer::{
    export::{geo_export::route_geometries, route_report},
    json::types::Snapshot,
    solver::{
        events::SolverEvent,
        optimization::Optimization,
        optimization_result::{OptimizationResult, UnassignedReason},
    },
};
use tracing::{debug, error, info, warn};

use crate::parsers;

#[derive(Args)]
pub struct OptimizeArgs {
    /// Snapshot document to optimize
    #[arg(short, long)]
    input: PathBuf,

    /// Cancels the run after this duration (e.g. "30s", "5m", "PT1H")
    #[arg(short, long, value_parser = parsers::parse_duration)]
    timeout: Option<jiff::SignedDuration>,

    /// Start from construction even if the snapshot stores a solution
    #[arg(long)]
    ignore_solution: bool,

    /// Writes the input snapshot with the optimized solution
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Writes a text report of the per-visit load levels
    #[arg(long)]
    report: Option<PathBuf>,

    /// Writes the route geometries as JSON
    #[arg(long)]
    geometry: Option<PathBuf>,
}

pub async fn run(args: OptimizeArgs) -> anyhow::Result<()> {
    info!("Optimizing {:?}", args.input);
    let snapshot = Snapshot::load(&args.input)?;

    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::default_spinner().template("{spinner} [{elapsed}] {msg}")?);
    bar.enable_steady_tick(Duration::from_millis(200));
    bar.set_message("pending...");

    let mut optimization = Optimization::new();
    optimization.load_snapshot(snapshot.clone(), args.ignore_solution)?;
    let event_bar = bar.clone();
    optimization.on_event(move |event| match event {
        SolverEvent::Progress(progress) => event_bar.set_message(progress.message.clone()),
        _ => event_bar.suspend(|| log_event(event)),
    });

    let handle = optimization.start_run_async()?;
    debug!(run_id = %handle.run_id(), "Run started");

    let result = match args.timeout {
        Some(timeout) => handle.with_timeout(timeout.try_into()?).await,
        None => handle.await,
    };
    bar.finish_and_clear();
    let result = result?;

    println!("{}", summary_table(&result));
    info!(
        "Finished: routes = {}, unassigned = {}, hard = {:.2}, soft = {:.2}, generations = {}",
        result.routes.iter().filter(|route| !route.visits.is_empty()).count(),
        result.unassigned.len(),
        result.score.hard_score,
        result.score.soft_score,
        result.generations,
    );

    if let Some(path) = args.output {
        snapshot.with_result(&result).save(&path)?;
        info!("Solution written to {:?}", path);
    }

    if let Some(path) = args.report {
        fs::write(&path, route_report::render_text(&route_report::route_reports(&result)))?;
        info!("Report written to {:?}", path);
    }

    if let Some(path) = args.geometry {
        fs::write(&path, serde_json::to_string_pretty(&route_geometries(&result))?)?;
        info!("Geometries written to {:?}", path);
    }

    Ok(())
}

fn summary_table(result: &OptimizationResult) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Resource", "Shift", "Visits", "Distance (km)", "Start", "End"]);

    for route in result.routes.iter().filter(|route| !route.visits.is_empty()) {
        table.add_row(vec![
            route.resource_id.clone(),
            route.working_hours_index.to_string(),
            route.visits.len().to_string(),
            format!("{:.1}", route.distance_km),
            route.start.to_string(),
            route.end.to_string(),
        ]);
    }

    for unassigned in &result.unassigned {
        let reason = match &unassigned.reason {
            UnassignedReason::Filtered { reasons } => format!("filtered {reasons:?}"),
            UnassignedReason::NoOpeningHours => "no opening hours".to_owned(),
            UnassignedReason::Infeasible => "infeasible".to_owned(),
        };
        table.add_row(vec![
            format!("- {}", unassigned.node_id),
            String::new(),
            reason,
            String::new(),
            String::new(),
            String::new(),
        ]);
    }

    table
}

fn log_event(event: &SolverEvent) {
    match event {
        SolverEvent::Progress(progress) => info!("{}", progress.message),
        SolverEvent::Status(status) => info!(code = ?status.code, "{}", status.message),
        SolverEvent::Warning(warning) => warn!(code = %warning.code, "{}", warning.message),
        SolverEvent::Error(failure) => error!(code = %failure.code, "{}", failure.message),
        SolverEvent::NodeFiltered(filter) => warn!(
            node = %filter.node_id,
            action = ?filter.action,
            reasons = ?filter.reasons,
            generation = filter.generation,
            "Auto-filter"
        ),
    }
}
