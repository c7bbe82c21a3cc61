use jiff::Timestamp;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    problem::optimization_problem::OptimizationProblem,
    solver::{ledger::LedgerTrace, optimization_result::OptimizationResult},
};

/// Stock of one good around a visit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GoodLevel {
    pub good: String,
    pub before: f64,
    pub after: f64,
}

/// Levels of every good before and after visit `index` of a route.
pub fn visit_levels(problem: &OptimizationProblem, trace: &LedgerTrace, index: usize) -> Vec<GoodLevel> {
    let (Some(before), Some(after)) = (trace.states.get(index), trace.states.get(index + 1)) else {
        return Vec::new();
    };

    problem
        .goods()
        .iter()
        .enumerate()
        .map(|(good, definition)| GoodLevel {
            good: definition.name().to_owned(),
            before: before.levels.get(good).copied().unwrap_or_default(),
            after: after.levels.get(good).copied().unwrap_or_default(),
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize, JsonSchema)]
pub struct ReportRow {
    pub node_id: String,
    pub arrival: Timestamp,
    pub departure: Timestamp,
    pub levels: Vec<GoodLevel>,
}

/// Walk of one route's depot state, visit by visit.
#[derive(Clone, Debug, PartialEq, Serialize, JsonSchema)]
pub struct RouteReport {
    pub resource_id: String,
    pub working_hours_index: usize,
    pub rows: Vec<ReportRow>,
}

impl RouteReport {
    /// Level of `good` when the route leaves, or `None` if it never carried it.
    pub fn final_level(&self, good: &str) -> Option<f64> {
        self.rows
            .last()?
            .levels
            .iter()
            .find(|level| level.good == good)
            .map(|level| level.after)
    }
}

pub fn route_reports(result: &OptimizationResult) -> Vec<RouteReport> {
    result
        .routes
        .iter()
        .map(|route| RouteReport {
            resource_id: route.resource_id.clone(),
            working_hours_index: route.working_hours_index,
            rows: route
                .visits
                .iter()
                .map(|visit| ReportRow {
                    node_id: visit.node_id.clone(),
                    arrival: visit.arrival,
                    departure: visit.departure,
                    levels: visit.loads.clone(),
                })
                .collect(),
        })
        .collect()
}

/// Plain text rendering, one line per visit and good.
pub fn render_text(reports: &[RouteReport]) -> String {
    let mut out = String::new();
    for report in reports {
        out.push_str(&format!(
            "{} #{}\n",
            report.resource_id, report.working_hours_index
        ));
        for row in &report.rows {
            out.push_str(&format!("  {} {} - {}\n", row.node_id, row.arrival, row.departure));
            for level in &row.levels {
                out.push_str(&format!(
                    "    {}: {:.2} -> {:.2}\n",
                    level.good, level.before, level.after
                ));
            }
        }
    }
    out
}
