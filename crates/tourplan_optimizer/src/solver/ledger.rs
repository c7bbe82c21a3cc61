use std::cmp;

use jiff::{SignedDuration, Timestamp};
use serde::Serialize;
use smallvec::SmallVec;
use thiserror::Error;

use crate::problem::{
    load::{GoodIdx, LoadKind},
    node::NodeIdx,
    optimization_problem::{CompiledDepot, CompiledLoad},
};

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CapacityViolationKind {
    /// More goods requested than aboard.
    Underflow,
    IndividualOverflow,
    TotalOverflow,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind:?} of good {good} at node {node}, excess {excess}")]
pub struct CapacityViolation {
    pub node: NodeIdx,
    pub good: GoodIdx,
    pub kind: CapacityViolationKind,
    pub excess: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct TimedChunk {
    good: GoodIdx,
    amount: f64,
    picked_at: Timestamp,
    max_duration: SignedDuration,
}

impl TimedChunk {
    fn overtime_at(&self, at: Timestamp) -> SignedDuration {
        cmp::max(
            SignedDuration::ZERO,
            at.duration_since(self.picked_at) - self.max_duration,
        )
    }
}

/// Resource stock at one point of a route.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerState {
    pub levels: SmallVec<[f64; 4]>,
    pub volume: f64,
    /// Priority weighted units not served so far.
    pub unfulfilled: f64,
    /// Accumulated time timed goods spent aboard past their bound.
    pub overtime: SignedDuration,
    chunks: SmallVec<[TimedChunk; 2]>,
}

/// A load with its quantity decided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLoad {
    pub good: GoodIdx,
    pub delta: f64,
    pub fuzzy: bool,
    pub priority: u32,
    pub timed: Option<SignedDuration>,
    /// Units below the lower flex bound that could not be served.
    pub shortfall: f64,
}

pub struct LedgerVisit<'a> {
    pub node: NodeIdx,
    pub at: Timestamp,
    pub loads: &'a [ResolvedLoad],
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerTrace {
    /// `states[0]` is the stock at route start, `states[i + 1]` the stock after visit `i`.
    pub states: Vec<LedgerState>,
    pub resolved: Vec<SmallVec<[ResolvedLoad; 2]>>,
    pub violations: Vec<CapacityViolation>,
    pub overload: f64,
    pub unfulfilled: f64,
    pub overtime: SignedDuration,
}

impl LedgerTrace {
    pub fn is_feasible(&self) -> bool {
        self.violations.is_empty()
    }
}

pub struct LoadLedger<'a> {
    depot: &'a CompiledDepot,
}

impl<'a> LoadLedger<'a> {
    pub fn new(depot: &'a CompiledDepot) -> Self {
        LoadLedger { depot }
    }

    pub fn initial_state(&self) -> LedgerState {
        LedgerState {
            levels: self.depot.initial_levels.clone(),
            volume: self.depot.initial_volume(),
            unfulfilled: 0.0,
            overtime: SignedDuration::ZERO,
            chunks: SmallVec::new(),
        }
    }

    /// Applies one visit to the stock, failing on the first bound it breaks.
    pub fn apply_load_delta(
        &self,
        state: &LedgerState,
        visit: &LedgerVisit,
    ) -> Result<LedgerState, CapacityViolation> {
        let (next, violations) = self.apply(state, visit);
        match violations.into_iter().next() {
            Some(violation) => Err(violation),
            None => Ok(next),
        }
    }

    /// Applies a visit, clamping to the bounds so evaluation can continue past a violation.
    fn apply(
        &self,
        state: &LedgerState,
        visit: &LedgerVisit,
    ) -> (LedgerState, SmallVec<[CapacityViolation; 1]>) {
        let mut next = state.clone();
        let mut violations = SmallVec::new();

        for load in visit.loads {
            let good = load.good.get();
            let max_capacity = self.depot.max_capacities[good];
            let space_factor = self.depot.space_factors[good];
            let priority = f64::from(load.priority);
            let before = next.levels[good];
            let mut level = before + load.delta;

            next.unfulfilled += load.shortfall * priority;

            if level < -EPSILON {
                if load.fuzzy {
                    next.unfulfilled += -level * priority;
                } else {
                    violations.push(CapacityViolation {
                        node: visit.node,
                        good: load.good,
                        kind: CapacityViolationKind::Underflow,
                        excess: -level,
                    });
                }
                level = 0.0;
            }

            if level > max_capacity + EPSILON {
                if load.fuzzy {
                    next.unfulfilled += (level - max_capacity) * priority;
                } else {
                    violations.push(CapacityViolation {
                        node: visit.node,
                        good: load.good,
                        kind: CapacityViolationKind::IndividualOverflow,
                        excess: level - max_capacity,
                    });
                }
                level = max_capacity;
            }

            let volume = next.volume + (level - before) * space_factor;
            if volume > self.depot.total_capacity + EPSILON {
                let excess = volume - self.depot.total_capacity;
                if load.fuzzy {
                    next.unfulfilled += excess / space_factor * priority;
                } else {
                    violations.push(CapacityViolation {
                        node: visit.node,
                        good: load.good,
                        kind: CapacityViolationKind::TotalOverflow,
                        excess,
                    });
                }
                level = (level - excess / space_factor).max(0.0);
            }

            let applied = level - before;
            next.levels[good] = level;
            next.volume += applied * space_factor;

            if applied > 0.0 {
                if let Some(max_duration) = load.timed {
                    next.chunks.push(TimedChunk {
                        good: load.good,
                        amount: applied,
                        picked_at: visit.at,
                        max_duration,
                    });
                }
            } else if applied < 0.0 {
                consume_chunks(&mut next, load.good, -applied, visit.at);
            }
        }

        (next, violations)
    }

    /// Decides flexible quantities in route order so every later stock stays within bounds.
    pub fn resolve(&self, visits: &[&[CompiledLoad]]) -> Vec<SmallVec<[ResolvedLoad; 2]>> {
        let mut resolved = visits
            .iter()
            .map(|loads| {
                loads
                    .iter()
                    .map(|load| ResolvedLoad {
                        good: load.good,
                        delta: match load.kind {
                            LoadKind::Fixed { delta } => delta,
                            _ => 0.0,
                        },
                        fuzzy: load.fuzzy,
                        priority: load.priority,
                        timed: match load.kind {
                            LoadKind::TimedSupplyFlex { max_duration, .. } => Some(max_duration),
                            _ => None,
                        },
                        shortfall: 0.0,
                    })
                    .collect::<SmallVec<[ResolvedLoad; 2]>>()
            })
            .collect::<Vec<_>>();

        let has_flex = visits
            .iter()
            .any(|loads| loads.iter().any(|load| !matches!(load.kind, LoadKind::Fixed { .. })));
        if !has_flex {
            return resolved;
        }

        // levels[j][g]: stock of g after visit j, unclamped.
        let mut levels = Vec::with_capacity(visits.len());
        let mut current = self.depot.initial_levels.clone();
        for loads in &resolved {
            for load in loads {
                current[load.good.get()] += load.delta;
            }
            levels.push(current.clone());
        }
        let mut volumes = levels
            .iter()
            .map(|stock| self.volume_of(stock))
            .collect::<Vec<_>>();

        for (position, loads) in visits.iter().enumerate() {
            for (load_index, load) in loads.iter().enumerate() {
                let bounds = match &load.kind {
                    LoadKind::Fixed { .. } => continue,
                    LoadKind::RequestFlex(bounds)
                    | LoadKind::SupplyFlex(bounds)
                    | LoadKind::MixedFlex(bounds)
                    | LoadKind::TimedSupplyFlex { bounds, .. } => *bounds,
                };

                let good = load.good.get();
                let space_factor = self.depot.space_factors[good];
                let downstream = &levels[position..];
                let min_level = downstream
                    .iter()
                    .map(|stock| stock[good])
                    .fold(f64::INFINITY, f64::min);
                let max_level = downstream
                    .iter()
                    .map(|stock| stock[good])
                    .fold(f64::NEG_INFINITY, f64::max);
                let max_volume = volumes[position..]
                    .iter()
                    .copied()
                    .fold(f64::NEG_INFINITY, f64::max);

                let lowest = -min_level;
                let highest = (self.depot.max_capacities[good] - max_level)
                    .min((self.depot.total_capacity - max_volume) / space_factor);

                let (delta, shortfall) = match &load.kind {
                    LoadKind::RequestFlex(_) => {
                        let magnitude = bounds.max.min(-lowest).max(0.0);
                        pick_magnitude(-1.0, magnitude, bounds.min, load.fuzzy)
                    }
                    LoadKind::SupplyFlex(_) | LoadKind::TimedSupplyFlex { .. } => {
                        let magnitude = bounds.max.min(highest).max(0.0);
                        pick_magnitude(1.0, magnitude, bounds.min, load.fuzzy)
                    }
                    LoadKind::MixedFlex(_) => {
                        let lo = bounds.min.max(lowest);
                        let hi = bounds.max.min(highest);
                        if lo <= hi {
                            (0.0_f64.clamp(lo, hi), 0.0)
                        } else if lowest > bounds.max {
                            (bounds.max, lowest - bounds.max)
                        } else {
                            (bounds.min, bounds.min - highest)
                        }
                    }
                    LoadKind::Fixed { .. } => continue,
                };

                resolved[position][load_index].delta = delta;
                resolved[position][load_index].shortfall = shortfall;
                for (stock, volume) in levels[position..].iter_mut().zip(&mut volumes[position..]) {
                    stock[good] += delta;
                    *volume += delta * space_factor;
                }
            }
        }

        resolved
    }

    fn volume_of(&self, levels: &[f64]) -> f64 {
        levels
            .iter()
            .zip(&self.depot.space_factors)
            .map(|(level, factor)| level * factor)
            .sum()
    }

    /// Walks a whole route. `visits` pairs each node with the instant its service starts.
    pub fn run(
        &self,
        visits: &[(NodeIdx, Timestamp, &[CompiledLoad])],
        route_end: Timestamp,
    ) -> LedgerTrace {
        let loads = visits.iter().map(|(_, _, loads)| *loads).collect::<Vec<_>>();
        let resolved = self.resolve(&loads);

        let mut states = Vec::with_capacity(visits.len() + 1);
        let mut violations = Vec::new();
        let mut state = self.initial_state();
        states.push(state.clone());

        for ((node, at, _), loads) in visits.iter().zip(&resolved) {
            let visit = LedgerVisit {
                node: *node,
                at: *at,
                loads,
            };
            let (next, found) = self.apply(&state, &visit);
            violations.extend(found);
            state = next;
            states.push(state.clone());
        }

        let pending = state
            .chunks
            .iter()
            .map(|chunk| chunk.overtime_at(route_end))
            .fold(SignedDuration::ZERO, |acc, overtime| acc + overtime);

        LedgerTrace {
            overload: violations.iter().map(|violation| violation.excess).sum(),
            unfulfilled: state.unfulfilled,
            overtime: state.overtime + pending,
            states,
            resolved,
            violations,
        }
    }
}

/// Returns the signed delta and the shortfall below `min`.
fn pick_magnitude(sign: f64, feasible: f64, min: f64, fuzzy: bool) -> (f64, f64) {
    if feasible + EPSILON >= min {
        (sign * feasible, 0.0)
    } else if fuzzy {
        (sign * feasible, min - feasible)
    } else {
        (sign * min, 0.0)
    }
}

fn consume_chunks(state: &mut LedgerState, good: GoodIdx, mut amount: f64, at: Timestamp) {
    let mut index = 0;
    while amount > EPSILON && index < state.chunks.len() {
        if state.chunks[index].good != good {
            index += 1;
            continue;
        }

        let chunk = &mut state.chunks[index];
        if chunk.amount <= amount + EPSILON {
            amount -= chunk.amount;
            let overtime = chunk.overtime_at(at);
            state.overtime += overtime;
            state.chunks.remove(index);
        } else {
            chunk.amount -= amount;
            amount = 0.0;
        }
    }
}
