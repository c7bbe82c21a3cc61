use std::f64::consts::LN_2;

use rand::Rng;

use crate::solver::{insertion::keeps_hard_feasibility, score::Score};

/// Share of the starting cost a worsening move may add and still be accepted half of the time.
const INITIAL_WORSENING_RATIO: f64 = 0.05;

const MIN_TEMPERATURE: f64 = 1e-6;

/// Metropolis criterion with a geometric cooling schedule.
///
/// Moves adding hard violations are never accepted.
#[derive(Debug, Clone)]
pub struct SimulatedAnnealingAcceptor {
    temperature: f64,
    cooling_rate: f64,
}

impl SimulatedAnnealingAcceptor {
    pub fn new(initial_temperature: f64, cooling_rate: f64) -> Self {
        SimulatedAnnealingAcceptor {
            temperature: initial_temperature.max(MIN_TEMPERATURE),
            cooling_rate,
        }
    }

    pub fn initial_temperature_for(soft_cost: f64) -> f64 {
        (INITIAL_WORSENING_RATIO * soft_cost.abs() / LN_2).max(1.0)
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn cool(&mut self) {
        self.temperature = (self.temperature * self.cooling_rate).max(MIN_TEMPERATURE);
    }

    pub fn accept(&self, delta: &Score, rng: &mut impl Rng) -> bool {
        if delta.is_improving() {
            return true;
        }
        if !keeps_hard_feasibility(delta) {
            return false;
        }
        if delta.soft_score <= 0.0 {
            return true;
        }

        let probability = (-delta.soft_score / self.temperature).exp();
        rng.random::<f64>() < probability
    }
}
