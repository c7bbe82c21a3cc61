use std::ops::{Add, AddAssign};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::score::{Score, ScoreAnalysis};

pub const NUM_COMPONENTS: usize = 18;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub enum CostComponent {
    /// Kilometers times the resource's cost per kilometer.
    Distance,
    /// Hours times the resource's cost per hour.
    Time,
    Stops,
    /// Minutes past the end of an opening hours interval.
    Lateness,
    /// Minutes of idle waiting beyond the early arrival tolerance.
    Earliness,
    /// Minutes past the shift end or past the maximum duration.
    WorkingHoursExceeded,
    /// Kilometers past the maximum route distance.
    RouteDistanceExceeded,
    CapacityOverload,
    UnfulfilledLoad,
    /// Minutes timed goods stayed aboard past their bound.
    LoadOvertime,
    Relationship,
    ZoneMismatch,
    SkillMismatch,
    /// Kilograms.
    Co2,
    ResourceActivation,
    /// Mean kilometers between visits and their route centroid.
    Compactness,
    Unassigned,
    DoubleBooking,
}

impl CostComponent {
    pub const ALL: [CostComponent; NUM_COMPONENTS] = [
        CostComponent::Distance,
        CostComponent::Time,
        CostComponent::Stops,
        CostComponent::Lateness,
        CostComponent::Earliness,
        CostComponent::WorkingHoursExceeded,
        CostComponent::RouteDistanceExceeded,
        CostComponent::CapacityOverload,
        CostComponent::UnfulfilledLoad,
        CostComponent::LoadOvertime,
        CostComponent::Relationship,
        CostComponent::ZoneMismatch,
        CostComponent::SkillMismatch,
        CostComponent::Co2,
        CostComponent::ResourceActivation,
        CostComponent::Compactness,
        CostComponent::Unassigned,
        CostComponent::DoubleBooking,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CostComponent::Distance => "Distance",
            CostComponent::Time => "Time",
            CostComponent::Stops => "Stops",
            CostComponent::Lateness => "Lateness",
            CostComponent::Earliness => "Earliness",
            CostComponent::WorkingHoursExceeded => "WorkingHoursExceeded",
            CostComponent::RouteDistanceExceeded => "RouteDistanceExceeded",
            CostComponent::CapacityOverload => "CapacityOverload",
            CostComponent::UnfulfilledLoad => "UnfulfilledLoad",
            CostComponent::LoadOvertime => "LoadOvertime",
            CostComponent::Relationship => "Relationship",
            CostComponent::ZoneMismatch => "ZoneMismatch",
            CostComponent::SkillMismatch => "SkillMismatch",
            CostComponent::Co2 => "Co2",
            CostComponent::ResourceActivation => "ResourceActivation",
            CostComponent::Compactness => "Compactness",
            CostComponent::Unassigned => "Unassigned",
            CostComponent::DoubleBooking => "DoubleBooking",
        }
    }

    pub fn from_name(name: &str) -> Option<CostComponent> {
        CostComponent::ALL
            .into_iter()
            .find(|component| component.name().eq_ignore_ascii_case(name))
    }

    #[inline(always)]
    fn index(self) -> usize {
        self as usize
    }

    fn default_weight(self) -> f64 {
        match self {
            CostComponent::Lateness
            | CostComponent::WorkingHoursExceeded
            | CostComponent::RouteDistanceExceeded
            | CostComponent::SkillMismatch => 10.0,
            CostComponent::UnfulfilledLoad => 50.0,
            CostComponent::Relationship | CostComponent::ZoneMismatch => 100.0,
            CostComponent::CapacityOverload | CostComponent::DoubleBooking => 1000.0,
            CostComponent::LoadOvertime => 5.0,
            _ => 1.0,
        }
    }
}

/// Non-negative multiplier per component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights([f64; NUM_COMPONENTS]);

impl Default for Weights {
    fn default() -> Self {
        let mut weights = [0.0; NUM_COMPONENTS];
        for component in CostComponent::ALL {
            weights[component.index()] = component.default_weight();
        }
        Weights(weights)
    }
}

impl Weights {
    pub fn get(&self, component: CostComponent) -> f64 {
        self.0[component.index()]
    }

    pub fn set(&mut self, component: CostComponent, weight: f64) {
        self.0[component.index()] = weight;
    }
}

/// Raw, unweighted component values split by score level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostVector {
    soft: [f64; NUM_COMPONENTS],
    hard: [f64; NUM_COMPONENTS],
}

impl Default for CostVector {
    fn default() -> Self {
        CostVector::ZERO
    }
}

impl CostVector {
    pub const ZERO: CostVector = CostVector {
        soft: [0.0; NUM_COMPONENTS],
        hard: [0.0; NUM_COMPONENTS],
    };

    #[inline(always)]
    pub fn add_soft(&mut self, component: CostComponent, value: f64) {
        self.soft[component.index()] += value;
    }

    #[inline(always)]
    pub fn add_hard(&mut self, component: CostComponent, value: f64) {
        self.hard[component.index()] += value;
    }

    pub fn soft(&self, component: CostComponent) -> f64 {
        self.soft[component.index()]
    }

    pub fn hard(&self, component: CostComponent) -> f64 {
        self.hard[component.index()]
    }

    pub fn has_hard_violation(&self) -> bool {
        self.hard.iter().any(|&value| value > 0.0)
    }

    pub fn component_score(&self, component: CostComponent, weights: &Weights) -> Score {
        let weight = weights.get(component);
        Score::new(self.hard(component) * weight, self.soft(component) * weight)
    }

    /// Weighted sum over every component regardless of level.
    pub fn total_cost(&self, weights: &Weights) -> f64 {
        CostComponent::ALL
            .into_iter()
            .map(|component| {
                weights.get(component) * (self.soft(component) + self.hard(component))
            })
            .sum()
    }

    pub fn score(&self, weights: &Weights) -> Score {
        CostComponent::ALL
            .into_iter()
            .map(|component| self.component_score(component, weights))
            .sum()
    }

    pub fn analysis(&self, weights: &Weights) -> ScoreAnalysis {
        let mut analysis = ScoreAnalysis::default();
        for component in CostComponent::ALL {
            let score = self.component_score(component, weights);
            if score != Score::ZERO {
                analysis.scores.insert(component.name().to_owned(), score);
            }
        }
        analysis
    }
}

impl AddAssign<&CostVector> for CostVector {
    fn add_assign(&mut self, other: &CostVector) {
        for index in 0..NUM_COMPONENTS {
            self.soft[index] += other.soft[index];
            self.hard[index] += other.hard[index];
        }
    }
}

impl Add<&CostVector> for CostVector {
    type Output = CostVector;

    fn add(mut self, other: &CostVector) -> Self::Output {
        self += other;
        self
    }
}
