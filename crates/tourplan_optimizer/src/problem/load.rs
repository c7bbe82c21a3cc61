use jiff::SignedDuration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::define_index_newtype;

define_index_newtype!(GoodIdx, Good);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Good {
    name: String,
}

impl Good {
    pub fn new(name: impl Into<String>) -> Self {
        Good { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Quantity range a flexible load may be resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LoadBounds {
    pub min: f64,
    pub max: f64,
}

impl LoadBounds {
    pub fn new(min: f64, max: f64) -> Self {
        LoadBounds { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// Signed convention: a positive delta adds goods to the resource, a negative one removes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum LoadKind {
    Fixed {
        delta: f64,
    },
    /// Deliver between `min` and `max` units. Bounds are magnitudes.
    RequestFlex(LoadBounds),
    /// Pick up between `min` and `max` units. Bounds are magnitudes.
    SupplyFlex(LoadBounds),
    /// Signed delta anywhere inside the bounds.
    MixedFlex(LoadBounds),
    /// Pick up, then drop off within `max_duration`.
    TimedSupplyFlex {
        bounds: LoadBounds,
        max_duration: SignedDuration,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Load {
    pub good: String,
    pub kind: LoadKind,
    #[serde(default)]
    pub fuzzy: bool,
    #[serde(default = "default_priority")]
    pub priority: u32,
}

fn default_priority() -> u32 {
    1
}

impl Load {
    pub fn request(good: impl Into<String>, quantity: f64) -> Self {
        Load::new(good, LoadKind::Fixed { delta: -quantity })
    }

    pub fn supply(good: impl Into<String>, quantity: f64) -> Self {
        Load::new(good, LoadKind::Fixed { delta: quantity })
    }

    pub fn new(good: impl Into<String>, kind: LoadKind) -> Self {
        Load {
            good: good.into(),
            kind,
            fuzzy: false,
            priority: default_priority(),
        }
    }

    pub fn fuzzy(mut self) -> Self {
        self.fuzzy = true;
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        match &self.kind {
            LoadKind::Fixed { delta } if !delta.is_finite() => Err("quantity is not finite"),
            LoadKind::RequestFlex(bounds) | LoadKind::SupplyFlex(bounds)
                if !bounds.is_valid() || bounds.min < 0.0 =>
            {
                Err("flex bounds must be non-negative and ordered")
            }
            LoadKind::MixedFlex(bounds) if !bounds.is_valid() => Err("flex bounds are not ordered"),
            LoadKind::TimedSupplyFlex {
                bounds,
                max_duration,
            } if !bounds.is_valid() || bounds.min < 0.0 || max_duration.is_negative() => {
                Err("timed bounds must be non-negative and ordered")
            }
            _ => Ok(()),
        }
    }
}

/// Node side pickup and delivery bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NodeDepot {
    pub loads: Vec<Load>,
}

/// Resource side capacity pool for one good.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LoadCapacity {
    pub good: String,
    #[serde(default)]
    pub initial_level: f64,
    pub max_capacity: f64,
    #[serde(default = "default_space_factor")]
    pub space_factor: f64,
}

fn default_space_factor() -> f64 {
    1.0
}

impl LoadCapacity {
    pub fn new(good: impl Into<String>, max_capacity: f64) -> Self {
        LoadCapacity {
            good: good.into(),
            initial_level: 0.0,
            max_capacity,
            space_factor: default_space_factor(),
        }
    }

    pub fn with_initial_level(mut self, level: f64) -> Self {
        self.initial_level = level;
        self
    }

    pub fn with_space_factor(mut self, factor: f64) -> Self {
        self.space_factor = factor;
        self
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.max_capacity.is_finite() || self.max_capacity < 0.0 {
            return Err("maximum capacity must be a non-negative number");
        }
        if !self.initial_level.is_finite() || self.initial_level < 0.0 {
            return Err("initial level must be a non-negative number");
        }
        if self.initial_level > self.max_capacity {
            return Err("initial level exceeds maximum capacity");
        }
        if !self.space_factor.is_finite() || self.space_factor <= 0.0 {
            return Err("space factor must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResourceDepot {
    pub capacities: Vec<LoadCapacity>,
    pub total_capacity: f64,
}

impl ResourceDepot {
    pub fn new(total_capacity: f64) -> Self {
        ResourceDepot {
            capacities: Vec::new(),
            total_capacity,
        }
    }

    pub fn with_capacity(mut self, capacity: LoadCapacity) -> Self {
        self.capacities.push(capacity);
        self
    }

    pub fn initial_volume(&self) -> f64 {
        self.capacities
            .iter()
            .map(|capacity| capacity.initial_level * capacity.space_factor)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_and_supply_sign() {
        assert_eq!(Load::request("TV", 3.0).kind, LoadKind::Fixed { delta: -3.0 });
        assert_eq!(Load::supply("TV", 3.0).kind, LoadKind::Fixed { delta: 3.0 });
    }

    #[test]
    fn test_capacity_validation() {
        assert!(LoadCapacity::new("Fridge", 15.0).validate().is_ok());
        assert!(LoadCapacity::new("Fridge", -1.0).validate().is_err());
        assert!(
            LoadCapacity::new("Fridge", 5.0)
                .with_initial_level(6.0)
                .validate()
                .is_err()
        );
        assert!(
            LoadCapacity::new("Fridge", 5.0)
                .with_space_factor(0.0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_load_validation() {
        assert!(
            Load::new("TV", LoadKind::RequestFlex(LoadBounds::new(2.0, 1.0)))
                .validate()
                .is_err()
        );
        assert!(
            Load::new("TV", LoadKind::MixedFlex(LoadBounds::new(-2.0, 1.0)))
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_initial_volume() {
        let depot = ResourceDepot::new(15.0)
            .with_capacity(LoadCapacity::new("Fridge", 15.0).with_initial_level(2.0))
            .with_capacity(
                LoadCapacity::new("TV", 15.0)
                    .with_initial_level(4.0)
                    .with_space_factor(0.5),
            );
        assert_eq!(depot.initial_volume(), 4.0);
    }
}
