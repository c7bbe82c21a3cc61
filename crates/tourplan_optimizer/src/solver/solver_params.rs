use std::str::FromStr;

use jiff::SignedDuration;
use tracing::warn;

use crate::problem::error::ConfigurationError;

use super::{
    cost_model::{CostComponent, Weights},
    properties::PropertyMap,
    violation::{ViolationClass, ViolationSet},
};

#[derive(Clone, Debug, PartialEq)]
pub enum Termination {
    Generations(usize),
    Duration(SignedDuration),
    GenerationsWithoutImprovement(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Threads {
    Single,
    Auto,
    Multi(usize),
}

impl Threads {
    pub fn number_of_threads(&self) -> usize {
        match self {
            Threads::Single => 1,
            Threads::Multi(num) => (*num).max(1),
            Threads::Auto => std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnnealingParams {
    pub iterations: usize,
    pub repetitions: usize,
    pub cooling_rate: f64,
    /// Derived from the construction cost when absent.
    pub initial_temperature: Option<f64>,
}

impl Default for AnnealingParams {
    fn default() -> Self {
        AnnealingParams {
            iterations: 2000,
            repetitions: 2,
            cooling_rate: 0.995,
            initial_temperature: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EvolutionParams {
    pub population_size: usize,
    pub mutation_rate: f64,
    pub ruin_ratio: f64,
    pub relation_nesting_limit: usize,
    pub local_search_iterations: usize,
}

impl Default for EvolutionParams {
    fn default() -> Self {
        EvolutionParams {
            population_size: 8,
            mutation_rate: 0.3,
            ruin_ratio: 0.2,
            relation_nesting_limit: 2,
            local_search_iterations: 200,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AutoFilterParams {
    pub enabled: bool,
    pub threshold: f64,
    pub decay: f64,
    pub warmup_generations: usize,
    pub early_arrival_tolerance: SignedDuration,
    pub classes: ViolationSet,
}

impl Default for AutoFilterParams {
    fn default() -> Self {
        AutoFilterParams {
            enabled: false,
            threshold: 3.0,
            decay: 0.8,
            warmup_generations: 5,
            early_arrival_tolerance: SignedDuration::from_mins(60),
            classes: ViolationSet::ALL,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SolverParams {
    pub terminations: Vec<Termination>,
    pub annealing: AnnealingParams,
    pub evolution: EvolutionParams,
    pub weights: Weights,
    /// Per unit of node importance.
    pub unassigned_penalty: f64,
    pub auto_filter: AutoFilterParams,
    pub threads: Threads,
    pub performance_mode: bool,
    pub seed: u64,
    pub progress_interval: Option<SignedDuration>,
}

impl Default for SolverParams {
    fn default() -> Self {
        SolverParams {
            terminations: vec![Termination::Generations(200)],
            annealing: AnnealingParams::default(),
            evolution: EvolutionParams::default(),
            weights: Weights::default(),
            unassigned_penalty: 10_000.0,
            auto_filter: AutoFilterParams::default(),
            threads: Threads::Single,
            performance_mode: false,
            seed: 0x5eed,
            progress_interval: None,
        }
    }
}

impl SolverParams {
    pub fn max_generations(&self) -> Option<usize> {
        self.terminations.iter().find_map(|termination| match termination {
            Termination::Generations(generations) => Some(*generations),
            _ => None,
        })
    }

    pub fn max_duration(&self) -> Option<SignedDuration> {
        self.terminations.iter().find_map(|termination| match termination {
            Termination::Duration(duration) => Some(*duration),
            _ => None,
        })
    }

    /// Parses the flat property map. Unknown keys are returned as warnings.
    pub fn from_properties(
        properties: &PropertyMap,
    ) -> Result<(SolverParams, Vec<String>), ConfigurationError> {
        let mut params = SolverParams::default();
        let mut warnings = Vec::new();
        let mut generations = 200;
        let mut max_duration = None;
        let mut without_improvement = None;
        let mut selective = None::<ViolationSet>;

        for (key, value) in properties.iter() {
            match key {
                "ExitCondition.Generations" => generations = parse(key, value)?,
                "ExitCondition.MaxDuration" => max_duration = Some(parse_duration(key, value)?),
                "ExitCondition.GenerationsWithoutImprovement" => {
                    without_improvement = Some(parse(key, value)?)
                }
                "Annealing.Iterations" => params.annealing.iterations = parse(key, value)?,
                "Annealing.Repetitions" => params.annealing.repetitions = parse(key, value)?,
                "Annealing.CoolingRate" => {
                    params.annealing.cooling_rate = parse_fraction(key, value, false)?
                }
                "Annealing.InitialTemperature" => {
                    params.annealing.initial_temperature = Some(parse_non_negative(key, value)?)
                }
                "Evolution.PopulationSize" => {
                    params.evolution.population_size = parse::<usize>(key, value)?.max(1)
                }
                "Evolution.MutationRate" => {
                    params.evolution.mutation_rate = parse_fraction(key, value, true)?
                }
                "Evolution.RuinRatio" => {
                    params.evolution.ruin_ratio = parse_fraction(key, value, true)?
                }
                "Evolution.RelationNestingLimit" => {
                    params.evolution.relation_nesting_limit = parse(key, value)?
                }
                "Evolution.LocalSearchIterations" => {
                    params.evolution.local_search_iterations = parse(key, value)?
                }
                "UnassignedPenalty" => params.unassigned_penalty = parse_non_negative(key, value)?,
                "AutoFilter" => params.auto_filter.enabled = parse_bool(key, value)?,
                "AutoFilter.Threshold" => {
                    params.auto_filter.threshold = parse_non_negative(key, value)?
                }
                "AutoFilter.Decay" => params.auto_filter.decay = parse_fraction(key, value, true)?,
                "AutoFilter.WarmupGenerations" => {
                    params.auto_filter.warmup_generations = parse(key, value)?
                }
                "AutoFilter.EarlyArrivalToleranceMinutes" => {
                    let minutes: i64 = parse(key, value)?;
                    params.auto_filter.early_arrival_tolerance = SignedDuration::from_mins(minutes);
                }
                "NumCPUCores" => {
                    params.threads = match value.trim() {
                        "auto" | "Auto" | "0" => Threads::Auto,
                        "1" => Threads::Single,
                        _ => Threads::Multi(parse(key, value)?),
                    }
                }
                "PerformanceMode" => params.performance_mode = parse_bool(key, value)?,
                "Seed" => params.seed = parse(key, value)?,
                "ProgressIntervalMillis" => {
                    let millis: i64 = parse(key, value)?;
                    params.progress_interval = Some(SignedDuration::from_millis(millis));
                }
                _ => {
                    if let Some(name) = key.strip_prefix("Weight.") {
                        match CostComponent::from_name(name) {
                            Some(component) => {
                                params.weights.set(component, parse_non_negative(key, value)?)
                            }
                            None => warnings.push(format!("Unknown weight component {name}")),
                        }
                    } else if let Some(name) = key.strip_prefix("SelectiveAutoFilter.") {
                        match ViolationClass::from_name(name) {
                            Some(class) => {
                                let set = selective.get_or_insert(ViolationSet::EMPTY);
                                if parse_bool(key, value)? {
                                    set.insert(class);
                                }
                            }
                            None => warnings.push(format!("Unknown violation class {name}")),
                        }
                    } else {
                        warnings.push(format!("Unknown property {key}"));
                    }
                }
            }
        }

        params.terminations = vec![Termination::Generations(generations)];
        if let Some(duration) = max_duration {
            params.terminations.push(Termination::Duration(duration));
        }
        if let Some(generations) = without_improvement {
            params
                .terminations
                .push(Termination::GenerationsWithoutImprovement(generations));
        }
        if let Some(classes) = selective {
            params.auto_filter.classes = classes;
            params.auto_filter.enabled = true;
        }

        for warning in &warnings {
            warn!("{warning}");
        }

        Ok((params, warnings))
    }
}

fn invalid(key: &str, value: &str) -> ConfigurationError {
    ConfigurationError::InvalidProperty {
        key: key.to_owned(),
        value: value.to_owned(),
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigurationError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigurationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn parse_non_negative(key: &str, value: &str) -> Result<f64, ConfigurationError> {
    let parsed: f64 = parse(key, value)?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(invalid(key, value));
    }
    Ok(parsed)
}

fn parse_fraction(key: &str, value: &str, inclusive_zero: bool) -> Result<f64, ConfigurationError> {
    let parsed = parse_non_negative(key, value)?;
    if parsed > 1.0 || (!inclusive_zero && parsed == 0.0) {
        return Err(invalid(key, value));
    }
    Ok(parsed)
}

/// Accepts plain seconds or any duration jiff parses, e.g. `PT5M` or `5m 30s`.
fn parse_duration(key: &str, value: &str) -> Result<SignedDuration, ConfigurationError> {
    let value = value.trim();
    let duration = match value.parse::<i64>() {
        Ok(seconds) => SignedDuration::from_secs(seconds),
        Err(_) => value.parse().map_err(|_| invalid(key, value))?,
    };
    if duration.is_negative() {
        return Err(invalid(key, value));
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let (params, warnings) = SolverParams::from_properties(&PropertyMap::new()).unwrap();
        assert_eq!(params, SolverParams::default());
        assert!(warnings.is_empty());
        assert_eq!(params.max_generations(), Some(200));
    }

    #[test]
    fn test_parses_known_keys() {
        let properties = PropertyMap::new()
            .with("ExitCondition.Generations", 5)
            .with("ExitCondition.MaxDuration", "PT2M")
            .with("Annealing.CoolingRate", 0.9)
            .with("Weight.Distance", 3.5)
            .with("NumCPUCores", 4)
            .with("PerformanceMode", "true")
            .with("SelectiveAutoFilter.LateArrival", "true")
            .with("SelectiveAutoFilter.ZoneMismatch", "false")
            .with("Seed", 42);

        let (params, warnings) = SolverParams::from_properties(&properties).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(
            params.terminations,
            vec![
                Termination::Generations(5),
                Termination::Duration(SignedDuration::from_mins(2))
            ]
        );
        assert_eq!(params.annealing.cooling_rate, 0.9);
        assert_eq!(params.weights.get(CostComponent::Distance), 3.5);
        assert_eq!(params.threads, Threads::Multi(4));
        assert!(params.performance_mode);
        assert!(params.auto_filter.enabled);
        assert!(params.auto_filter.classes.contains(ViolationClass::LateArrival));
        assert!(!params.auto_filter.classes.contains(ViolationClass::ZoneMismatch));
        assert_eq!(params.seed, 42);
    }

    #[test]
    fn test_unknown_keys_warn() {
        let properties = PropertyMap::new()
            .with("JustSomething", 1)
            .with("Weight.Teleportation", 1);

        let (_, warnings) = SolverParams::from_properties(&properties).unwrap();
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_malformed_values_fail() {
        let properties = PropertyMap::new().with("ExitCondition.Generations", "many");
        assert!(matches!(
            SolverParams::from_properties(&properties),
            Err(ConfigurationError::InvalidProperty { .. })
        ));

        let properties = PropertyMap::new().with("Weight.Distance", -1.0);
        assert!(SolverParams::from_properties(&properties).is_err());

        let properties = PropertyMap::new().with("Annealing.CoolingRate", 0);
        assert!(SolverParams::from_properties(&properties).is_err());
    }

    #[test]
    fn test_negative_duration_fails() {
        for value in ["-5", "-PT5S"] {
            let properties = PropertyMap::new().with("ExitCondition.MaxDuration", value);
            assert!(matches!(
                SolverParams::from_properties(&properties),
                Err(ConfigurationError::InvalidProperty { .. })
            ));
        }

        let properties = PropertyMap::new().with("ExitCondition.MaxDuration", "5");
        let (params, _) = SolverParams::from_properties(&properties).unwrap();
        assert!(params.terminations.contains(&Termination::Duration(SignedDuration::from_secs(5))));
    }
}
