use crate::problem::node::NodeIdx;

use super::{
    solver_params::AutoFilterParams,
    violation::{ViolationClass, ViolationSet},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterState {
    Active,
    Filtered,
    Restored,
}

/// A node that crossed the threshold in the last observation.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterDecision {
    pub node: NodeIdx,
    pub reasons: Vec<ViolationClass>,
}

/// Decayed violation counters per node and class.
///
/// Counters decay geometrically and grow by one on every observed
/// violation, so a node has to keep violating a class for several
/// generations before it crosses the threshold. Filtering is sticky:
/// only an explicit restore brings a node back, with fresh counters.
pub struct AutoFilter {
    params: AutoFilterParams,
    counters: Vec<[f64; ViolationClass::ALL.len()]>,
    states: Vec<FilterState>,
    observations: usize,
}

impl AutoFilter {
    pub fn new(params: &AutoFilterParams, num_nodes: usize) -> Self {
        AutoFilter {
            params: params.clone(),
            counters: vec![[0.0; ViolationClass::ALL.len()]; num_nodes],
            states: vec![FilterState::Active; num_nodes],
            observations: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.params.enabled
    }

    pub fn state(&self, node: NodeIdx) -> FilterState {
        self.states[node.get()]
    }

    pub fn counter(&self, node: NodeIdx, class: ViolationClass) -> f64 {
        self.counters[node.get()][class as usize]
    }

    /// Feeds the per node violations of one generation and returns the newly filtered nodes.
    pub fn observe(&mut self, violations: &[ViolationSet]) -> Vec<FilterDecision> {
        if !self.params.enabled {
            return Vec::new();
        }

        self.observations += 1;
        let warmed_up = self.observations > self.params.warmup_generations;
        let mut decisions = Vec::new();

        for (index, (counters, observed)) in self.counters.iter_mut().zip(violations).enumerate() {
            if self.states[index] == FilterState::Filtered {
                continue;
            }

            let mut reasons = Vec::new();
            for class in self.params.classes.iter() {
                let counter = &mut counters[class as usize];
                *counter *= self.params.decay;
                if observed.contains(class) {
                    *counter += 1.0;
                }
                if *counter >= self.params.threshold {
                    reasons.push(class);
                }
            }

            if warmed_up && !reasons.is_empty() {
                self.states[index] = FilterState::Filtered;
                decisions.push(FilterDecision {
                    node: NodeIdx::new(index),
                    reasons,
                });
            }
        }

        decisions
    }

    /// Re-activates a filtered node. Returns false if the node was not filtered.
    pub fn restore(&mut self, node: NodeIdx) -> bool {
        if self.states[node.get()] != FilterState::Filtered {
            return false;
        }
        self.states[node.get()] = FilterState::Restored;
        self.counters[node.get()] = [0.0; ViolationClass::ALL.len()];
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> AutoFilterParams {
        AutoFilterParams {
            enabled: true,
            threshold: 2.0,
            decay: 0.5,
            warmup_generations: 1,
            ..AutoFilterParams::default()
        }
    }

    fn late() -> ViolationSet {
        [ViolationClass::LateArrival].into_iter().collect()
    }

    #[test]
    fn test_filters_after_repeated_violations() {
        let mut filter = AutoFilter::new(&params(), 2);
        let observed = vec![late(), ViolationSet::EMPTY];

        // 1, 1.5, 1.75, 1.875, ... reaches 2 only in the limit
        assert!(filter.observe(&observed).is_empty());
        assert!(filter.observe(&observed).is_empty());

        let mut filter = AutoFilter::new(
            &AutoFilterParams {
                decay: 1.0,
                ..params()
            },
            2,
        );
        assert!(filter.observe(&observed).is_empty());
        let decisions = filter.observe(&observed);
        assert_eq!(
            decisions,
            vec![FilterDecision {
                node: NodeIdx::new(0),
                reasons: vec![ViolationClass::LateArrival],
            }]
        );
        assert_eq!(filter.state(NodeIdx::new(0)), FilterState::Filtered);
        assert_eq!(filter.state(NodeIdx::new(1)), FilterState::Active);

        // sticky
        assert!(filter.observe(&observed).is_empty());
    }

    #[test]
    fn test_intermittent_violation_decays() {
        let mut filter = AutoFilter::new(&params(), 1);
        for generation in 0..20 {
            let observed = if generation % 2 == 0 {
                vec![late()]
            } else {
                vec![ViolationSet::EMPTY]
            };
            assert!(filter.observe(&observed).is_empty());
        }
        assert!(filter.counter(NodeIdx::new(0), ViolationClass::LateArrival) < 2.0);
    }

    #[test]
    fn test_selective_classes_and_restore() {
        let mut filter = AutoFilter::new(
            &AutoFilterParams {
                decay: 1.0,
                classes: [ViolationClass::ZoneMismatch].into_iter().collect(),
                ..params()
            },
            1,
        );
        for _ in 0..5 {
            assert!(filter.observe(&[late()]).is_empty());
        }

        let zone: ViolationSet = [ViolationClass::ZoneMismatch].into_iter().collect();
        filter.observe(&[zone]);
        assert_eq!(filter.observe(&[zone]).len(), 1);

        assert!(filter.restore(NodeIdx::new(0)));
        assert!(!filter.restore(NodeIdx::new(0)));
        assert_eq!(filter.state(NodeIdx::new(0)), FilterState::Restored);
        assert_eq!(filter.counter(NodeIdx::new(0), ViolationClass::ZoneMismatch), 0.0);
    }

    #[test]
    fn test_disabled_never_filters() {
        let mut filter = AutoFilter::new(&AutoFilterParams::default(), 1);
        for _ in 0..10 {
            assert!(filter.observe(&[late()]).is_empty());
        }
    }
}
