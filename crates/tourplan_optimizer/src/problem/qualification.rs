use fixedbitset::FixedBitSet;
use fxhash::FxHashMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(tag = "kind", content = "value")]
pub enum ZoneCode {
    Postcode(String),
    ZoneNumber(u32),
    Named(String),
}

/// A capability offered by a resource's working hours or by a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum Qualification {
    Type { tag: String },
    LeveledType { tag: String, level: u32 },
    Zone { code: ZoneCode },
}

impl Qualification {
    pub fn of_type(tag: impl Into<String>) -> Self {
        Qualification::Type { tag: tag.into() }
    }

    pub fn leveled(tag: impl Into<String>, level: u32) -> Self {
        Qualification::LeveledType {
            tag: tag.into(),
            level,
        }
    }

    pub fn zone(code: ZoneCode) -> Self {
        Qualification::Zone { code }
    }

    fn tag(&self) -> Option<&str> {
        match self {
            Qualification::Type { tag } | Qualification::LeveledType { tag, .. } => Some(tag),
            Qualification::Zone { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum LevelMode {
    /// Offered level must be at least the required level.
    #[default]
    Minimum,
    /// Offered level must be at most the required level.
    Maximum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum LevelCostModel {
    #[default]
    NoPenalty,
    /// Cost grows with the distance to the best level offered anywhere.
    FavorHighest,
    /// Cost grows with the distance to the required level.
    FavorClosest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum RequirementKind {
    Type {
        tag: String,
    },
    LeveledType {
        tag: String,
        level: u32,
        #[serde(default)]
        mode: LevelMode,
        #[serde(default)]
        cost_model: LevelCostModel,
    },
    Zone {
        codes: Vec<ZoneCode>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Requirement {
    #[serde(flatten)]
    pub kind: RequirementKind,
    #[serde(default = "default_hard")]
    pub hard: bool,
}

fn default_hard() -> bool {
    true
}

impl Requirement {
    pub fn of_type(tag: impl Into<String>, hard: bool) -> Self {
        Requirement {
            kind: RequirementKind::Type { tag: tag.into() },
            hard,
        }
    }

    pub fn min_level(tag: impl Into<String>, level: u32, hard: bool) -> Self {
        Requirement {
            kind: RequirementKind::LeveledType {
                tag: tag.into(),
                level,
                mode: LevelMode::Minimum,
                cost_model: LevelCostModel::NoPenalty,
            },
            hard,
        }
    }

    pub fn max_level(tag: impl Into<String>, level: u32, hard: bool) -> Self {
        Requirement {
            kind: RequirementKind::LeveledType {
                tag: tag.into(),
                level,
                mode: LevelMode::Maximum,
                cost_model: LevelCostModel::NoPenalty,
            },
            hard,
        }
    }

    pub fn zone(codes: Vec<ZoneCode>, hard: bool) -> Self {
        Requirement {
            kind: RequirementKind::Zone { codes },
            hard,
        }
    }

    pub fn with_cost_model(mut self, model: LevelCostModel) -> Self {
        if let RequirementKind::LeveledType { cost_model, .. } = &mut self.kind {
            *cost_model = model;
        }
        self
    }

    pub fn is_zone(&self) -> bool {
        matches!(self.kind, RequirementKind::Zone { .. })
    }

    fn tag(&self) -> Option<&str> {
        match &self.kind {
            RequirementKind::Type { tag } | RequirementKind::LeveledType { tag, .. } => Some(tag),
            RequirementKind::Zone { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOutcome {
    /// Pairing allowed. Only a failed hard requirement makes this false.
    pub feasible: bool,
    /// Requirement met without falling back to a soft penalty.
    pub satisfied: bool,
    pub cost: f64,
}

impl MatchOutcome {
    pub const SATISFIED: MatchOutcome = MatchOutcome {
        feasible: true,
        satisfied: true,
        cost: 0.0,
    };

    fn unmet(hard: bool, cost: f64) -> Self {
        MatchOutcome {
            feasible: !hard,
            satisfied: false,
            cost,
        }
    }
}

/// What an offer provides for a single requirement.
struct Offered {
    has_tag: bool,
    level: Option<u32>,
    zone_hit: bool,
}

fn score(requirement: &Requirement, offered: Offered, global_max_level: u32) -> MatchOutcome {
    match &requirement.kind {
        RequirementKind::Type { .. } => {
            if offered.has_tag {
                MatchOutcome::SATISFIED
            } else {
                MatchOutcome::unmet(requirement.hard, 1.0)
            }
        }
        RequirementKind::LeveledType {
            level: required,
            mode,
            cost_model,
            ..
        } => {
            let Some(level) = offered.level else {
                return MatchOutcome::unmet(requirement.hard, f64::from((*required).max(1)));
            };

            let within = match mode {
                LevelMode::Minimum => level >= *required,
                LevelMode::Maximum => level <= *required,
            };

            if !within {
                return MatchOutcome::unmet(
                    requirement.hard,
                    f64::from(level.abs_diff(*required)),
                );
            }

            let cost = match cost_model {
                LevelCostModel::NoPenalty => 0.0,
                LevelCostModel::FavorHighest => f64::from(global_max_level.saturating_sub(level)),
                LevelCostModel::FavorClosest => f64::from(level.abs_diff(*required)),
            };

            MatchOutcome {
                feasible: true,
                satisfied: true,
                cost,
            }
        }
        RequirementKind::Zone { .. } => {
            if offered.zone_hit {
                MatchOutcome::SATISFIED
            } else {
                MatchOutcome::unmet(requirement.hard, 1.0)
            }
        }
    }
}

/// Evaluates one requirement against a plain list of offered qualifications.
pub fn evaluate(
    requirement: &Requirement,
    offered: &[Qualification],
    global_max_level: u32,
) -> MatchOutcome {
    let offered = match &requirement.kind {
        RequirementKind::Type { tag } | RequirementKind::LeveledType { tag, .. } => {
            let level = offered
                .iter()
                .filter_map(|qualification| match qualification {
                    Qualification::LeveledType { tag: t, level } if t == tag => Some(*level),
                    _ => None,
                })
                .max();
            Offered {
                has_tag: level.is_some() || offered.iter().any(|q| q.tag() == Some(tag)),
                level,
                zone_hit: false,
            }
        }
        RequirementKind::Zone { codes } => Offered {
            has_tag: false,
            level: None,
            zone_hit: offered.iter().any(|qualification| {
                matches!(qualification, Qualification::Zone { code } if codes.contains(code))
            }),
        },
    };

    score(requirement, offered, global_max_level)
}

/// Hard requirements that no single offer could ever satisfy together.
/// Returns the conflicting tag.
pub fn find_contradiction(requirements: &[Requirement]) -> Option<String> {
    let mut bounds: FxHashMap<&str, (u32, u32)> = FxHashMap::default();
    let mut zones: Option<Vec<&ZoneCode>> = None;

    for requirement in requirements.iter().filter(|r| r.hard) {
        match &requirement.kind {
            RequirementKind::LeveledType {
                tag, level, mode, ..
            } => {
                let entry = bounds.entry(tag).or_insert((0, u32::MAX));
                match mode {
                    LevelMode::Minimum => entry.0 = entry.0.max(*level),
                    LevelMode::Maximum => entry.1 = entry.1.min(*level),
                }
                if entry.0 > entry.1 {
                    return Some(tag.clone());
                }
            }
            RequirementKind::Zone { codes } => {
                let next = match zones.take() {
                    None => codes.iter().collect::<Vec<_>>(),
                    Some(previous) => previous
                        .into_iter()
                        .filter(|code| codes.contains(code))
                        .collect(),
                };
                if next.is_empty() {
                    return Some(String::from("zone"));
                }
                zones = Some(next);
            }
            RequirementKind::Type { .. } => {}
        }
    }

    None
}

/// Maps qualification tags to dense bit positions and tracks the highest level offered per tag.
#[derive(Debug, Default, Clone)]
pub struct QualificationDictionary {
    keys: FxHashMap<String, usize>,
    max_levels: Vec<u32>,
}

impl QualificationDictionary {
    pub fn register_offer(&mut self, qualifications: &[Qualification]) {
        for qualification in qualifications {
            if let Some(tag) = qualification.tag() {
                let key = self.key_or_insert(tag);
                if let Qualification::LeveledType { level, .. } = qualification {
                    self.max_levels[key] = self.max_levels[key].max(*level);
                }
            }
        }
    }

    pub fn register_requirements(&mut self, requirements: &[Requirement]) {
        for requirement in requirements {
            if let Some(tag) = requirement.tag() {
                self.key_or_insert(tag);
            }
        }
    }

    fn key_or_insert(&mut self, tag: &str) -> usize {
        if let Some(&key) = self.keys.get(tag) {
            return key;
        }
        let key = self.keys.len();
        self.keys.insert(tag.to_owned(), key);
        self.max_levels.push(0);
        key
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn max_level(&self, key: usize) -> u32 {
        self.max_levels[key]
    }

    pub fn compile_offer(&self, qualifications: &[Qualification]) -> CompiledOffer {
        let mut bits = FixedBitSet::with_capacity(self.len());
        let mut levels = SmallVec::new();
        let mut zones = SmallVec::new();

        for qualification in qualifications {
            match qualification {
                Qualification::Type { tag } => {
                    if let Some(&key) = self.keys.get(tag) {
                        bits.insert(key);
                    }
                }
                Qualification::LeveledType { tag, level } => {
                    if let Some(&key) = self.keys.get(tag) {
                        bits.insert(key);
                        levels.push((key, *level));
                    }
                }
                Qualification::Zone { code } => zones.push(code.clone()),
            }
        }

        CompiledOffer {
            bits,
            levels,
            zones,
        }
    }

    pub fn compile_requirements(&self, requirements: &[Requirement]) -> CompiledRequirements {
        let mut hard_bits = FixedBitSet::with_capacity(self.len());
        let mut entries = Vec::with_capacity(requirements.len());

        for requirement in requirements {
            let key = requirement.tag().and_then(|tag| self.keys.get(tag).copied());
            if requirement.hard
                && let Some(key) = key
            {
                hard_bits.insert(key);
            }
            entries.push(CompiledRequirement {
                key,
                requirement: requirement.clone(),
            });
        }

        CompiledRequirements { hard_bits, entries }
    }
}

#[derive(Debug, Clone)]
pub struct CompiledOffer {
    bits: FixedBitSet,
    levels: SmallVec<[(usize, u32); 4]>,
    zones: SmallVec<[ZoneCode; 2]>,
}

impl CompiledOffer {
    /// Highest level offered for `key`, whatever the requirement mode.
    /// A tag listed at several levels is judged by its top level.
    fn level(&self, key: usize) -> Option<u32> {
        self.levels
            .iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, level)| *level)
            .max()
    }
}

#[derive(Debug, Clone)]
struct CompiledRequirement {
    key: Option<usize>,
    requirement: Requirement,
}

#[derive(Debug, Clone, Default)]
pub struct CompiledRequirements {
    hard_bits: FixedBitSet,
    entries: Vec<CompiledRequirement>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchSummary {
    pub feasible: bool,
    pub skill_cost: f64,
    pub zone_cost: f64,
    pub skill_satisfied: bool,
    pub zone_satisfied: bool,
}

impl MatchSummary {
    pub const EMPTY: MatchSummary = MatchSummary {
        feasible: true,
        skill_cost: 0.0,
        zone_cost: 0.0,
        skill_satisfied: true,
        zone_satisfied: true,
    };

    /// A hard failure. Only the class of the failing requirement is marked unsatisfied.
    fn rejected(zone: bool) -> MatchSummary {
        MatchSummary {
            feasible: false,
            skill_cost: 0.0,
            zone_cost: 0.0,
            skill_satisfied: zone,
            zone_satisfied: !zone,
        }
    }

    pub fn merge(self, other: MatchSummary) -> MatchSummary {
        MatchSummary {
            feasible: self.feasible && other.feasible,
            skill_cost: self.skill_cost + other.skill_cost,
            zone_cost: self.zone_cost + other.zone_cost,
            skill_satisfied: self.skill_satisfied && other.skill_satisfied,
            zone_satisfied: self.zone_satisfied && other.zone_satisfied,
        }
    }
}

impl CompiledRequirements {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Scores every requirement against an offer after a bitset inclusion check on hard keys.
    pub fn match_offer(
        &self,
        offer: &CompiledOffer,
        dictionary: &QualificationDictionary,
    ) -> MatchSummary {
        if self.entries.is_empty() {
            return MatchSummary::EMPTY;
        }

        if !self.hard_bits.is_subset(&offer.bits) {
            return MatchSummary::rejected(false);
        }

        let mut summary = MatchSummary::EMPTY;
        for entry in &self.entries {
            let requirement = &entry.requirement;
            let offered = match (&requirement.kind, entry.key) {
                (RequirementKind::Zone { codes }, _) => Offered {
                    has_tag: false,
                    level: None,
                    zone_hit: offer.zones.iter().any(|code| codes.contains(code)),
                },
                (_, Some(key)) => Offered {
                    has_tag: offer.bits.contains(key),
                    level: offer.level(key),
                    zone_hit: false,
                },
                (_, None) => Offered {
                    has_tag: false,
                    level: None,
                    zone_hit: false,
                },
            };

            let global_max = entry.key.map(|key| dictionary.max_level(key)).unwrap_or(0);
            let outcome = score(requirement, offered, global_max);

            summary.feasible &= outcome.feasible;
            if requirement.is_zone() {
                summary.zone_cost += outcome.cost;
                summary.zone_satisfied &= outcome.satisfied;
            } else {
                summary.skill_cost += outcome.cost;
                summary.skill_satisfied &= outcome.satisfied;
            }

            if !summary.feasible {
                return MatchSummary::rejected(requirement.is_zone());
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_requirement() {
        let offered = vec![Qualification::of_type("Electrician")];

        let hard = Requirement::of_type("Electrician", true);
        assert_eq!(evaluate(&hard, &offered, 0), MatchOutcome::SATISFIED);

        let missing = Requirement::of_type("Plumber", true);
        let outcome = evaluate(&missing, &offered, 0);
        assert!(!outcome.feasible);
        assert!(!outcome.satisfied);

        let soft = Requirement::of_type("Plumber", false);
        let outcome = evaluate(&soft, &offered, 0);
        assert!(outcome.feasible);
        assert!(!outcome.satisfied);
        assert_eq!(outcome.cost, 1.0);
    }

    #[test]
    fn test_minimum_expertise_level() {
        let requirement = Requirement::min_level("Expertise", 8, true);

        for (level, feasible) in [(10, true), (2, false), (5, false), (8, true)] {
            let offered = vec![Qualification::leveled("Expertise", level)];
            assert_eq!(
                evaluate(&requirement, &offered, 10).feasible,
                feasible,
                "level {level}"
            );
        }
    }

    #[test]
    fn test_maximum_mode() {
        let requirement = Requirement::max_level("Noise", 3, true);
        assert!(evaluate(&requirement, &[Qualification::leveled("Noise", 2)], 5).feasible);
        assert!(!evaluate(&requirement, &[Qualification::leveled("Noise", 4)], 5).feasible);
    }

    #[test]
    fn test_level_cost_models() {
        let offered = vec![Qualification::leveled("Expertise", 6)];

        let highest =
            Requirement::min_level("Expertise", 4, false).with_cost_model(LevelCostModel::FavorHighest);
        assert_eq!(evaluate(&highest, &offered, 10).cost, 4.0);

        let closest =
            Requirement::min_level("Expertise", 4, false).with_cost_model(LevelCostModel::FavorClosest);
        assert_eq!(evaluate(&closest, &offered, 10).cost, 2.0);

        let none = Requirement::min_level("Expertise", 4, false);
        assert_eq!(evaluate(&none, &offered, 10).cost, 0.0);
    }

    #[test]
    fn test_zone_requirement() {
        let requirement = Requirement::zone(
            vec![ZoneCode::Postcode("50667".into()), ZoneCode::ZoneNumber(3)],
            true,
        );

        assert!(evaluate(&requirement, &[Qualification::zone(ZoneCode::ZoneNumber(3))], 0).feasible);
        assert!(!evaluate(&requirement, &[Qualification::zone(ZoneCode::ZoneNumber(4))], 0).feasible);
    }

    #[test]
    fn test_compiled_matches_plain_evaluation() {
        let offers = [
            vec![Qualification::leveled("Expertise", 10)],
            vec![Qualification::leveled("Expertise", 2)],
            vec![Qualification::leveled("Expertise", 5), Qualification::of_type("Van")],
        ];
        let requirements = vec![
            Requirement::min_level("Expertise", 8, true).with_cost_model(LevelCostModel::FavorHighest),
            Requirement::of_type("Van", false),
        ];

        let mut dictionary = QualificationDictionary::default();
        for offer in &offers {
            dictionary.register_offer(offer);
        }
        dictionary.register_requirements(&requirements);
        let compiled = dictionary.compile_requirements(&requirements);

        let summaries = offers
            .iter()
            .map(|offer| compiled.match_offer(&dictionary.compile_offer(offer), &dictionary))
            .collect::<Vec<_>>();

        assert!(summaries[0].feasible);
        assert_eq!(summaries[0].skill_cost, 1.0);
        assert!(!summaries[0].skill_satisfied);
        assert!(!summaries[1].feasible);
        assert!(!summaries[2].feasible);
    }

    #[test]
    fn test_fast_reject_on_missing_hard_key() {
        let mut dictionary = QualificationDictionary::default();
        let requirements = vec![Requirement::of_type("Crane", true)];
        dictionary.register_requirements(&requirements);
        let compiled = dictionary.compile_requirements(&requirements);

        let summary = compiled.match_offer(&dictionary.compile_offer(&[]), &dictionary);
        assert!(!summary.feasible);
    }

    #[test]
    fn test_rejection_names_failing_class() {
        let requirements = vec![Requirement::zone(vec![ZoneCode::ZoneNumber(7)], true)];
        let mut dictionary = QualificationDictionary::default();
        dictionary.register_requirements(&requirements);
        let compiled = dictionary.compile_requirements(&requirements);

        let wrong_zone = compiled.match_offer(
            &dictionary.compile_offer(&[Qualification::zone(ZoneCode::ZoneNumber(3))]),
            &dictionary,
        );
        assert!(!wrong_zone.feasible);
        assert!(!wrong_zone.zone_satisfied);
        assert!(wrong_zone.skill_satisfied);

        let crane = vec![Requirement::of_type("Crane", true)];
        dictionary.register_requirements(&crane);
        let missing_skill = dictionary
            .compile_requirements(&crane)
            .match_offer(&dictionary.compile_offer(&[]), &dictionary);
        assert!(!missing_skill.skill_satisfied);
        assert!(missing_skill.zone_satisfied);
    }

    #[test]
    fn test_find_contradiction() {
        let contradicting = vec![
            Requirement::min_level("Expertise", 8, true),
            Requirement::max_level("Expertise", 5, true),
        ];
        assert_eq!(find_contradiction(&contradicting), Some("Expertise".to_owned()));

        let soft = vec![
            Requirement::min_level("Expertise", 8, true),
            Requirement::max_level("Expertise", 5, false),
        ];
        assert_eq!(find_contradiction(&soft), None);

        let zones = vec![
            Requirement::zone(vec![ZoneCode::ZoneNumber(1)], true),
            Requirement::zone(vec![ZoneCode::ZoneNumber(2)], true),
        ];
        assert_eq!(find_contradiction(&zones), Some("zone".to_owned()));
    }
}
