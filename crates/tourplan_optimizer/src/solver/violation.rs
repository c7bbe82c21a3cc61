use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Violation classes tracked per node by the auto-filter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub enum ViolationClass {
    LateArrival,
    EarlyArrival,
    RouteDistanceExceeded,
    WorkingHoursExceeded,
    DoubleBooking,
    RelationViolation,
    ResourceMismatch,
    ZoneMismatch,
}

impl ViolationClass {
    pub const ALL: [ViolationClass; 8] = [
        ViolationClass::LateArrival,
        ViolationClass::EarlyArrival,
        ViolationClass::RouteDistanceExceeded,
        ViolationClass::WorkingHoursExceeded,
        ViolationClass::DoubleBooking,
        ViolationClass::RelationViolation,
        ViolationClass::ResourceMismatch,
        ViolationClass::ZoneMismatch,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ViolationClass::LateArrival => "LateArrival",
            ViolationClass::EarlyArrival => "EarlyArrival",
            ViolationClass::RouteDistanceExceeded => "RouteDistanceExceeded",
            ViolationClass::WorkingHoursExceeded => "WorkingHoursExceeded",
            ViolationClass::DoubleBooking => "DoubleBooking",
            ViolationClass::RelationViolation => "RelationViolation",
            ViolationClass::ResourceMismatch => "ResourceMismatch",
            ViolationClass::ZoneMismatch => "ZoneMismatch",
        }
    }

    pub fn from_name(name: &str) -> Option<ViolationClass> {
        ViolationClass::ALL
            .into_iter()
            .find(|class| class.name().eq_ignore_ascii_case(name))
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ViolationSet(u8);

impl ViolationSet {
    pub const EMPTY: ViolationSet = ViolationSet(0);
    pub const ALL: ViolationSet = ViolationSet(u8::MAX);

    pub fn insert(&mut self, class: ViolationClass) {
        self.0 |= class.bit();
    }

    pub fn remove(&mut self, class: ViolationClass) {
        self.0 &= !class.bit();
    }

    pub fn contains(&self, class: ViolationClass) -> bool {
        self.0 & class.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn union(self, other: ViolationSet) -> ViolationSet {
        ViolationSet(self.0 | other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = ViolationClass> + '_ {
        ViolationClass::ALL
            .into_iter()
            .filter(|&class| self.contains(class))
    }
}

impl FromIterator<ViolationClass> for ViolationSet {
    fn from_iter<T: IntoIterator<Item = ViolationClass>>(iter: T) -> Self {
        let mut set = ViolationSet::EMPTY;
        for class in iter {
            set.insert(class);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_set() {
        let mut set = ViolationSet::EMPTY;
        set.insert(ViolationClass::LateArrival);
        set.insert(ViolationClass::ZoneMismatch);

        assert!(set.contains(ViolationClass::LateArrival));
        assert!(!set.contains(ViolationClass::DoubleBooking));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![ViolationClass::LateArrival, ViolationClass::ZoneMismatch]
        );

        set.remove(ViolationClass::LateArrival);
        assert_eq!(set.iter().count(), 1);
        assert!(ViolationSet::ALL.contains(ViolationClass::DoubleBooking));
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            ViolationClass::from_name("latearrival"),
            Some(ViolationClass::LateArrival)
        );
        assert_eq!(ViolationClass::from_name("Unknown"), None);
    }
}
