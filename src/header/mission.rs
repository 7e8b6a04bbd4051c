// src/header/mission.rs
use crate::error::{DbdError, Result};
use std::collections::HashSet;

/// Mission include/exclude filter, compared case-insensitively
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MissionFilter {
    #[default]
    All,
    Include(HashSet<String>),
    Exclude(HashSet<String>),
}

impl MissionFilter {
    /// Build a filter from skip and keep lists; giving both is an error
    pub fn new<S: AsRef<str>>(skip: &[S], keep: &[S]) -> Result<Self> {
        match (skip.is_empty(), keep.is_empty()) {
            (true, true) => Ok(MissionFilter::All),
            (false, true) => Ok(MissionFilter::exclude(skip)),
            (true, false) => Ok(MissionFilter::include(keep)),
            (false, false) => Err(DbdError::ConflictingMissionFilters),
        }
    }

    pub fn include<S: AsRef<str>>(missions: &[S]) -> Self {
        MissionFilter::Include(lowercase_set(missions))
    }

    pub fn exclude<S: AsRef<str>>(missions: &[S]) -> Self {
        MissionFilter::Exclude(lowercase_set(missions))
    }

    pub fn accepts(&self, mission: &str) -> bool {
        let mission = mission.to_lowercase();
        match self {
            MissionFilter::All => true,
            MissionFilter::Include(set) => set.contains(&mission),
            MissionFilter::Exclude(set) => !set.contains(&mission),
        }
    }
}

fn lowercase_set<S: AsRef<str>>(names: &[S]) -> HashSet<String> {
    names.iter().map(|s| s.as_ref().to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_filters() {
        let keep = MissionFilter::include(&["Micro.MI"]);
        assert!(keep.accepts("MICRO.MI"));
        assert!(!keep.accepts("status.mi"));

        let skip = MissionFilter::exclude(&["STATUS.MI", "lastgasp.mi"]);
        assert!(!skip.accepts("status.mi"));
        assert!(!skip.accepts("LASTGASP.MI"));
        assert!(skip.accepts("micro.mi"));

        assert!(MissionFilter::All.accepts("anything"));
    }

    #[test]
    fn test_both_lists_rejected() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            MissionFilter::new(&["a"], &["b"]),
            Err(DbdError::ConflictingMissionFilters)
        ));
        assert_eq!(MissionFilter::new(&empty, &empty).unwrap(), MissionFilter::All);
        assert!(matches!(MissionFilter::new(&["a"], &empty).unwrap(), MissionFilter::Exclude(_)));
    }
}
