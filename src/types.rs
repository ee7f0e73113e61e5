//! Core type definitions for the work allocation engine
//!
//! Identifiers for workers and job categories, passion levels, and the small
//! newtypes used by priority tiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a worker (colonist)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Worker#{}", self.0)
    }
}

/// Stable name of a job category (e.g. "Cooking", "Mining")
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobCategoryId(pub String);

impl JobCategoryId {
    pub fn new(name: impl Into<String>) -> Self {
        JobCategoryId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobCategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobCategoryId {
    fn from(name: &str) -> Self {
        JobCategoryId(name.to_string())
    }
}

/// A category of work, as enumerated by the category source
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobCategory {
    pub id: JobCategoryId,
    /// Position in the host's work order (lower = performed first)
    pub order: u32,
    /// True for work with no relevant skills (hauling, cleaning)
    #[serde(default)]
    pub requires_no_skill: bool,
}

impl JobCategory {
    pub fn new(id: impl Into<String>, order: u32) -> Self {
        JobCategory {
            id: JobCategoryId::new(id),
            order,
            requires_no_skill: false,
        }
    }

    pub fn unskilled(id: impl Into<String>, order: u32) -> Self {
        JobCategory {
            requires_no_skill: true,
            ..JobCategory::new(id, order)
        }
    }
}

/// How much a worker enjoys the skills behind a job category
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Passion {
    #[default]
    None,
    Minor,
    Major,
}

impl Passion {
    /// Multiplier weight applied to the skill average
    pub fn factor(&self) -> f64 {
        match self {
            Passion::None => 0.0,
            Passion::Minor => 1.0,
            Passion::Major => 2.0,
        }
    }
}

/// Priority value written to workers (lower = more urgent)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(pub u32);

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maximum number of job categories a worker may receive within one tier
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobCount(pub u32);

impl fmt::Display for JobCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passion_factor() {
        assert_eq!(Passion::None.factor(), 0.0);
        assert_eq!(Passion::Minor.factor(), 1.0);
        assert_eq!(Passion::Major.factor(), 2.0);
    }

    #[test]
    fn test_category_id_serializes_as_string() {
        let id = JobCategoryId::new("Cooking");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"Cooking\"");
        assert_eq!(id.to_string(), "Cooking");
    }

    #[test]
    fn test_unskilled_category() {
        let hauling = JobCategory::unskilled("Hauling", 12);
        assert!(hauling.requires_no_skill);
        assert_eq!(hauling.order, 12);
    }
}
