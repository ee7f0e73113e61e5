//! Capability interfaces exposed by the host simulation
//!
//! The engine never touches live host objects. It asks a source for job
//! categories and workers, queries skill data per (worker, category), and
//! writes priorities back through a sink.

use crate::error::SourceError;
use crate::types::{JobCategory, JobCategoryId, Passion, Priority, WorkerId};

/// Worker as enumerated on a rebuild
#[derive(Clone, Debug, PartialEq)]
pub struct WorkerInfo {
    pub id: WorkerId,
    /// Display label used in logs and reports
    pub label: String,
    /// False for animals and other non-colonist pawns
    pub assignable: bool,
}

/// Enumerates job categories
pub trait CategorySource {
    /// All job categories, in the host's work order
    fn job_categories(&self) -> Vec<JobCategory>;
}

/// Enumerates workers and exposes their skill data
pub trait WorkerSource {
    fn workers(&self) -> Vec<WorkerInfo>;

    /// Binary gate independent of skill (e.g. a pacifist cannot hunt)
    fn is_capable(&self, worker: WorkerId, category: &JobCategoryId) -> Result<bool, SourceError>;

    /// Average level of the skills relevant to `category`
    fn average_skill(&self, worker: WorkerId, category: &JobCategoryId) -> Result<f64, SourceError>;

    /// Highest passion among the skills relevant to `category`
    fn max_passion(&self, worker: WorkerId, category: &JobCategoryId) -> Result<Passion, SourceError>;
}

/// Receives the priorities chosen by the assigner
pub trait PrioritySink {
    fn set_priority(
        &mut self,
        worker: WorkerId,
        category: &JobCategoryId,
        priority: Priority,
    ) -> Result<(), SourceError>;
}
