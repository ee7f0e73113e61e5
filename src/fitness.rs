//! Fitness model and per-category ranking
//!
//! Fitness is the worker's average relevant skill, boosted by passion:
//! `skill + skill * passion_factor * passion_multiplier`. Workers who cannot
//! do a category, or are excluded from it, never appear in its ranking.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::SourceError;
use crate::params::AllocationParams;
use crate::source::{WorkerInfo, WorkerSource};
use crate::table::ExclusionSet;
use crate::types::{JobCategory, JobCategoryId, Passion, WorkerId};

/// Result of evaluating one (worker, category) pair
#[derive(Clone, Debug, PartialEq)]
pub enum FitnessOutcome {
    Eligible(f64),
    /// Incapable of the category, or excluded from it
    Ineligible,
    /// The source failed for this pair; treated as ineligible
    Fault(SourceError),
}

/// Passion-adjusted fitness from a skill average; `passion_multiplier` must be >= 0
pub fn passion_adjusted(skill: f64, passion: Passion, passion_multiplier: f64) -> f64 {
    skill + skill * passion.factor() * passion_multiplier
}

/// Fitness of `worker` for `category`
pub fn evaluate<S: WorkerSource + ?Sized>(
    source: &S,
    worker: WorkerId,
    category: &JobCategoryId,
    exclusions: &ExclusionSet,
    params: &AllocationParams,
) -> FitnessOutcome {
    match source.is_capable(worker, category) {
        Ok(true) => {}
        Ok(false) => return FitnessOutcome::Ineligible,
        Err(e) => return FitnessOutcome::Fault(e),
    }
    if exclusions.contains(category, worker) {
        return FitnessOutcome::Ineligible;
    }

    let skill = match source.average_skill(worker, category) {
        Ok(skill) => skill,
        Err(e) => return FitnessOutcome::Fault(e),
    };
    let passion = match source.max_passion(worker, category) {
        Ok(passion) => passion,
        Err(e) => return FitnessOutcome::Fault(e),
    };

    let score = passion_adjusted(skill, passion, params.effective_passion_multiplier());
    if !score.is_finite() || score < 0.0 {
        return FitnessOutcome::Fault(SourceError::Adapter(format!(
            "skill average {} yields unusable fitness",
            skill
        )));
    }
    FitnessOutcome::Eligible(score)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RankedWorker {
    pub worker: WorkerId,
    pub fitness: f64,
}

/// Capable workers and the fitness-ordered list for one category
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CategoryRanking {
    /// Every worker capable of the category, excluded or not
    pub capable: Vec<WorkerId>,
    /// Eligible, non-excluded workers, best first
    pub ranked: Vec<RankedWorker>,
}

impl CategoryRanking {
    pub fn capable_count(&self) -> u32 {
        self.capable.len() as u32
    }
}

/// A fitness evaluation that failed and was skipped
#[derive(Clone, Debug, PartialEq)]
pub struct FitnessFault {
    pub worker: WorkerId,
    pub category: JobCategoryId,
    pub error: SourceError,
}

/// Rankings for every job category, rebuilt from scratch on each rebuild
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FitnessRanking {
    categories: BTreeMap<JobCategoryId, CategoryRanking>,
}

impl FitnessRanking {
    /// Evaluate every assignable worker against every category
    pub fn build<S: WorkerSource + ?Sized>(
        source: &S,
        workers: &[WorkerInfo],
        categories: &[JobCategory],
        exclusions: &ExclusionSet,
        params: &AllocationParams,
    ) -> (FitnessRanking, Vec<FitnessFault>) {
        let mut ranking = FitnessRanking::default();
        let mut faults = Vec::new();

        for category in categories {
            let mut entry = CategoryRanking::default();

            for worker in workers.iter().filter(|w| w.assignable) {
                let outcome = evaluate(source, worker.id, &category.id, exclusions, params);
                match outcome {
                    FitnessOutcome::Eligible(fitness) => {
                        entry.capable.push(worker.id);
                        entry.ranked.push(RankedWorker { worker: worker.id, fitness });
                    }
                    FitnessOutcome::Ineligible => {
                        // Excluded workers still count towards the category's population
                        if exclusions.contains(&category.id, worker.id)
                            && source.is_capable(worker.id, &category.id) == Ok(true)
                        {
                            entry.capable.push(worker.id);
                        }
                    }
                    FitnessOutcome::Fault(error) => {
                        warn!(
                            worker = %worker.label,
                            category = %category.id,
                            %error,
                            "fitness evaluation failed, skipping"
                        );
                        faults.push(FitnessFault {
                            worker: worker.id,
                            category: category.id.clone(),
                            error,
                        });
                    }
                }
            }

            // Stable sort keeps enumeration order among equal scores
            entry.ranked.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
            debug!(
                category = %category.id,
                capable = entry.capable.len(),
                ranked = entry.ranked.len(),
                "ranked category"
            );
            ranking.categories.insert(category.id.clone(), entry);
        }

        (ranking, faults)
    }

    pub fn category(&self, category: &JobCategoryId) -> Option<&CategoryRanking> {
        self.categories.get(category)
    }

    /// Ranked workers for a category, best first
    pub fn ranked(&self, category: &JobCategoryId) -> &[RankedWorker] {
        self.categories
            .get(category)
            .map(|c| c.ranked.as_slice())
            .unwrap_or(&[])
    }

    /// Number of workers capable of a category; the total for headcount quantities
    pub fn capable_count(&self, category: &JobCategoryId) -> u32 {
        self.categories
            .get(category)
            .map(|c| c.capable_count())
            .unwrap_or(0)
    }

    pub fn fitness_of(&self, category: &JobCategoryId, worker: WorkerId) -> Option<f64> {
        self.ranked(category)
            .iter()
            .find(|r| r.worker == worker)
            .map(|r| r.fitness)
    }
}
