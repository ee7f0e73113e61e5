//! Allocation table - priority tiers, exclusions and important categories
//!
//! The table is the user-owned state of the engine. Tiers are kept dense: every
//! category known to any tier is present in all of them.

use std::collections::{BTreeMap, BTreeSet};

use crate::quantity::Quantity;
use crate::types::{JobCategory, JobCategoryId, JobCount, Priority, WorkerId};

/// One priority tier: a priority value, a per-worker job cap and a quantity per category
#[derive(Clone, Debug, PartialEq)]
pub struct PriorityTier {
    pub priority: Priority,
    pub max_jobs: JobCount,
    pub quantities: BTreeMap<JobCategoryId, Quantity>,
}

impl PriorityTier {
    /// Tier with every category at 0%
    pub fn new(priority: Priority, max_jobs: JobCount, categories: &[JobCategory]) -> Self {
        PriorityTier {
            priority,
            max_jobs,
            quantities: categories
                .iter()
                .map(|c| (c.id.clone(), Quantity::default()))
                .collect(),
        }
    }

    /// Quantity for a category; absent categories read as 0%
    pub fn quantity(&self, category: &JobCategoryId) -> Quantity {
        self.quantities.get(category).copied().unwrap_or_default()
    }
}

/// (category, worker) pairs that must never be assigned
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    pairs: BTreeSet<(JobCategoryId, WorkerId)>,
}

impl ExclusionSet {
    pub fn contains(&self, category: &JobCategoryId, worker: WorkerId) -> bool {
        self.pairs.contains(&(category.clone(), worker))
    }

    pub fn insert(&mut self, category: JobCategoryId, worker: WorkerId) -> bool {
        self.pairs.insert((category, worker))
    }

    pub fn remove(&mut self, category: &JobCategoryId, worker: WorkerId) -> bool {
        self.pairs.remove(&(category.clone(), worker))
    }

    /// Flip one pair; returns whether it is now excluded
    pub fn toggle(&mut self, category: &JobCategoryId, worker: WorkerId) -> bool {
        if self.remove(category, worker) {
            false
        } else {
            self.insert(category.clone(), worker);
            true
        }
    }

    /// Number of categories the worker is excluded from
    pub fn count_for_worker(&self, worker: WorkerId) -> usize {
        self.pairs.iter().filter(|(_, w)| *w == worker).count()
    }

    /// Clear a worker excluded from more than half the categories, otherwise exclude it from all
    pub fn toggle_worker(&mut self, worker: WorkerId, categories: &[JobCategory]) {
        if self.count_for_worker(worker) > categories.len() / 2 {
            self.pairs.retain(|(_, w)| *w != worker);
        } else {
            for category in categories {
                self.pairs.insert((category.id.clone(), worker));
            }
        }
    }

    /// Drop pairs whose worker fails `keep`; returns how many were removed
    pub fn prune<F: Fn(WorkerId) -> bool>(&mut self, keep: F) -> usize {
        let before = self.pairs.len();
        self.pairs.retain(|(_, w)| keep(*w));
        before - self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(JobCategoryId, WorkerId)> {
        self.pairs.iter()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl FromIterator<(JobCategoryId, WorkerId)> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = (JobCategoryId, WorkerId)>>(iter: I) -> Self {
        ExclusionSet {
            pairs: iter.into_iter().collect(),
        }
    }
}

/// Ordered tiers plus the global exclusion set
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AllocationTable {
    pub tiers: Vec<PriorityTier>,
    pub exclusions: ExclusionSet,
    /// Categories filled before all others within each tier
    pub important: BTreeSet<JobCategoryId>,
}

impl AllocationTable {
    pub fn new() -> Self {
        AllocationTable::default()
    }

    /// Append a tier at priority 0 with no job cap and every category at 0%
    pub fn add_tier(&mut self, categories: &[JobCategory]) -> usize {
        let max_jobs = JobCount(categories.len() as u32);
        self.tiers
            .push(PriorityTier::new(Priority(0), max_jobs, categories));
        self.tiers.len() - 1
    }

    pub fn remove_last_tier(&mut self) -> Option<PriorityTier> {
        self.tiers.pop()
    }

    pub fn tier(&self, index: usize) -> Option<&PriorityTier> {
        self.tiers.get(index)
    }

    pub fn set_priority(&mut self, tier: usize, priority: Priority) -> bool {
        match self.tiers.get_mut(tier) {
            Some(t) => {
                t.priority = priority;
                true
            }
            None => false,
        }
    }

    /// Set a tier's job cap, clamped to the number of categories
    pub fn set_max_jobs(&mut self, tier: usize, max_jobs: u32, category_count: usize) -> bool {
        match self.tiers.get_mut(tier) {
            Some(t) => {
                t.max_jobs = JobCount(max_jobs.min(category_count as u32));
                true
            }
            None => false,
        }
    }

    pub fn set_quantity(&mut self, tier: usize, category: &JobCategoryId, quantity: Quantity) -> bool {
        match self.tiers.get_mut(tier) {
            Some(t) => {
                t.quantities.insert(category.clone(), quantity);
                true
            }
            None => false,
        }
    }

    /// Priority values used by more than one tier
    pub fn duplicate_priorities(&self) -> Vec<Priority> {
        let mut seen: BTreeMap<Priority, usize> = BTreeMap::new();
        for tier in &self.tiers {
            *seen.entry(tier.priority).or_insert(0) += 1;
        }
        seen.into_iter()
            .filter(|&(_, n)| n > 1)
            .map(|(p, _)| p)
            .collect()
    }

    /// Add missing categories at 0% so no tier is sparse; returns cells added
    pub fn fill_missing_categories(&mut self, categories: &[JobCategory]) -> usize {
        let mut known: BTreeSet<JobCategoryId> =
            categories.iter().map(|c| c.id.clone()).collect();
        for tier in &self.tiers {
            known.extend(tier.quantities.keys().cloned());
        }

        let mut added = 0;
        for tier in &mut self.tiers {
            for id in &known {
                if !tier.quantities.contains_key(id) {
                    tier.quantities.insert(id.clone(), Quantity::default());
                    added += 1;
                }
            }
        }
        added
    }

    /// Rebind every headcount cell to its category's current population
    pub fn rebind_totals<F: Fn(&JobCategoryId) -> u32>(&mut self, total_for: F) {
        for tier in &mut self.tiers {
            for (id, quantity) in tier.quantities.iter_mut() {
                if quantity.is_number() {
                    *quantity = quantity.rebind(total_for(id));
                }
            }
        }
    }

    pub fn set_important(&mut self, category: &JobCategoryId, important: bool) {
        if important {
            self.important.insert(category.clone());
        } else {
            self.important.remove(category);
        }
    }

    pub fn is_important(&self, category: &JobCategoryId) -> bool {
        self.important.contains(category)
    }
}
