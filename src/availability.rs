//! Availability calculator
//!
//! How much of a category's population is still unclaimed by the other tiers,
//! and whether the tiers together ask for more than everyone.

use crate::table::AllocationTable;
use crate::types::{JobCategory, JobCategoryId};

/// Summed fractions above this count as over-committed
pub const OVERCOMMIT_THRESHOLD: f64 = 1.0001;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Availability {
    /// Fraction left for the ignored tier, in [0, 1]
    pub remaining: f64,
    /// The category's quantities over all tiers exceed 100%
    pub over_committed: bool,
}

impl AllocationTable {
    /// Room left for `category` in tier `ignore`, counting every other tier
    pub fn availability(&self, category: &JobCategoryId, ignore: Option<usize>) -> Availability {
        let mut taken: f64 = 0.0;
        let mut taken_total: f64 = 0.0;

        for (index, tier) in self.tiers.iter().enumerate() {
            let fraction = tier.quantity(category).as_fraction();
            if Some(index) != ignore {
                taken += fraction;
            }
            taken_total += fraction;
        }

        Availability {
            remaining: (1.0 - taken).max(0.0),
            over_committed: taken_total > OVERCOMMIT_THRESHOLD,
        }
    }

    /// Bound a proposed fraction for (tier, category) to what is still available.
    ///
    /// An already over-committed cell may keep its current value but not grow.
    pub fn clamp_edit(&self, tier: usize, category: &JobCategoryId, proposed: f64) -> f64 {
        let current = self
            .tier(tier)
            .map(|t| t.quantity(category).as_fraction())
            .unwrap_or(0.0);
        let available = self.availability(category, Some(tier)).remaining;
        let proposed = if proposed.is_nan() { 0.0 } else { proposed };
        proposed.clamp(0.0, available.max(current))
    }

    /// Categories whose tiers together exceed 100%, in category order
    pub fn over_committed_categories(&self, categories: &[JobCategory]) -> Vec<JobCategoryId> {
        categories
            .iter()
            .filter(|c| self.availability(&c.id, None).over_committed)
            .map(|c| c.id.clone())
            .collect()
    }
}
