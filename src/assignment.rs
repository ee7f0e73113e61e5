//! Job assignment algorithm
//!
//! Turns the allocation table into concrete (worker, category, priority)
//! triples. Tiers are filled one at a time; within a tier each category takes
//! the best-ranked workers that still have room under the tier's job cap and
//! have not already received that category from an earlier tier.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::fitness::FitnessRanking;
use crate::params::{AllocationParams, TierOrder};
use crate::source::PrioritySink;
use crate::table::AllocationTable;
use crate::types::{JobCategory, JobCategoryId, Priority, WorkerId};

/// One priority to be written to a worker
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedAssignment {
    pub worker: WorkerId,
    pub category: JobCategoryId,
    pub priority: Priority,
    /// Index of the tier in the table
    pub tier: usize,
    pub fitness: f64,
}

/// How one (tier, category) cell was filled
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryFill {
    pub tier: usize,
    pub category: JobCategoryId,
    /// Workers the cell asked for
    pub target: u32,
    /// Workers it received
    pub assigned: u32,
}

impl CategoryFill {
    pub fn shortage(&self) -> u32 {
        self.target.saturating_sub(self.assigned)
    }
}

/// Output of the planning pass, before anything is written to workers
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssignmentPlan {
    pub assignments: Vec<PlannedAssignment>,
    pub fills: Vec<CategoryFill>,
}

impl AssignmentPlan {
    pub fn for_category<'a>(
        &'a self,
        category: &'a JobCategoryId,
    ) -> impl Iterator<Item = &'a PlannedAssignment> {
        self.assignments.iter().filter(move |a| &a.category == category)
    }

    /// Number of categories a worker received within one tier
    pub fn jobs_in_tier(&self, worker: WorkerId, tier: usize) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.worker == worker && a.tier == tier)
            .count()
    }

    /// Cells that received fewer workers than they asked for
    pub fn shortages(&self) -> impl Iterator<Item = &CategoryFill> {
        self.fills.iter().filter(|f| f.shortage() > 0)
    }
}

/// Tier indices in processing order
pub fn tier_processing_order(table: &AllocationTable, order: TierOrder) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..table.tiers.len()).collect();
    if order == TierOrder::MostUrgentFirst {
        // Stable: equal priorities keep their stored order
        indices.sort_by_key(|&i| table.tiers[i].priority);
    }
    indices
}

/// Important categories first, then the rest in work order
fn category_processing_order<'a>(
    table: &AllocationTable,
    categories: &'a [JobCategory],
) -> Vec<&'a JobCategory> {
    let mut ordered: Vec<&JobCategory> = categories.iter().collect();
    ordered.sort_by_key(|c| (!table.is_important(&c.id), c.order));
    ordered
}

/// Plan assignments for every tier of the table.
///
/// Pure: reads the table and the rankings and returns what should be written.
pub fn plan_assignments(
    table: &AllocationTable,
    ranking: &FitnessRanking,
    categories: &[JobCategory],
    params: &AllocationParams,
) -> AssignmentPlan {
    let mut plan = AssignmentPlan::default();
    let mut already_assigned: HashSet<(WorkerId, JobCategoryId)> = HashSet::new();
    let category_order = category_processing_order(table, categories);

    for tier_index in tier_processing_order(table, params.tier_order) {
        let tier = &table.tiers[tier_index];
        let max_jobs = tier.max_jobs.0;
        if max_jobs == 0 {
            debug!(tier = tier_index, priority = %tier.priority, "job cap is 0, skipping tier");
            continue;
        }

        let mut jobs_in_tier: HashMap<WorkerId, u32> = HashMap::new();

        for category in &category_order {
            let Some(quantity) = tier.quantities.get(&category.id) else {
                continue;
            };
            if quantity.is_zero() {
                continue;
            }
            let Some(entry) = ranking.category(&category.id) else {
                debug!(category = %category.id, "no ranking for category, skipping");
                continue;
            };

            // Capable workers who still have room in this tier
            let population = entry
                .capable
                .iter()
                .filter(|w| jobs_in_tier.get(*w).copied().unwrap_or(0) < max_jobs)
                .count() as u32;
            let target = quantity.headcount(population);
            if target == 0 {
                continue;
            }

            let mut assigned = 0;
            for candidate in &entry.ranked {
                if assigned >= target {
                    break;
                }
                let worker = candidate.worker;
                if table.exclusions.contains(&category.id, worker) {
                    continue;
                }
                if jobs_in_tier.get(&worker).copied().unwrap_or(0) >= max_jobs {
                    continue;
                }
                if already_assigned.contains(&(worker, category.id.clone())) {
                    continue;
                }
                if !category.requires_no_skill && candidate.fitness < params.minimum_fitness {
                    continue;
                }

                plan.assignments.push(PlannedAssignment {
                    worker,
                    category: category.id.clone(),
                    priority: tier.priority,
                    tier: tier_index,
                    fitness: candidate.fitness,
                });
                *jobs_in_tier.entry(worker).or_insert(0) += 1;
                already_assigned.insert((worker, category.id.clone()));
                assigned += 1;
            }

            if assigned < target {
                debug!(
                    tier = tier_index,
                    category = %category.id,
                    wanted = target,
                    assigned,
                    "not enough eligible workers"
                );
            }
            plan.fills.push(CategoryFill {
                tier: tier_index,
                category: category.id.clone(),
                target,
                assigned,
            });
        }
    }

    plan
}

/// A planned write the sink rejected
#[derive(Clone, Debug, PartialEq)]
pub struct AssignmentFault {
    pub worker: WorkerId,
    pub category: JobCategoryId,
    pub error: SourceError,
}

/// Result of job assignment
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssignmentReport {
    pub plan: AssignmentPlan,
    /// Writes the sink accepted
    pub applied: usize,
    pub faults: Vec<AssignmentFault>,
}

impl AssignmentReport {
    pub fn total_planned(&self) -> usize {
        self.plan.assignments.len()
    }
}

/// Push every planned assignment to the sink; failed writes are logged and skipped
pub fn apply_plan<S: PrioritySink + ?Sized>(plan: AssignmentPlan, sink: &mut S) -> AssignmentReport {
    let mut report = AssignmentReport::default();

    for assignment in &plan.assignments {
        match sink.set_priority(assignment.worker, &assignment.category, assignment.priority) {
            Ok(()) => report.applied += 1,
            Err(error) => {
                warn!(
                    worker = %assignment.worker,
                    category = %assignment.category,
                    %error,
                    "failed to set priority, skipping"
                );
                report.faults.push(AssignmentFault {
                    worker: assignment.worker,
                    category: assignment.category.clone(),
                    error,
                });
            }
        }
    }

    info!(
        planned = plan.assignments.len(),
        applied = report.applied,
        failed = report.faults.len(),
        "assigned priorities"
    );
    report.plan = plan;
    report
}
