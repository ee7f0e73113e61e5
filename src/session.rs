//! Priority session - owner of the allocation table and rankings
//!
//! A session is driven by the host: `rebuild` re-reads the colony, `assign`
//! writes priorities back, and the editing helpers mutate the table in
//! between. A rebuild computes everything into fresh values and swaps them in
//! at the end, so a session is only ever observed before or after a rebuild.

use tracing::{debug, info, warn};

use crate::assignment::{apply_plan, plan_assignments, AssignmentPlan, AssignmentReport};
use crate::availability::Availability;
use crate::error::PersistenceError;
use crate::fitness::{FitnessFault, FitnessRanking};
use crate::params::AllocationParams;
use crate::persistence::{load_table_or_default, AllocationStore, SaveFile};
use crate::quantity::Quantity;
use crate::source::{CategorySource, PrioritySink, WorkerInfo, WorkerSource};
use crate::table::AllocationTable;
use crate::types::{JobCategory, JobCategoryId, WorkerId};

/// Summary of one rebuild
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RebuildReport {
    pub categories: usize,
    pub workers: usize,
    /// Fitness evaluations skipped because the source failed
    pub faults: Vec<FitnessFault>,
    /// Exclusions dropped because their worker left
    pub pruned_exclusions: usize,
    /// Cells added to keep tiers dense
    pub filled_cells: usize,
}

#[derive(Clone, Debug, Default)]
pub struct PrioritySession {
    params: AllocationParams,
    table: AllocationTable,
    categories: Vec<JobCategory>,
    workers: Vec<WorkerInfo>,
    ranking: FitnessRanking,
}

impl PrioritySession {
    pub fn new(params: AllocationParams) -> Self {
        PrioritySession {
            params,
            ..PrioritySession::default()
        }
    }

    pub fn with_table(params: AllocationParams, table: AllocationTable) -> Self {
        PrioritySession {
            params,
            table,
            ..PrioritySession::default()
        }
    }

    /// Load persisted state (empty on any fault) and rebuild against the source
    pub fn load<St, S>(params: AllocationParams, store: &St, source: &S) -> Self
    where
        St: AllocationStore + ?Sized,
        S: CategorySource + WorkerSource + ?Sized,
    {
        let categories = sorted_categories(source);
        let table = load_table_or_default(store, &categories);
        let mut session = PrioritySession::with_table(params, table);
        session.rebuild(source);
        session
    }

    /// Re-read categories and workers, rank every category and bring the table up to date
    pub fn rebuild<S>(&mut self, source: &S) -> RebuildReport
    where
        S: CategorySource + WorkerSource + ?Sized,
    {
        let categories = sorted_categories(source);
        let workers: Vec<WorkerInfo> = source
            .workers()
            .into_iter()
            .filter(|w| w.assignable)
            .collect();

        let mut table = self.table.clone();
        let pruned_exclusions = table
            .exclusions
            .prune(|id| workers.iter().any(|w| w.id == id));

        let (ranking, faults) =
            FitnessRanking::build(source, &workers, &categories, &table.exclusions, &self.params);

        let filled_cells = table.fill_missing_categories(&categories);
        if filled_cells > 0 {
            info!(cells = filled_cells, "added missing categories to tiers at 0%");
        }
        table.rebind_totals(|id| ranking.capable_count(id));

        for id in table.over_committed_categories(&categories) {
            warn!(category = %id, "category is allocated above 100% across tiers");
        }

        let report = RebuildReport {
            categories: categories.len(),
            workers: workers.len(),
            faults,
            pruned_exclusions,
            filled_cells,
        };
        info!(
            categories = report.categories,
            workers = report.workers,
            faults = report.faults.len(),
            pruned = report.pruned_exclusions,
            "rebuilt fitness rankings"
        );

        self.table = table;
        self.categories = categories;
        self.workers = workers;
        self.ranking = ranking;
        report
    }

    /// Plan assignments from the last rebuild without writing anything
    pub fn plan(&self) -> AssignmentPlan {
        plan_assignments(&self.table, &self.ranking, &self.categories, &self.params)
    }

    /// Plan and write priorities to the sink
    pub fn assign<P: PrioritySink + ?Sized>(&self, sink: &mut P) -> AssignmentReport {
        apply_plan(self.plan(), sink)
    }

    /// Rebuild then assign, as the host's "run" button does
    pub fn run<S>(&mut self, source: &mut S) -> (RebuildReport, AssignmentReport)
    where
        S: CategorySource + WorkerSource + PrioritySink + ?Sized,
    {
        let rebuild = self.rebuild(&*source);
        let assignment = self.assign(source);
        (rebuild, assignment)
    }

    pub fn save<St: AllocationStore + ?Sized>(&self, store: &St) -> Result<(), PersistenceError> {
        store
            .save(&SaveFile::from_table(&self.table))
            .inspect_err(|error| warn!(%error, "unable to save allocation table"))
    }

    pub fn params(&self) -> &AllocationParams {
        &self.params
    }

    pub fn set_params(&mut self, params: AllocationParams) {
        self.params = params;
    }

    pub fn table(&self) -> &AllocationTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut AllocationTable {
        &mut self.table
    }

    pub fn categories(&self) -> &[JobCategory] {
        &self.categories
    }

    pub fn workers(&self) -> &[WorkerInfo] {
        &self.workers
    }

    pub fn ranking(&self) -> &FitnessRanking {
        &self.ranking
    }

    pub fn worker_label(&self, id: WorkerId) -> Option<&str> {
        self.workers
            .iter()
            .find(|w| w.id == id)
            .map(|w| w.label.as_str())
    }

    pub fn availability(&self, category: &JobCategoryId, tier: usize) -> Availability {
        self.table.availability(category, Some(tier))
    }

    pub fn add_tier(&mut self) -> usize {
        self.table.add_tier(&self.categories)
    }

    pub fn remove_last_tier(&mut self) -> bool {
        self.table.remove_last_tier().is_some()
    }

    pub fn set_max_jobs(&mut self, tier: usize, max_jobs: u32) -> bool {
        self.table.set_max_jobs(tier, max_jobs, self.categories.len())
    }

    /// Set a cell from a fraction, clamped to the room other tiers leave.
    ///
    /// The cell keeps its representation: headcount cells store the rounded count.
    pub fn edit_fraction(&mut self, tier: usize, category: &JobCategoryId, fraction: f64) -> Option<Quantity> {
        let current = self.table.tier(tier)?.quantity(category);
        let fraction = self.table.clamp_edit(tier, category, fraction);
        let quantity = match current {
            Quantity::Percent { .. } => Quantity::percent(fraction),
            Quantity::Number { .. } => {
                Quantity::percent(fraction).to_number(self.ranking.capable_count(category))
            }
        };
        self.table.set_quantity(tier, category, quantity);
        Some(quantity)
    }

    /// Flip a cell between percent and headcount, keeping its value
    pub fn switch_representation(&mut self, tier: usize, category: &JobCategoryId) -> Option<Quantity> {
        let current = self.table.tier(tier)?.quantity(category);
        let switched = if current.is_number() {
            current.to_percent()
        } else {
            current.to_number(self.ranking.capable_count(category))
        };
        self.table.set_quantity(tier, category, switched);
        Some(switched)
    }

    /// Returns whether the pair is now excluded
    pub fn toggle_exclusion(&mut self, category: &JobCategoryId, worker: WorkerId) -> bool {
        let excluded = self.table.exclusions.toggle(category, worker);
        debug!(%worker, %category, excluded, "toggled exclusion");
        excluded
    }

    pub fn toggle_worker_exclusions(&mut self, worker: WorkerId) {
        self.table.exclusions.toggle_worker(worker, &self.categories);
    }
}

/// Categories in work order; the sort is stable for sources that already order them
fn sorted_categories<S: CategorySource + ?Sized>(source: &S) -> Vec<JobCategory> {
    let mut categories = source.job_categories();
    categories.sort_by_key(|c| c.order);
    categories
}
