//! End-to-end allocation scenarios through the public session API

use priority_allocator::colony::ColonyWorker;
use priority_allocator::error::SourceError;
use priority_allocator::persistence::MemoryStore;
use priority_allocator::source::{CategorySource, PrioritySink, WorkerInfo, WorkerSource};
use priority_allocator::{
    AllocationParams, Colony, JobCategory, JobCategoryId, Passion, Priority, PrioritySession,
    Quantity, WorkerId,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Ten workers, one category; worker n has skill n
fn ten_cooks() -> Colony {
    Colony::new(
        vec![JobCategory::new("Cooking", 0)],
        (1..=10)
            .map(|n| ColonyWorker::new(n, format!("Cook {}", n)).with_skill("Cooking", n as f64, Passion::None))
            .collect(),
    )
}

fn cooking() -> JobCategoryId {
    JobCategoryId::new("Cooking")
}

fn single_tier_session(colony: &Colony, quantity: Quantity, max_jobs: u32) -> PrioritySession {
    let mut session = PrioritySession::new(AllocationParams::default());
    session.rebuild(colony);
    let tier = session.add_tier();
    session.table_mut().set_priority(tier, Priority(1));
    session.set_max_jobs(tier, max_jobs);
    session.table_mut().set_quantity(tier, &cooking(), quantity);
    session
}

fn assigned_cooks(colony: &Colony) -> Vec<u64> {
    colony
        .workers
        .iter()
        .filter(|w| w.priorities.contains_key(&cooking()))
        .map(|w| w.id.0)
        .collect()
}

#[test]
fn test_thirty_percent_of_ten_takes_top_three() {
    let mut colony = ten_cooks();
    let mut session = single_tier_session(&colony, Quantity::percent(0.3), 5);

    let (_, report) = session.run(&mut colony);
    assert_eq!(report.applied, 3);
    assert_eq!(assigned_cooks(&colony), vec![8, 9, 10]);
    for n in 8..=10 {
        assert_eq!(colony.priority_of(WorkerId(n), "Cooking"), Some(Priority(1)));
    }
}

#[test]
fn test_excluded_top_workers_are_replaced() {
    let mut colony = ten_cooks();
    let mut session = single_tier_session(&colony, Quantity::percent(0.3), 5);
    session.toggle_exclusion(&cooking(), WorkerId(10));
    session.toggle_exclusion(&cooking(), WorkerId(9));

    let (_, report) = session.run(&mut colony);
    assert_eq!(report.applied, 3);
    assert_eq!(assigned_cooks(&colony), vec![6, 7, 8]);
}

#[test]
fn test_over_commitment_reported() {
    let colony = ten_cooks();
    let mut session = PrioritySession::new(AllocationParams::default());
    session.rebuild(&colony);
    for _ in 0..2 {
        let tier = session.add_tier();
        session.table_mut().set_quantity(tier, &cooking(), Quantity::percent(0.6));
    }

    let availability = session.availability(&cooking(), 1);
    assert!((availability.remaining - 0.4).abs() < 1e-9);
    assert!(availability.over_committed);
    assert_eq!(
        session.table().over_committed_categories(session.categories()),
        vec![cooking()]
    );
}

#[test]
fn test_three_half_tiers_leave_no_room() {
    let colony = ten_cooks();
    let mut session = PrioritySession::new(AllocationParams::default());
    session.rebuild(&colony);
    for _ in 0..3 {
        let tier = session.add_tier();
        session.table_mut().set_quantity(tier, &cooking(), Quantity::percent(0.5));
    }
    for tier in 0..3 {
        let availability = session.availability(&cooking(), tier);
        assert_eq!(availability.remaining, 0.0);
        assert!(availability.over_committed);
    }
}

#[test]
fn test_cap_respected_on_random_colony() {
    let mut colony = Colony::random(25, &mut ChaCha8Rng::seed_from_u64(99));
    let categories = colony.categories.clone();
    let mut session = PrioritySession::new(AllocationParams::default());
    session.rebuild(&colony);
    for (priority, cap) in [(1, 2), (2, 3)] {
        let tier = session.add_tier();
        session.table_mut().set_priority(tier, Priority(priority));
        session.set_max_jobs(tier, cap);
        for category in &categories {
            session.edit_fraction(tier, &category.id, 0.5);
        }
    }

    let (_, report) = session.run(&mut colony);
    assert!(report.applied > 0);
    for worker in &colony.workers {
        assert!(report.plan.jobs_in_tier(worker.id, 0) <= 2);
        assert!(report.plan.jobs_in_tier(worker.id, 1) <= 3);
    }
}

#[test]
fn test_exclusions_respected_on_random_colony() {
    let mut colony = Colony::random(20, &mut ChaCha8Rng::seed_from_u64(5));
    let categories = colony.categories.clone();
    let mut session = PrioritySession::new(AllocationParams::default());
    session.rebuild(&colony);
    let tier = session.add_tier();
    for category in &categories {
        session.table_mut().set_quantity(tier, &category.id, Quantity::percent(1.0));
    }
    for n in (1..=20).step_by(3) {
        session.toggle_worker_exclusions(WorkerId(n));
    }
    session.toggle_exclusion(&JobCategoryId::new("Mining"), WorkerId(2));

    let (_, report) = session.run(&mut colony);
    for assignment in &report.plan.assignments {
        assert!(!session
            .table()
            .exclusions
            .contains(&assignment.category, assignment.worker));
    }
    for n in (1..=20).step_by(3) {
        assert!(colony.worker(WorkerId(n)).unwrap().priorities.is_empty());
    }
}

#[test]
fn test_rebuild_and_assign_are_deterministic() {
    let run = || {
        let mut colony = Colony::random(30, &mut ChaCha8Rng::seed_from_u64(2024));
        let categories = colony.categories.clone();
        let mut session = PrioritySession::new(AllocationParams::default());
        session.rebuild(&colony);
        let tier = session.add_tier();
        session.set_max_jobs(tier, 4);
        for category in &categories {
            session.edit_fraction(tier, &category.id, 0.25);
        }
        let (_, report) = session.run(&mut colony);
        (session.ranking().clone(), report.plan, colony)
    };

    let (ranking_a, plan_a, colony_a) = run();
    let (ranking_b, plan_b, colony_b) = run();
    assert_eq!(ranking_a, ranking_b);
    assert_eq!(plan_a, plan_b);
    assert_eq!(colony_a, colony_b);
}

#[test]
fn test_headcount_rebinds_when_population_changes() {
    let mut colony = ten_cooks();
    let mut session = single_tier_session(&colony, Quantity::number(3, 10), 5);
    session.run(&mut colony);
    assert_eq!(assigned_cooks(&colony).len(), 3);

    for n in 1..=5 {
        colony.remove_worker(WorkerId(n));
    }
    for worker in &mut colony.workers {
        worker.priorities.clear();
    }
    session.run(&mut colony);

    // Still three cooks, now 3 of 5
    assert_eq!(session.table().tiers[0].quantity(&cooking()), Quantity::number(3, 5));
    assert_eq!(assigned_cooks(&colony), vec![8, 9, 10]);
}

#[test]
fn test_unloadable_state_starts_empty() {
    let colony = ten_cooks();
    let store = MemoryStore::from_bytes(b"{ \"version\": 1, \"tiers\": [ oops".to_vec());
    let session = PrioritySession::load(AllocationParams::default(), &store, &colony);

    assert!(session.table().tiers.is_empty());
    assert!(session.table().exclusions.is_empty());
    assert_eq!(session.workers().len(), 10);
}

#[test]
fn test_out_of_range_saved_percent_is_clamped() {
    let mut colony = ten_cooks();
    let json = br#"{
        "version": 1,
        "tiers": [
            { "priority": 1, "max_jobs": 1, "quantities": { "Cooking": { "kind": "percent", "value": 1.7 } } },
            { "priority": 2, "max_jobs": 1, "quantities": { "Cooking": { "kind": "percent", "value": -0.5 } } }
        ]
    }"#;
    let mut session = PrioritySession::load(
        AllocationParams::default(),
        &MemoryStore::from_bytes(json.to_vec()),
        &colony,
    );

    for tier in &session.table().tiers {
        let fraction = tier.quantity(&cooking()).as_fraction();
        assert!((0.0..=1.0).contains(&fraction));
    }
    assert!(!session.availability(&cooking(), 0).over_committed);

    let (_, report) = session.run(&mut colony);
    assert_eq!(report.applied, 10);
    assert_eq!(report.plan.shortages().count(), 0);
}

#[test]
fn test_state_survives_save_and_population_change() {
    let mut colony = ten_cooks();
    let store = MemoryStore::new();
    let mut session = single_tier_session(&colony, Quantity::number(2, 10), 5);
    session.toggle_exclusion(&cooking(), WorkerId(10));
    session.toggle_exclusion(&cooking(), WorkerId(3));
    session.save(&store).unwrap();

    colony.remove_worker(WorkerId(3));
    let mut restored = PrioritySession::load(AllocationParams::default(), &store, &colony);
    assert_eq!(restored.table().exclusions.len(), 1);
    assert_eq!(restored.table().tiers[0].quantity(&cooking()), Quantity::number(2, 9));

    restored.run(&mut colony);
    assert_eq!(assigned_cooks(&colony), vec![8, 9]);
}

/// Colony wrapper whose queries fail for one worker
struct FlakySource {
    colony: Colony,
    broken: WorkerId,
}

impl CategorySource for FlakySource {
    fn job_categories(&self) -> Vec<JobCategory> {
        self.colony.job_categories()
    }
}

impl WorkerSource for FlakySource {
    fn workers(&self) -> Vec<WorkerInfo> {
        self.colony.workers()
    }

    fn is_capable(&self, worker: WorkerId, category: &JobCategoryId) -> Result<bool, SourceError> {
        self.colony.is_capable(worker, category)
    }

    fn average_skill(&self, worker: WorkerId, category: &JobCategoryId) -> Result<f64, SourceError> {
        if worker == self.broken {
            return Err(SourceError::Adapter("skill tracker missing".into()));
        }
        self.colony.average_skill(worker, category)
    }

    fn max_passion(&self, worker: WorkerId, category: &JobCategoryId) -> Result<Passion, SourceError> {
        self.colony.max_passion(worker, category)
    }
}

impl PrioritySink for FlakySource {
    fn set_priority(
        &mut self,
        worker: WorkerId,
        category: &JobCategoryId,
        priority: Priority,
    ) -> Result<(), SourceError> {
        if worker == self.broken {
            return Err(SourceError::Adapter("pawn despawned".into()));
        }
        self.colony.set_priority(worker, category, priority)
    }
}

#[test]
fn test_source_fault_skips_only_that_worker() {
    let mut source = FlakySource {
        colony: ten_cooks(),
        broken: WorkerId(10),
    };
    let mut session = single_tier_session(&source.colony, Quantity::percent(0.3), 5);

    let (rebuild, report) = session.run(&mut source);
    assert_eq!(rebuild.faults.len(), 1);
    assert_eq!(rebuild.faults[0].worker, WorkerId(10));
    assert!(report.faults.is_empty());
    assert_eq!(assigned_cooks(&source.colony), vec![7, 8, 9]);
}

#[test]
fn test_passion_multiplier_reorders_ranking() {
    let mut colony = Colony::new(
        vec![JobCategory::new("Art", 0)],
        vec![
            ColonyWorker::new(1, "Steady").with_skill("Art", 10.0, Passion::None),
            ColonyWorker::new(2, "Keen").with_skill("Art", 6.0, Passion::Major),
        ],
    );
    let art = JobCategoryId::new("Art");

    let mut session = PrioritySession::new(AllocationParams {
        passion_multiplier: 0.0,
        ..AllocationParams::default()
    });
    session.rebuild(&colony);
    let tier = session.add_tier();
    session.table_mut().set_quantity(tier, &art, Quantity::number(1, 2));
    session.run(&mut colony);
    assert_eq!(colony.priority_of(WorkerId(1), "Art"), Some(Priority(0)));

    for worker in &mut colony.workers {
        worker.priorities.clear();
    }
    session.set_params(AllocationParams::default());
    session.run(&mut colony);
    // 6 + 6 * 2 * 1 = 18 beats 10
    assert_eq!(session.ranking().fitness_of(&art, WorkerId(2)), Some(18.0));
    assert_eq!(colony.priority_of(WorkerId(2), "Art"), Some(Priority(0)));
    assert_eq!(colony.priority_of(WorkerId(1), "Art"), None);
}
