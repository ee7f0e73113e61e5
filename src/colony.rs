//! In-memory colony
//!
//! A self-contained worker/category source backed by plain data. It can be
//! read from JSON, generated from a seeded RNG, and records the priorities
//! written back by the assigner.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{PersistenceError, SourceError};
use crate::source::{CategorySource, PrioritySink, WorkerInfo, WorkerSource};
use crate::types::{JobCategory, JobCategoryId, Passion, Priority, WorkerId};

/// Kind of pawn; only colonists take part in allocation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    #[default]
    Colonist,
    Animal,
    Guest,
}

/// Skill level and passion for one job category
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkillRecord {
    /// Average of the relevant skills, 0-20
    pub level: f64,
    #[serde(default)]
    pub passion: Passion,
}

impl SkillRecord {
    pub fn new(level: f64, passion: Passion) -> Self {
        SkillRecord { level, passion }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColonyWorker {
    pub id: WorkerId,
    pub name: String,
    #[serde(default)]
    pub kind: WorkerKind,
    #[serde(default)]
    pub skills: BTreeMap<JobCategoryId, SkillRecord>,
    /// Categories this worker can never perform
    #[serde(default)]
    pub incapable: BTreeSet<JobCategoryId>,
    /// Priorities written back by the assigner
    #[serde(default)]
    pub priorities: BTreeMap<JobCategoryId, Priority>,
}

impl ColonyWorker {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        ColonyWorker {
            id: WorkerId(id),
            name: name.into(),
            kind: WorkerKind::Colonist,
            skills: BTreeMap::new(),
            incapable: BTreeSet::new(),
            priorities: BTreeMap::new(),
        }
    }

    pub fn with_skill(mut self, category: &str, level: f64, passion: Passion) -> Self {
        self.skills
            .insert(JobCategoryId::new(category), SkillRecord::new(level, passion));
        self
    }

    pub fn incapable_of(mut self, category: &str) -> Self {
        self.incapable.insert(JobCategoryId::new(category));
        self
    }

    pub fn with_kind(mut self, kind: WorkerKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Standard category list (name, requires no skill)
const STANDARD_CATEGORIES: &[(&str, bool)] = &[
    ("Firefighter", true),
    ("Patient", true),
    ("Doctor", false),
    ("Basic", true),
    ("Warden", false),
    ("Handling", false),
    ("Cooking", false),
    ("Hunting", false),
    ("Construction", false),
    ("Growing", false),
    ("Mining", false),
    ("PlantCutting", false),
    ("Smithing", false),
    ("Tailoring", false),
    ("Art", false),
    ("Crafting", false),
    ("Hauling", true),
    ("Cleaning", true),
    ("Research", false),
];

const FIRST_NAMES: &[&str] = &[
    "Ada", "Bram", "Cass", "Dorn", "Edda", "Finn", "Greta", "Hale", "Ines", "Jory",
    "Kira", "Lott", "Mara", "Nils", "Orla", "Pike", "Quin", "Rhea", "Sten", "Tova",
];

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Colony {
    pub categories: Vec<JobCategory>,
    pub workers: Vec<ColonyWorker>,
}

impl Colony {
    pub fn new(categories: Vec<JobCategory>, workers: Vec<ColonyWorker>) -> Self {
        Colony { categories, workers }
    }

    /// The standard category list in work order
    pub fn standard_categories() -> Vec<JobCategory> {
        STANDARD_CATEGORIES
            .iter()
            .enumerate()
            .map(|(order, &(name, unskilled))| {
                if unskilled {
                    JobCategory::unskilled(name, order as u32)
                } else {
                    JobCategory::new(name, order as u32)
                }
            })
            .collect()
    }

    /// Generate a random colony over the standard categories
    pub fn random<R: Rng>(worker_count: usize, rng: &mut R) -> Self {
        let categories = Colony::standard_categories();
        let mut workers = Vec::with_capacity(worker_count);

        for index in 0..worker_count {
            let name = format!(
                "{} {}",
                FIRST_NAMES.choose(rng).copied().unwrap_or("Nameless"),
                index + 1
            );
            let mut worker = ColonyWorker::new(index as u64 + 1, name);

            for category in &categories {
                // Roughly one in twelve workers refuses any given category
                if rng.gen_ratio(1, 12) {
                    worker.incapable.insert(category.id.clone());
                    continue;
                }
                if category.requires_no_skill {
                    continue;
                }
                let level = rng.gen_range(0..=20) as f64;
                let passion = match rng.gen_range(0..10) {
                    0..=5 => Passion::None,
                    6..=8 => Passion::Minor,
                    _ => Passion::Major,
                };
                worker
                    .skills
                    .insert(category.id.clone(), SkillRecord::new(level, passion));
            }

            workers.push(worker);
        }

        Colony { categories, workers }
    }

    /// Read a colony description from a JSON file
    pub fn load(path: &Path) -> Result<Self, PersistenceError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn worker(&self, id: WorkerId) -> Option<&ColonyWorker> {
        self.workers.iter().find(|w| w.id == id)
    }

    pub fn worker_mut(&mut self, id: WorkerId) -> Option<&mut ColonyWorker> {
        self.workers.iter_mut().find(|w| w.id == id)
    }

    /// Remove a worker (death, departure)
    pub fn remove_worker(&mut self, id: WorkerId) -> Option<ColonyWorker> {
        let index = self.workers.iter().position(|w| w.id == id)?;
        Some(self.workers.remove(index))
    }

    /// Priority recorded for a worker/category pair, if any
    pub fn priority_of(&self, id: WorkerId, category: &str) -> Option<Priority> {
        self.worker(id)?
            .priorities
            .get(&JobCategoryId::new(category))
            .copied()
    }

    fn known_worker(&self, id: WorkerId) -> Result<&ColonyWorker, SourceError> {
        self.worker(id).ok_or(SourceError::UnknownWorker(id))
    }

    fn known_category(&self, category: &JobCategoryId) -> Result<(), SourceError> {
        if self.categories.iter().any(|c| &c.id == category) {
            Ok(())
        } else {
            Err(SourceError::UnknownCategory(category.clone()))
        }
    }
}

impl CategorySource for Colony {
    fn job_categories(&self) -> Vec<JobCategory> {
        self.categories.clone()
    }
}

impl WorkerSource for Colony {
    fn workers(&self) -> Vec<WorkerInfo> {
        self.workers
            .iter()
            .map(|w| WorkerInfo {
                id: w.id,
                label: w.name.clone(),
                assignable: w.kind == WorkerKind::Colonist,
            })
            .collect()
    }

    fn is_capable(&self, worker: WorkerId, category: &JobCategoryId) -> Result<bool, SourceError> {
        self.known_category(category)?;
        Ok(!self.known_worker(worker)?.incapable.contains(category))
    }

    fn average_skill(&self, worker: WorkerId, category: &JobCategoryId) -> Result<f64, SourceError> {
        self.known_category(category)?;
        Ok(self
            .known_worker(worker)?
            .skills
            .get(category)
            .map(|s| s.level)
            .unwrap_or(0.0))
    }

    fn max_passion(&self, worker: WorkerId, category: &JobCategoryId) -> Result<Passion, SourceError> {
        self.known_category(category)?;
        Ok(self
            .known_worker(worker)?
            .skills
            .get(category)
            .map(|s| s.passion)
            .unwrap_or_default())
    }
}

impl PrioritySink for Colony {
    fn set_priority(
        &mut self,
        worker: WorkerId,
        category: &JobCategoryId,
        priority: Priority,
    ) -> Result<(), SourceError> {
        self.known_category(category)?;
        let record = self
            .worker_mut(worker)
            .ok_or(SourceError::UnknownWorker(worker))?;
        record.priorities.insert(category.clone(), priority);
        Ok(())
    }
}
