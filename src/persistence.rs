//! Allocation state persistence
//!
//! Saves the allocation table (tiers, exclusions, important categories) as a
//! versioned JSON document. Quantities keep their percent/number tag; headcount
//! totals are rebound on the next rebuild since the population may have
//! changed since the save.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::PersistenceError;
use crate::quantity::Quantity;
use crate::table::{AllocationTable, PriorityTier};
use crate::types::{JobCategory, JobCategoryId, JobCount, Priority, WorkerId};

/// Current save format version
pub const SAVE_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedTier {
    pub priority: Priority,
    /// Older saves have no cap; it defaults to the number of categories
    #[serde(default)]
    pub max_jobs: Option<JobCount>,
    pub quantities: BTreeMap<JobCategoryId, Quantity>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedExclusion {
    pub category: JobCategoryId,
    pub worker: WorkerId,
}

/// On-disk representation of an allocation table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveFile {
    /// Format version for forward compatibility
    pub version: u32,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    pub tiers: Vec<SavedTier>,
    #[serde(default)]
    pub excluded: Vec<SavedExclusion>,
    #[serde(default)]
    pub important: Vec<JobCategoryId>,
}

impl SaveFile {
    pub fn from_table(table: &AllocationTable) -> Self {
        SaveFile {
            version: SAVE_VERSION,
            saved_at: Some(Utc::now()),
            tiers: table
                .tiers
                .iter()
                .map(|t| SavedTier {
                    priority: t.priority,
                    max_jobs: Some(t.max_jobs),
                    quantities: t.quantities.clone(),
                })
                .collect(),
            excluded: table
                .exclusions
                .iter()
                .map(|(category, worker)| SavedExclusion {
                    category: category.clone(),
                    worker: *worker,
                })
                .collect(),
            important: table.important.iter().cloned().collect(),
        }
    }

    /// Rebuild a table against the current category list.
    ///
    /// Cells and exclusions naming categories that no longer exist are dropped.
    pub fn into_table(self, categories: &[JobCategory]) -> AllocationTable {
        let known = |id: &JobCategoryId| categories.iter().any(|c| &c.id == id);
        let default_cap = JobCount(categories.len() as u32);
        let mut table = AllocationTable::new();

        for saved in self.tiers {
            let mut quantities = BTreeMap::new();
            for (id, quantity) in saved.quantities {
                if known(&id) {
                    let value = sanitized(&id, quantity);
                    quantities.insert(id, value);
                } else {
                    warn!(category = %id, "saved category no longer exists, dropping");
                }
            }
            table.tiers.push(PriorityTier {
                priority: saved.priority,
                max_jobs: saved.max_jobs.unwrap_or(default_cap),
                quantities,
            });
        }

        for SavedExclusion { category, worker } in self.excluded {
            if known(&category) {
                table.exclusions.insert(category, worker);
            }
        }
        table.important = self.important.into_iter().filter(|id| known(id)).collect();
        table
    }
}

/// Saved percents outside [0, 1] (or NaN) are clamped like freshly built ones
fn sanitized(category: &JobCategoryId, quantity: Quantity) -> Quantity {
    match quantity {
        Quantity::Percent { value } if !(0.0..=1.0).contains(&value) => {
            warn!(category = %category, value, "saved percent out of range, clamping");
            Quantity::percent(value)
        }
        other => other,
    }
}

/// Parse and version-check a save document
pub fn decode(bytes: &[u8]) -> Result<SaveFile, PersistenceError> {
    let save: SaveFile = serde_json::from_slice(bytes)?;
    if save.version > SAVE_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: save.version,
            supported: SAVE_VERSION,
        });
    }
    Ok(save)
}

pub fn encode(save: &SaveFile) -> Result<Vec<u8>, PersistenceError> {
    Ok(serde_json::to_vec_pretty(save)?)
}

/// Durable home of the allocation table
pub trait AllocationStore {
    /// `Ok(None)` when nothing has been saved yet
    fn load(&self) -> Result<Option<SaveFile>, PersistenceError>;
    fn save(&self, save: &SaveFile) -> Result<(), PersistenceError>;
}

/// JSON file on disk
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AllocationStore for JsonFileStore {
    fn load(&self) -> Result<Option<SaveFile>, PersistenceError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path)?;
        decode(&bytes).map(Some)
    }

    fn save(&self, save: &SaveFile) -> Result<(), PersistenceError> {
        fs::write(&self.path, encode(save)?)?;
        Ok(())
    }
}

/// In-memory buffer, for hosts that embed the state in their own save data
#[derive(Debug, Default)]
pub struct MemoryStore {
    buffer: RefCell<Option<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        MemoryStore {
            buffer: RefCell::new(Some(bytes)),
        }
    }

    pub fn bytes(&self) -> Option<Vec<u8>> {
        self.buffer.borrow().clone()
    }
}

impl AllocationStore for MemoryStore {
    fn load(&self) -> Result<Option<SaveFile>, PersistenceError> {
        match self.buffer.borrow().as_deref() {
            Some(bytes) => decode(bytes).map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, save: &SaveFile) -> Result<(), PersistenceError> {
        *self.buffer.borrow_mut() = Some(encode(save)?);
        Ok(())
    }
}

/// Load the table, falling back to an empty one on any fault
pub fn load_table_or_default<St: AllocationStore + ?Sized>(
    store: &St,
    categories: &[JobCategory],
) -> AllocationTable {
    match store.load() {
        Ok(Some(save)) => {
            let table = save.into_table(categories);
            info!(
                tiers = table.tiers.len(),
                excluded = table.exclusions.len(),
                "loaded allocation table"
            );
            table
        }
        Ok(None) => AllocationTable::new(),
        Err(error) => {
            warn!(%error, "unable to load allocation table, starting empty");
            AllocationTable::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> Vec<JobCategory> {
        vec![JobCategory::new("Cooking", 0), JobCategory::new("Mining", 1)]
    }

    fn sample_table() -> AllocationTable {
        let cats = categories();
        let mut table = AllocationTable::new();
        let i = table.add_tier(&cats);
        table.set_priority(i, Priority(1));
        table.set_quantity(i, &JobCategoryId::new("Cooking"), Quantity::number(2, 7));
        table.set_quantity(i, &JobCategoryId::new("Mining"), Quantity::percent(0.4));
        let j = table.add_tier(&cats);
        table.set_priority(j, Priority(3));
        table.set_max_jobs(j, 1, cats.len());
        table.exclusions.insert(JobCategoryId::new("Mining"), WorkerId(4));
        table.set_important(&JobCategoryId::new("Cooking"), true);
        table
    }

    #[test]
    fn test_memory_store_preserves_table() {
        let table = sample_table();
        let store = MemoryStore::new();
        store.save(&SaveFile::from_table(&table)).unwrap();

        let loaded = load_table_or_default(&store, &categories());
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("allocation.json"));
        assert!(store.load().unwrap().is_none());

        let table = sample_table();
        store.save(&SaveFile::from_table(&table)).unwrap();
        let loaded = load_table_or_default(&store, &categories());
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_missing_max_jobs_defaults_to_category_count() {
        let json = br#"{
            "version": 1,
            "tiers": [
                { "priority": 2, "quantities": { "Cooking": { "kind": "percent", "value": 0.5 } } }
            ]
        }"#;
        let store = MemoryStore::from_bytes(json.to_vec());
        let table = load_table_or_default(&store, &categories());

        assert_eq!(table.tiers.len(), 1);
        assert_eq!(table.tiers[0].max_jobs, JobCount(2));
        assert_eq!(table.tiers[0].priority, Priority(2));
        assert!(table.exclusions.is_empty());
    }

    #[test]
    fn test_unknown_categories_dropped() {
        let json = br#"{
            "version": 1,
            "tiers": [
                { "priority": 1, "max_jobs": 2, "quantities": {
                    "Cooking": { "kind": "number", "count": 1, "total": 4 },
                    "Dancing": { "kind": "percent", "value": 0.5 }
                } }
            ],
            "excluded": [
                { "category": "Dancing", "worker": 1 },
                { "category": "Mining", "worker": 2 }
            ],
            "important": ["Dancing"]
        }"#;
        let table = load_table_or_default(&MemoryStore::from_bytes(json.to_vec()), &categories());

        assert_eq!(table.tiers[0].quantities.len(), 1);
        assert_eq!(table.exclusions.len(), 1);
        assert!(table.exclusions.contains(&JobCategoryId::new("Mining"), WorkerId(2)));
        assert!(table.important.is_empty());
    }

    #[test]
    fn test_out_of_range_percents_clamped() {
        let json = br#"{
            "version": 1,
            "tiers": [
                { "priority": 1, "quantities": {
                    "Cooking": { "kind": "percent", "value": 1.7 },
                    "Mining": { "kind": "percent", "value": -0.5 }
                } }
            ]
        }"#;
        let table = load_table_or_default(&MemoryStore::from_bytes(json.to_vec()), &categories());
        let tier = &table.tiers[0];

        assert_eq!(tier.quantity(&JobCategoryId::new("Cooking")), Quantity::percent(1.0));
        assert_eq!(tier.quantity(&JobCategoryId::new("Mining")), Quantity::percent(0.0));
        assert_eq!(tier.quantity(&JobCategoryId::new("Cooking")).as_fraction(), 1.0);
        assert_eq!(tier.quantity(&JobCategoryId::new("Mining")).as_fraction(), 0.0);
    }

    #[test]
    fn test_embedded_bytes_reload() {
        let table = sample_table();
        let store = MemoryStore::new();
        assert!(store.bytes().is_none());
        store.save(&SaveFile::from_table(&table)).unwrap();

        let host_copy = MemoryStore::from_bytes(store.bytes().unwrap());
        assert_eq!(load_table_or_default(&host_copy, &categories()), table);
    }

    #[test]
    fn test_malformed_state_loads_empty() {
        let store = MemoryStore::from_bytes(b"<xml>not json</xml>".to_vec());
        assert!(store.load().is_err());
        assert_eq!(load_table_or_default(&store, &categories()), AllocationTable::new());
    }

    #[test]
    fn test_newer_version_rejected() {
        let json = br#"{ "version": 99, "tiers": [] }"#;
        let result = decode(json);
        assert!(matches!(
            result,
            Err(PersistenceError::UnsupportedVersion { found: 99, supported: 1 })
        ));
    }
}
