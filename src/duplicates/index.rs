//! In-memory duplicate index with incrementally maintained counters.
//!
//! # Overview
//!
//! [`DuplicateIndex`] maps a [`FileKey`] to the set of absolute paths that
//! share it, and keeps [`AggregateCounters`] up to date as a side effect of
//! every [`DuplicateIndex::observe`] call. Counters are never derived by
//! re-scanning the map during a walk; [`DuplicateIndex::recount`] exists only
//! for rehydrating persisted data that lacks them.
//!
//! # Example
//!
//! ```
//! use dupescan::duplicates::{DuplicateIndex, FileKey, Observation};
//!
//! let mut index = DuplicateIndex::new();
//! let key = FileKey::new("dup.bin", 500);
//!
//! assert_eq!(index.observe(key.clone(), "/a/dup.bin"), Observation::NewGroup);
//! assert_eq!(index.observe(key.clone(), "/b/dup.bin"), Observation::Duplicate);
//! assert_eq!(index.observe(key, "/b/dup.bin"), Observation::AlreadyRecorded);
//!
//! let counters = index.counters();
//! assert_eq!(counters.total_files, 2);
//! assert_eq!(counters.duplicate_count, 1);
//! assert_eq!(counters.bytes_wasted, 500);
//! ```

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::key::{FileKey, KeyDecodeError};

/// Serializable form of the index: encoded key to sorted location list.
pub type PersistedIndex = BTreeMap<String, Vec<String>>;

/// Running statistics over the index contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateCounters {
    /// Every regular file observed, including the first of each group
    pub total_files: u64,
    /// Files that matched an already-present key
    pub duplicate_count: u64,
    /// Sum of sizes of files that matched an already-present key
    pub bytes_wasted: u64,
}

/// Result of recording one file in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// The key was not present; a singleton group was created.
    NewGroup,
    /// The key was present and the path was added to its group.
    Duplicate,
    /// The path was already recorded under this key; nothing changed.
    AlreadyRecorded,
}

impl Observation {
    /// Whether this observation created a new group.
    #[must_use]
    pub fn is_new_group(self) -> bool {
        matches!(self, Self::NewGroup)
    }
}

/// Mapping from [`FileKey`] to the locations sharing it.
///
/// Not synchronized; shared use goes through [`crate::scan::SharedScan`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateIndex {
    groups: HashMap<FileKey, BTreeSet<String>>,
    counters: AggregateCounters,
}

impl DuplicateIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path` under `key`, updating the counters exactly once.
    ///
    /// Re-observing a path already recorded for the same key is a no-op.
    pub fn observe(&mut self, key: FileKey, path: impl Into<String>) -> Observation {
        let path = path.into();
        let size = key.size;

        match self.groups.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(BTreeSet::from([path]));
                self.counters.total_files += 1;
                Observation::NewGroup
            }
            Entry::Occupied(mut slot) => {
                if !slot.get_mut().insert(path) {
                    return Observation::AlreadyRecorded;
                }
                self.counters.total_files += 1;
                self.counters.duplicate_count += 1;
                self.counters.bytes_wasted += size;
                Observation::Duplicate
            }
        }
    }

    /// Current running counters.
    #[must_use]
    pub fn counters(&self) -> AggregateCounters {
        self.counters
    }

    /// Derive the counters from the index contents by a full pass.
    #[must_use]
    pub fn computed_counters(&self) -> AggregateCounters {
        self.groups
            .iter()
            .fold(AggregateCounters::default(), |mut acc, (key, paths)| {
                let extra = paths.len().saturating_sub(1) as u64;
                acc.total_files += paths.len() as u64;
                acc.duplicate_count += extra;
                acc.bytes_wasted += key.size * extra;
                acc
            })
    }

    /// Replace the running counters with [`Self::computed_counters`].
    pub fn recount(&mut self) {
        self.counters = self.computed_counters();
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Whether the index holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Locations recorded under `key`.
    #[must_use]
    pub fn locations(&self, key: &FileKey) -> Option<&BTreeSet<String>> {
        self.groups.get(key)
    }

    /// Iterate over every group in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&FileKey, &BTreeSet<String>)> {
        self.groups.iter()
    }

    /// Iterate over groups with two or more locations.
    pub fn duplicate_groups(&self) -> impl Iterator<Item = (&FileKey, &BTreeSet<String>)> {
        self.groups.iter().filter(|(_, paths)| paths.len() > 1)
    }

    /// Render the index in its stable serializable form.
    #[must_use]
    pub fn to_persisted(&self) -> PersistedIndex {
        self.groups
            .iter()
            .map(|(key, paths)| (key.encode(), paths.iter().cloned().collect()))
            .collect()
    }

    /// Rebuild an index from its persisted form, recomputing the counters.
    ///
    /// Empty location lists are dropped and repeated paths collapse.
    ///
    /// # Errors
    ///
    /// Returns [`KeyDecodeError`] for the first key that is not in
    /// canonical encoded form.
    pub fn from_persisted(persisted: &PersistedIndex) -> Result<Self, KeyDecodeError> {
        let mut index = Self {
            groups: decode_groups(persisted)?,
            counters: AggregateCounters::default(),
        };
        index.recount();
        Ok(index)
    }

    /// Rebuild an index from its persisted form and stored counters.
    ///
    /// Stored counters that disagree with the locations are replaced by
    /// recomputed ones.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_persisted`].
    pub fn from_persisted_with_counters(
        persisted: &PersistedIndex,
        counters: AggregateCounters,
    ) -> Result<Self, KeyDecodeError> {
        let mut index = Self {
            groups: decode_groups(persisted)?,
            counters,
        };
        let computed = index.computed_counters();
        if computed != counters {
            log::warn!(
                "Stored counters {:?} do not match the index, using {:?}",
                counters,
                computed
            );
            index.counters = computed;
        }
        Ok(index)
    }
}

fn decode_groups(
    persisted: &PersistedIndex,
) -> Result<HashMap<FileKey, BTreeSet<String>>, KeyDecodeError> {
    let mut groups = HashMap::with_capacity(persisted.len());
    for (encoded, paths) in persisted {
        let key = FileKey::decode(encoded)?;
        if paths.is_empty() {
            continue;
        }
        groups.insert(key, paths.iter().cloned().collect::<BTreeSet<_>>());
    }
    Ok(groups)
}
