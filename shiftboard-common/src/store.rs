//! Per-store, per-month schedule storage
//!
//! Layout under the data root:
//!
//! ```text
//! <root>/<store dir>/<YYYY>-<MM>.json      canonical schedule document
//! <root>/<store dir>/<YYYY>-<MM>.json.bak  previous contents, best effort
//! ```
//!
//! Reads never fail on bad data: a missing or corrupt file is an empty
//! document. Writes are merge-then-replace and surface filesystem errors.
//! There is no cross-request locking; concurrent writers race and the last
//! full-document write wins.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::fs_utils::{self, JsonFile};
use crate::model::{Period, ScheduleDocument, ScheduleUpdate, StoreId};
use crate::normalize::Normalizer;
use crate::Result;

/// What to do when a submission decodes to an empty update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyUpdatePolicy {
    /// Leave the file alone and report [`SaveOutcome::NothingToSave`]
    #[default]
    Skip,
    /// Rewrite the current document anyway (creates `{}` if missing)
    WriteThrough,
}

/// Result of a merge-and-write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved {
        /// Entries taken from the update
        updated_entries: usize,
        /// Days present in the document after the write
        total_days: usize,
        /// Backup of the previous file, if one was made
        backup: Option<PathBuf>,
    },
    NothingToSave,
}

/// Store tuning knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub empty_update_policy: EmptyUpdatePolicy,
    /// Keep a `.bak` copy of the previous file on every write
    pub backup: bool,
    pub normalizer: Normalizer,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            empty_update_policy: EmptyUpdatePolicy::default(),
            backup: true,
            normalizer: Normalizer::default(),
        }
    }
}

/// JSON-file schedule store rooted at one data folder
#[derive(Debug, Clone)]
pub struct ScheduleStore {
    root: PathBuf,
    options: StoreOptions,
}

impl ScheduleStore {
    pub fn new(root: impl Into<PathBuf>, options: StoreOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Directory holding one store's files
    pub fn store_dir(&self, store: &StoreId) -> PathBuf {
        self.root.join(store.dir_name())
    }

    /// Schedule file for (store, period)
    pub fn schedule_path(&self, store: &StoreId, period: Period) -> PathBuf {
        self.store_dir(store)
            .join(format!("{}.json", period.file_stem()))
    }

    /// Stored JSON exactly as found on disk
    ///
    /// Missing or corrupt files yield an empty object.
    pub fn read_raw(&self, store: &StoreId, period: Period) -> Value {
        let path = self.schedule_path(store, period);
        match fs_utils::read_json(&path) {
            JsonFile::Loaded(value) => value,
            JsonFile::Missing => {
                debug!(store = %store, period = %period, "No schedule file, using empty document");
                Value::Object(Map::new())
            }
            JsonFile::Corrupt(reason) => {
                warn!(
                    store = %store,
                    period = %period,
                    path = %path.display(),
                    reason = %reason,
                    "Schedule file unreadable, treating as empty"
                );
                Value::Object(Map::new())
            }
        }
    }

    /// Load and normalize the schedule for (store, period)
    pub fn read(&self, store: &StoreId, period: Period) -> ScheduleDocument {
        let raw = self.read_raw(store, period);
        let (doc, report) = self
            .options
            .normalizer
            .normalize_with_report(&raw, Some(period));
        if !report.is_clean() {
            warn!(
                store = %store,
                period = %period,
                unwrapped = ?report.unwrapped,
                dropped_days = report.dropped_days,
                dropped_shifts = report.dropped_shifts,
                "Schedule file needed normalization"
            );
        }
        doc
    }

    /// Overlay `update` onto the stored document and persist it
    ///
    /// Every (day, kind) in the update replaces the stored entry; nothing
    /// else changes. The previous file is backed up first when enabled.
    /// An empty update follows [`EmptyUpdatePolicy`].
    pub fn merge_and_write(
        &self,
        store: &StoreId,
        period: Period,
        update: &ScheduleUpdate,
    ) -> Result<SaveOutcome> {
        if update.is_empty() && self.options.empty_update_policy == EmptyUpdatePolicy::Skip {
            info!(store = %store, period = %period, "Empty update, nothing to save");
            return Ok(SaveOutcome::NothingToSave);
        }
        self.write_merged(store, period, update)
    }

    /// Rewrite the stored document in canonical shape
    ///
    /// Used to upgrade files written by older formats; ignores the empty
    /// update policy.
    pub fn migrate(&self, store: &StoreId, period: Period) -> Result<SaveOutcome> {
        self.write_merged(store, period, &ScheduleUpdate::new())
    }

    fn write_merged(
        &self,
        store: &StoreId,
        period: Period,
        update: &ScheduleUpdate,
    ) -> Result<SaveOutcome> {
        let mut doc = self.read(store, period);
        doc.apply(update);

        let path = self.schedule_path(store, period);
        let backup = if self.options.backup {
            fs_utils::backup_existing(&path)
        } else {
            None
        };

        fs_utils::write_json_atomic(&path, &doc.to_value())?;

        info!(
            store = %store,
            period = %period,
            updated_entries = update.entry_count(),
            total_days = doc.day_count(),
            "Saved schedule"
        );

        Ok(SaveOutcome::Saved {
            updated_entries: update.entry_count(),
            total_days: doc.day_count(),
            backup,
        })
    }
}
