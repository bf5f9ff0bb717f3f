//! Employee roster directory
//!
//! One ordered name list per store, stored as `<root>/<store dir>/employees.json`.
//! A shared `<root>/employees.json` serves stores without their own file.
//! Rosters are replaced wholesale on every write, never merged.

use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::fs_utils::{self, JsonFile};
use crate::model::StoreId;
use crate::Result;

pub const EMPLOYEES_FILE: &str = "employees.json";

/// Roster used the first time a store is seen
pub const DEFAULT_EMPLOYEES: [&str; 3] = ["佐藤", "鈴木", "高橋"];

/// New roster contents as submitted by a settings form or caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterInput {
    /// Names separated by commas (ASCII or full-width) and/or newlines
    Text(String),
    List(Vec<String>),
}

/// Split a free-text roster block into names
pub fn parse_roster_text(text: &str) -> Vec<String> {
    normalize_names(text.split([',', '，', '\n', '\r']))
}

/// Trim, drop empties and collapse duplicates, keeping first-seen order
pub fn normalize_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter_map(|name| {
            let name = name.as_ref().trim();
            (!name.is_empty() && seen.insert(name.to_string())).then(|| name.to_string())
        })
        .collect()
}

/// Accepts a bare array or `{"employees": [...]}`
fn roster_from_value(value: &Value) -> Option<Vec<String>> {
    let list = match value {
        Value::Array(items) => items,
        Value::Object(map) => map.get("employees")?.as_array()?,
        _ => return None,
    };
    Some(normalize_names(list.iter().filter_map(Value::as_str)))
}

/// File-backed roster lookup and replacement
#[derive(Debug, Clone)]
pub struct RosterDirectory {
    root: PathBuf,
    defaults: Vec<String>,
}

impl RosterDirectory {
    pub fn new(root: impl Into<PathBuf>, defaults: Vec<String>) -> Self {
        Self {
            root: root.into(),
            defaults: normalize_names(defaults),
        }
    }

    /// Directory using [`DEFAULT_EMPLOYEES`] for unseen stores
    pub fn with_builtin_defaults(root: impl Into<PathBuf>) -> Self {
        Self::new(root, DEFAULT_EMPLOYEES.iter().map(|s| s.to_string()).collect())
    }

    pub fn roster_path(&self, store: &StoreId) -> PathBuf {
        self.root.join(store.dir_name()).join(EMPLOYEES_FILE)
    }

    pub fn shared_path(&self) -> PathBuf {
        self.root.join(EMPLOYEES_FILE)
    }

    /// Current roster for `store`
    ///
    /// Falls back to the shared file, then to the defaults. When neither
    /// file exists the defaults are written for the store, best effort.
    pub fn read(&self, store: &StoreId) -> Vec<String> {
        let path = self.roster_path(store);
        let own = fs_utils::read_json(&path);
        if let Some(names) = self.parse(&own, store) {
            return names;
        }

        let shared = fs_utils::read_json(&self.shared_path());
        if let Some(names) = self.parse(&shared, store) {
            debug!(store = %store, "Using shared employee roster");
            return names;
        }

        if own == JsonFile::Missing {
            match fs_utils::write_json_atomic(&path, &Value::from(self.defaults.clone())) {
                Ok(()) => info!(store = %store, "Created default employee roster"),
                Err(e) => warn!(store = %store, error = %e, "Could not persist default roster"),
            }
        }
        self.defaults.clone()
    }

    /// Replace the roster for `store`, returning what was stored
    pub fn write(&self, store: &StoreId, input: RosterInput) -> Result<Vec<String>> {
        let names = match input {
            RosterInput::Text(text) => parse_roster_text(&text),
            RosterInput::List(list) => normalize_names(list),
        };
        fs_utils::write_json_atomic(&self.roster_path(store), &Value::from(names.clone()))?;
        info!(store = %store, count = names.len(), "Saved employee roster");
        Ok(names)
    }

    fn parse(&self, file: &JsonFile, store: &StoreId) -> Option<Vec<String>> {
        match file {
            JsonFile::Missing => None,
            JsonFile::Corrupt(reason) => {
                warn!(store = %store, reason = %reason, "Roster file unreadable, ignoring");
                None
            }
            JsonFile::Loaded(value) => {
                let names = roster_from_value(value);
                if names.is_none() {
                    warn!(store = %store, "Roster file has unexpected shape, ignoring");
                }
                names
            }
        }
    }
}
