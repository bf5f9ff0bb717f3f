//! Record model for monthly shift schedules
//!
//! Canonical in-memory shape of one store's month:
//! - [`ScheduleDocument`]: day of month → [`DaySchedule`]
//! - [`DaySchedule`]: [`ShiftKind`] → [`SlotPair`]
//! - [`SlotPair`]: exactly two staff names, `""` meaning unassigned
//!
//! Everything here is pure data plus validation predicates.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// One of the five daily shift slots
///
/// Serializes as its canonical identifier (`"early"`, `"morning"`, ...).
/// Variant order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftKind {
    Early,
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl ShiftKind {
    /// All shift kinds in display order
    pub const ALL: [ShiftKind; 5] = [
        ShiftKind::Early,
        ShiftKind::Morning,
        ShiftKind::Afternoon,
        ShiftKind::Evening,
        ShiftKind::Night,
    ];

    /// Canonical identifier used on disk and in form field names
    pub fn id(self) -> &'static str {
        match self {
            ShiftKind::Early => "early",
            ShiftKind::Morning => "morning",
            ShiftKind::Afternoon => "afternoon",
            ShiftKind::Evening => "evening",
            ShiftKind::Night => "night",
        }
    }

    /// Localized display label
    pub fn label(self) -> &'static str {
        match self {
            ShiftKind::Early => "早朝",
            ShiftKind::Morning => "午前",
            ShiftKind::Afternoon => "午後",
            ShiftKind::Evening => "夕方",
            ShiftKind::Night => "深夜",
        }
    }

    /// Look up a kind by canonical identifier
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    /// Look up a kind by localized display label (legacy on-disk keys)
    pub fn from_label(label: &str) -> Option<Self> {
        LABEL_LOOKUP.get(label).copied()
    }
}

impl fmt::Display for ShiftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

static LABEL_LOOKUP: Lazy<HashMap<&'static str, ShiftKind>> = Lazy::new(|| {
    ShiftKind::ALL
        .into_iter()
        .map(|kind| (kind.label(), kind))
        .collect()
});

/// Resolve a shift key to its canonical kind
///
/// Canonical identifiers are tried first, then the localized labels.
/// Returns `None` for anything else.
pub fn validate_shift_kind(key: &str) -> Option<ShiftKind> {
    let key = key.trim();
    ShiftKind::from_id(key).or_else(|| ShiftKind::from_label(key))
}

/// A set of tokens naming the five shift kinds
///
/// Different deployments wrote shift kinds differently: canonical
/// identifiers, localized labels, or a site-specific token set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftVocabulary {
    /// `early`, `morning`, ...
    Identifiers,
    /// `早朝`, `午前`, ...
    Labels,
    /// Explicit token → kind table
    Custom(BTreeMap<String, ShiftKind>),
}

impl ShiftVocabulary {
    /// Kind named by `token` in this vocabulary
    pub fn resolve(&self, token: &str) -> Option<ShiftKind> {
        match self {
            ShiftVocabulary::Identifiers => ShiftKind::from_id(token),
            ShiftVocabulary::Labels => ShiftKind::from_label(token),
            ShiftVocabulary::Custom(table) => table.get(token).copied(),
        }
    }

    /// Token this vocabulary uses for `kind`, if it names it at all
    pub fn token(&self, kind: ShiftKind) -> Option<&str> {
        match self {
            ShiftVocabulary::Identifiers => Some(kind.id()),
            ShiftVocabulary::Labels => Some(kind.label()),
            ShiftVocabulary::Custom(table) => table
                .iter()
                .find(|(_, mapped)| **mapped == kind)
                .map(|(token, _)| token.as_str()),
        }
    }
}

/// Two ordered staff-name slots for one shift
///
/// Serializes as a two-element JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPair([String; 2]);

impl SlotPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self([first.into(), second.into()])
    }

    pub fn first(&self) -> &str {
        &self.0[0]
    }

    pub fn second(&self) -> &str {
        &self.0[1]
    }

    /// Both slots unassigned
    pub fn is_unassigned(&self) -> bool {
        self.0.iter().all(String::is_empty)
    }

    pub fn as_array(&self) -> &[String; 2] {
        &self.0
    }
}

impl<A: Into<String>, B: Into<String>> From<(A, B)> for SlotPair {
    fn from((first, second): (A, B)) -> Self {
        Self::new(first, second)
    }
}

/// Coerce any stored slot value into exactly two strings
///
/// - absent or null → `["", ""]`
/// - string → `[value, ""]`
/// - list → first two elements stringified, padded with `""`
/// - number or bool → stringified into slot 1
/// - object → `["", ""]`
pub fn normalize_slot_pair(value: Option<&Value>) -> SlotPair {
    match value {
        None | Some(Value::Null) | Some(Value::Object(_)) => SlotPair::default(),
        Some(Value::String(name)) => SlotPair::new(name.as_str(), ""),
        Some(Value::Array(items)) => {
            let mut slots = items.iter().take(2).map(stringify_slot);
            let first = slots.next().unwrap_or_default();
            let second = slots.next().unwrap_or_default();
            SlotPair::new(first, second)
        }
        Some(scalar) => SlotPair::new(scalar.to_string(), ""),
    }
}

fn stringify_slot(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Number of days in a month, 0 when `month` is outside 1..=12
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(start), Some(end)) => end.signed_duration_since(start).num_days() as u32,
        _ => 0,
    }
}

/// A validated (year, month) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// Create a period; year must be 1..=9999 and month 1..=12
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=9999).contains(&year) {
            return Err(Error::InvalidInput(format!("year out of range: {}", year)));
        }
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidInput(format!("month out of range: {}", month)));
        }
        Ok(Self { year, month })
    }

    /// Period containing the given date
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn days_in_month(&self) -> u32 {
        days_in_month(self.year, self.month)
    }

    /// Whether `day` is a valid day of this month
    pub fn contains_day(&self, day: u32) -> bool {
        (1..=self.days_in_month()).contains(&day)
    }

    /// Previous month, wrapping into the previous year
    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    /// Next month, wrapping into the next year
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// `YYYY-MM`, used as the schedule file stem
    pub fn file_stem(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_stem())
    }
}

/// Tenant key for schedule and roster storage
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(String);

const MAX_STORE_ID_LEN: usize = 128;

impl StoreId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::InvalidInput("store id must not be empty".to_string()));
        }
        if id.len() > MAX_STORE_ID_LEN {
            return Err(Error::InvalidInput(format!(
                "store id longer than {} bytes",
                MAX_STORE_ID_LEN
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory name for this store under the data root
    ///
    /// Lowercase ASCII letters, digits, `-` and `_` pass through; every
    /// other byte (uppercase letters, `%` and `.` included) becomes `%xx`
    /// in lowercase hex. The output is already case-folded, so the mapping
    /// stays injective on case-insensitive filesystems. It never yields a
    /// path separator or a dot-only name.
    pub fn dir_name(&self) -> String {
        let mut out = String::with_capacity(self.0.len());
        for byte in self.0.bytes() {
            if byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-' || byte == b'_' {
                out.push(byte as char);
            } else {
                out.push_str(&format!("%{:02x}", byte));
            }
        }
        out
    }
}

impl FromStr for StoreId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Assignments for every shift of one day
pub type DaySchedule = BTreeMap<ShiftKind, SlotPair>;

/// One store's schedule for one month
///
/// Serializes to the canonical on-disk shape
/// `{"<day>": {"<shift-kind>": ["<name1>", "<name2>"]}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleDocument {
    days: BTreeMap<u32, DaySchedule>,
}

/// Partial update decoded from a form submission; same shape as a document
pub type ScheduleUpdate = ScheduleDocument;

impl ScheduleDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Number of days carrying at least one assignment entry
    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    /// Total number of (day, shift kind) entries
    pub fn entry_count(&self) -> usize {
        self.days.values().map(BTreeMap::len).sum()
    }

    pub fn day(&self, day: u32) -> Option<&DaySchedule> {
        self.days.get(&day)
    }

    pub fn slot(&self, day: u32, kind: ShiftKind) -> Option<&SlotPair> {
        self.days.get(&day).and_then(|shifts| shifts.get(&kind))
    }

    /// Set one (day, kind) entry, replacing any previous value
    pub fn set(&mut self, day: u32, kind: ShiftKind, pair: SlotPair) {
        self.days.entry(day).or_default().insert(kind, pair);
    }

    pub fn days(&self) -> impl Iterator<Item = (u32, &DaySchedule)> {
        self.days.iter().map(|(day, shifts)| (*day, shifts))
    }

    /// Overlay `update` onto this document
    ///
    /// Each (day, kind) present in the update replaces the stored entry
    /// wholesale; everything else is left untouched.
    pub fn apply(&mut self, update: &ScheduleUpdate) {
        for (day, shifts) in update.days() {
            for (kind, pair) in shifts {
                self.set(day, *kind, pair.clone());
            }
        }
    }

    /// Canonical JSON value of this document
    pub fn to_value(&self) -> Value {
        let days = self
            .days
            .iter()
            .map(|(day, shifts)| {
                let shifts = shifts
                    .iter()
                    .map(|(kind, pair)| {
                        let slots = pair.as_array().iter().cloned().map(Value::String).collect();
                        (kind.id().to_string(), Value::Array(slots))
                    })
                    .collect();
                (day.to_string(), Value::Object(shifts))
            })
            .collect();
        Value::Object(days)
    }
}
