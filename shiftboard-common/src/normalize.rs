//! Normalization of stored schedule documents
//!
//! Schedule files have been written in several shapes over time:
//! - canonical: `{"<day>": {"<shift-id>": ["a", "b"]}}`
//! - wrapped: the same mapping nested under a legacy key (`{"d": {...}}`)
//! - label-keyed: shift kinds written as localized labels (`"午前"`)
//! - loose slot values: a bare string, a short list, or nothing
//!
//! [`Normalizer`] folds all of them into a [`ScheduleDocument`]. It never
//! fails: anything it cannot interpret is dropped and counted in a
//! [`NormalizeReport`].

use serde_json::{Map, Value};
use tracing::debug;

use crate::model::{normalize_slot_pair, Period, ScheduleDocument, ShiftKind, ShiftVocabulary};

/// Legacy wrapper key used by older drafts
pub const LEGACY_WRAPPER_KEY: &str = "d";

/// What normalization had to discard or rewrite
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Input was not a JSON object at all
    pub not_an_object: bool,
    /// Wrapper key that was unwrapped, if any
    pub unwrapped: Option<String>,
    /// Day keys dropped: unparseable, out of range, non-object value, or
    /// sitting beside an unwrapped legacy wrapper
    pub dropped_days: usize,
    /// Shift keys no vocabulary recognised
    pub dropped_shifts: usize,
}

impl NormalizeReport {
    /// True when the input was already canonical
    pub fn is_clean(&self) -> bool {
        !self.not_an_object
            && self.unwrapped.is_none()
            && self.dropped_days == 0
            && self.dropped_shifts == 0
    }
}

/// Converts arbitrary JSON into a canonical [`ScheduleDocument`]
///
/// Parametric over the legacy wrapper keys it will unwrap and the shift
/// vocabularies it tries, in order, for each nested key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    wrapper_keys: Vec<String>,
    vocabularies: Vec<ShiftVocabulary>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            wrapper_keys: vec![LEGACY_WRAPPER_KEY.to_string()],
            vocabularies: vec![ShiftVocabulary::Identifiers, ShiftVocabulary::Labels],
        }
    }
}

impl Normalizer {
    pub fn new(wrapper_keys: Vec<String>, vocabularies: Vec<ShiftVocabulary>) -> Self {
        Self {
            wrapper_keys,
            vocabularies,
        }
    }

    /// Add a vocabulary tried after the existing ones
    pub fn with_vocabulary(mut self, vocabulary: ShiftVocabulary) -> Self {
        if !self.vocabularies.contains(&vocabulary) {
            self.vocabularies.push(vocabulary);
        }
        self
    }

    pub fn normalize(&self, raw: &Value, period: Option<Period>) -> ScheduleDocument {
        self.normalize_with_report(raw, period).0
    }

    /// Normalize `raw`, reporting everything that was dropped
    ///
    /// With a `period`, day keys must fall within that month. Without one
    /// (relaxed mode) any positive integer day is accepted.
    pub fn normalize_with_report(
        &self,
        raw: &Value,
        period: Option<Period>,
    ) -> (ScheduleDocument, NormalizeReport) {
        let mut report = NormalizeReport::default();
        let mut doc = ScheduleDocument::new();

        let Some(mut days) = raw.as_object() else {
            debug!(kind = json_kind(raw), "Schedule value is not an object, using empty document");
            report.not_an_object = true;
            return (doc, report);
        };

        if let Some((key, inner)) = self.find_wrapped(days) {
            debug!(wrapper = %key, "Unwrapping legacy schedule wrapper");
            for sibling in days.keys().filter(|sibling| sibling.as_str() != key) {
                debug!(day = %sibling, wrapper = %key, "Dropping key beside legacy wrapper");
                report.dropped_days += 1;
            }
            report.unwrapped = Some(key.to_string());
            days = inner;
        }

        for (day_key, shifts) in days {
            let Some(day) = parse_day(day_key, period) else {
                debug!(day = %day_key, "Dropping unrecognised day key");
                report.dropped_days += 1;
                continue;
            };
            let Some(shifts) = shifts.as_object() else {
                debug!(day, "Dropping day whose value is not an object");
                report.dropped_days += 1;
                continue;
            };

            for (shift_key, value) in shifts {
                match self.resolve_kind(shift_key) {
                    Some(kind) => doc.set(day, kind, normalize_slot_pair(Some(value))),
                    None => {
                        debug!(day, shift = %shift_key, "Dropping unrecognised shift key");
                        report.dropped_shifts += 1;
                    }
                }
            }
        }

        (doc, report)
    }

    fn find_wrapped<'a>(
        &'a self,
        days: &'a Map<String, Value>,
    ) -> Option<(&'a str, &'a Map<String, Value>)> {
        self.wrapper_keys.iter().find_map(|key| {
            days.get(key)
                .and_then(Value::as_object)
                .map(|inner| (key.as_str(), inner))
        })
    }

    fn resolve_kind(&self, key: &str) -> Option<ShiftKind> {
        let key = key.trim();
        self.vocabularies
            .iter()
            .find_map(|vocabulary| vocabulary.resolve(key))
    }
}

/// Normalize with the default dialects (canonical ids, labels, `"d"` wrapper)
pub fn normalize(raw: &Value, period: Option<Period>) -> ScheduleDocument {
    Normalizer::default().normalize(raw, period)
}

fn parse_day(key: &str, period: Option<Period>) -> Option<u32> {
    let day = key.trim().parse::<u32>().ok().filter(|day| *day >= 1)?;
    match period {
        Some(period) if !period.contains_day(day) => None,
        _ => Some(day),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
