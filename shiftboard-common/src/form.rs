//! Decoding of schedule form submissions
//!
//! The edit form posts one scalar field per (day, shift kind, slot):
//! `<prefix><sep><day><sep><kind-token><sep><slot>`, e.g. `day_15_morning_1`.
//! Older templates used `e_15_午前_1`. The naming scheme is configuration,
//! not a constant; see [`FormScheme`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

use crate::model::{Period, ScheduleUpdate, ShiftKind, ShiftVocabulary, SlotPair};

/// Read-only view over submitted form fields
pub trait FormFields {
    fn field(&self, name: &str) -> Option<&str>;

    /// Names of every submitted field
    fn field_names(&self) -> Vec<&str>;
}

impl FormFields for HashMap<String, String> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }

    fn field_names(&self) -> Vec<&str> {
        self.keys().map(String::as_str).collect()
    }
}

impl FormFields for BTreeMap<String, String> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }

    fn field_names(&self) -> Vec<&str> {
        self.keys().map(String::as_str).collect()
    }
}

fn default_separator() -> String {
    "_".to_string()
}

/// Field-naming scheme of one form dialect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormScheme {
    pub prefix: String,
    #[serde(default = "default_separator")]
    pub separator: String,
    pub vocabulary: ShiftVocabulary,
}

impl FormScheme {
    /// Current scheme: `day_<D>_<kind-id>_<slot>`
    pub fn day() -> Self {
        Self {
            prefix: "day".to_string(),
            separator: default_separator(),
            vocabulary: ShiftVocabulary::Identifiers,
        }
    }

    /// Older scheme: `e_<D>_<label>_<slot>`
    pub fn legacy_e() -> Self {
        Self {
            prefix: "e".to_string(),
            separator: default_separator(),
            vocabulary: ShiftVocabulary::Labels,
        }
    }

    /// Built-in scheme by name (`"day"` or `"e"`)
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "day" => Some(Self::day()),
            "e" => Some(Self::legacy_e()),
            _ => None,
        }
    }

    /// Field name for one slot, or `None` if the vocabulary lacks `kind`
    pub fn field_name(&self, day: u32, kind: ShiftKind, slot: u8) -> Option<String> {
        let token = self.vocabulary.token(kind)?;
        let sep = &self.separator;
        Some(format!("{}{sep}{}{sep}{}{sep}{}", self.prefix, day, token, slot))
    }
}

impl Default for FormScheme {
    fn default() -> Self {
        Self::day()
    }
}

/// Fields carrying a scheme's prefix that did not decode to any slot
///
/// Covers days outside the period, unknown shift tokens and slot numbers
/// other than 1 and 2.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeReport {
    pub ignored_fields: Vec<String>,
}

impl DecodeReport {
    pub fn is_clean(&self) -> bool {
        self.ignored_fields.is_empty()
    }
}

/// Decode one scheme's fields into a partial update
///
/// For each day of `period` and each shift kind, the pair is emitted when
/// either slot field is present, even as an empty string; a missing slot
/// becomes `""`. When neither field exists the entry is left out, so
/// "cleared" and "not in the form" stay distinguishable. Unknown fields are
/// ignored.
pub fn decode<F: FormFields + ?Sized>(
    fields: &F,
    period: Period,
    scheme: &FormScheme,
) -> ScheduleUpdate {
    decode_with_report(fields, period, scheme).0
}

/// Same as [`decode`], also reporting prefixed fields that were dropped
pub fn decode_with_report<F: FormFields + ?Sized>(
    fields: &F,
    period: Period,
    scheme: &FormScheme,
) -> (ScheduleUpdate, DecodeReport) {
    let mut update = ScheduleUpdate::new();
    let mut consumed = HashSet::new();

    for day in 1..=period.days_in_month() {
        for kind in ShiftKind::ALL {
            let (Some(first_name), Some(second_name)) =
                (scheme.field_name(day, kind, 1), scheme.field_name(day, kind, 2))
            else {
                continue;
            };
            let first = fields.field(&first_name);
            let second = fields.field(&second_name);
            if first.is_none() && second.is_none() {
                continue;
            }
            update.set(
                day,
                kind,
                SlotPair::new(first.unwrap_or_default(), second.unwrap_or_default()),
            );
            consumed.insert(first_name);
            consumed.insert(second_name);
        }
    }

    let scheme_prefix = format!("{}{}", scheme.prefix, scheme.separator);
    let mut ignored_fields: Vec<String> = fields
        .field_names()
        .into_iter()
        .filter(|name| name.starts_with(&scheme_prefix) && !consumed.contains(*name))
        .map(str::to_string)
        .collect();
    ignored_fields.sort();

    for name in &ignored_fields {
        debug!(field = %name, %period, "Dropping form field outside the schedule grid");
    }

    (update, DecodeReport { ignored_fields })
}

/// Form decoder configured with a primary scheme and optional fallbacks
///
/// Fallback schemes let one deployment accept submissions from older
/// templates. Where schemes overlap, the primary scheme wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormDecoder {
    primary: FormScheme,
    fallbacks: Vec<FormScheme>,
}

impl Default for FormDecoder {
    fn default() -> Self {
        Self::new(FormScheme::day())
    }
}

impl FormDecoder {
    pub fn new(primary: FormScheme) -> Self {
        Self {
            primary,
            fallbacks: Vec::new(),
        }
    }

    pub fn with_fallback(mut self, scheme: FormScheme) -> Self {
        if scheme != self.primary && !self.fallbacks.contains(&scheme) {
            self.fallbacks.push(scheme);
        }
        self
    }

    pub fn primary(&self) -> &FormScheme {
        &self.primary
    }

    pub fn decode<F: FormFields + ?Sized>(&self, fields: &F, period: Period) -> ScheduleUpdate {
        let mut update = ScheduleUpdate::new();
        for scheme in self.fallbacks.iter().rev() {
            let decoded = decode(fields, period, scheme);
            if !decoded.is_empty() {
                debug!(prefix = %scheme.prefix, entries = decoded.entry_count(), "Decoded fallback form scheme");
            }
            update.apply(&decoded);
        }
        update.apply(&decode(fields, period, &self.primary));
        update
    }
}

/// Target period from the plain `year`/`month` submission fields
///
/// Missing values fall back to `today`; malformed or out-of-range values are
/// logged and fall back the same way.
pub fn resolve_period<F: FormFields + ?Sized>(fields: &F, today: NaiveDate) -> Period {
    let fallback = Period::from_date(today);
    let year = parse_field(fields, "year").unwrap_or(fallback.year() as i64);
    let month = parse_field(fields, "month").unwrap_or(fallback.month() as i64);

    let period = i32::try_from(year)
        .ok()
        .zip(u32::try_from(month).ok())
        .and_then(|(year, month)| Period::new(year, month).ok());

    match period {
        Some(period) => period,
        None => {
            warn!(year, month, "Submitted period out of range, using current month");
            fallback
        }
    }
}

fn parse_field<F: FormFields + ?Sized>(fields: &F, name: &str) -> Option<i64> {
    let raw = fields.field(name)?.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<i64>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(field = name, value = raw, "Ignoring malformed period field");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn april() -> Period {
        Period::new(2025, 4).unwrap()
    }

    #[test]
    fn test_single_slot_present_yields_padded_pair() {
        let update = decode(&fields(&[("day_5_morning_1", "A")]), april(), &FormScheme::day());

        assert_eq!(update.slot(5, ShiftKind::Morning), Some(&SlotPair::new("A", "")));
        assert_eq!(update.entry_count(), 1);
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let update = decode(&fields(&[("day_6_night_2", "B")]), april(), &FormScheme::day());

        assert!(update.day(5).is_none());
        assert_eq!(update.slot(6, ShiftKind::Night), Some(&SlotPair::new("", "B")));
    }

    #[test]
    fn test_empty_string_counts_as_present() {
        let update = decode(
            &fields(&[("day_2_early_1", ""), ("day_2_early_2", "")]),
            april(),
            &FormScheme::day(),
        );

        assert_eq!(update.slot(2, ShiftKind::Early), Some(&SlotPair::new("", "")));
    }

    #[test]
    fn test_unknown_and_out_of_range_fields_ignored() {
        let (update, report) = decode_with_report(
            &fields(&[
                ("day_31_early_1", "A"),
                ("day_3_brunch_1", "B"),
                ("day_3_early_3", "C"),
                ("csrf_token", "xyz"),
                ("year", "2025"),
            ]),
            april(),
            &FormScheme::day(),
        );

        assert!(update.is_empty());
        assert_eq!(
            report.ignored_fields,
            vec!["day_31_early_1", "day_3_brunch_1", "day_3_early_3"]
        );
    }

    #[test]
    fn test_report_is_clean_when_every_field_decodes() {
        let submitted: BTreeMap<String, String> = [
            ("day_7_evening_1".to_string(), "Mori".to_string()),
            ("day_7_evening_2".to_string(), String::new()),
            ("month".to_string(), "4".to_string()),
        ]
        .into_iter()
        .collect();

        let (update, report) = decode_with_report(&submitted, april(), &FormScheme::day());

        assert!(report.is_clean());
        assert_eq!(update.slot(7, ShiftKind::Evening), Some(&SlotPair::new("Mori", "")));
        assert_eq!(resolve_period(&submitted, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()).month(), 4);
    }

    #[test]
    fn test_legacy_e_scheme_uses_labels() {
        let scheme = FormScheme::legacy_e();
        assert_eq!(
            scheme.field_name(4, ShiftKind::Afternoon, 2).as_deref(),
            Some("e_4_午後_2")
        );

        let update = decode(&fields(&[("e_4_午後_1", "Ueda")]), april(), &scheme);
        assert_eq!(update.slot(4, ShiftKind::Afternoon), Some(&SlotPair::new("Ueda", "")));
    }

    #[test]
    fn test_custom_separator_and_vocabulary() {
        let scheme = FormScheme {
            prefix: "shift".to_string(),
            separator: "-".to_string(),
            vocabulary: ShiftVocabulary::Custom(
                [("n".to_string(), ShiftKind::Night)].into_iter().collect(),
            ),
        };
        let update = decode(&fields(&[("shift-10-n-2", "Kato")]), april(), &scheme);

        assert_eq!(update.slot(10, ShiftKind::Night), Some(&SlotPair::new("", "Kato")));
        assert_eq!(scheme.field_name(10, ShiftKind::Early, 1), None);
    }

    #[test]
    fn test_primary_scheme_wins_over_fallback() {
        let decoder = FormDecoder::new(FormScheme::day()).with_fallback(FormScheme::legacy_e());
        let update = decoder.decode(
            &fields(&[
                ("day_1_early_1", "New"),
                ("e_1_早朝_1", "Old"),
                ("e_2_深夜_2", "Legacy"),
            ]),
            april(),
        );

        assert_eq!(update.slot(1, ShiftKind::Early), Some(&SlotPair::new("New", "")));
        assert_eq!(update.slot(2, ShiftKind::Night), Some(&SlotPair::new("", "Legacy")));
    }

    #[test]
    fn test_resolve_period_from_fields() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();

        let period = resolve_period(&fields(&[("year", "2024"), ("month", "2")]), today);
        assert_eq!(period, Period::new(2024, 2).unwrap());

        let period = resolve_period(&fields(&[]), today);
        assert_eq!(period, Period::new(2025, 6).unwrap());

        let period = resolve_period(&fields(&[("year", ""), ("month", "11")]), today);
        assert_eq!(period, Period::new(2025, 11).unwrap());
    }

    #[test]
    fn test_resolve_period_falls_back_on_garbage() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();

        let period = resolve_period(&fields(&[("year", "twenty"), ("month", "3")]), today);
        assert_eq!(period, Period::new(2025, 3).unwrap());

        let period = resolve_period(&fields(&[("month", "13")]), today);
        assert_eq!(period, Period::new(2025, 6).unwrap());
    }
}
