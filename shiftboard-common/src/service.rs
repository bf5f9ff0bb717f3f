//! Schedule service facade
//!
//! Entry points a front end calls: build the month view handed to a
//! renderer, save a form submission, replace a roster. Authorization is
//! decided by the caller and passed in as a plain boolean.

use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

use crate::config::ShiftboardConfig;
use crate::form::{resolve_period, FormDecoder, FormFields};
use crate::model::{Period, ScheduleDocument, ShiftKind, StoreId};
use crate::roster::{RosterDirectory, RosterInput};
use crate::store::{SaveOutcome, ScheduleStore};
use crate::{Error, Result};

/// Shift identifier with its display label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShiftOption {
    pub id: &'static str,
    pub label: &'static str,
}

/// Everything a renderer needs for one store's month
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthView {
    pub store_id: String,
    pub year: i32,
    pub month: u32,
    pub days_in_month: u32,
    pub prefill: ScheduleDocument,
    pub employees: Vec<String>,
    pub shifts: Vec<ShiftOption>,
    pub prev: Period,
    pub next: Period,
}

/// Schedule store, roster directory and form decoder wired together
#[derive(Debug, Clone)]
pub struct ScheduleService {
    store: ScheduleStore,
    roster: RosterDirectory,
    decoder: FormDecoder,
}

impl ScheduleService {
    pub fn new(store: ScheduleStore, roster: RosterDirectory, decoder: FormDecoder) -> Self {
        Self {
            store,
            roster,
            decoder,
        }
    }

    /// Build the service for a data root from loaded configuration
    pub fn from_config(root: &Path, config: &ShiftboardConfig) -> Result<Self> {
        Ok(Self::new(
            ScheduleStore::new(root, config.store_options()?),
            config.roster_directory(root),
            config.form_decoder()?,
        ))
    }

    pub fn store(&self) -> &ScheduleStore {
        &self.store
    }

    pub fn roster(&self) -> &RosterDirectory {
        &self.roster
    }

    pub fn decoder(&self) -> &FormDecoder {
        &self.decoder
    }

    /// Normalized schedule, roster and shift table for one month
    pub fn month_view(&self, store: &StoreId, period: Period) -> MonthView {
        MonthView {
            store_id: store.to_string(),
            year: period.year(),
            month: period.month(),
            days_in_month: period.days_in_month(),
            prefill: self.store.read(store, period),
            employees: self.roster.read(store),
            shifts: ShiftKind::ALL
                .into_iter()
                .map(|kind| ShiftOption {
                    id: kind.id(),
                    label: kind.label(),
                })
                .collect(),
            prev: period.prev(),
            next: period.next(),
        }
    }

    /// Decode a submitted edit form and merge it into the stored month
    ///
    /// The target month comes from the `year`/`month` fields, defaulting to
    /// the month of `today`. Returns the period written alongside the
    /// outcome.
    pub fn save_submission<F: FormFields + ?Sized>(
        &self,
        store: &StoreId,
        fields: &F,
        authorized: bool,
        today: NaiveDate,
    ) -> Result<(Period, SaveOutcome)> {
        ensure_authorized(store, authorized)?;
        let period = resolve_period(fields, today);
        let update = self.decoder.decode(fields, period);
        let outcome = self.store.merge_and_write(store, period, &update)?;
        Ok((period, outcome))
    }

    /// Replace a store's roster
    pub fn update_roster(
        &self,
        store: &StoreId,
        input: RosterInput,
        authorized: bool,
    ) -> Result<Vec<String>> {
        ensure_authorized(store, authorized)?;
        self.roster.write(store, input)
    }
}

fn ensure_authorized(store: &StoreId, authorized: bool) -> Result<()> {
    if authorized {
        return Ok(());
    }
    warn!(store = %store, "Rejected write from unauthorized caller");
    Err(Error::Unauthorized(format!(
        "caller may not modify store {}",
        store
    )))
}
