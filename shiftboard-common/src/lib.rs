//! # Shiftboard Common Library
//!
//! Persistence and normalization core for the monthly shift roster:
//! - Record model (periods, shift kinds, slot pairs, schedule documents)
//! - Normalization of legacy on-disk schedule dialects
//! - Decoding of flat form submissions into schedule updates
//! - Per-store, per-month schedule storage with merge-then-write
//! - Per-store employee roster directory
//! - Configuration loading and root folder resolution

pub mod config;
pub mod error;
pub mod form;
pub mod fs_utils;
pub mod model;
pub mod normalize;
pub mod roster;
pub mod service;
pub mod store;

pub use error::{Error, Result};
pub use model::{
    DaySchedule, Period, ScheduleDocument, ScheduleUpdate, ShiftKind, ShiftVocabulary, SlotPair,
    StoreId,
};
