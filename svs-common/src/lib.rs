//! # SVS Common Library
//!
//! Serial validation engine shared by the SVS service:
//! - Serial number normalization to canonical fixed-width identifiers
//! - Range tables and their atomic publication
//! - Three-way classification (valid / invalid / not found)
//! - Bulk import from spreadsheet rows
//! - SQLite persistence and the audit log
//! - Configuration loading

pub mod audit;
pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod normalize;
pub mod range_table;
pub mod snapshot;
pub mod store;

pub use classifier::{Classifier, Status, Verdict};
pub use error::{Error, Result};
pub use import::{ImportPipeline, ImportResult};
pub use normalize::{Identifier, Normalizer};
pub use range_table::{MatchResult, RangeTable, SerialRange};
pub use snapshot::SnapshotCell;
pub use store::SerialStore;
