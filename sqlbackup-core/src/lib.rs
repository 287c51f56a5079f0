//! Dump a MySQL database to a single replayable SQL file.

pub mod config;
pub mod db;
pub mod error;
pub mod exporter;
pub mod source;
pub mod writer;

pub use config::{BackupConfig, OnTableError};
pub use error::{BackupError, Result};
pub use exporter::{ExportSummary, Exporter, TableReport};
