//! Field-to-column mapping and SQL write synthesis.

pub mod batch;
pub mod record;

pub use batch::BatchMapper;
pub use record::{ColumnMapperFn, RecordMapper};

/// Column holding the short creation date.
pub const DATE_ADDED: &str = "DateAdded";
/// Column holding the full creation timestamp.
pub const DATE_TIME_ADDED: &str = "DateTimeAdded";
/// Column holding the last-write timestamp.
pub const LAST_UPDATED: &str = "LastUpdated";

/// Short date format for [`DATE_ADDED`].
pub const SHORT_DATE: &str = "%Y-%m-%d";
/// Timestamp format for [`DATE_TIME_ADDED`] and [`LAST_UPDATED`].
pub const DATE_TIME: &str = "%Y-%m-%d %H:%M:%S";
