//! Storage adapters.
//!
//! [`Backend`] is the execution seam: it runs statements and serves table
//! schemas, nothing more. [`MysqlConnection`](crate::connection::MysqlConnection)
//! is the production implementation; tests script one. [`Adapter`] is the
//! model-level surface the [`Manager`](crate::manager::Manager) fans out to.

pub mod mysql;

pub use self::mysql::MysqlAdapter;

use std::sync::Arc;

use crate::connection::Role;
use crate::core::{ExecOutcome, Result, Row, Statement};
use crate::criteria::Criteria;
use crate::model::Model;
use crate::schema::TableSchema;

/// Statement execution and schema lookup, separated from the mapping logic
/// so adapters run against anything that can answer these four calls.
pub trait Backend: Send + Sync {
    fn run_select(&self, role: Role, stmt: &Statement) -> Result<Vec<Row>>;

    fn run_execute(&self, stmt: &Statement) -> Result<ExecOutcome>;

    /// Execute inside a transaction; used for multi-row inserts so the
    /// generated id block belongs to the batch alone.
    fn run_execute_in_tx(&self, stmt: &Statement) -> Result<ExecOutcome>;

    fn table_schema(&self, database: &str, table: &str) -> Result<Arc<TableSchema>>;
}

/// Options for a single write.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Skip the existing-record lookup and go straight to insert.
    pub skip_lookup: bool,
    /// Pre-built criteria identifying the existing record, used instead of
    /// the model's own lookup key.
    pub existing: Option<Criteria>,
}

impl WriteOptions {
    pub fn skip_lookup() -> Self {
        Self {
            skip_lookup: true,
            ..Self::default()
        }
    }

    pub fn existing(criteria: Criteria) -> Self {
        Self {
            existing: Some(criteria),
            ..Self::default()
        }
    }
}

/// A store a model type can be written to and read from.
pub trait Adapter<M: Model>: Send + Sync {
    /// Adapter type identifier, e.g. `"mysql"`.
    fn kind(&self) -> &str;

    /// Write one model: find-or-insert, update when found, stamp generated
    /// id and audit dates back, then write the meta side-record if the
    /// model carries one.
    fn write(&self, model: &mut M, options: &WriteOptions) -> Result<()>;

    /// Write many models in one multi-row statement, back-filling generated
    /// ids when the table allows it.
    fn write_batch(&self, models: &mut [M]) -> Result<()>;

    fn find_one(&self, criteria: &Criteria) -> Result<Option<M>>;

    fn find_all(&self, criteria: &Criteria) -> Result<Vec<M>>;

    /// [`find_all`](Self::find_all) with a result window. An offset only
    /// applies together with a limit.
    fn find(&self, criteria: &Criteria, limit: Option<u64>, offset: Option<u64>) -> Result<Vec<M>>;

    /// Look up by primary key values, arity-checked against the key.
    fn find_one_by_id(&self, ids: &[crate::core::Value]) -> Result<Option<M>>;

    /// Look up a meta side-record directly.
    fn find_meta(&self, criteria: &Criteria) -> Result<Option<M::Meta>>;

    /// Offset numeric columns for the record the model identifies, all by
    /// the same amount.
    fn increment(&self, model: &M, fields: &[&str], offset: i64) -> Result<()>;

    fn decrement(&self, model: &M, fields: &[&str], offset: i64) -> Result<()>;

    /// Delete matching records, returning the count removed.
    fn delete(&self, criteria: &Criteria) -> Result<u64>;

    /// Delete matching records and their meta side-records.
    fn delete_batch(&self, criteria: &Criteria) -> Result<u64>;
}
