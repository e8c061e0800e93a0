//! Multi-record write synthesis.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;

use super::record::{ColumnMapperFn, RecordMapper};
use crate::core::{ExecOutcome, Result, Statement, StatementKind, StoreError, Value};
use crate::model::FieldMap;
use crate::schema::TableSchema;

/// Maps a batch of records onto one table and emits a single multi-row
/// `INSERT`.
///
/// Each record goes through the same resolution, NULL and date-stamping
/// rules as a single-record write. The statement's column list is the union
/// of every record's touched columns in first-seen order; records missing a
/// column bind NULL for it.
pub struct BatchMapper {
    schema: Arc<TableSchema>,
    custom_mapper: Option<Arc<ColumnMapperFn>>,
    static_map: HashMap<String, String>,
    columns: Vec<String>,
    rows: Vec<Vec<(String, Value)>>,
}

impl BatchMapper {
    pub fn new(schema: Arc<TableSchema>) -> Self {
        Self {
            schema,
            custom_mapper: None,
            static_map: HashMap::new(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Install the custom resolution hook used for every record.
    pub fn with_column_mapper(mut self, mapper: Arc<ColumnMapperFn>) -> Self {
        self.custom_mapper = Some(mapper);
        self
    }

    pub fn map_field(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.static_map.insert(field.into(), column.into());
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Map and date-stamp every record, extending the batch.
    pub fn populate(&mut self, records: &[FieldMap], now: NaiveDateTime) {
        for record in records {
            let mut mapper = RecordMapper::new(Arc::clone(&self.schema));
            if let Some(custom) = &self.custom_mapper {
                mapper = mapper.with_column_mapper(Arc::clone(custom));
            }
            for (field, column) in &self.static_map {
                mapper = mapper.map_field(field.clone(), column.clone());
            }

            mapper.populate(record);
            mapper.stamp_dates(now);

            let touched: Vec<(String, Value)> = mapper
                .touched()
                .map(|(c, v)| (c.to_string(), v.clone()))
                .collect();

            for (column, _) in &touched {
                if !self.columns.contains(column) {
                    self.columns.push(column.clone());
                }
            }

            self.rows.push(touched);
        }
    }

    /// Synthesize the multi-row `INSERT`, optionally with
    /// `ON DUPLICATE KEY UPDATE col = VALUES(col)` over every column.
    pub fn insert(&self, dupe_update: bool) -> Result<Statement> {
        if self.rows.is_empty() || self.columns.is_empty() {
            return Err(StoreError::Write(format!(
                "nothing to insert into {}",
                self.schema.qualified_name()
            )));
        }

        let column_list = self
            .columns
            .iter()
            .map(|c| format!("`{c}`"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut tuples = Vec::with_capacity(self.rows.len());
        let mut params = Vec::new();

        for row in &self.rows {
            let mut slots = Vec::with_capacity(self.columns.len());
            for column in &self.columns {
                let value = row
                    .iter()
                    .find(|(c, _)| c == column)
                    .map(|(_, v)| v.clone())
                    .unwrap_or(Value::Null);
                if value.is_verbatim() {
                    slots.push(value.to_string());
                } else {
                    slots.push("?".to_string());
                    params.push(value);
                }
            }
            tuples.push(format!("({})", slots.join(", ")));
        }

        let mut sql = format!(
            "INSERT INTO {} ({column_list}) VALUES {}",
            self.schema.qualified_name(),
            tuples.join(", ")
        );

        if dupe_update {
            let updates = self
                .columns
                .iter()
                .map(|c| format!("`{c}` = VALUES(`{c}`)"))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" ON DUPLICATE KEY UPDATE ");
            sql.push_str(&updates);
        }

        Ok(Statement::new(StatementKind::Insert, sql, params))
    }

    /// Generated ids for the batch, when the table has a single-column
    /// auto-increment primary key.
    ///
    /// Relies on MySQL handing a plain multi-row insert a contiguous id
    /// block starting at `last_insert_id`, which holds when
    /// `innodb_autoinc_lock_mode` is not interleaved and no row hit the
    /// duplicate-key path.
    pub fn assigned_ids(&self, outcome: &ExecOutcome) -> Option<Vec<i64>> {
        if !self.schema.has_auto_increment_primary() {
            return None;
        }
        let first = outcome.last_insert_id.filter(|id| *id > 0)? as i64;
        Some((0..self.rows.len() as i64).map(|i| first + i).collect())
    }
}
