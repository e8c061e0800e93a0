//! Single-record field-to-column mapping and write synthesis.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::trace;

use super::{DATE_ADDED, DATE_TIME, DATE_TIME_ADDED, LAST_UPDATED, SHORT_DATE};
use crate::core::{Result, Statement, StatementKind, StoreError, Value};
use crate::model::FieldMap;
use crate::naming::tabelize;
use crate::schema::TableSchema;

/// Custom field-to-column hook, consulted after an exact-name match and
/// before the naming conventions.
pub type ColumnMapperFn = dyn Fn(&str, &TableSchema) -> Option<String> + Send + Sync;

/// Maps one record's fields onto one table and synthesizes its writes.
///
/// The mapper tracks a touched set: only columns that were explicitly
/// populated ever appear in generated SQL, so an untouched column is never
/// overwritten with a default. Fields that resolve to no column are dropped
/// without error; the resolution chain is
///
/// 1. exact column name,
/// 2. the custom mapper hook, when set,
/// 3. the tabelize convention (`customerId` to `CustomerID`),
/// 4. the whole field uppercased (`ssn` to `SSN`),
/// 5. the explicit static map.
pub struct RecordMapper {
    schema: Arc<TableSchema>,
    touched: Vec<(String, Value)>,
    custom_mapper: Option<Arc<ColumnMapperFn>>,
    static_map: HashMap<String, String>,
    force_lookup_fields: Option<Vec<String>>,
}

impl RecordMapper {
    pub fn new(schema: Arc<TableSchema>) -> Self {
        Self {
            schema,
            touched: Vec::new(),
            custom_mapper: None,
            static_map: HashMap::new(),
            force_lookup_fields: None,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Install the custom resolution hook.
    pub fn with_column_mapper(mut self, mapper: Arc<ColumnMapperFn>) -> Self {
        self.custom_mapper = Some(mapper);
        self
    }

    /// Add an explicit field-to-column mapping, the last resort of the
    /// resolution chain.
    pub fn map_field(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.static_map.insert(field.into(), column.into());
        self
    }

    /// Resolve a field name to a column of this table, or `None` when the
    /// field has no storage here.
    pub fn resolve_column(&self, field: &str) -> Option<String> {
        if self.schema.has_column(field) {
            return Some(field.to_string());
        }

        // the hook's answer is trusted as-is, not re-checked against the
        // schema
        if let Some(mapper) = &self.custom_mapper {
            if let Some(column) = mapper(field, &self.schema) {
                return Some(column);
            }
        }

        let conventional = tabelize(field);
        if self.schema.has_column(&conventional) {
            return Some(conventional);
        }

        let upper = field.to_uppercase();
        if self.schema.has_column(&upper) {
            return Some(upper);
        }

        if let Some(column) = self.static_map.get(field) {
            if self.schema.has_column(column) {
                return Some(column.clone());
            }
        }

        None
    }

    /// Populate the touched set from a field snapshot.
    ///
    /// A NULL incoming value never clears a column that already holds one;
    /// callers that mean "reset this column" pass [`Value::sql_null`]
    /// instead.
    pub fn populate(&mut self, fields: &FieldMap) {
        for (field, value) in fields.iter() {
            self.set(field, value.clone());
        }
    }

    /// Populate one field, subject to the same resolution and NULL rules as
    /// [`populate`](Self::populate).
    pub fn set(&mut self, field: &str, value: Value) {
        let Some(column) = self.resolve_column(field) else {
            trace!(table = %self.schema.table, field, "field has no column, dropped");
            return;
        };

        if value.is_null() && self.get(&column).map(|v| !v.is_empty()).unwrap_or(false) {
            return;
        }

        self.set_column(column, value);
    }

    /// Touch a column directly, bypassing field resolution.
    pub fn set_column(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        match self.touched.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = value,
            None => self.touched.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.touched
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn touched(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.touched.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn is_touched(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn clear(&mut self) {
        self.touched.clear();
        self.force_lookup_fields = None;
    }

    /// Stamp the audit columns the table has, but only those not already
    /// carrying a value. [`DATE_ADDED`] gets the short date, the other two
    /// the full timestamp.
    pub fn stamp_dates(&mut self, now: NaiveDateTime) {
        let short = now.format(SHORT_DATE).to_string();
        let full = now.format(DATE_TIME).to_string();

        for (column, stamp) in [
            (DATE_ADDED, &short),
            (DATE_TIME_ADDED, &full),
            (LAST_UPDATED, &full),
        ] {
            if self.schema.has_column(column)
                && self.get(column).map(Value::is_empty).unwrap_or(true)
            {
                self.set_column(column, Value::Text(stamp.clone()));
            }
        }
    }

    /// Re-stamp [`LAST_UPDATED`] unconditionally. Every update path calls
    /// this so the column always reflects the latest write.
    pub fn touch_last_updated(&mut self, now: NaiveDateTime) {
        if self.schema.has_column(LAST_UPDATED) {
            self.set_column(
                LAST_UPDATED,
                Value::Text(now.format(DATE_TIME).to_string()),
            );
        }
    }

    /// Pin the next lookup to these fields instead of the key chain. The
    /// override is consumed by the next statement that needs a lookup key.
    pub fn force_lookup(&mut self, fields: Vec<String>) {
        self.force_lookup_fields = Some(fields);
    }

    /// Columns identifying this record, in precedence order: the one-shot
    /// forced fields, then the primary key, then the best unique key. Every
    /// column of the chosen key must hold a touched, non-empty value.
    pub fn lookup_columns(&mut self) -> Result<Vec<String>> {
        if let Some(fields) = self.force_lookup_fields.take() {
            let columns = fields
                .iter()
                .map(|f| self.resolve_column(f))
                .collect::<Option<Vec<String>>>();
            return match columns {
                Some(columns) if !columns.is_empty() && self.all_populated(&columns) => {
                    Ok(columns)
                }
                _ => Err(self.lookup_error()),
            };
        }

        let primary = self.schema.primary_key();
        if !primary.is_empty() && self.all_populated(&primary) {
            return Ok(primary);
        }

        let unique = self.schema.best_unique_key();
        if !unique.is_empty() && self.all_populated(&unique) {
            return Ok(unique);
        }

        Err(self.lookup_error())
    }

    fn all_populated(&self, columns: &[String]) -> bool {
        columns
            .iter()
            .all(|c| self.get(c).map(|v| !v.is_empty()).unwrap_or(false))
    }

    fn lookup_error(&self) -> StoreError {
        StoreError::LookupKey {
            database: self.schema.database.clone(),
            table: self.schema.table.clone(),
        }
    }

    /// Synthesize an `INSERT ... SET` over the touched columns, optionally
    /// with an `ON DUPLICATE KEY UPDATE` clause repeating the same
    /// assignments. Verbatim values are inlined; everything else binds.
    pub fn insert(&mut self, now: NaiveDateTime, dupe_update: bool) -> Result<Statement> {
        self.stamp_dates(now);

        if self.touched.is_empty() {
            return Err(StoreError::Write(format!(
                "nothing to insert into {}",
                self.schema.qualified_name()
            )));
        }

        let (assignments, mut params) = assignment_list(&self.touched);
        let mut sql = format!(
            "INSERT INTO {} SET {assignments}",
            self.schema.qualified_name()
        );

        if dupe_update {
            sql.push_str(" ON DUPLICATE KEY UPDATE ");
            sql.push_str(&assignments);
            let repeat = params.clone();
            params.extend(repeat);
        }

        Ok(Statement::new(StatementKind::Insert, sql, params))
    }

    /// Synthesize an `UPDATE` of the touched columns, keyed by
    /// [`lookup_columns`](Self::lookup_columns). Key columns move to the
    /// `WHERE` clause and are left out of the assignment list.
    pub fn update(&mut self, now: NaiveDateTime) -> Result<Statement> {
        self.touch_last_updated(now);

        let key = self.lookup_columns()?;
        let assignments: Vec<(String, Value)> = self
            .touched
            .iter()
            .filter(|(c, _)| !key.contains(c))
            .cloned()
            .collect();

        if assignments.is_empty() {
            return Err(StoreError::Write(format!(
                "no columns to update in {}",
                self.schema.qualified_name()
            )));
        }

        let (set_sql, mut params) = assignment_list(&assignments);
        let (where_sql, where_params) = self.where_clause(&key);
        params.extend(where_params);

        let sql = format!(
            "UPDATE {} SET {set_sql} WHERE {where_sql}",
            self.schema.qualified_name()
        );

        Ok(Statement::new(StatementKind::Update, sql, params))
    }

    /// `col = COALESCE(col, 0) + offset` for each field, keyed like an
    /// update.
    pub fn increment(
        &mut self,
        fields: &[&str],
        offset: i64,
        now: NaiveDateTime,
    ) -> Result<Statement> {
        self.offset_columns(fields, offset, now, '+')
    }

    /// `col = COALESCE(col, 0) - offset` for each field, keyed like an
    /// update.
    pub fn decrement(
        &mut self,
        fields: &[&str],
        offset: i64,
        now: NaiveDateTime,
    ) -> Result<Statement> {
        self.offset_columns(fields, offset, now, '-')
    }

    fn offset_columns(
        &mut self,
        fields: &[&str],
        offset: i64,
        now: NaiveDateTime,
        sign: char,
    ) -> Result<Statement> {
        if fields.is_empty() {
            return Err(StoreError::Write(format!(
                "no fields to offset on {}",
                self.schema.qualified_name()
            )));
        }

        let mut fragments = Vec::with_capacity(fields.len());
        let mut params = Vec::with_capacity(fields.len() + 1);
        for field in fields {
            let column = self.resolve_column(field).ok_or_else(|| {
                StoreError::Write(format!(
                    "cannot offset unknown field {field:?} on {}",
                    self.schema.qualified_name()
                ))
            })?;
            fragments.push(format!("`{column}` = COALESCE(`{column}`, 0) {sign} ?"));
            params.push(Value::Integer(offset));
        }

        let key = self.lookup_columns()?;
        let mut sql = format!(
            "UPDATE {} SET {}",
            self.schema.qualified_name(),
            fragments.join(", ")
        );

        if self.schema.has_column(LAST_UPDATED) {
            sql.push_str(&format!(", `{LAST_UPDATED}` = ?"));
            params.push(Value::Text(now.format(DATE_TIME).to_string()));
        }

        let (where_sql, where_params) = self.where_clause(&key);
        sql.push_str(" WHERE ");
        sql.push_str(&where_sql);
        params.extend(where_params);

        Ok(Statement::new(StatementKind::Update, sql, params))
    }

    fn where_clause(&self, key: &[String]) -> (String, Vec<Value>) {
        let mut fragments = Vec::with_capacity(key.len());
        let mut params = Vec::new();

        for column in key {
            let value = self.get(column).cloned().unwrap_or(Value::Null);
            if value.is_verbatim() {
                fragments.push(format!("`{column}` = {value}"));
            } else {
                fragments.push(format!("`{column}` = ?"));
                params.push(value);
            }
        }

        (fragments.join(" AND "), params)
    }
}

/// Render `` `A` = ?, `B` = NOW() `` over the given columns, binding
/// everything except verbatim values.
fn assignment_list(columns: &[(String, Value)]) -> (String, Vec<Value>) {
    let mut fragments = Vec::with_capacity(columns.len());
    let mut params = Vec::new();

    for (column, value) in columns {
        if value.is_verbatim() {
            fragments.push(format!("`{column}` = {value}"));
        } else {
            fragments.push(format!("`{column}` = ?"));
            params.push(value.clone());
        }
    }

    (fragments.join(", "), params)
}
