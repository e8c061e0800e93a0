//! The MySQL adapter: model-level reads and writes over a [`Backend`].

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::debug;

use super::{Adapter, Backend, WriteOptions};
use crate::connection::Role;
use crate::core::{Result, Row, Statement, StatementKind, StoreError, Value};
use crate::criteria::Criteria;
use crate::mapper::record::ColumnMapperFn;
use crate::mapper::{BatchMapper, RecordMapper, DATE_ADDED, DATE_TIME_ADDED, LAST_UPDATED};
use crate::model::{from_tagged, to_tagged, Model};
use crate::naming::{modelize, names_match};
use crate::schema::TableSchema;

const ADAPTER_KIND: &str = "mysql";

/// Column carrying the serialized meta payload, when the meta table has it.
const META_DATA_COLUMN: &str = "Data";

type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Result-window rendering for selects. An offset without a limit is
/// ignored; MySQL has no standalone `OFFSET`.
#[derive(Debug, Clone, Copy)]
struct Window {
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Window {
    fn one() -> Self {
        Self {
            limit: Some(1),
            offset: None,
        }
    }

    fn new(limit: Option<u64>, offset: Option<u64>) -> Self {
        Self { limit, offset }
    }

    fn append_to(self, sql: &mut String) {
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
            if let Some(offset) = self.offset {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }
    }
}

/// MySQL storage for one model type.
///
/// Every operation resolves the table schema through the backend's cache,
/// maps model fields to columns and synthesizes parameterized SQL. The
/// write path is find-or-insert: an existing record is located by the
/// caller-supplied criteria or the model's lookup key, merged with the
/// incoming fields and updated; otherwise the model is inserted and the
/// generated id stamped back.
pub struct MysqlAdapter<M: Model> {
    backend: Arc<dyn Backend>,
    database: String,
    clock: Clock,
    column_mapper: Option<Arc<ColumnMapperFn>>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> MysqlAdapter<M> {
    pub fn new(backend: Arc<dyn Backend>, database: impl Into<String>) -> Self {
        Self {
            backend,
            database: database.into(),
            clock: Arc::new(|| chrono::Local::now().naive_local()),
            column_mapper: None,
            _model: PhantomData,
        }
    }

    /// Replace the wall clock. Tests pin this to a fixed instant.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Install a custom field-to-column hook used by every mapper this
    /// adapter builds.
    pub fn with_column_mapper(mut self, mapper: Arc<ColumnMapperFn>) -> Self {
        self.column_mapper = Some(mapper);
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    fn schema(&self, table: &str) -> Result<Arc<TableSchema>> {
        self.backend.table_schema(&self.database, table)
    }

    fn mapper_for(&self, schema: &Arc<TableSchema>) -> RecordMapper {
        let mapper = RecordMapper::new(Arc::clone(schema));
        match &self.column_mapper {
            Some(custom) => mapper.with_column_mapper(Arc::clone(custom)),
            None => mapper,
        }
    }

    /// Rewrite criteria field names to column names for one table.
    fn resolve_criteria(&self, schema: &Arc<TableSchema>, criteria: &Criteria) -> Result<Criteria> {
        let mapper = self.mapper_for(schema);
        let mut resolved = Criteria::new();
        if criteria.conjunction() == crate::criteria::Conjunction::Or {
            resolved = resolved.any_of();
        }
        for (field, term) in criteria.iter() {
            let column = mapper.resolve_column(field).ok_or_else(|| {
                StoreError::Model(format!(
                    "criteria field {field:?} has no column in {}",
                    schema.qualified_name()
                ))
            })?;
            resolved = resolved.term(column, term.clone());
        }
        Ok(resolved)
    }

    /// Lookup criteria from the model itself: its declared unique fields,
    /// or the schema's best unique key. A hash column is answered with the
    /// model's content hash; fields without a value are left out.
    fn lookup_criteria(&self, model: &M, schema: &Arc<TableSchema>) -> Result<Criteria> {
        let mapper = self.mapper_for(schema);

        let columns: Vec<String> = {
            let fields = M::unique_search_fields();
            if fields.is_empty() {
                schema.best_unique_key()
            } else {
                fields
                    .iter()
                    .filter_map(|f| mapper.resolve_column(f))
                    .collect()
            }
        };

        let mut criteria = Criteria::new();
        for column in columns {
            let value = if M::hashed() && names_match(&column, "hash") {
                Value::Text(model.content_hash())
            } else {
                model.field(&modelize(&column)).unwrap_or(Value::Null)
            };
            if !value.is_empty() {
                criteria = criteria.equals(column, value);
            }
        }
        Ok(criteria)
    }

    fn select_rows(
        &self,
        role: Role,
        schema: &Arc<TableSchema>,
        criteria: &Criteria,
        window: Window,
    ) -> Result<Vec<Row>> {
        let resolved = self.resolve_criteria(schema, criteria)?;
        let (condition, params) = resolved.render(None);

        let mut sql = format!("SELECT * FROM {}", schema.qualified_name());
        if !condition.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&condition);
        }
        window.append_to(&mut sql);

        self.backend
            .run_select(role, &Statement::new(StatementKind::Select, sql, params))
    }

    /// The column joining a meta row to its owner, `CustomerID` for a
    /// `Customer`.
    fn owner_column(&self, schema: &Arc<TableSchema>) -> Result<String> {
        self.mapper_for(schema)
            .resolve_column(&M::id_field())
            .ok_or_else(|| {
                StoreError::Model(format!(
                    "{} has no column for id field {:?}",
                    schema.qualified_name(),
                    M::id_field()
                ))
            })
    }

    /// Select through the meta join, splitting each combined row into the
    /// model and its side-record.
    fn select_with_meta(&self, criteria: &Criteria, window: Window) -> Result<Vec<M>> {
        let schema = self.schema(&M::table_name())?;
        let meta_schema = self.schema(&M::meta_table_name())?;
        let owner = self.owner_column(&schema)?;

        let resolved = self.resolve_criteria(&schema, criteria)?;
        let (condition, params) = resolved.render(Some(&M::table_name()));

        let mut sql = format!(
            "SELECT * FROM {} LEFT JOIN {} USING (`{owner}`)",
            schema.qualified_name(),
            meta_schema.qualified_name()
        );
        if !condition.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&condition);
        }
        window.append_to(&mut sql);

        let rows = self
            .backend
            .run_select(Role::Slave, &Statement::new(StatementKind::Select, sql, params))?;

        let mut models = Vec::with_capacity(rows.len());
        for mut row in rows {
            let data = row.remove(META_DATA_COLUMN);
            let mut model: M = row_to(&row);
            let meta = hydrate_meta::<M>(&row, data);
            if meta.id().is_some() {
                model.set_meta(meta);
            }
            models.push(model);
        }
        Ok(models)
    }

    /// Find-or-insert one record into `table`. Returns true when a new row
    /// was inserted.
    fn write_record<N: Model>(
        &self,
        record: &mut N,
        table: &str,
        criteria: &Criteria,
        skip_lookup: bool,
    ) -> Result<bool> {
        let schema = self.schema(table)?;
        let now = self.now();

        let looked_up = !skip_lookup && !criteria.is_empty();
        let existing: Option<N> = if looked_up {
            // read the master so a record written moments ago is found
            self.select_rows(Role::Master, &schema, criteria, Window::one())?
                .first()
                .map(row_to)
        } else {
            None
        };

        match existing {
            None => {
                if N::hashed() {
                    let hash = record.content_hash();
                    record.set_hash(&hash);
                }

                let mut mapper = self.mapper_for(&schema);
                mapper.populate(&record.to_fields());
                // absence was verified when a lookup ran; otherwise the
                // insert carries a duplicate-key guard
                let stmt = mapper.insert(now, !looked_up)?;
                let outcome = self.backend.run_execute(&stmt)?;

                if schema.has_auto_increment_primary() {
                    let id = outcome.last_insert_id.ok_or_else(|| {
                        StoreError::Write(format!(
                            "insert into {} produced no generated id",
                            schema.qualified_name()
                        ))
                    })?;
                    record.apply_field(&N::id_field(), &Value::from(id));
                }

                copy_stamps(&mapper, record);
                debug!(table = %schema.qualified_name(), "inserted record");
                Ok(true)
            }
            Some(stored) => {
                let mut merged = stored;
                merged.populate_delta(record);
                if N::hashed() {
                    let hash = merged.content_hash();
                    merged.set_hash(&hash);
                }

                let mut mapper = self.mapper_for(&schema);
                mapper.populate(&merged.to_fields());
                let stmt = mapper.update(now)?;
                self.backend.run_execute(&stmt)?;

                copy_stamps(&mapper, &mut merged);
                *record = merged;
                debug!(table = %schema.qualified_name(), "updated record");
                Ok(false)
            }
        }
    }

    fn write_meta(&self, model: &M, meta: &mut M::Meta) -> Result<()> {
        let table = M::meta_table_name();
        let owner_field = M::id_field();

        if let Some(id) = model.id() {
            meta.apply_field(&owner_field, &Value::Integer(id));
        }
        if <M::Meta as Model>::hashed() {
            let hash = meta.content_hash();
            meta.set_hash(&hash);
        }

        // stateful meta is one row per owner, updated in place; historical
        // meta is append-only, deduplicated by content hash
        let criteria = if M::meta_stateful() {
            match model.id() {
                Some(id) => Criteria::new().equals(owner_field.clone(), id),
                None => Criteria::new(),
            }
        } else {
            match meta.hash_value() {
                Some(hash) => Criteria::new().equals("hash", hash),
                None => Criteria::new(),
            }
        };

        self.write_record(meta, &table, &criteria, false)?;
        self.write_meta_data(meta, &table)
    }

    /// When the meta table carries a `Data` column, follow up with the full
    /// tagged serialization of the side-record, generated id included.
    fn write_meta_data(&self, meta: &M::Meta, table: &str) -> Result<()> {
        let schema = self.schema(table)?;
        if !schema.has_column(META_DATA_COLUMN) {
            return Ok(());
        }
        let Some(meta_id) = meta.id() else {
            return Ok(());
        };

        let json = to_tagged(meta)?;
        let mut mapper = self.mapper_for(&schema);
        mapper.set(&<M::Meta as Model>::id_field(), Value::Integer(meta_id));
        mapper.set_column(META_DATA_COLUMN, Value::Text(json.to_string()));

        let stmt = mapper.update(self.now())?;
        self.backend.run_execute(&stmt)?;
        Ok(())
    }
}

impl<M: Model> Adapter<M> for MysqlAdapter<M> {
    fn kind(&self) -> &str {
        ADAPTER_KIND
    }

    fn write(&self, model: &mut M, options: &WriteOptions) -> Result<()> {
        let schema = self.schema(&M::table_name())?;

        let criteria = match &options.existing {
            Some(criteria) if !criteria.is_empty() => criteria.clone(),
            _ => self.lookup_criteria(model, &schema)?,
        };

        // the update path replaces the model with the merged record, so the
        // side-record has to be taken off beforehand
        let meta = model.meta();

        self.write_record(model, &M::table_name(), &criteria, options.skip_lookup)?;

        if M::has_meta() {
            if let Some(mut meta) = meta {
                self.write_meta(model, &mut meta)?;
                model.set_meta(meta);
            }
        }
        Ok(())
    }

    fn write_batch(&self, models: &mut [M]) -> Result<()> {
        if models.is_empty() {
            return Ok(());
        }
        let schema = self.schema(&M::table_name())?;

        let records: Vec<_> = models
            .iter_mut()
            .map(|model| {
                if M::hashed() {
                    let hash = model.content_hash();
                    model.set_hash(&hash);
                }
                model.to_fields()
            })
            .collect();

        let mut batch = BatchMapper::new(Arc::clone(&schema));
        if let Some(custom) = &self.column_mapper {
            batch = batch.with_column_mapper(Arc::clone(custom));
        }
        batch.populate(&records, self.now());

        let stmt = batch.insert(true)?;
        let outcome = self.backend.run_execute_in_tx(&stmt)?;

        if let Some(ids) = batch.assigned_ids(&outcome) {
            let id_field = M::id_field();
            for (model, id) in models.iter_mut().zip(ids) {
                model.apply_field(&id_field, &Value::Integer(id));
            }
        }
        Ok(())
    }

    fn find_one(&self, criteria: &Criteria) -> Result<Option<M>> {
        if M::has_meta() {
            return Ok(self
                .select_with_meta(criteria, Window::one())?
                .into_iter()
                .next());
        }
        let schema = self.schema(&M::table_name())?;
        Ok(self
            .select_rows(Role::Slave, &schema, criteria, Window::one())?
            .first()
            .map(row_to))
    }

    fn find_all(&self, criteria: &Criteria) -> Result<Vec<M>> {
        self.find(criteria, None, None)
    }

    fn find(&self, criteria: &Criteria, limit: Option<u64>, offset: Option<u64>) -> Result<Vec<M>> {
        let window = Window::new(limit, offset);
        if M::has_meta() {
            return self.select_with_meta(criteria, window);
        }
        let schema = self.schema(&M::table_name())?;
        Ok(self
            .select_rows(Role::Slave, &schema, criteria, window)?
            .iter()
            .map(row_to)
            .collect())
    }

    fn find_one_by_id(&self, ids: &[Value]) -> Result<Option<M>> {
        let schema = self.schema(&M::table_name())?;
        let primary = schema.primary_key();

        if primary.is_empty() || primary.len() != ids.len() {
            return Err(StoreError::Model(format!(
                "{} takes {} primary key value(s), got {}",
                schema.qualified_name(),
                primary.len(),
                ids.len()
            )));
        }

        let mut criteria = Criteria::new();
        for (column, id) in primary.iter().zip(ids) {
            criteria = criteria.equals(column.clone(), id.clone());
        }
        self.find_one(&criteria)
    }

    fn find_meta(&self, criteria: &Criteria) -> Result<Option<M::Meta>> {
        if !M::has_meta() {
            return Err(StoreError::Model(format!(
                "{} has no meta side-record",
                M::base_name()
            )));
        }

        if !M::meta_stateful() {
            let meta_id_field = <M::Meta as Model>::id_field();
            let keyed = criteria
                .iter()
                .any(|(f, _)| names_match(f, "hash") || names_match(f, &meta_id_field));
            if !keyed {
                return Err(StoreError::Model(format!(
                    "historical meta lookup for {} requires a hash or {meta_id_field:?}",
                    M::base_name()
                )));
            }
        }

        let schema = self.schema(&M::meta_table_name())?;
        Ok(self
            .select_rows(Role::Slave, &schema, criteria, Window::one())?
            .first()
            .map(row_to))
    }

    fn increment(&self, model: &M, fields: &[&str], offset: i64) -> Result<()> {
        let schema = self.schema(&M::table_name())?;
        let mut mapper = self.mapper_for(&schema);
        mapper.populate(&model.to_fields());
        let stmt = mapper.increment(fields, offset, self.now())?;
        self.backend.run_execute(&stmt)?;
        Ok(())
    }

    fn decrement(&self, model: &M, fields: &[&str], offset: i64) -> Result<()> {
        let schema = self.schema(&M::table_name())?;
        let mut mapper = self.mapper_for(&schema);
        mapper.populate(&model.to_fields());
        let stmt = mapper.decrement(fields, offset, self.now())?;
        self.backend.run_execute(&stmt)?;
        Ok(())
    }

    fn delete(&self, criteria: &Criteria) -> Result<u64> {
        let schema = self.schema(&M::table_name())?;
        let resolved = self.resolve_criteria(&schema, criteria)?;
        let (condition, params) = resolved.render(None);

        if condition.is_empty() {
            return Err(StoreError::Write(format!(
                "refusing to delete from {} without criteria",
                schema.qualified_name()
            )));
        }

        let sql = format!("DELETE FROM {} WHERE {condition}", schema.qualified_name());
        let outcome = self
            .backend
            .run_execute(&Statement::new(StatementKind::Delete, sql, params))?;
        Ok(outcome.rows_affected)
    }

    fn delete_batch(&self, criteria: &Criteria) -> Result<u64> {
        let schema = self.schema(&M::table_name())?;
        let primary = schema.primary_key();
        if primary.len() != 1 {
            return Err(StoreError::Model(format!(
                "batch delete from {} needs a single-column primary key",
                schema.qualified_name()
            )));
        }
        let id_column = &primary[0];

        let resolved = self.resolve_criteria(&schema, criteria)?;
        let (condition, params) = resolved.render(None);
        if condition.is_empty() {
            return Err(StoreError::Write(format!(
                "refusing to batch-delete from {} without criteria",
                schema.qualified_name()
            )));
        }

        let sql = format!(
            "SELECT `{id_column}` FROM {} WHERE {condition}",
            schema.qualified_name()
        );
        let rows = self
            .backend
            .run_select(Role::Master, &Statement::new(StatementKind::Select, sql, params))?;

        let ids: Vec<Value> = rows
            .iter()
            .filter_map(|row| row.get(id_column).cloned())
            .filter(|v| !v.is_empty())
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let marks = vec!["?"; ids.len()].join(", ");

        // meta rows go first; the two deletes are separate statements, so a
        // failure in between leaves orphan-free meta but intact models
        if M::has_meta() {
            let meta_schema = self.schema(&M::meta_table_name())?;
            let sql = format!(
                "DELETE FROM {} WHERE `{id_column}` IN ({marks})",
                meta_schema.qualified_name()
            );
            self.backend
                .run_execute(&Statement::new(StatementKind::Delete, sql, ids.clone()))?;
        }

        let sql = format!(
            "DELETE FROM {} WHERE `{id_column}` IN ({marks})",
            schema.qualified_name()
        );
        let outcome = self
            .backend
            .run_execute(&Statement::new(StatementKind::Delete, sql, ids))?;
        Ok(outcome.rows_affected)
    }
}

/// Build the side-record from a joined row. A tagged serialization in the
/// `Data` column is the base, since it carries fields the scalar columns
/// may not store; the scalar columns overlay it. A missing or unreadable
/// payload falls back to the scalar columns alone.
fn hydrate_meta<M: Model>(row: &Row, data: Option<Value>) -> M::Meta {
    let scalar: M::Meta = row_to(row);
    let Some(Value::Text(json)) = data else {
        return scalar;
    };
    let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&json) else {
        return scalar;
    };
    match from_tagged::<M::Meta>(&parsed) {
        Ok(mut base) => {
            base.populate_delta(&scalar);
            base
        }
        Err(_) => scalar,
    }
}

/// Map a result row onto a fresh model, modelizing column names. Columns
/// the model does not know are ignored.
fn row_to<N: Model>(row: &Row) -> N {
    let mut model = N::default();
    for (column, value) in row.iter() {
        model.apply_field(&modelize(column), value);
    }
    model
}

/// Copy the audit stamps a mapper generated back onto the record.
fn copy_stamps<N: Model>(mapper: &RecordMapper, record: &mut N) {
    for (column, field) in [
        (DATE_ADDED, "dateAdded"),
        (DATE_TIME_ADDED, "dateTimeAdded"),
        (LAST_UPDATED, "lastUpdated"),
    ] {
        if let Some(value) = mapper.get(column) {
            record.apply_field(field, value);
        }
    }
}
