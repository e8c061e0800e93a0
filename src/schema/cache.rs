//! In-process cache of parsed table schemas.
//!
//! Schema introspection costs a round trip per table, so parsed results are
//! kept for the life of the process, keyed by host, database and table. The
//! cache is handed to connections and adapters explicitly rather than living
//! in a global.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::{parse_create_table, TableSchema};
use crate::core::{Result, StoreError};

/// Cache key: one entry per table per host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaKey {
    pub host: String,
    pub database: String,
    pub table: String,
}

impl SchemaKey {
    pub fn new(host: impl Into<String>, database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            database: database.into(),
            table: table.into(),
        }
    }
}

/// Shared, thread-safe schema cache.
#[derive(Debug, Default, Clone)]
pub struct SchemaCache {
    entries: Arc<RwLock<HashMap<SchemaKey, Arc<TableSchema>>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &SchemaKey) -> Option<Arc<TableSchema>> {
        self.entries
            .read()
            .ok()
            .and_then(|map| map.get(key).cloned())
    }

    /// Return the cached schema for `key`, or run `load_ddl` to fetch the
    /// `SHOW CREATE TABLE` text, parse it and cache the result.
    ///
    /// A loader that yields no DDL means the table does not exist, which is
    /// reported as [`StoreError::SchemaNotFound`] and not cached.
    pub fn get_or_load<F>(&self, key: &SchemaKey, load_ddl: F) -> Result<Arc<TableSchema>>
    where
        F: FnOnce() -> Result<Option<String>>,
    {
        if let Some(schema) = self.get(key) {
            return Ok(schema);
        }

        let ddl = load_ddl()?.ok_or_else(|| StoreError::SchemaNotFound {
            database: key.database.clone(),
            table: key.table.clone(),
        })?;

        let schema = Arc::new(parse_create_table(&key.database, &key.table, &ddl)?);
        debug!(
            host = %key.host,
            table = %schema.qualified_name(),
            columns = schema.columns.len(),
            "cached table schema"
        );

        if let Ok(mut map) = self.entries.write() {
            map.insert(key.clone(), Arc::clone(&schema));
        }

        Ok(schema)
    }

    /// Drop one cached entry, forcing a reload on next use. Call after an
    /// `ALTER TABLE` the process knows about.
    pub fn purge(&self, key: &SchemaKey) {
        if let Ok(mut map) = self.entries.write() {
            map.remove(key);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut map) = self.entries.write() {
            map.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
