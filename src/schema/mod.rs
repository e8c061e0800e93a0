//! Table schema metadata resolved from `SHOW CREATE TABLE` output.

pub mod cache;
pub mod parser;

pub use cache::{SchemaCache, SchemaKey};
pub use parser::parse_create_table;

use serde::{Deserialize, Serialize};

/// A single column definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Base SQL type with any length stripped, e.g. `int`, `varchar`.
    pub sql_type: String,
    /// The numeric detail from the type, e.g. `8` for `int(8)`.
    pub type_detail: Option<u32>,
    /// Remaining definition words: `unsigned`, `NOT`, `NULL`,
    /// `AUTO_INCREMENT` and friends.
    pub extra: Vec<String>,
}

impl Column {
    pub fn is_auto_increment(&self) -> bool {
        self.extra.iter().any(|e| e.eq_ignore_ascii_case("AUTO_INCREMENT"))
    }
}

/// An index definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub primary: bool,
    pub auto_increment: bool,
}

/// Parsed schema for one `database.table`, ordered as the DDL listed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub database: String,
    pub table: String,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
}

impl TableSchema {
    /// Exact, case-sensitive column existence check.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary key columns, empty when the table has none.
    pub fn primary_key(&self) -> Vec<String> {
        self.indexes
            .iter()
            .find(|i| i.primary)
            .map(|i| i.columns.clone())
            .unwrap_or_default()
    }

    pub fn unique_indexes(&self) -> Vec<&Index> {
        self.indexes.iter().filter(|i| i.unique && !i.primary).collect()
    }

    /// The most specific unique key: the non-primary unique index with the
    /// greatest column count. Ties break in first-seen order.
    pub fn best_unique_key(&self) -> Vec<String> {
        let mut best: &[String] = &[];
        for index in self.unique_indexes() {
            if index.columns.len() > best.len() {
                best = &index.columns;
            }
        }
        best.to_vec()
    }

    /// The auto-increment column, when the table has one.
    pub fn auto_increment_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_auto_increment())
    }

    /// True when the table has a single-column auto-increment primary key,
    /// the precondition for back-filling generated ids after a batch insert.
    pub fn has_auto_increment_primary(&self) -> bool {
        let primary = self.primary_key();
        primary.len() == 1
            && self
                .column(&primary[0])
                .map(Column::is_auto_increment)
                .unwrap_or(false)
    }

    pub fn qualified_name(&self) -> String {
        format!("`{}`.`{}`", self.database, self.table)
    }
}
