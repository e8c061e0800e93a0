//! Line classifier for `SHOW CREATE TABLE` output.
//!
//! MySQL returns the full table DDL as one text blob. Each trimmed line is
//! either a column definition (backtick-led), a key clause we care about
//! (primary, unique, plain index), or a clause we recognize and discard
//! (fulltext, constraint, foreign key, partition). Lines that match nothing
//! are skipped.

use lazy_static::lazy_static;
use regex::Regex;

use super::{Column, Index, TableSchema};
use crate::core::{Result, StoreError};

lazy_static! {
    static ref AUTO_INCREMENT_OPTION: Regex = Regex::new(r"AUTO_INCREMENT=[0-9]+").unwrap();
    static ref COLUMN_LINE: Regex =
        Regex::new(r"^`(?P<name>[^`]+)`\s+(?P<type>[A-Za-z]+)(?:\((?P<detail>[0-9]+)[^)]*\))?(?P<extra>[^,]*),?$")
            .unwrap();
    static ref PRIMARY_LINE: Regex = Regex::new(r"(?i)^PRIMARY\s+KEY\s+\((?P<cols>[^)]+)\)").unwrap();
    static ref UNIQUE_LINE: Regex =
        Regex::new(r"(?i)^UNIQUE\s+KEY\s+`(?P<name>[^`]+)`\s+\((?P<cols>[^)]+)\)").unwrap();
    static ref KEY_LINE: Regex =
        Regex::new(r"(?i)^KEY\s+`(?P<name>[^`]+)`\s+\((?P<cols>[^)]+)\)").unwrap();
    static ref IGNORED_LINE: Regex =
        Regex::new(r"(?i)^(FULLTEXT|SPATIAL|CONSTRAINT|FOREIGN\s+KEY|/?\*?!?\s*PARTITION)").unwrap();
    static ref PREFIX_LENGTH: Regex = Regex::new(r"\([0-9]+\)").unwrap();
}

/// Parse a `SHOW CREATE TABLE` definition into a [`TableSchema`].
///
/// A definition with no recognizable columns means the table does not exist
/// as far as the mapper is concerned.
pub fn parse_create_table(database: &str, table: &str, ddl: &str) -> Result<TableSchema> {
    let ddl = AUTO_INCREMENT_OPTION.replace_all(ddl, "");

    let mut columns: Vec<Column> = Vec::new();
    let mut indexes: Vec<Index> = Vec::new();

    for raw in ddl.lines() {
        let line = raw.trim();

        if line.is_empty() || line.contains("CREATE TABLE") || line.contains("ENGINE=") {
            continue;
        }

        if line.starts_with('`') {
            if let Some(caps) = COLUMN_LINE.captures(line) {
                let extra = caps["extra"]
                    .split_whitespace()
                    .map(|w| w.trim_matches(',').to_string())
                    .filter(|w| !w.is_empty())
                    .collect();

                columns.push(Column {
                    name: caps["name"].to_string(),
                    sql_type: caps["type"].to_lowercase(),
                    type_detail: caps.name("detail").and_then(|d| d.as_str().parse().ok()),
                    extra,
                });
            }
            continue;
        }

        if IGNORED_LINE.is_match(line) {
            continue;
        }

        if let Some(caps) = PRIMARY_LINE.captures(line) {
            let cols = split_index_columns(&caps["cols"]);
            let auto_increment = cols
                .first()
                .and_then(|lead| columns.iter().find(|c| &c.name == lead))
                .map(Column::is_auto_increment)
                .unwrap_or(false);

            indexes.push(Index {
                name: cols.first().cloned().unwrap_or_default(),
                columns: cols,
                unique: true,
                primary: true,
                auto_increment,
            });
            continue;
        }

        if let Some(caps) = UNIQUE_LINE.captures(line) {
            indexes.push(Index {
                name: caps["name"].to_string(),
                columns: split_index_columns(&caps["cols"]),
                unique: true,
                primary: false,
                auto_increment: false,
            });
            continue;
        }

        if let Some(caps) = KEY_LINE.captures(line) {
            indexes.push(Index {
                name: caps["name"].to_string(),
                columns: split_index_columns(&caps["cols"]),
                unique: false,
                primary: false,
                auto_increment: false,
            });
        }

        // anything else is an unrecognized clause, skipped on purpose
    }

    if columns.is_empty() {
        return Err(StoreError::SchemaNotFound {
            database: database.to_string(),
            table: table.to_string(),
        });
    }

    Ok(TableSchema {
        database: database.to_string(),
        table: table.to_string(),
        columns,
        indexes,
    })
}

/// `` `A`,`B`(8) `` -> `["A", "B"]`, dropping backticks and prefix lengths.
fn split_index_columns(raw: &str) -> Vec<String> {
    PREFIX_LENGTH
        .replace_all(raw, "")
        .split(',')
        .map(|c| c.trim().trim_matches('`').to_string())
        .filter(|c| !c.is_empty())
        .collect()
}
