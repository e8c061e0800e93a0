use crate::core::Value;
use crate::naming::names_match;

/// What kind of statement a [`Statement`] carries.
///
/// The connection layer keys its error-tolerance policy off this: update
/// statements swallow duplicate-key violations and retry a transient
/// deadlock once, everything else propagates as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

/// A parameterized SQL statement plus its bound values, ready for a
/// [`Backend`](crate::adapter::Backend) to execute.
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
    pub kind: StatementKind,
}

impl Statement {
    pub fn new(kind: StatementKind, sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
            kind,
        }
    }

    /// Interpolate the bound values into the SQL text.
    ///
    /// Diagnostics only; never execute the result.
    pub fn rendered(&self) -> String {
        let mut out = String::with_capacity(self.sql.len());
        let mut params = self.params.iter();

        for chunk in self.sql.split('?') {
            out.push_str(chunk);
            if let Some(value) = params.next() {
                out.push_str(&value.render());
            }
        }

        out
    }
}

/// A result row: ordered column name/value pairs.
#[derive(Debug, Clone, Default)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    /// Case-insensitive column lookup.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(col, _)| names_match(col, name))
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Drop a column from the row (used to strip the meta `Data` payload
    /// before mapping the remaining columns onto the base model).
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self.columns.iter().position(|(col, _)| names_match(col, name))?;
        Some(self.columns.remove(idx).1)
    }
}

/// Outcome of a non-select statement.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    pub last_insert_id: Option<u64>,
}
