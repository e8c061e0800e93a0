use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Schema for '{database}.{table}' could not be resolved")]
    SchemaNotFound { database: String, table: String },

    #[error("No lookup key could be determined for '{database}.{table}'")]
    LookupKey { database: String, table: String },

    #[error("Write error: {0}")]
    Write(String),

    #[error("Query error: {message} [sql: {sql}]")]
    Query { message: String, sql: String },

    #[error("Model error: {0}")]
    Model(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Wrap a driver-level failure with the rendered statement attached for
    /// diagnostics.
    pub fn query(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql: sql.into(),
        }
    }
}
