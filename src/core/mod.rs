pub mod error;
pub mod statement;
pub mod value;

pub use error::{Result, StoreError};
pub use statement::{ExecOutcome, Row, Statement, StatementKind};
pub use value::Value;
