//! # rowmap
//!
//! Convention-driven MySQL persistence: models map onto tables through
//! naming conventions and live schema introspection instead of hand-written
//! SQL or per-table configuration.
//!
//! ## What it does
//!
//! - **Schema introspection**: table layouts come from `SHOW CREATE TABLE`,
//!   parsed once and cached for the process ([`schema`]).
//! - **Convention mapping**: model fields find their columns by name
//!   (`customerId` to `CustomerID`), with hooks for the exceptions
//!   ([`mapper`]).
//! - **Find-or-insert writes**: a write locates the existing record by
//!   unique key or content hash, merges and updates it, or inserts and
//!   stamps the generated id back ([`adapter`]).
//! - **Meta side-records**: a model can carry a second record in a
//!   companion table, either one-per-owner or append-only history keyed by
//!   hash ([`model`]).
//! - **Master/slave routing**: writes hit the master, reads a randomly
//!   chosen slave ([`connection`]).
//! - **Multi-store fan-out**: a [`manager::Manager`] writes through every
//!   configured store and reads from the first that answers.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rowmap::adapter::{MysqlAdapter, WriteOptions};
//! use rowmap::connection::{ConnectionConfig, MysqlConnection};
//! use rowmap::criteria::Criteria;
//! use rowmap::manager::Manager;
//! use rowmap::model::TypeRegistry;
//! use rowmap::schema::SchemaCache;
//! # use rowmap::core::Value;
//! # use rowmap::model::{FieldMap, Model, NoMeta};
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! # #[serde(rename_all = "camelCase", default)]
//! # struct Customer { customer_id: Option<i64>, email_address: Option<String> }
//! # impl Model for Customer {
//! #     type Meta = NoMeta;
//! #     fn base_name() -> &'static str { "Customer" }
//! #     fn to_fields(&self) -> FieldMap {
//! #         FieldMap::new()
//! #             .with("customerId", self.customer_id)
//! #             .with("emailAddress", self.email_address.clone())
//! #     }
//! #     fn apply_field(&mut self, field: &str, value: &Value) {
//! #         match field {
//! #             "customerId" => self.customer_id = value.as_i64(),
//! #             "emailAddress" => self.email_address = value.as_str().map(str::to_string),
//! #             _ => {}
//! #         }
//! #     }
//! # }
//!
//! fn main() -> rowmap::core::Result<()> {
//!     let config = ConnectionConfig::from_group_file("db.json", "main")?;
//!     let connection = Arc::new(MysqlConnection::new(config, SchemaCache::new()));
//!
//!     let mut registry = TypeRegistry::new();
//!     registry.register::<Customer>()?;
//!
//!     let manager = Manager::new(&registry)?
//!         .adapter(Arc::new(MysqlAdapter::<Customer>::new(connection, "main")));
//!
//!     let mut customer = Customer {
//!         customer_id: None,
//!         email_address: Some("a@b.c".into()),
//!     };
//!     manager.write(&mut customer, &WriteOptions::default())?;
//!
//!     let found = manager.find_one(
//!         &Criteria::new().equals("emailAddress", "a@b.c"),
//!         None,
//!     )?;
//!     assert!(found.is_some());
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod connection;
pub mod core;
pub mod criteria;
pub mod manager;
pub mod mapper;
pub mod model;
pub mod naming;
pub mod schema;

pub use adapter::{Adapter, Backend, MysqlAdapter, WriteOptions};
pub use connection::{ConnectionConfig, HostAddress, MysqlConnection, Role};
pub use crate::core::{ExecOutcome, Result, Row, Statement, StatementKind, StoreError, Value};
pub use criteria::{Criteria, Operator, Term};
pub use manager::Manager;
pub use mapper::{BatchMapper, RecordMapper};
pub use model::{Collection, FieldMap, Model, NoMeta, TypeRegistry};
pub use schema::{SchemaCache, SchemaKey, TableSchema};
