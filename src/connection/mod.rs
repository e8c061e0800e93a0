//! Pooled MySQL connections with master/slave routing.
//!
//! Writes always go to the master. Reads go to a slave picked uniformly at
//! random when the pool is (re)built, so a process sticks with one slave
//! until [`MysqlConnection::close`] or a host-list replacement forces a
//! reconnect.

pub mod config;

pub use config::{ConnectionConfig, HostAddress, DEFAULT_PORT};

use std::sync::{Arc, Mutex};

use mysql::prelude::Queryable;
use mysql::{OptsBuilder, Pool, TxOpts};
use rand::Rng;
use tracing::{debug, warn};

use crate::adapter::Backend;
use crate::core::{ExecOutcome, Result, Row, Statement, StatementKind, StoreError, Value};
use crate::schema::{SchemaCache, SchemaKey, TableSchema};

/// Which side of the replication topology a statement runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Master,
    Slave,
}

/// A master/slave MySQL connection with lazy pools and an injected schema
/// cache.
pub struct MysqlConnection {
    config: ConnectionConfig,
    masters: Mutex<Vec<HostAddress>>,
    slaves: Mutex<Vec<HostAddress>>,
    master_pool: Mutex<Option<Pool>>,
    slave_pool: Mutex<Option<Pool>>,
    schema_cache: SchemaCache,
    last_statement: Mutex<Option<String>>,
}

impl MysqlConnection {
    pub fn new(config: ConnectionConfig, schema_cache: SchemaCache) -> Self {
        let masters = vec![config.master.clone()];
        let slaves = config.read_hosts();
        Self {
            config,
            masters: Mutex::new(masters),
            slaves: Mutex::new(slaves),
            master_pool: Mutex::new(None),
            slave_pool: Mutex::new(None),
            schema_cache,
            last_statement: Mutex::new(None),
        }
    }

    pub fn schema_cache(&self) -> &SchemaCache {
        &self.schema_cache
    }

    /// Add a host to one side of the topology; duplicates (same
    /// `host:port`) are ignored.
    pub fn register_host(&self, role: Role, host: HostAddress) {
        if let Ok(mut hosts) = self.host_list(role).lock() {
            if !hosts.iter().any(|h| h.identifier() == host.identifier()) {
                hosts.push(host);
            }
        }
    }

    /// Replace one side of the topology wholesale and drop its pool so the
    /// next statement reconnects.
    pub fn replace_hosts(&self, role: Role, hosts: Vec<HostAddress>) {
        if let Ok(mut list) = self.host_list(role).lock() {
            *list = hosts;
        }
        if let Ok(mut pool) = self.pool_slot(role).lock() {
            *pool = None;
        }
    }

    pub fn hosts(&self, role: Role) -> Vec<HostAddress> {
        self.host_list(role)
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    /// Drop both pools. The next statement reconnects, re-rolling the slave
    /// choice.
    pub fn close(&self) {
        for role in [Role::Master, Role::Slave] {
            if let Ok(mut pool) = self.pool_slot(role).lock() {
                *pool = None;
            }
        }
    }

    /// The statement most recently handed to this connection, rendered with
    /// its values interpolated. Diagnostics only.
    pub fn last_query(&self) -> Option<String> {
        self.last_statement.lock().ok().and_then(|s| s.clone())
    }

    fn host_list(&self, role: Role) -> &Mutex<Vec<HostAddress>> {
        match role {
            Role::Master => &self.masters,
            Role::Slave => &self.slaves,
        }
    }

    fn pool_slot(&self, role: Role) -> &Mutex<Option<Pool>> {
        match role {
            Role::Master => &self.master_pool,
            Role::Slave => &self.slave_pool,
        }
    }

    fn pick_host(&self, role: Role) -> Result<HostAddress> {
        let hosts = self.hosts(role);
        match role {
            Role::Master => hosts.first().cloned(),
            Role::Slave => {
                if hosts.is_empty() {
                    None
                } else {
                    let idx = rand::rng().random_range(0..hosts.len());
                    hosts.get(idx).cloned()
                }
            }
        }
        .ok_or_else(|| {
            StoreError::Configuration(format!("no {role:?} hosts registered"))
        })
    }

    fn pool(&self, role: Role) -> Result<Pool> {
        let mut slot = self
            .pool_slot(role)
            .lock()
            .map_err(|_| StoreError::Configuration("connection pool lock poisoned".into()))?;

        if let Some(pool) = slot.as_ref() {
            return Ok(pool.clone());
        }

        let host = self.pick_host(role)?;
        debug!(?role, host = %host, "opening connection pool");

        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(host.host.clone()))
            .tcp_port(host.port)
            .user(Some(self.config.username.clone()))
            .pass(Some(self.config.password.clone()));

        let pool = Pool::new(opts)
            .map_err(|e| StoreError::Configuration(format!("connect to {host}: {e}")))?;
        *slot = Some(pool.clone());
        Ok(pool)
    }

    fn remember(&self, stmt: &Statement) {
        if let Ok(mut last) = self.last_statement.lock() {
            *last = Some(stmt.rendered());
        }
    }

    /// `SHOW CREATE TABLE` for one table, `None` when the table does not
    /// exist.
    pub fn show_create_table(&self, database: &str, table: &str) -> Result<Option<String>> {
        let sql = format!("SHOW CREATE TABLE `{database}`.`{table}`");
        let mut conn = self
            .pool(Role::Master)?
            .get_conn()
            .map_err(|e| StoreError::Configuration(format!("get connection: {e}")))?;

        let result = match conn.query_iter(&sql) {
            Ok(result) => result,
            Err(err) if is_unknown_table(&err) => return Ok(None),
            Err(err) => return Err(StoreError::query(err.to_string(), sql)),
        };

        for row in result {
            let row = row.map_err(|e| StoreError::query(e.to_string(), &sql))?;
            let row = convert_row(row);
            if let Some(ddl) = row.get("Create Table").and_then(Value::as_str) {
                return Ok(Some(ddl.to_string()));
            }
        }

        Ok(None)
    }
}

impl Backend for MysqlConnection {
    fn run_select(&self, role: Role, stmt: &Statement) -> Result<Vec<Row>> {
        self.remember(stmt);
        let mut conn = self
            .pool(role)?
            .get_conn()
            .map_err(|e| StoreError::Configuration(format!("get connection: {e}")))?;

        let result = conn
            .exec_iter(stmt.sql.as_str(), bind_params(&stmt.params))
            .map_err(|e| query_error(&e, stmt))?;

        let mut rows = Vec::new();
        for row in result {
            let row = row.map_err(|e| query_error(&e, stmt))?;
            rows.push(convert_row(row));
        }
        Ok(rows)
    }

    fn run_execute(&self, stmt: &Statement) -> Result<ExecOutcome> {
        self.remember(stmt);
        let pool = self.pool(Role::Master)?;
        let mut retried = false;

        loop {
            let mut conn = pool
                .get_conn()
                .map_err(|e| StoreError::Configuration(format!("get connection: {e}")))?;

            match conn.exec_drop(stmt.sql.as_str(), bind_params(&stmt.params)) {
                Ok(()) => {
                    let last = conn.last_insert_id();
                    return Ok(ExecOutcome {
                        rows_affected: conn.affected_rows(),
                        last_insert_id: (last > 0).then_some(last),
                    });
                }
                Err(err) if stmt.kind == StatementKind::Update && is_duplicate_key(&err) => {
                    // the row already says what this update would make it say
                    debug!(sql = %stmt.sql, "duplicate key on update, treated as no-op");
                    return Ok(ExecOutcome::default());
                }
                Err(err)
                    if stmt.kind == StatementKind::Update && is_deadlock(&err) && !retried =>
                {
                    warn!(sql = %stmt.sql, "deadlock, retrying once");
                    retried = true;
                }
                Err(err) => return Err(query_error(&err, stmt)),
            }
        }
    }

    fn run_execute_in_tx(&self, stmt: &Statement) -> Result<ExecOutcome> {
        self.remember(stmt);
        let mut conn = self
            .pool(Role::Master)?
            .get_conn()
            .map_err(|e| StoreError::Configuration(format!("get connection: {e}")))?;

        let mut tx = conn
            .start_transaction(TxOpts::default())
            .map_err(|e| query_error(&e, stmt))?;
        tx.exec_drop(stmt.sql.as_str(), bind_params(&stmt.params))
            .map_err(|e| query_error(&e, stmt))?;

        let outcome = ExecOutcome {
            rows_affected: tx.affected_rows(),
            last_insert_id: tx.last_insert_id().filter(|id| *id > 0),
        };
        tx.commit().map_err(|e| query_error(&e, stmt))?;
        Ok(outcome)
    }

    fn table_schema(&self, database: &str, table: &str) -> Result<Arc<TableSchema>> {
        let key = SchemaKey::new(self.config.master.identifier(), database, table);
        self.schema_cache
            .get_or_load(&key, || self.show_create_table(database, table))
    }
}

fn bind_params(values: &[Value]) -> mysql::Params {
    if values.is_empty() {
        mysql::Params::Empty
    } else {
        mysql::Params::Positional(values.iter().map(mysql::Value::from).collect())
    }
}

fn convert_row(row: mysql::Row) -> Row {
    let names: Vec<String> = row
        .columns_ref()
        .iter()
        .map(|c| c.name_str().into_owned())
        .collect();
    let values = row.unwrap();
    Row::new(names.into_iter().zip(values.into_iter().map(Value::from)).collect())
}

fn query_error(err: &mysql::Error, stmt: &Statement) -> StoreError {
    StoreError::query(err.to_string(), stmt.rendered())
}

fn mysql_error(err: &mysql::Error) -> Option<(u16, &str)> {
    match err {
        mysql::Error::MySqlError(e) => Some((e.code, e.state.as_str())),
        _ => None,
    }
}

fn is_duplicate_key(err: &mysql::Error) -> bool {
    matches!(mysql_error(err), Some((code, state)) if code == 1062 || state == "23000")
}

fn is_deadlock(err: &mysql::Error) -> bool {
    matches!(mysql_error(err), Some((code, state)) if code == 1213 || state == "40001")
}

fn is_unknown_table(err: &mysql::Error) -> bool {
    matches!(mysql_error(err), Some((code, state)) if code == 1146 || state == "42S02")
}
