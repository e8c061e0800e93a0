#![allow(dead_code)]

//! Shared test fixtures: a scripted backend and a few sample models.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use rowmap::adapter::Backend;
use rowmap::connection::Role;
use rowmap::core::{ExecOutcome, Result, Row, Statement, StoreError, Value};
use rowmap::model::{FieldMap, Model, NoMeta};
use rowmap::naming::names_match;
use rowmap::schema::{parse_create_table, TableSchema};

pub const DATABASE: &str = "main";

pub const CUSTOMER_DDL: &str = "CREATE TABLE `Customer` (\n\
    `CustomerID` int(10) unsigned NOT NULL AUTO_INCREMENT,\n\
    `EmailAddress` varchar(255) NOT NULL,\n\
    `Balance` int(10) DEFAULT NULL,\n\
    `Hash` char(64) DEFAULT NULL,\n\
    `DateAdded` date DEFAULT NULL,\n\
    `DateTimeAdded` datetime DEFAULT NULL,\n\
    `LastUpdated` datetime DEFAULT NULL,\n\
    PRIMARY KEY (`CustomerID`),\n\
    UNIQUE KEY `email` (`EmailAddress`)\n\
    ) ENGINE=InnoDB";

pub const CUSTOMER_META_DDL: &str = "CREATE TABLE `CustomerMeta` (\n\
    `CustomerMetaID` int(10) unsigned NOT NULL AUTO_INCREMENT,\n\
    `CustomerID` int(10) unsigned NOT NULL,\n\
    `Note` varchar(255) DEFAULT NULL,\n\
    `Data` text DEFAULT NULL,\n\
    `LastUpdated` datetime DEFAULT NULL,\n\
    PRIMARY KEY (`CustomerMetaID`),\n\
    UNIQUE KEY `owner` (`CustomerID`)\n\
    ) ENGINE=InnoDB";

pub const ARTICLE_DDL: &str = "CREATE TABLE `Article` (\n\
    `ArticleID` int(10) unsigned NOT NULL AUTO_INCREMENT,\n\
    `Title` varchar(255) DEFAULT NULL,\n\
    `Body` text DEFAULT NULL,\n\
    `Hash` char(64) DEFAULT NULL,\n\
    `DateTimeAdded` datetime DEFAULT NULL,\n\
    `LastUpdated` datetime DEFAULT NULL,\n\
    PRIMARY KEY (`ArticleID`),\n\
    UNIQUE KEY `hash` (`Hash`)\n\
    ) ENGINE=InnoDB";

pub const ARTICLE_META_DDL: &str = "CREATE TABLE `ArticleMeta` (\n\
    `ArticleMetaID` int(10) unsigned NOT NULL AUTO_INCREMENT,\n\
    `ArticleID` int(10) unsigned NOT NULL,\n\
    `Source` varchar(255) DEFAULT NULL,\n\
    `Hash` char(64) DEFAULT NULL,\n\
    PRIMARY KEY (`ArticleMetaID`),\n\
    UNIQUE KEY `hash` (`Hash`)\n\
    ) ENGINE=InnoDB";

pub const WIDGET_DDL: &str = "CREATE TABLE `Widget` (\n\
    `WidgetID` int(10) unsigned NOT NULL AUTO_INCREMENT,\n\
    `Name` varchar(64) NOT NULL,\n\
    `Qty` int(10) DEFAULT NULL,\n\
    PRIMARY KEY (`WidgetID`),\n\
    UNIQUE KEY `name` (`Name`)\n\
    ) ENGINE=InnoDB";

/// A fixed instant so generated timestamps are assertable.
pub fn noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

pub fn row(columns: &[(&str, Value)]) -> Row {
    Row::new(
        columns
            .iter()
            .map(|(c, v)| (c.to_string(), v.clone()))
            .collect(),
    )
}

/// One call the fake backend received.
#[derive(Debug, Clone)]
pub enum Call {
    Select(Role, Statement),
    Execute(Statement),
    ExecuteTx(Statement),
}

impl Call {
    pub fn sql(&self) -> &str {
        match self {
            Call::Select(_, stmt) | Call::Execute(stmt) | Call::ExecuteTx(stmt) => &stmt.sql,
        }
    }

    pub fn statement(&self) -> &Statement {
        match self {
            Call::Select(_, stmt) | Call::Execute(stmt) | Call::ExecuteTx(stmt) => stmt,
        }
    }
}

/// A backend with canned schemas and scripted results, recording every call.
///
/// Select results and execute outcomes are consumed front-to-back; when a
/// script runs out, selects answer with no rows and executes with a default
/// outcome.
#[derive(Default)]
pub struct FakeBackend {
    schemas: HashMap<String, Arc<TableSchema>>,
    selects: Mutex<VecDeque<Vec<Row>>>,
    outcomes: Mutex<VecDeque<ExecOutcome>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: &str, ddl: &str) -> Self {
        let schema = parse_create_table(DATABASE, table, ddl).expect("fixture DDL parses");
        self.schemas.insert(table.to_string(), Arc::new(schema));
        self
    }

    /// Queue the answer for the next select.
    pub fn script_select(&self, rows: Vec<Row>) {
        self.selects.lock().unwrap().push_back(rows);
    }

    /// Queue the outcome for the next execute (plain or transactional).
    pub fn script_outcome(&self, outcome: ExecOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| c.sql().to_string())
            .collect()
    }
}

impl Backend for FakeBackend {
    fn run_select(&self, role: Role, stmt: &Statement) -> Result<Vec<Row>> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Select(role, stmt.clone()));
        Ok(self
            .selects
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    fn run_execute(&self, stmt: &Statement) -> Result<ExecOutcome> {
        self.calls.lock().unwrap().push(Call::Execute(stmt.clone()));
        Ok(self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    fn run_execute_in_tx(&self, stmt: &Statement) -> Result<ExecOutcome> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::ExecuteTx(stmt.clone()));
        Ok(self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    fn table_schema(&self, database: &str, table: &str) -> Result<Arc<TableSchema>> {
        self.schemas
            .get(table)
            .cloned()
            .ok_or_else(|| StoreError::SchemaNotFound {
                database: database.to_string(),
                table: table.to_string(),
            })
    }
}

fn text(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

/// Plain model: no hash, no meta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Widget {
    pub widget_id: Option<i64>,
    pub name: Option<String>,
    pub qty: Option<i64>,
}

impl Model for Widget {
    type Meta = NoMeta;

    fn base_name() -> &'static str {
        "Widget"
    }

    fn to_fields(&self) -> FieldMap {
        FieldMap::new()
            .with("widgetId", self.widget_id)
            .with("name", self.name.clone())
            .with("qty", self.qty)
    }

    fn apply_field(&mut self, field: &str, value: &Value) {
        if names_match(field, "widgetId") {
            self.widget_id = value.as_i64();
        } else if names_match(field, "name") {
            self.name = text(value);
        } else if names_match(field, "qty") {
            self.qty = value.as_i64();
        }
    }
}

/// Hashed model with a stateful (one row per owner) meta side-record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Customer {
    pub customer_id: Option<i64>,
    pub email_address: Option<String>,
    pub balance: Option<i64>,
    pub hash: Option<String>,
    pub date_added: Option<String>,
    pub date_time_added: Option<String>,
    pub last_updated: Option<String>,
    #[serde(skip)]
    pub meta: Option<CustomerMeta>,
}

impl Model for Customer {
    type Meta = CustomerMeta;

    fn base_name() -> &'static str {
        "Customer"
    }

    fn to_fields(&self) -> FieldMap {
        FieldMap::new()
            .with("customerId", self.customer_id)
            .with("emailAddress", self.email_address.clone())
            .with("balance", self.balance)
            .with("hash", self.hash.clone())
            .with("dateAdded", self.date_added.clone())
            .with("dateTimeAdded", self.date_time_added.clone())
            .with("lastUpdated", self.last_updated.clone())
    }

    fn apply_field(&mut self, field: &str, value: &Value) {
        if names_match(field, "customerId") {
            self.customer_id = value.as_i64();
        } else if names_match(field, "emailAddress") {
            self.email_address = text(value);
        } else if names_match(field, "balance") {
            self.balance = value.as_i64();
        } else if names_match(field, "hash") {
            self.hash = text(value);
        } else if names_match(field, "dateAdded") {
            self.date_added = text(value);
        } else if names_match(field, "dateTimeAdded") {
            self.date_time_added = text(value);
        } else if names_match(field, "lastUpdated") {
            self.last_updated = text(value);
        }
    }

    fn unique_search_fields() -> Vec<String> {
        vec!["emailAddress".to_string()]
    }

    fn hashed() -> bool {
        true
    }

    fn has_meta() -> bool {
        true
    }

    fn meta_stateful() -> bool {
        true
    }

    fn meta(&self) -> Option<CustomerMeta> {
        self.meta.clone()
    }

    fn set_meta(&mut self, meta: CustomerMeta) {
        self.meta = Some(meta);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerMeta {
    pub customer_meta_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub note: Option<String>,
}

impl Model for CustomerMeta {
    type Meta = NoMeta;

    fn base_name() -> &'static str {
        "CustomerMeta"
    }

    fn to_fields(&self) -> FieldMap {
        FieldMap::new()
            .with("customerMetaId", self.customer_meta_id)
            .with("customerId", self.customer_id)
            .with("note", self.note.clone())
    }

    fn apply_field(&mut self, field: &str, value: &Value) {
        if names_match(field, "customerMetaId") {
            self.customer_meta_id = value.as_i64();
        } else if names_match(field, "customerId") {
            self.customer_id = value.as_i64();
        } else if names_match(field, "note") {
            self.note = text(value);
        }
    }
}

/// Hashed model whose lookup key is its content hash, with append-only
/// (historical) meta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Article {
    pub article_id: Option<i64>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub hash: Option<String>,
    pub date_time_added: Option<String>,
    pub last_updated: Option<String>,
    #[serde(skip)]
    pub meta: Option<ArticleMeta>,
}

impl Model for Article {
    type Meta = ArticleMeta;

    fn base_name() -> &'static str {
        "Article"
    }

    fn to_fields(&self) -> FieldMap {
        FieldMap::new()
            .with("articleId", self.article_id)
            .with("title", self.title.clone())
            .with("body", self.body.clone())
            .with("hash", self.hash.clone())
            .with("dateTimeAdded", self.date_time_added.clone())
            .with("lastUpdated", self.last_updated.clone())
    }

    fn apply_field(&mut self, field: &str, value: &Value) {
        if names_match(field, "articleId") {
            self.article_id = value.as_i64();
        } else if names_match(field, "title") {
            self.title = text(value);
        } else if names_match(field, "body") {
            self.body = text(value);
        } else if names_match(field, "hash") {
            self.hash = text(value);
        } else if names_match(field, "dateTimeAdded") {
            self.date_time_added = text(value);
        } else if names_match(field, "lastUpdated") {
            self.last_updated = text(value);
        }
    }

    fn hashed() -> bool {
        true
    }

    fn has_meta() -> bool {
        true
    }

    fn meta(&self) -> Option<ArticleMeta> {
        self.meta.clone()
    }

    fn set_meta(&mut self, meta: ArticleMeta) {
        self.meta = Some(meta);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArticleMeta {
    pub article_meta_id: Option<i64>,
    pub article_id: Option<i64>,
    pub source: Option<String>,
    pub hash: Option<String>,
}

impl Model for ArticleMeta {
    type Meta = NoMeta;

    fn base_name() -> &'static str {
        "ArticleMeta"
    }

    fn to_fields(&self) -> FieldMap {
        FieldMap::new()
            .with("articleMetaId", self.article_meta_id)
            .with("articleId", self.article_id)
            .with("source", self.source.clone())
            .with("hash", self.hash.clone())
    }

    fn apply_field(&mut self, field: &str, value: &Value) {
        if names_match(field, "articleMetaId") {
            self.article_meta_id = value.as_i64();
        } else if names_match(field, "articleId") {
            self.article_id = value.as_i64();
        } else if names_match(field, "source") {
            self.source = text(value);
        } else if names_match(field, "hash") {
            self.hash = text(value);
        }
    }

    fn hashed() -> bool {
        true
    }
}
