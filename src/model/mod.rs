//! Model traits and field-level plumbing.
//!
//! A [`Model`] is a plain struct that knows how to present itself as an
//! ordered set of named [`Value`]s and how to absorb values back. Everything
//! the persistence layer does (column resolution, write synthesis, hashing,
//! tagged serialization) is driven off that field view, so models carry no
//! storage code of their own.

pub mod collection;
pub mod hash;
pub mod tagged;

pub use collection::Collection;
pub use tagged::{from_tagged, to_tagged, TypeRegistry};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::Value;
use crate::naming::{lcfirst, names_match};

/// An ordered field-name/value map. Order is whatever the model's
/// `to_fields` emits, normally declaration order, and it is what makes
/// content hashes deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(String, Value)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append or replace a field, keeping the original position on replace.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(f, _)| names_match(f, &field)) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((field, value)),
        }
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Case-insensitive lookup.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(f, _)| names_match(f, field))
            .map(|(_, v)| v)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        let idx = self.entries.iter().position(|(f, _)| names_match(f, field))?;
        Some(self.entries.remove(idx).1)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(f, v)| (f.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fields that carry an actual value: not NULL and not the empty string.
    pub fn non_empty(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.iter().filter(|(_, v)| !v.is_empty())
    }
}

impl FromIterator<(String, Value)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// A persistable domain object.
///
/// Implementations provide the field view (`to_fields` / `apply_field`) and
/// a base name; naming conventions derive the rest. Only `base_name`,
/// `to_fields` and `apply_field` are mandatory.
pub trait Model: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Side-record type for this model. Use [`NoMeta`] when there is none.
    type Meta: Model;

    /// Base name the table, id field and type tag derive from, e.g.
    /// `"Customer"`.
    fn base_name() -> &'static str;

    /// Snapshot every field as a column-ready value, in declaration order.
    fn to_fields(&self) -> FieldMap;

    /// Set one field from a stored value. Field names arrive in model form
    /// (`customerId`, not `CustomerID`); implementations should match them
    /// case-insensitively and ignore names they do not know.
    fn apply_field(&mut self, field: &str, value: &Value);

    /// Tag written into the `___type` attribute of tagged serializations.
    fn type_tag() -> &'static str {
        Self::base_name()
    }

    fn table_name() -> String {
        Self::base_name().to_string()
    }

    /// The model's own id field, `customerId` for a `Customer`.
    fn id_field() -> String {
        format!("{}Id", lcfirst(Self::base_name()))
    }

    fn field(&self, name: &str) -> Option<Value> {
        self.to_fields().get(name).cloned()
    }

    fn id(&self) -> Option<i64> {
        self.field(&Self::id_field()).and_then(|v| v.as_i64())
    }

    /// Fields forming the model's preferred lookup key, checked before the
    /// schema's unique indexes. Empty means no preference.
    fn unique_search_fields() -> Vec<String> {
        Vec::new()
    }

    /// Whether this model participates in content hashing.
    fn hashed() -> bool {
        false
    }

    fn hash_value(&self) -> Option<String> {
        match self.field("hash") {
            Some(Value::Text(h)) if !h.is_empty() => Some(h),
            _ => None,
        }
    }

    fn set_hash(&mut self, hash: &str) {
        self.apply_field("hash", &Value::from(hash));
    }

    /// Fields feeding the content hash. Defaults to every field except the
    /// model's own id; audit fields and the hash itself are excluded
    /// downstream. The id stays out so the hash of a record is the same
    /// before and after its id is generated. Models with hashable children
    /// override this and fold each child's `content_hash()` in as a text
    /// value.
    fn hash_fields(&self) -> FieldMap {
        let mut fields = self.to_fields();
        fields.remove(&Self::id_field());
        fields
    }

    fn content_hash(&self) -> String {
        hash::content_hash(&self.hash_fields())
    }

    /// Whether this model carries a meta side-record.
    fn has_meta() -> bool {
        false
    }

    /// Stateful meta keeps exactly one row per owning record, updated in
    /// place. Non-stateful meta is append-only history keyed by hash.
    fn meta_stateful() -> bool {
        false
    }

    fn meta(&self) -> Option<Self::Meta> {
        None
    }

    fn set_meta(&mut self, _meta: Self::Meta) {}

    fn meta_table_name() -> String {
        format!("{}Meta", Self::base_name())
    }

    /// Merge another instance's non-empty fields over this one.
    fn populate_delta(&mut self, other: &Self) {
        for (field, value) in other.to_fields().iter() {
            if !value.is_empty() {
                self.apply_field(field, value);
            }
        }
    }
}

/// Sentinel meta type for models without a side-record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NoMeta;

impl Model for NoMeta {
    type Meta = NoMeta;

    fn base_name() -> &'static str {
        "NoMeta"
    }

    fn to_fields(&self) -> FieldMap {
        FieldMap::new()
    }

    fn apply_field(&mut self, _field: &str, _value: &Value) {}
}
