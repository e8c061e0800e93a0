//! Tagged JSON serialization.
//!
//! Serialized models carry a `___type` attribute naming their type so a
//! payload can be checked before it is decoded. The [`TypeRegistry`] is the
//! allow-list: types register once at startup and duplicate or blank tags
//! are rejected at registration time instead of surfacing as mysterious
//! decode failures later.

use std::collections::HashMap;

use serde_json::{json, Value as Json};

use super::Model;
use crate::core::{Result, StoreError};

/// Attribute carrying the type tag in serialized form.
pub const TYPE_ATTRIBUTE: &str = "___type";

/// Serialize a model with its `___type` tag attached.
pub fn to_tagged<M: Model>(model: &M) -> Result<Json> {
    let mut json = serde_json::to_value(model)
        .map_err(|e| StoreError::Model(format!("serialize {}: {e}", M::type_tag())))?;

    match json.as_object_mut() {
        Some(object) => {
            object.insert(TYPE_ATTRIBUTE.to_string(), json!(M::type_tag()));
            Ok(json)
        }
        None => Err(StoreError::Model(format!(
            "{} does not serialize to an object",
            M::type_tag()
        ))),
    }
}

/// Decode a tagged payload back into `M`, verifying the tag first.
pub fn from_tagged<M: Model>(json: &Json) -> Result<M> {
    let object = json
        .as_object()
        .ok_or_else(|| StoreError::Model("tagged payload is not an object".into()))?;

    let tag = object
        .get(TYPE_ATTRIBUTE)
        .and_then(Json::as_str)
        .ok_or_else(|| StoreError::Model(format!("payload has no {TYPE_ATTRIBUTE} tag")))?;

    if tag != M::type_tag() {
        return Err(StoreError::Model(format!(
            "type tag mismatch: expected {}, found {tag}",
            M::type_tag()
        )));
    }

    let mut object = object.clone();
    object.remove(TYPE_ATTRIBUTE);

    serde_json::from_value(Json::Object(object))
        .map_err(|e| StoreError::Model(format!("decode {}: {e}", M::type_tag())))
}

/// Registry of known model types, validated at registration.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    tags: HashMap<String, &'static str>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `M` under its type tag.
    ///
    /// Blank tags are rejected, as is a tag already registered to a
    /// different base name. Re-registering the same type is a no-op.
    pub fn register<M: Model>(&mut self) -> Result<()> {
        let tag = M::type_tag();
        if tag.trim().is_empty() {
            return Err(StoreError::Model(format!(
                "{} has a blank type tag",
                M::base_name()
            )));
        }

        match self.tags.get(tag) {
            Some(existing) if *existing != M::base_name() => Err(StoreError::Model(format!(
                "type tag {tag:?} already registered to {existing}"
            ))),
            Some(_) => Ok(()),
            None => {
                self.tags.insert(tag.to_string(), M::base_name());
                Ok(())
            }
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    /// Fail unless `M` was registered.
    pub fn expect_registered<M: Model>(&self) -> Result<()> {
        if self.contains(M::type_tag()) {
            Ok(())
        } else {
            Err(StoreError::Model(format!(
                "unregistered model type: {}",
                M::type_tag()
            )))
        }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
