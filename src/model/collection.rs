//! Typed model collections.

use serde_json::Value as Json;

use super::{from_tagged, to_tagged, Model};
use crate::core::Result;

/// An ordered collection of one model type.
///
/// Collections serialize to a JSON array of tagged objects and decode back
/// with every element's tag verified, so a mixed or mislabeled payload fails
/// instead of producing half-decoded models.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection<M: Model> {
    items: Vec<M>,
}

impl<M: Model> Collection<M> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, item: M) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, M> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, M> {
        self.items.iter_mut()
    }

    pub fn items(&self) -> &[M] {
        &self.items
    }

    pub fn into_items(self) -> Vec<M> {
        self.items
    }

    /// Fold another collection in. Items whose id matches an existing item
    /// replace it in place; items without a match (or without an id) append.
    pub fn merge(&mut self, other: Collection<M>) {
        for incoming in other.items {
            let id = incoming.id();
            let slot = id.and_then(|id| {
                self.items.iter().position(|existing| existing.id() == Some(id))
            });
            match slot {
                Some(idx) => self.items[idx] = incoming,
                None => self.items.push(incoming),
            }
        }
    }

    /// Serialize as a JSON array of tagged objects.
    pub fn to_tagged_json(&self) -> Result<Json> {
        let items = self
            .items
            .iter()
            .map(to_tagged)
            .collect::<Result<Vec<Json>>>()?;
        Ok(Json::Array(items))
    }

    /// Decode a tagged array, verifying every element's type tag.
    pub fn from_tagged_json(json: &Json) -> Result<Self> {
        let items = json
            .as_array()
            .map(|array| array.iter().map(from_tagged::<M>).collect::<Result<Vec<M>>>())
            .transpose()?
            .unwrap_or_default();
        Ok(Self { items })
    }
}

impl<M: Model> FromIterator<M> for Collection<M> {
    fn from_iter<I: IntoIterator<Item = M>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<M: Model> IntoIterator for Collection<M> {
    type Item = M;
    type IntoIter = std::vec::IntoIter<M>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<M: Model> From<Vec<M>> for Collection<M> {
    fn from(items: Vec<M>) -> Self {
        Self { items }
    }
}
