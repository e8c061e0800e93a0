//! Multi-store coordination for one model type.
//!
//! A manager owns an ordered list of adapters. Writes and deletes fan out
//! to every adapter, threading the model through so an id generated by the
//! first store is visible to the rest. Reads try adapters in order and
//! return the first non-empty answer, optionally pinned to one adapter
//! kind.

use std::sync::Arc;

use tracing::debug;

use crate::adapter::{Adapter, WriteOptions};
use crate::core::{Result, StoreError, Value};
use crate::criteria::Criteria;
use crate::model::{Model, TypeRegistry};

pub struct Manager<M: Model> {
    adapters: Vec<Arc<dyn Adapter<M>>>,
}

impl<M: Model> Manager<M> {
    /// Build a manager for `M`, which must already be in the type
    /// registry.
    pub fn new(registry: &TypeRegistry) -> Result<Self> {
        registry.expect_registered::<M>()?;
        Ok(Self {
            adapters: Vec::new(),
        })
    }

    /// Append an adapter. Order is priority order for reads.
    pub fn adapter(mut self, adapter: Arc<dyn Adapter<M>>) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// The adapter of one kind, for callers that need to address a store
    /// directly.
    pub fn adapter_of(&self, kind: &str) -> Result<&Arc<dyn Adapter<M>>> {
        self.adapters
            .iter()
            .find(|a| a.kind() == kind)
            .ok_or_else(|| {
                StoreError::Configuration(format!(
                    "no {kind:?} adapter configured for {}",
                    M::base_name()
                ))
            })
    }

    fn require_adapters(&self) -> Result<()> {
        if self.adapters.is_empty() {
            return Err(StoreError::Configuration(format!(
                "no adapters configured for {}",
                M::base_name()
            )));
        }
        Ok(())
    }

    /// Write to every store in order. The model is threaded through, so
    /// ids and stamps from earlier stores reach later ones.
    pub fn write(&self, model: &mut M, options: &WriteOptions) -> Result<()> {
        self.require_adapters()?;
        for adapter in &self.adapters {
            adapter.write(model, options)?;
        }
        Ok(())
    }

    pub fn write_batch(&self, models: &mut [M]) -> Result<()> {
        self.require_adapters()?;
        for adapter in &self.adapters {
            adapter.write_batch(models)?;
        }
        Ok(())
    }

    /// First non-empty answer across stores, in priority order.
    pub fn find_one(&self, criteria: &Criteria, kind: Option<&str>) -> Result<Option<M>> {
        self.require_adapters()?;
        for adapter in self.candidates(kind) {
            if let Some(found) = adapter.find_one(criteria)? {
                return Ok(Some(found));
            }
            debug!(
                adapter = adapter.kind(),
                model = M::base_name(),
                "no match, trying next store"
            );
        }
        Ok(None)
    }

    pub fn find_all(&self, criteria: &Criteria, kind: Option<&str>) -> Result<Vec<M>> {
        self.require_adapters()?;
        for adapter in self.candidates(kind) {
            let found = adapter.find_all(criteria)?;
            if !found.is_empty() {
                return Ok(found);
            }
        }
        Ok(Vec::new())
    }

    /// [`find_all`](Self::find_all) with a result window.
    pub fn find(
        &self,
        criteria: &Criteria,
        limit: Option<u64>,
        offset: Option<u64>,
        kind: Option<&str>,
    ) -> Result<Vec<M>> {
        self.require_adapters()?;
        for adapter in self.candidates(kind) {
            let found = adapter.find(criteria, limit, offset)?;
            if !found.is_empty() {
                return Ok(found);
            }
        }
        Ok(Vec::new())
    }

    pub fn find_one_by_id(&self, ids: &[Value], kind: Option<&str>) -> Result<Option<M>> {
        self.require_adapters()?;
        for adapter in self.candidates(kind) {
            if let Some(found) = adapter.find_one_by_id(ids)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    pub fn find_meta(&self, criteria: &Criteria, kind: Option<&str>) -> Result<Option<M::Meta>> {
        self.require_adapters()?;
        for adapter in self.candidates(kind) {
            if let Some(found) = adapter.find_meta(criteria)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    pub fn increment(&self, model: &M, fields: &[&str], offset: i64) -> Result<()> {
        self.require_adapters()?;
        for adapter in &self.adapters {
            adapter.increment(model, fields, offset)?;
        }
        Ok(())
    }

    pub fn decrement(&self, model: &M, fields: &[&str], offset: i64) -> Result<()> {
        self.require_adapters()?;
        for adapter in &self.adapters {
            adapter.decrement(model, fields, offset)?;
        }
        Ok(())
    }

    /// Delete from every store; the returned count comes from the first
    /// (primary) adapter.
    pub fn delete(&self, criteria: &Criteria) -> Result<u64> {
        self.require_adapters()?;
        let mut primary_count = 0;
        for (idx, adapter) in self.adapters.iter().enumerate() {
            let count = adapter.delete(criteria)?;
            if idx == 0 {
                primary_count = count;
            }
        }
        Ok(primary_count)
    }

    pub fn delete_batch(&self, criteria: &Criteria) -> Result<u64> {
        self.require_adapters()?;
        let mut primary_count = 0;
        for (idx, adapter) in self.adapters.iter().enumerate() {
            let count = adapter.delete_batch(criteria)?;
            if idx == 0 {
                primary_count = count;
            }
        }
        Ok(primary_count)
    }

    fn candidates<'a>(
        &'a self,
        kind: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Arc<dyn Adapter<M>>> {
        self.adapters
            .iter()
            .filter(move |a| kind.is_none_or(|k| a.kind() == k))
    }
}
