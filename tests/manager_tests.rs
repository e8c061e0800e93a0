mod common;

use std::sync::{Arc, Mutex};

use common::Widget;
use rowmap::adapter::{Adapter, WriteOptions};
use rowmap::core::{Result, StoreError, Value};
use rowmap::criteria::Criteria;
use rowmap::manager::Manager;
use rowmap::model::{NoMeta, TypeRegistry};

/// A store stub: returns canned finds, records writes, optionally assigns
/// an id the way a real insert would.
struct StubAdapter {
    kind: String,
    found: Option<Widget>,
    assign_id: Option<i64>,
    deleted: u64,
    writes: Mutex<Vec<Widget>>,
}

impl StubAdapter {
    fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            found: None,
            assign_id: None,
            deleted: 0,
            writes: Mutex::new(Vec::new()),
        }
    }

    fn finding(mut self, widget: Widget) -> Self {
        self.found = Some(widget);
        self
    }

    fn assigning_id(mut self, id: i64) -> Self {
        self.assign_id = Some(id);
        self
    }

    fn deleting(mut self, count: u64) -> Self {
        self.deleted = count;
        self
    }

    fn writes(&self) -> Vec<Widget> {
        self.writes.lock().unwrap().clone()
    }
}

impl Adapter<Widget> for StubAdapter {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn write(&self, model: &mut Widget, _options: &WriteOptions) -> Result<()> {
        if model.widget_id.is_none() {
            model.widget_id = self.assign_id;
        }
        self.writes.lock().unwrap().push(model.clone());
        Ok(())
    }

    fn write_batch(&self, models: &mut [Widget]) -> Result<()> {
        self.writes.lock().unwrap().extend(models.iter().cloned());
        Ok(())
    }

    fn find_one(&self, _criteria: &Criteria) -> Result<Option<Widget>> {
        Ok(self.found.clone())
    }

    fn find_all(&self, _criteria: &Criteria) -> Result<Vec<Widget>> {
        Ok(self.found.clone().into_iter().collect())
    }

    fn find(
        &self,
        criteria: &Criteria,
        _limit: Option<u64>,
        _offset: Option<u64>,
    ) -> Result<Vec<Widget>> {
        self.find_all(criteria)
    }

    fn find_one_by_id(&self, _ids: &[Value]) -> Result<Option<Widget>> {
        Ok(self.found.clone())
    }

    fn find_meta(&self, _criteria: &Criteria) -> Result<Option<NoMeta>> {
        Ok(None)
    }

    fn increment(&self, _model: &Widget, _fields: &[&str], _offset: i64) -> Result<()> {
        Ok(())
    }

    fn decrement(&self, _model: &Widget, _fields: &[&str], _offset: i64) -> Result<()> {
        Ok(())
    }

    fn delete(&self, _criteria: &Criteria) -> Result<u64> {
        Ok(self.deleted)
    }

    fn delete_batch(&self, _criteria: &Criteria) -> Result<u64> {
        Ok(self.deleted)
    }
}

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register::<Widget>().unwrap();
    registry
}

fn widget(id: i64, name: &str) -> Widget {
    Widget {
        widget_id: Some(id),
        name: Some(name.into()),
        qty: None,
    }
}

#[test]
fn test_manager_requires_registered_type() {
    let empty = TypeRegistry::new();
    assert!(matches!(
        Manager::<Widget>::new(&empty),
        Err(StoreError::Model(_))
    ));
    assert!(Manager::<Widget>::new(&registry()).is_ok());
}

#[test]
fn test_manager_requires_adapters() {
    let manager = Manager::<Widget>::new(&registry()).unwrap();
    let mut w = widget(1, "a");
    assert!(matches!(
        manager.write(&mut w, &WriteOptions::default()),
        Err(StoreError::Configuration(_))
    ));
    assert!(matches!(
        manager.find_one(&Criteria::new(), None),
        Err(StoreError::Configuration(_))
    ));
}

#[test]
fn test_find_one_returns_first_non_empty_in_priority_order() {
    let primary = Arc::new(StubAdapter::new("mysql"));
    let fallback = Arc::new(StubAdapter::new("memcache").finding(widget(2, "cached")));

    let manager = Manager::<Widget>::new(&registry())
        .unwrap()
        .adapter(primary)
        .adapter(fallback);

    let found = manager.find_one(&Criteria::new(), None).unwrap().unwrap();
    assert_eq!(found.name.as_deref(), Some("cached"));
}

#[test]
fn test_find_can_be_pinned_to_one_adapter_kind() {
    let primary = Arc::new(StubAdapter::new("mysql"));
    let fallback = Arc::new(StubAdapter::new("memcache").finding(widget(2, "cached")));

    let manager = Manager::<Widget>::new(&registry())
        .unwrap()
        .adapter(primary)
        .adapter(fallback);

    assert!(manager
        .find_one(&Criteria::new(), Some("mysql"))
        .unwrap()
        .is_none());
    assert!(manager
        .find_one(&Criteria::new(), Some("memcache"))
        .unwrap()
        .is_some());
}

#[test]
fn test_write_threads_model_through_adapters() {
    let primary = Arc::new(StubAdapter::new("mysql").assigning_id(42));
    let secondary = Arc::new(StubAdapter::new("memcache"));

    let manager = Manager::<Widget>::new(&registry())
        .unwrap()
        .adapter(Arc::clone(&primary) as Arc<dyn Adapter<Widget>>)
        .adapter(Arc::clone(&secondary) as Arc<dyn Adapter<Widget>>);

    let mut w = Widget {
        name: Some("sprocket".into()),
        ..Widget::default()
    };
    manager.write(&mut w, &WriteOptions::default()).unwrap();

    assert_eq!(w.widget_id, Some(42));
    // the id assigned by the first store is visible to the second
    assert_eq!(secondary.writes()[0].widget_id, Some(42));
}

#[test]
fn test_delete_reports_primary_store_count() {
    let primary = Arc::new(StubAdapter::new("mysql").deleting(3));
    let secondary = Arc::new(StubAdapter::new("memcache").deleting(9));

    let manager = Manager::<Widget>::new(&registry())
        .unwrap()
        .adapter(primary)
        .adapter(secondary);

    assert_eq!(manager.delete(&Criteria::new().equals("qty", 0)).unwrap(), 3);
    assert_eq!(
        manager
            .delete_batch(&Criteria::new().equals("qty", 0))
            .unwrap(),
        3
    );
}

#[test]
fn test_adapter_of_looks_up_by_kind() {
    let manager = Manager::<Widget>::new(&registry())
        .unwrap()
        .adapter(Arc::new(StubAdapter::new("mysql")));

    assert!(manager.adapter_of("mysql").is_ok());
    assert!(matches!(
        manager.adapter_of("memcache"),
        Err(StoreError::Configuration(_))
    ));
}

#[test]
fn test_find_all_falls_through_empty_stores() {
    let primary = Arc::new(StubAdapter::new("mysql"));
    let fallback = Arc::new(StubAdapter::new("memcache").finding(widget(7, "cached")));

    let manager = Manager::<Widget>::new(&registry())
        .unwrap()
        .adapter(primary)
        .adapter(fallback);

    let all = manager.find_all(&Criteria::new(), None).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].widget_id, Some(7));

    let page = manager
        .find(&Criteria::new(), Some(10), Some(0), None)
        .unwrap();
    assert_eq!(page.len(), 1);
}
