//! Per-element plugin instance maps.
//!
//! Each element lazily owns one [`InstanceMap`]; every access hands out a
//! handle to that same map. The manager never walks or clears these maps, they
//! simply go away with their element.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::capability::PluginInstance;

/// Shared handle to an element's plugin-name → instance map.
#[derive(Clone, Default)]
pub struct InstanceMap(Rc<RefCell<BTreeMap<String, PluginInstance>>>);

impl InstanceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<PluginInstance> {
        self.0.borrow().get(name).cloned()
    }

    /// Store `instance` under `name`, returning the instance it replaced.
    pub fn insert(&self, name: &str, instance: PluginInstance) -> Option<PluginInstance> {
        self.0.borrow_mut().insert(name.to_string(), instance)
    }

    pub fn remove(&self, name: &str) -> Option<PluginInstance> {
        self.0.borrow_mut().remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.borrow().contains_key(name)
    }

    /// Plugin names with a live instance, sorted.
    pub fn names(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Whether both handles refer to the same map.
    pub fn ptr_eq(&self, other: &InstanceMap) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for InstanceMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
