//! Behavior contract for plugins.
//!
//! A [`Capability`] is the constructor side of a plugin: given an element, the
//! merged options and the registered name it produces a [`Behavior`]. The
//! default [`Capability::construct`] attaches the new instance to the
//! element's instance map and then calls its `init` method. The runtime never
//! attaches instances itself; a capability that overrides `construct` and
//! skips the attach step is never retrievable through the manager.
//!
//! The element owns its instances, so an instance only holds a weak handle
//! back to its element. Once the last [`Element`] handle is dropped the
//! element, its instance map and the instances in it are freed together.
//!
//! Behaviors answer calls by method name. This is what lets an override table
//! replace individual members of an existing behavior (see `extend`).

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use crate::dom::{Element, WeakElement};
use crate::error::{PluginError, Result};

use super::merge::deep_merge;
use super::types::{empty_options, Options};

/// What an instance was constructed with.
#[derive(Debug, Clone)]
pub struct PluginContext {
    element: WeakElement,
    options: Options,
    name: String,
}

impl PluginContext {
    pub fn new(element: Element, options: Options, name: impl Into<String>) -> Self {
        Self {
            element: element.downgrade(),
            options,
            name: name.into(),
        }
    }

    /// The element this instance is attached to.
    ///
    /// # Errors
    /// `PluginError::Behavior` if the element has already been dropped.
    pub fn element(&self) -> Result<Element> {
        self.element.upgrade().ok_or_else(|| {
            PluginError::Behavior(format!("element of plugin \"{}\" was dropped", self.name))
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Registered plugin name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a top-level option.
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Error for a method this behavior does not answer.
    pub fn unknown_method(&self, method: &str) -> PluginError {
        PluginError::UnknownMethod {
            plugin: self.name.clone(),
            method: method.to_string(),
        }
    }
}

/// A live plugin instance attached to an element.
pub trait Behavior: 'static {
    fn context(&self) -> &PluginContext;

    /// Whether `method` is answered by this behavior.
    fn responds_to(&self, method: &str) -> bool;

    /// Invoke a method by name.
    ///
    /// Implementations return `PluginError::UnknownMethod` for names they do
    /// not answer.
    fn call(&mut self, method: &str, args: &Value) -> Result<Value>;

    fn as_any(&self) -> &dyn Any;
}

/// Constructor side of a plugin.
pub trait Capability: 'static {
    /// Short label used in logs and listings.
    fn kind(&self) -> &str;

    /// Options every instance starts from, before registered and call-site
    /// options are layered on top.
    fn default_options(&self) -> Options {
        empty_options()
    }

    /// Reject capabilities that cannot be constructed.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Build a new instance. Runs the behavior's own setup but does not attach
    /// it anywhere.
    fn instantiate(&self, context: PluginContext) -> Result<Box<dyn Behavior>>;

    /// Construct an instance for `element` and attach it under `name`.
    ///
    /// The instance is attached before `init` runs. If `init` fails the error
    /// is returned, but the instance stays attached and can still be looked up.
    fn construct(&self, element: &Element, options: Options, name: &str) -> Result<()> {
        let options = deep_merge(&self.default_options(), &options);
        let context = PluginContext::new(element.clone(), options, name);
        let instance = PluginInstance::new(self.instantiate(context)?);

        if element
            .plugin_instances()
            .insert(name, instance.clone())
            .is_some()
        {
            debug!(plugin = %name, element = %element, "Replaced existing plugin instance");
        }

        if instance.responds_to("init") {
            instance.call("init", &Value::Null)?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a live behavior.
#[derive(Clone)]
pub struct PluginInstance(Rc<RefCell<Box<dyn Behavior>>>);

impl PluginInstance {
    pub fn new(behavior: Box<dyn Behavior>) -> Self {
        Self(Rc::new(RefCell::new(behavior)))
    }

    /// Invoke a method on the behavior.
    ///
    /// # Errors
    /// `PluginError::Behavior` if the instance is already executing a call
    /// (re-entrant call through another handle), otherwise whatever the
    /// behavior returns.
    pub fn call(&self, method: &str, args: &Value) -> Result<Value> {
        let mut behavior = self.0.try_borrow_mut().map_err(|_| {
            PluginError::Behavior(format!(
                "re-entrant call to '{}' while the instance is busy",
                method
            ))
        })?;
        behavior.call(method, args)
    }

    pub fn responds_to(&self, method: &str) -> bool {
        self.0.borrow().responds_to(method)
    }

    pub fn name(&self) -> String {
        self.0.borrow().context().name().to_string()
    }

    /// The element this instance is attached to, if it is still alive.
    pub fn element(&self) -> Option<Element> {
        self.0.borrow().context().element().ok()
    }

    pub fn options(&self) -> Options {
        self.0.borrow().context().options().clone()
    }

    /// Run `f` against the concrete behavior type, if it matches.
    pub fn with<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let behavior = self.0.borrow();
        behavior.as_any().downcast_ref::<T>().map(f)
    }

    pub fn ptr_eq(&self, other: &PluginInstance) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(behavior) => write!(
                f,
                "PluginInstance({} on {:?})",
                behavior.context().name(),
                behavior.context().element
            ),
            Err(_) => write!(f, "PluginInstance(<busy>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Counter {
        context: PluginContext,
        count: i64,
        initialized: bool,
    }

    impl Behavior for Counter {
        fn context(&self) -> &PluginContext {
            &self.context
        }

        fn responds_to(&self, method: &str) -> bool {
            matches!(method, "init" | "increment" | "count")
        }

        fn call(&mut self, method: &str, _args: &Value) -> Result<Value> {
            match method {
                "init" => {
                    if self.context.option("fail_init") == Some(&json!(true)) {
                        return Err(PluginError::Behavior("init refused".into()));
                    }
                    self.initialized = true;
                    Ok(Value::Null)
                }
                "increment" => {
                    self.count += self.context.option("step").and_then(Value::as_i64).unwrap_or(1);
                    Ok(json!(self.count))
                }
                "count" => Ok(json!(self.count)),
                other => Err(self.context.unknown_method(other)),
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct CounterCapability;

    impl Capability for CounterCapability {
        fn kind(&self) -> &str {
            "counter"
        }

        fn default_options(&self) -> Options {
            json!({"step": 1, "label": "clicks"})
        }

        fn instantiate(&self, context: PluginContext) -> Result<Box<dyn Behavior>> {
            Ok(Box::new(Counter {
                context,
                count: 0,
                initialized: false,
            }))
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_construct_attaches_and_inits() {
        let el = Element::new("button");
        CounterCapability
            .construct(&el, json!({"step": 5}), "counter")
            .unwrap();

        let instance = el.plugin_instances().get("counter").unwrap();
        assert_eq!(instance.name(), "counter");
        assert_eq!(instance.element(), Some(el));
        assert_eq!(instance.with(|c: &Counter| c.initialized), Some(true));
        assert_eq!(instance.call("increment", &Value::Null).unwrap(), json!(5));
    }

    #[test]
    fn test_construct_layers_default_options() {
        let el = Element::new("button");
        CounterCapability
            .construct(&el, json!({"step": 2}), "counter")
            .unwrap();
        let instance = el.plugin_instances().get("counter").unwrap();
        assert_eq!(instance.options(), json!({"step": 2, "label": "clicks"}));
    }

    #[test]
    fn test_construct_twice_replaces_instance() {
        let el = Element::new("button");
        CounterCapability.construct(&el, json!({}), "counter").unwrap();
        let first = el.plugin_instances().get("counter").unwrap();
        CounterCapability.construct(&el, json!({}), "counter").unwrap();
        let second = el.plugin_instances().get("counter").unwrap();
        assert!(!first.ptr_eq(&second));
        assert_eq!(el.plugin_instances().len(), 1);
    }

    #[test]
    fn test_unknown_method() {
        let el = Element::new("button");
        CounterCapability.construct(&el, json!({}), "counter").unwrap();
        let instance = el.plugin_instances().get("counter").unwrap();
        let err = instance.call("explode", &Value::Null).unwrap_err();
        assert!(matches!(err, PluginError::UnknownMethod { .. }));
    }

    #[test]
    fn test_with_wrong_type_is_none() {
        let el = Element::new("button");
        CounterCapability.construct(&el, json!({}), "counter").unwrap();
        let instance = el.plugin_instances().get("counter").unwrap();
        assert!(instance.with(|_: &String| ()).is_none());
    }

    #[test]
    fn test_failed_init_leaves_instance_attached() {
        let el = Element::new("button");
        let err = CounterCapability
            .construct(&el, json!({"fail_init": true}), "counter")
            .unwrap_err();
        assert!(matches!(err, PluginError::Behavior(_)));

        let instance = el.plugin_instances().get("counter").unwrap();
        assert_eq!(instance.with(|c: &Counter| c.initialized), Some(false));
    }

    #[test]
    fn test_dropping_element_frees_attached_instance() {
        let el = Element::new("button");
        CounterCapability.construct(&el, json!({}), "counter").unwrap();
        let weak = el.downgrade();
        let instances = el.plugin_instances();
        assert_eq!(instances.len(), 1);

        drop(instances);
        drop(el);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_instance_outliving_element() {
        let el = Element::new("button");
        CounterCapability.construct(&el, json!({}), "counter").unwrap();
        let instance = el.plugin_instances().get("counter").unwrap();

        drop(el);
        assert!(instance.element().is_none());
        assert_eq!(instance.call("count", &Value::Null).unwrap(), json!(0));
        assert_eq!(format!("{:?}", instance), "PluginInstance(counter on <dropped>)");
    }

    #[test]
    fn test_context_element_after_drop_is_error() {
        let el = Element::new("div");
        let context = PluginContext::new(el.clone(), json!({}), "panel");
        assert_eq!(context.element().unwrap(), el);
        drop(el);
        assert!(matches!(context.element(), Err(PluginError::Behavior(_))));
    }

    #[test]
    fn test_debug_format() {
        let el = Element::new("button").with_id("buy");
        CounterCapability.construct(&el, json!({}), "counter").unwrap();
        let instance = el.plugin_instances().get("counter").unwrap();
        assert_eq!(format!("{:?}", instance), "PluginInstance(counter on button#buy)");
    }
}
