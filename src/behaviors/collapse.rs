//! Collapse behavior: opens and closes its element by toggling a class.

use std::any::Any;

use serde_json::{json, Value};

use crate::error::Result;
use crate::plugins::{Behavior, Capability, Options, PluginContext};

pub struct Collapse {
    context: PluginContext,
    open_class: String,
}

impl Collapse {
    /// Whether the element carries the open class. False once the element
    /// is gone.
    pub fn is_open(&self) -> bool {
        self.context
            .element()
            .map_or(false, |el| el.has_class(&self.open_class))
    }

    fn set_open(&self, open: bool) -> Result<Value> {
        let el = self.context.element()?;
        if open {
            el.add_class(&self.open_class);
        } else {
            el.remove_class(&self.open_class);
        }
        Ok(json!(open))
    }
}

impl Behavior for Collapse {
    fn context(&self) -> &PluginContext {
        &self.context
    }

    fn responds_to(&self, method: &str) -> bool {
        matches!(method, "init" | "open" | "close" | "toggle" | "is_open")
    }

    fn call(&mut self, method: &str, _args: &Value) -> Result<Value> {
        match method {
            "init" => {
                let initially_open = self
                    .context
                    .option("initially_open")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                if initially_open {
                    self.set_open(true)?;
                }
                Ok(Value::Null)
            }
            "open" => self.set_open(true),
            "close" => self.set_open(false),
            "toggle" => self.set_open(!self.is_open()),
            "is_open" => Ok(json!(self.is_open())),
            other => Err(self.context.unknown_method(other)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Capability for [`Collapse`].
pub struct CollapseCapability;

impl Capability for CollapseCapability {
    fn kind(&self) -> &str {
        "collapse"
    }

    fn default_options(&self) -> Options {
        json!({ "open_class": "is-open", "initially_open": false })
    }

    fn instantiate(&self, context: PluginContext) -> Result<Box<dyn Behavior>> {
        let open_class = context
            .option("open_class")
            .and_then(Value::as_str)
            .unwrap_or("is-open")
            .to_string();
        Ok(Box::new(Collapse {
            context,
            open_class,
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
