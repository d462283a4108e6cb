//! Tooltip behavior.
//!
//! Marks its element with `data-tooltip` (the title) and
//! `data-tooltip-placement`, and toggles `data-tooltip-visible`.
//!
//! Options: `delay` (ms, non-negative integer), `placement`, `title`
//! (falls back to the element's `title` attribute).

use std::any::Any;

use serde_json::{json, Value};

use crate::error::{PluginError, Result};
use crate::plugins::{Behavior, Capability, Options, PluginContext};

const VISIBLE_ATTR: &str = "data-tooltip-visible";

pub struct Tooltip {
    context: PluginContext,
    title: String,
    delay: u64,
    visible: bool,
}

impl Tooltip {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn delay(&self) -> u64 {
        self.delay
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_visible(&mut self, visible: bool) -> Result<Value> {
        let el = self.context.element()?;
        self.visible = visible;
        if visible {
            el.set_attribute(VISIBLE_ATTR, "true");
        } else {
            el.remove_attribute(VISIBLE_ATTR);
        }
        Ok(json!(visible))
    }
}

impl Behavior for Tooltip {
    fn context(&self) -> &PluginContext {
        &self.context
    }

    fn responds_to(&self, method: &str) -> bool {
        matches!(
            method,
            "init" | "show" | "hide" | "toggle" | "is_visible" | "title" | "delay"
        )
    }

    fn call(&mut self, method: &str, _args: &Value) -> Result<Value> {
        match method {
            "init" => {
                let el = self.context.element()?;
                el.set_attribute("data-tooltip", &self.title);
                if let Some(placement) = self.context.option("placement").and_then(Value::as_str) {
                    el.set_attribute("data-tooltip-placement", placement);
                }
                Ok(Value::Null)
            }
            "show" => self.set_visible(true),
            "hide" => self.set_visible(false),
            "toggle" => {
                let next = !self.visible;
                self.set_visible(next)
            }
            "is_visible" => Ok(json!(self.visible)),
            "title" => Ok(json!(self.title)),
            "delay" => Ok(json!(self.delay)),
            other => Err(self.context.unknown_method(other)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Capability for [`Tooltip`].
pub struct TooltipCapability;

impl Capability for TooltipCapability {
    fn kind(&self) -> &str {
        "tooltip"
    }

    fn default_options(&self) -> Options {
        json!({ "delay": 0, "placement": "top" })
    }

    fn instantiate(&self, context: PluginContext) -> Result<Box<dyn Behavior>> {
        let delay = match context.option("delay") {
            None | Some(Value::Null) => 0,
            Some(value) => value.as_u64().ok_or_else(|| {
                PluginError::Behavior(format!(
                    "{}: option 'delay' must be a non-negative integer, got {}",
                    context.name(),
                    value
                ))
            })?,
        };
        let title = context
            .option("title")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| context.element().ok()?.attribute("title"))
            .unwrap_or_default();

        Ok(Box::new(Tooltip {
            context,
            title,
            delay,
            visible: false,
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
