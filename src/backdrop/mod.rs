//! Modal backdrop overlay.
//!
//! A single dimming overlay shared by modals and off-canvas panels. At most
//! one backdrop element exists after `open`; `close` hides it immediately and
//! removes it after a delay so a CSS transition can finish.
//!
//! Removal is scheduled on a [`TimerQueue`] with no way to cancel it. Closing
//! twice schedules two removals, and a removal scheduled by `close` also takes
//! out a backdrop opened again before it fires.

mod timers;

pub use timers::TimerQueue;

use tracing::debug;

use crate::dom::{Document, Element};

pub const SELECTOR_CLASS: &str = "modal-backdrop";
pub const BACKDROP_OPEN_CLASS: &str = "modal-backdrop-open";
pub const NO_SCROLL_CLASS: &str = "no-scroll";
/// Default removal delay in milliseconds.
pub const REMOVE_BACKDROP_DELAY: u64 = 350;
/// Event reported when the backdrop itself is clicked.
pub const BACKDROP_ON_CLICK: &str = "backdrop/onclick";

pub struct Backdrop {
    document: Document,
    timers: TimerQueue,
    remove_delay_ms: u64,
}

impl Backdrop {
    pub fn new(document: Document, timers: TimerQueue) -> Self {
        Self {
            document,
            timers,
            remove_delay_ms: REMOVE_BACKDROP_DELAY,
        }
    }

    /// Override the delay `close(None)` uses.
    pub fn with_remove_delay(mut self, delay_ms: u64) -> Self {
        self.remove_delay_ms = delay_ms;
        self
    }

    /// Insert a fresh backdrop at the end of `<body>` and lock page scrolling.
    ///
    /// Existing backdrops are removed first. One millisecond later the
    /// backdrop gets its open class and `on_open` runs.
    pub fn open(&self, on_open: Option<Box<dyn FnOnce()>>) -> Element {
        remove_backdrops(&self.document);

        let backdrop = Element::new("div").with_class(SELECTOR_CLASS);
        let container = self
            .document
            .body()
            .unwrap_or_else(|| self.document.root().clone());
        container.append_child(&backdrop);
        self.document.root().add_class(NO_SCROLL_CLASS);

        let opened = backdrop.clone();
        self.timers.schedule(1, move || {
            opened.add_class(BACKDROP_OPEN_CLASS);
            if let Some(callback) = on_open {
                callback();
            }
        });

        debug!("Opened backdrop");
        backdrop
    }

    /// Hide all backdrops and schedule their removal after `delay_ms`
    /// (default: the configured remove delay).
    pub fn close(&self, delay_ms: Option<u64>) {
        for backdrop in self.backdrops() {
            backdrop.remove_class(BACKDROP_OPEN_CLASS);
        }

        let delay = delay_ms.unwrap_or(self.remove_delay_ms);
        let document = self.document.clone();
        self.timers.schedule(delay, move || remove_backdrops(&document));

        self.document.root().remove_class(NO_SCROLL_CLASS);
        debug!(delay_ms = delay, "Closing backdrop");
    }

    /// Backdrop elements currently in the document.
    pub fn backdrops(&self) -> Vec<Element> {
        find_backdrops(&self.document)
    }

    pub fn exists(&self) -> bool {
        !self.backdrops().is_empty()
    }

    /// The event a click on `target` produces, if it hit a backdrop.
    pub fn click(&self, target: &Element) -> Option<&'static str> {
        target.has_class(SELECTOR_CLASS).then_some(BACKDROP_ON_CLICK)
    }
}

fn find_backdrops(document: &Document) -> Vec<Element> {
    document
        .elements()
        .into_iter()
        .filter(|el| el.has_class(SELECTOR_CLASS))
        .collect()
}

fn remove_backdrops(document: &Document) {
    for backdrop in find_backdrops(document) {
        backdrop.remove();
    }
}
