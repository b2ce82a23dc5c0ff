//! Build lifecycle hooks
//!
//! The host calls [`Lifecycle::build_start`] once before processing and
//! [`Lifecycle::item_ready`] once per content item. Plugins run in
//! registration order.

use crate::site::{ContentItem, Settings};

/// Extension points a plugin may implement
pub trait Plugin {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Called once before any content is processed
    fn on_build_start(&mut self, _settings: &dyn Settings) {}

    /// Called once for every content item after it is initialised
    fn on_item_ready(&mut self, _item: &mut dyn ContentItem) {}
}

/// Registered plugins and the dispatch of lifecycle events to them
#[derive(Default)]
pub struct Lifecycle {
    plugins: Vec<Box<dyn Plugin>>,
}

impl Lifecycle {
    /// Create an empty lifecycle
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin for all subsequent events
    pub fn register(&mut self, plugin: impl Plugin + 'static) -> &mut Self {
        tracing::debug!(plugin = plugin.name(), "Registered plugin");
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Number of registered plugins
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no plugin is registered
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Dispatch the build-start event
    pub fn build_start(&mut self, settings: &dyn Settings) {
        for plugin in &mut self.plugins {
            plugin.on_build_start(settings);
        }
    }

    /// Dispatch the item-ready event for one item
    pub fn item_ready(&mut self, item: &mut dyn ContentItem) {
        for plugin in &mut self.plugins {
            plugin.on_item_ready(item);
        }
    }

    /// Run a whole build: the start event, then every item in order.
    pub fn run<'a, I, T>(&mut self, settings: &dyn Settings, items: I)
    where
        I: IntoIterator<Item = &'a mut T>,
        T: ContentItem + 'a,
    {
        self.build_start(settings);
        for item in items {
            self.item_ready(item);
        }
    }
}
