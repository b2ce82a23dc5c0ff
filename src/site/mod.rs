//! Integration with a static-site build tool
//!
//! The host tool is represented by three small interfaces: a [`Settings`]
//! lookup, [`ContentItem`]s and the [`Lifecycle`] that calls registered
//! [`Plugin`]s. [`EngravePlugin`] is the plugin this crate provides.

mod content;
mod lifecycle;
mod plugin;
mod settings;

pub use content::{ContentItem, Page};
pub use lifecycle::{Lifecycle, Plugin};
pub use plugin::{BuildReport, EngravePlugin};
pub use settings::{Settings, keys};

/// Register a default-configured [`EngravePlugin`] with `lifecycle`.
pub fn register(lifecycle: &mut Lifecycle) {
    lifecycle.register(EngravePlugin::default());
}
