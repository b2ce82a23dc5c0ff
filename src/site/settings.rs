//! String-keyed settings lookup exposed by the host build tool

use crate::config::split_list;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Setting keys read by engrave
pub mod keys {
    /// Public base URL of the site
    pub const SITE_URL: &str = "SITEURL";
    /// Root output directory of the build
    pub const OUTPUT_PATH: &str = "OUTPUT_PATH";
    /// Schemes that may be engraved
    pub const ALLOWED_SCHEMES: &str = "ENGRAVE_ALLOWED_SCHEMES";
    /// Image directory below the output path
    pub const IMAGE_DIR: &str = "ENGRAVE_IMAGE_DIR";
    /// engrave's own directory below the image directory
    pub const BASE_DIR: &str = "ENGRAVE_BASE_DIR";
    /// Whether to embed an `<img>` reference into page content
    pub const EMBED: &str = "ENGRAVE_EMBED";
}

/// Read-only view of the host's configuration
pub trait Settings {
    /// String value for `key`
    fn get_str(&self, key: &str) -> Option<&str>;

    /// List value for `key`; comma separated unless the host stores real lists
    fn get_list(&self, key: &str) -> Option<Vec<String>> {
        self.get_str(key).map(split_list)
    }
}

impl Settings for HashMap<String, String> {
    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

impl Settings for BTreeMap<String, String> {
    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

/// JSON objects, as dumped by most hosts; non-string scalars are ignored
impl Settings for Value {
    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    fn get_list(&self, key: &str) -> Option<Vec<String>> {
        match self.get(key)? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            ),
            Value::String(s) => Some(split_list(s)),
            _ => None,
        }
    }
}
