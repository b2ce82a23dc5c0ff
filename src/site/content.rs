//! Content items handed to plugins once they are ready

use serde::{Deserialize, Serialize};

/// A page or article as seen by a plugin
pub trait ContentItem {
    /// URL-safe identifier used for file names
    fn slug(&self) -> &str;

    /// URL relative to the site root, if the item is published
    fn url(&self) -> Option<&str>;

    /// Whether the item carries rendered content
    fn has_content(&self) -> bool;

    /// Record the public URL of the item's QR code
    fn attach_qrcode(&mut self, url: String);

    /// Append markup to the item's rendered content
    fn embed_html(&mut self, _html: &str) {}
}

/// Minimal in-memory content item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// URL-safe identifier
    pub slug: String,
    /// URL relative to the site root
    pub url: Option<String>,
    /// Rendered HTML
    pub content: Option<String>,
    /// Public URL of the engraved QR code
    #[serde(default)]
    pub engrave_qrcode: Option<String>,
}

impl Page {
    /// Published page with rendered content
    pub fn new(slug: impl Into<String>, url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            url: Some(url.into()),
            content: Some(content.into()),
            engrave_qrcode: None,
        }
    }
}

impl ContentItem for Page {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn has_content(&self) -> bool {
        self.content.is_some()
    }

    fn attach_qrcode(&mut self, url: String) {
        self.engrave_qrcode = Some(url);
    }

    fn embed_html(&mut self, html: &str) {
        if let Some(content) = self.content.as_mut() {
            content.push_str(html);
        }
    }
}
