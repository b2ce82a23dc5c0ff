//! The engrave plugin: one QR code per published page

use crate::config::EngraveConfig;
use crate::engraver::{Engraver, SvgImage};
use crate::error::Result;
use crate::site::{ContentItem, Plugin, Settings};
use std::fs;
use std::path::{Path, PathBuf};

/// Counters for one build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// QR codes written
    pub generated: usize,
    /// Items skipped (no content, no URL, rejected URL, unusable slug)
    pub skipped: usize,
    /// Items whose QR code could not be written
    pub failed: usize,
}

/// Generates a QR code for every page and attaches its public URL to the page
#[derive(Debug)]
pub struct EngravePlugin {
    config: EngraveConfig,
    engraver: Engraver,
    report: BuildReport,
}

impl Default for EngravePlugin {
    fn default() -> Self {
        Self::new(EngraveConfig::default())
    }
}

impl EngravePlugin {
    /// Create a plugin; host settings are merged in at build start.
    pub fn new(config: EngraveConfig) -> Self {
        let engraver = config.engraver();
        Self {
            config,
            engraver,
            report: BuildReport::default(),
        }
    }

    /// Effective configuration
    pub fn config(&self) -> &EngraveConfig {
        &self.config
    }

    /// Counters since the last build start
    pub fn report(&self) -> BuildReport {
        self.report
    }

    /// Remove codes left over from a previous build.
    ///
    /// The directory is emptied but kept; it is never created here.
    pub fn cleanup_directory(&self) -> Result<()> {
        let dir = self.config.engrave_dir();
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
            fs::create_dir_all(&dir)?;
            tracing::info!("Cleaned up {}", dir.display());
        }
        Ok(())
    }

    /// Absolute URL of `item`, or `None` without a base URL or item URL
    pub fn page_url(&self, item: &dyn ContentItem) -> Option<String> {
        let base = self.config.base_url()?;
        let path = item.url()?.trim_matches('/');
        Some(format!("{base}/{path}"))
    }

    /// File an item's code is written to
    pub fn output_file(&self, slug: &str) -> PathBuf {
        self.config.engrave_dir().join(file_name(slug))
    }

    fn process(&mut self, item: &mut dyn ContentItem) {
        if !item.has_content() || item.url().is_none_or(str::is_empty) {
            self.report.skipped += 1;
            return;
        }

        let slug = item.slug().to_string();
        if !is_safe_slug(&slug) {
            tracing::warn!(slug = %slug, "Slug cannot be used as a file name, skipping QR code");
            self.report.skipped += 1;
            return;
        }

        let Some(full_url) = self.page_url(item) else {
            self.report.skipped += 1;
            return;
        };

        let Some(image) = self.engraver.engrave(&full_url) else {
            tracing::warn!("No QR code was generated for page {slug}");
            self.report.skipped += 1;
            return;
        };

        match self.persist(&slug, &image) {
            Ok(qrcode_url) => {
                tracing::debug!(slug = %slug, url = %full_url, qrcode = %qrcode_url, "Engraved page");
                if self.config.embed {
                    item.embed_html(&img_tag(&qrcode_url, &slug));
                }
                item.attach_qrcode(qrcode_url);
                self.report.generated += 1;
            }
            Err(err) => {
                tracing::error!(slug = %slug, error = %err, "Failed to write QR code");
                self.report.failed += 1;
            }
        }
    }

    /// Write the image and return its public URL.
    fn persist(&self, slug: &str, image: &SvgImage) -> Result<String> {
        let dir = self.config.engrave_dir();
        fs::create_dir_all(&dir)?;
        image.save(dir.join(file_name(slug)))?;

        let relative = self.config.relative_dir().join(file_name(slug));
        // Base URL presence was checked by the caller.
        let base = self.config.base_url().unwrap_or_default();
        Ok(format!("{base}/{}", url_path(&relative)))
    }
}

impl Plugin for EngravePlugin {
    fn name(&self) -> &str {
        "engrave"
    }

    fn on_build_start(&mut self, settings: &dyn Settings) {
        self.config.apply_settings(settings);
        self.engraver = self.config.engraver();
        self.report = BuildReport::default();

        if self.config.base_url().is_none() {
            tracing::warn!("SITEURL is not set; QR codes will not be generated");
        }

        if let Err(err) = self.cleanup_directory() {
            let dir = self.config.engrave_dir();
            tracing::error!(
                dir = %dir.display(),
                error = %err,
                "Failed to clean up QR code directory",
            );
        }
    }

    fn on_item_ready(&mut self, item: &mut dyn ContentItem) {
        if self.config.base_url().is_none() {
            self.report.skipped += 1;
            return;
        }
        self.process(item);
    }
}

fn file_name(slug: &str) -> String {
    format!("{slug}_qrcode.svg")
}

fn is_safe_slug(slug: &str) -> bool {
    !slug.is_empty() && slug != "." && slug != ".." && !slug.contains(['/', '\\'])
}

fn url_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn img_tag(src: &str, slug: &str) -> String {
    format!(
        "<img class=\"engrave-qrcode\" src=\"{}\" alt=\"QR code for {}\">",
        escape_attr(src),
        escape_attr(slug)
    )
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
