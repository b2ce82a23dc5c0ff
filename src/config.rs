//! engrave runtime configuration handling

use crate::engraver::{DEFAULT_SCHEMES, EccLevel, Engraver, QUIET_ZONE, RenderOptions};
use crate::error::{Error, Result};
use crate::site::{Settings, keys};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration structure persisted to disk or environment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngraveConfig {
    /// Public base URL of the site; no QR codes are generated without it
    pub site_url: Option<String>,
    /// Root directory the site is written to
    pub output_path: PathBuf,
    /// Image directory below `output_path`
    pub image_dir: String,
    /// Directory below `image_dir` owned by engrave, cleared on every build
    pub base_dir: String,
    /// URL schemes that may be engraved
    pub allowed_schemes: Vec<String>,
    /// Append an `<img>` tag referencing the code to each page's content
    pub embed: bool,
    /// QR rendering options
    pub qr: QrOptions,
    /// Logging configuration
    pub logging: LoggingOptions,
}

impl Default for EngraveConfig {
    fn default() -> Self {
        Self {
            site_url: None,
            output_path: PathBuf::from("output"),
            image_dir: "images".to_string(),
            base_dir: "engrave".to_string(),
            allowed_schemes: DEFAULT_SCHEMES.iter().map(|s| s.to_string()).collect(),
            embed: false,
            qr: QrOptions::default(),
            logging: LoggingOptions::default(),
        }
    }
}

impl EngraveConfig {
    /// Load configuration from an explicit path or fall back to discovered defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            Self::from_file(path)?
        } else if let Some(path) = Self::discover_file()? {
            tracing::info!("Using configuration file: {}", path.display());
            Self::from_file(&path)?
        } else {
            tracing::debug!("No engrave.toml / engrave.yaml found, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Attempt to locate a configuration file in common locations.
    fn discover_file() -> Result<Option<PathBuf>> {
        let cwd =
            env::current_dir().map_err(|e| Error::Config(format!("Failed to read cwd: {e}")))?;
        for candidate in ["engrave.toml", "engrave.yaml", "engrave.yml"] {
            let path = cwd.join(candidate);
            if path.exists() {
                return Ok(Some(path));
            }
        }

        if let Some(xdg_config) = env::var_os("XDG_CONFIG_HOME") {
            let base = PathBuf::from(xdg_config).join("engrave");
            for candidate in ["config.toml", "config.yaml"] {
                let path = base.join(candidate);
                if path.exists() {
                    return Ok(Some(path));
                }
            }
        }

        Ok(None)
    }

    /// Read configuration from a concrete file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "toml" => toml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse TOML {}: {e}", path.display()))
            }),
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse YAML {}: {e}", path.display()))
            }),
            other => Err(Error::Config(format!(
                "Unsupported config format '{}', expected toml/yaml",
                other
            ))),
        }
    }

    /// Apply `ENGRAVE_*` overrides read through `lookup` (the environment in [`load`](Self::load)).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ENGRAVE_SITE_URL") {
            self.site_url = Some(url);
        }
        if let Some(path) = lookup("ENGRAVE_OUTPUT_PATH") {
            self.output_path = PathBuf::from(path);
        }
        if let Some(schemes) = lookup("ENGRAVE_ALLOWED_SCHEMES") {
            self.allowed_schemes = split_list(&schemes);
        }
        if let Some(embed) = lookup("ENGRAVE_EMBED").as_deref().and_then(parse_flag) {
            self.embed = embed;
        }
        self.qr.apply_overrides(&lookup);
        self.logging.apply_overrides(&lookup);
    }

    /// Merge values provided by the host build tool.
    ///
    /// Host settings win over file and environment values; keys the host does
    /// not define leave the current value untouched.
    pub fn apply_settings(&mut self, settings: &dyn Settings) {
        if let Some(url) = settings.get_str(keys::SITE_URL) {
            self.site_url = Some(url.to_string()).filter(|u| !u.trim().is_empty());
        }
        if let Some(path) = settings.get_str(keys::OUTPUT_PATH) {
            self.output_path = PathBuf::from(path);
        }
        if let Some(dir) = settings.get_str(keys::IMAGE_DIR) {
            self.image_dir = dir.to_string();
        }
        if let Some(dir) = settings.get_str(keys::BASE_DIR) {
            self.base_dir = dir.to_string();
        }
        if let Some(schemes) = settings.get_list(keys::ALLOWED_SCHEMES) {
            self.allowed_schemes = schemes;
        }
        if let Some(embed) = settings.get_str(keys::EMBED).and_then(parse_flag) {
            self.embed = embed;
        }
    }

    /// Base URL without trailing slashes, if set and non-empty
    pub fn base_url(&self) -> Option<&str> {
        self.site_url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .filter(|u| !u.is_empty())
    }

    /// Path of the engrave-owned directory, relative to `output_path`
    pub fn relative_dir(&self) -> PathBuf {
        Path::new(&self.image_dir).join(&self.base_dir)
    }

    /// Absolute path of the engrave-owned directory
    pub fn engrave_dir(&self) -> PathBuf {
        self.output_path.join(self.relative_dir())
    }

    /// Build the engraver described by this configuration.
    pub fn engraver(&self) -> Engraver {
        Engraver::new(&self.allowed_schemes)
            .with_options(self.qr.render_options())
            .with_verification(self.qr.verify)
    }
}

/// QR rendering configuration
///
/// The quiet border is not configurable: it is always [`QUIET_ZONE`] modules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QrOptions {
    /// Error-correction level
    pub ecc_level: EccLevel,
    /// Module side length in SVG units
    pub module_size: u32,
    /// Decode every rendered code before accepting it
    pub verify: bool,
}

impl Default for QrOptions {
    fn default() -> Self {
        let render = RenderOptions::default();
        Self {
            ecc_level: render.ecc_level,
            module_size: render.module_size,
            verify: false,
        }
    }
}

impl QrOptions {
    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("ENGRAVE_QR_ECC").as_deref().and_then(EccLevel::parse) {
            self.ecc_level = level;
        }
        if let Some(size) = lookup("ENGRAVE_QR_MODULE_SIZE").and_then(|s| s.parse::<u32>().ok()) {
            self.module_size = size.max(1);
        }
        if let Some(verify) = lookup("ENGRAVE_QR_VERIFY").as_deref().and_then(parse_flag) {
            self.verify = verify;
        }
    }

    /// Renderer parameters for these options
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            ecc_level: self.ecc_level,
            border: QUIET_ZONE,
            module_size: self.module_size.max(1),
        }
    }
}

/// Structured logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Default log level (overridable via `ENGRAVE_LOG_LEVEL`)
    pub level: String,
    /// Also append plain-text logs to this file
    pub file: Option<PathBuf>,
    /// ANSI colors in stderr logging
    pub color: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            color: true,
        }
    }
}

impl LoggingOptions {
    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("ENGRAVE_LOG_LEVEL") {
            self.level = level;
        }
        if let Some(file) = lookup("ENGRAVE_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }
        if let Some(color) = lookup("ENGRAVE_LOG_COLOR").as_deref().and_then(parse_flag) {
            self.color = color;
        }
    }
}

pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

pub(crate) fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
