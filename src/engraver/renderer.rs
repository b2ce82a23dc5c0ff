//! Barcode rendering backends

use crate::error::{Error, Result};
use image::{GrayImage, Luma};
use qrcode::render::svg;
use qrcode::{EcLevel, QrCode, Version};
use serde::{Deserialize, Serialize};

/// Quiet border drawn by the `qrcode` renderers, in modules
pub const QUIET_ZONE: u32 = 4;

const DARK: &str = "#000000";
const LIGHT: &str = "#ffffff";

/// QR error-correction level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EccLevel {
    /// Recovers roughly 7% damage
    #[default]
    Low,
    /// Recovers roughly 15% damage
    Medium,
    /// Recovers roughly 25% damage
    Quartile,
    /// Recovers roughly 30% damage
    High,
}

impl EccLevel {
    /// Parse a level name (case-insensitive); accepts the single-letter forms too.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "low" | "l" => Some(Self::Low),
            "medium" | "m" => Some(Self::Medium),
            "quartile" | "q" => Some(Self::Quartile),
            "high" | "h" => Some(Self::High),
            _ => None,
        }
    }
}

impl From<EccLevel> for EcLevel {
    fn from(level: EccLevel) -> Self {
        match level {
            EccLevel::Low => EcLevel::L,
            EccLevel::Medium => EcLevel::M,
            EccLevel::Quartile => EcLevel::Q,
            EccLevel::High => EcLevel::H,
        }
    }
}

/// Visual parameters handed to a [`BarcodeRenderer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Error-correction level
    pub ecc_level: EccLevel,
    /// Quiet border width, in modules
    pub border: u32,
    /// Side length of one module, in SVG user units
    pub module_size: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            ecc_level: EccLevel::Low,
            border: QUIET_ZONE,
            module_size: 10,
        }
    }
}

impl RenderOptions {
    /// Side length in user units of a symbol that is `modules` wide
    pub fn side_length(&self, modules: usize) -> u32 {
        (modules as u32 + 2 * self.border) * self.module_size
    }
}

/// Shape of a rendered QR symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolInfo {
    /// QR version (1-40)
    pub version: i16,
    /// Symbol width in modules, without the quiet border
    pub modules: usize,
    /// Image side length in user units, including the quiet border
    pub side_length: u32,
}

/// Output of [`BarcodeRenderer::render_symbol`]
#[derive(Debug, Clone)]
pub struct Rendering {
    /// Encoded vector image
    pub bytes: Vec<u8>,
    /// Symbol metadata, when the renderer knows it
    pub symbol: Option<SymbolInfo>,
    /// Bitmap of the same symbol, used to check that it scans
    pub bitmap: Option<GrayImage>,
}

/// Rasterizes a payload into a vector barcode image
pub trait BarcodeRenderer: Send + Sync {
    /// Render `payload` and return the encoded image bytes.
    fn render(&self, payload: &str, options: &RenderOptions) -> Result<Vec<u8>>;

    /// Render `payload` along with whatever metadata the backend can report.
    fn render_symbol(&self, payload: &str, options: &RenderOptions) -> Result<Rendering> {
        Ok(Rendering {
            bytes: self.render(payload, options)?,
            symbol: None,
            bitmap: None,
        })
    }
}

/// QR renderer producing black-on-white SVG documents via `qrcode::render::svg`
///
/// The symbol version is the smallest one that fits the payload at the
/// requested error-correction level.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrSvgRenderer;

impl QrSvgRenderer {
    /// Create the renderer
    pub fn new() -> Self {
        Self
    }

    /// Build the QR symbol for `payload`, auto-fitting the version.
    pub fn symbol(payload: &str, ecc_level: EccLevel) -> Result<QrCode> {
        Ok(QrCode::with_error_correction_level(
            payload.as_bytes(),
            ecc_level.into(),
        )?)
    }

    fn check(options: &RenderOptions) -> Result<()> {
        if options.border != QUIET_ZONE {
            return Err(Error::QrEncode(format!(
                "quiet border must be {QUIET_ZONE} modules, got {}",
                options.border
            )));
        }
        if options.module_size == 0 {
            return Err(Error::QrEncode("module size must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl BarcodeRenderer for QrSvgRenderer {
    fn render(&self, payload: &str, options: &RenderOptions) -> Result<Vec<u8>> {
        Ok(self.render_symbol(payload, options)?.bytes)
    }

    fn render_symbol(&self, payload: &str, options: &RenderOptions) -> Result<Rendering> {
        Self::check(options)?;
        let code = Self::symbol(payload, options.ecc_level)?;
        let size = options.module_size;

        let svg = code
            .render::<svg::Color>()
            .quiet_zone(true)
            .module_dimensions(size, size)
            .dark_color(svg::Color(DARK))
            .light_color(svg::Color(LIGHT))
            .build();

        let bitmap = code
            .render::<Luma<u8>>()
            .quiet_zone(true)
            .module_dimensions(size, size)
            .build();

        let symbol = SymbolInfo {
            version: match code.version() {
                Version::Normal(v) | Version::Micro(v) => v,
            },
            modules: code.width(),
            side_length: options.side_length(code.width()),
        };
        tracing::trace!(?symbol, "Rendered QR symbol");

        Ok(Rendering {
            bytes: svg.into_bytes(),
            symbol: Some(symbol),
            bitmap: Some(bitmap),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = RenderOptions::default();
        assert_eq!(options.ecc_level, EccLevel::Low);
        assert_eq!(options.border, 4);
        assert_eq!(options.module_size, 10);
        // Version 1 is 21 modules wide.
        assert_eq!(options.side_length(21), 290);
    }

    #[test]
    fn test_ecc_parse() {
        assert_eq!(EccLevel::parse("LOW"), Some(EccLevel::Low));
        assert_eq!(EccLevel::parse("q"), Some(EccLevel::Quartile));
        assert_eq!(EccLevel::parse("extreme"), None);
    }

    #[test]
    fn test_svg_matches_symbol() {
        let rendering = QrSvgRenderer::new()
            .render_symbol("https://example.com", &RenderOptions::default())
            .unwrap();
        let symbol = rendering.symbol.unwrap();
        let svg = String::from_utf8(rendering.bytes).unwrap();

        assert!(svg.contains("<svg"));
        assert!(svg.contains(&format!("width=\"{}\"", symbol.side_length)));
        assert!(svg.contains(DARK));
        assert!(svg.contains(LIGHT));

        let bitmap = rendering.bitmap.unwrap();
        assert_eq!(bitmap.dimensions(), (symbol.side_length, symbol.side_length));
    }

    #[test]
    fn test_version_grows_with_payload() {
        let options = RenderOptions::default();
        let short = QrSvgRenderer::new()
            .render_symbol("https://a.io", &options)
            .unwrap()
            .symbol
            .unwrap();
        let long_url = format!("https://example.com/{}", "segment/".repeat(40));
        let long = QrSvgRenderer::new()
            .render_symbol(&long_url, &options)
            .unwrap()
            .symbol
            .unwrap();

        assert_eq!(short.version, 1);
        assert!(long.version > short.version);
        assert!(long.modules > short.modules);
    }

    #[test]
    fn test_oversized_payload_fails() {
        let huge = format!("https://example.com/{}", "x".repeat(4000));
        let result = QrSvgRenderer::new().render(&huge, &RenderOptions::default());
        assert!(matches!(result, Err(Error::QrEncode(_))));
    }

    #[test]
    fn test_quiet_zone_is_fixed() {
        for border in [0, 2, 8] {
            let options = RenderOptions {
                border,
                ..RenderOptions::default()
            };
            let result = QrSvgRenderer::new().render("https://example.com", &options);
            assert!(matches!(result, Err(Error::QrEncode(_))), "border {border}");
        }
    }
}
