//! URL validation and QR engraving
//!
//! [`Engraver`] is the core of the crate: it checks that a payload is an
//! absolute URL with an allowed scheme and a host, then hands it to a
//! [`BarcodeRenderer`] to produce an SVG QR code. Validation failures are
//! reported as a rejection and never as an error, so a single bad page cannot
//! abort a site build.
//!
//! ```
//! use engrave::Engraver;
//!
//! let engraver = Engraver::new(["https"]);
//! let image = engraver.engrave("https://example.com/test-article.html");
//! assert!(image.is_some());
//! assert!(engraver.engrave("ftp://example.com").is_none());
//! ```

mod renderer;

pub use renderer::{
    BarcodeRenderer, EccLevel, QUIET_ZONE, QrSvgRenderer, RenderOptions, Rendering, SymbolInfo,
};

use crate::error::{Error, Result};
use crate::qr::QrDecoder;
use image::GrayImage;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// Schemes accepted when none are configured
pub const DEFAULT_SCHEMES: &[&str] = &["https"];

/// A single engraving request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeRequest {
    /// Absolute URL to encode
    pub payload: String,
    /// Schemes the payload may use
    pub allowed_schemes: BTreeSet<String>,
}

impl EncodeRequest {
    /// Request with the default scheme set (`https` only)
    pub fn new(payload: impl Into<String>) -> Self {
        Self::with_schemes(payload, DEFAULT_SCHEMES.iter().copied())
    }

    /// Request with an explicit scheme set
    pub fn with_schemes<I, S>(payload: impl Into<String>, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            payload: payload.into(),
            allowed_schemes: normalize_schemes(schemes),
        }
    }
}

/// Why a payload was not engraved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Payload was empty
    Empty,
    /// Payload could not be parsed as an absolute URL
    Malformed(String),
    /// Scheme is not in the allowed set
    DisallowedScheme(String),
    /// URL has no host
    MissingAuthority,
    /// Renderer failed or the rendered code did not scan back to the payload
    RenderFailed(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Empty => write!(f, "payload is empty"),
            Rejection::Malformed(reason) => write!(f, "not a URL with expected structure: {reason}"),
            Rejection::DisallowedScheme(scheme) => write!(f, "scheme '{scheme}' is not allowed"),
            Rejection::MissingAuthority => write!(f, "URL has no host"),
            Rejection::RenderFailed(reason) => write!(f, "rendering failed: {reason}"),
        }
    }
}

/// Result of evaluating an [`EncodeRequest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeOutcome {
    /// The payload was accepted and rendered
    Image(SvgImage),
    /// The payload was rejected; no artifact was produced
    Rejected(Rejection),
}

impl EncodeOutcome {
    /// Artifact if the payload was accepted
    pub fn into_image(self) -> Option<SvgImage> {
        match self {
            EncodeOutcome::Image(image) => Some(image),
            EncodeOutcome::Rejected(_) => None,
        }
    }

    /// Rejection reason, if any
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            EncodeOutcome::Image(_) => None,
            EncodeOutcome::Rejected(reason) => Some(reason),
        }
    }
}

/// An engraved QR code as an SVG document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgImage {
    payload: String,
    bytes: Vec<u8>,
    symbol: Option<SymbolInfo>,
    bitmap: Option<GrayImage>,
}

impl SvgImage {
    /// The URL encoded in this image
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Raw SVG bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// QR version, when the renderer reports it
    pub fn version(&self) -> Option<i16> {
        self.symbol.map(|s| s.version)
    }

    /// Symbol width in modules without the quiet border, when known
    pub fn modules(&self) -> Option<usize> {
        self.symbol.map(|s| s.modules)
    }

    /// Image side length in user units, when known
    pub fn side_length(&self) -> Option<u32> {
        self.symbol.map(|s| s.side_length)
    }

    /// Write the SVG document to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), &self.bytes)?;
        Ok(())
    }

    /// Scan the symbol back into its text.
    ///
    /// Works on the bitmap the renderer drew alongside the SVG; renderers
    /// that do not provide one yield [`Error::QrDecode`].
    pub fn decode(&self) -> Result<String> {
        let bitmap = self
            .bitmap
            .as_ref()
            .ok_or_else(|| Error::QrDecode("renderer provided no bitmap to scan".to_string()))?;
        QrDecoder::new().decode_gray(bitmap)
    }
}

/// Validates URLs and engraves them into QR codes
///
/// The engraver is immutable after construction and can be shared across
/// threads.
#[derive(Clone)]
pub struct Engraver {
    allowed_schemes: BTreeSet<String>,
    options: RenderOptions,
    renderer: Arc<dyn BarcodeRenderer>,
    verify: bool,
}

impl fmt::Debug for Engraver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engraver")
            .field("allowed_schemes", &self.allowed_schemes)
            .field("options", &self.options)
            .field("verify", &self.verify)
            .finish_non_exhaustive()
    }
}

impl Default for Engraver {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEMES.iter().copied())
    }
}

impl Engraver {
    /// Create an engraver accepting the given schemes, rendering black-on-white SVG
    pub fn new<I, S>(allowed_schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_schemes: normalize_schemes(allowed_schemes),
            options: RenderOptions::default(),
            renderer: Arc::new(QrSvgRenderer::new()),
            verify: false,
        }
    }

    /// Replace the barcode renderer
    pub fn with_renderer(mut self, renderer: impl BarcodeRenderer + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    /// Replace the render options
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Decode every rendered image and reject it unless it scans back to the payload
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Schemes this engraver accepts
    pub fn allowed_schemes(&self) -> &BTreeSet<String> {
        &self.allowed_schemes
    }

    /// Engrave `payload`, returning `None` if it is rejected.
    pub fn engrave(&self, payload: &str) -> Option<SvgImage> {
        self.engrave_with(payload, &self.allowed_schemes)
            .into_image()
    }

    /// Evaluate a request against its own scheme set.
    pub fn evaluate(&self, request: &EncodeRequest) -> EncodeOutcome {
        self.engrave_with(&request.payload, &request.allowed_schemes)
    }

    fn engrave_with(&self, payload: &str, schemes: &BTreeSet<String>) -> EncodeOutcome {
        if let Err(rejection) = validate(payload, schemes) {
            tracing::info!(url = payload, %rejection, "Could not generate QR code");
            return EncodeOutcome::Rejected(rejection);
        }

        match self.render(payload) {
            Ok(image) => EncodeOutcome::Image(image),
            Err(err) => {
                tracing::error!(url = payload, error = %err, "QR rendering failed");
                EncodeOutcome::Rejected(Rejection::RenderFailed(err.to_string()))
            }
        }
    }

    fn render(&self, payload: &str) -> Result<SvgImage> {
        let rendering = self.renderer.render_symbol(payload, &self.options)?;
        let image = SvgImage {
            payload: payload.to_string(),
            bytes: rendering.bytes,
            symbol: rendering.symbol,
            bitmap: rendering.bitmap,
        };

        if self.verify {
            let decoded = image.decode()?;
            if decoded != payload {
                return Err(Error::QrDecode(format!(
                    "rendered code scans as '{decoded}'"
                )));
            }
        }

        Ok(image)
    }
}

/// Engrave `payload` if its scheme is one of `allowed_schemes`.
pub fn encode<I, S>(payload: &str, allowed_schemes: I) -> Option<SvgImage>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Engraver::new(allowed_schemes).engrave(payload)
}

/// Check that `payload` is an absolute URL with an allowed scheme and a host.
pub fn validate(
    payload: &str,
    allowed_schemes: &BTreeSet<String>,
) -> std::result::Result<Url, Rejection> {
    if payload.is_empty() {
        return Err(Rejection::Empty);
    }

    // The URL parser invents a host for `https:example.com` and friends, so
    // the `scheme://authority` shape is checked on the raw text first.
    let authority = authority(payload)?;

    let url = Url::parse(payload).map_err(|e| Rejection::Malformed(e.to_string()))?;

    if !allowed_schemes.contains(url.scheme()) {
        return Err(Rejection::DisallowedScheme(url.scheme().to_string()));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() && !authority.is_empty() => Ok(url),
        _ => Err(Rejection::MissingAuthority),
    }
}

/// Raw authority of `scheme://authority[/?#...]`
fn authority(payload: &str) -> std::result::Result<&str, Rejection> {
    let Some((scheme, rest)) = payload.split_once(':') else {
        return Err(Rejection::Malformed("missing scheme".to_string()));
    };

    let mut chars = scheme.chars();
    let valid_scheme = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid_scheme {
        return Err(Rejection::Malformed(format!("invalid scheme '{scheme}'")));
    }

    let Some(rest) = rest.strip_prefix("//") else {
        return Err(Rejection::MissingAuthority);
    };
    let end = rest.find(['/', '?', '#', '\\']).unwrap_or(rest.len());
    match &rest[..end] {
        "" => Err(Rejection::MissingAuthority),
        authority => Ok(authority),
    }
}

fn normalize_schemes<I, S>(schemes: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    schemes
        .into_iter()
        .map(|s| s.as_ref().trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
