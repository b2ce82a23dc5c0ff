//! engrave - QR codes for every page of a static site
//!
//! This library hooks into a static-site build and engraves the final URL of
//! each page into a scannable SVG QR code, saved next to the generated site.
//!
//! # Features
//!
//! - **URL gating**: only absolute URLs with an allowed scheme and a host are encoded
//! - **Deterministic SVG**: identical URLs always produce byte-identical images
//! - **Pluggable rendering**: swap the [`BarcodeRenderer`] behind the [`Engraver`]
//! - **Build hooks**: [`EngravePlugin`] cleans stale codes at build start and
//!   writes one code per page as items become ready
//!
//! # Example
//!
//! ```no_run
//! use engrave::{EngraveConfig, Lifecycle, Page};
//! use std::collections::HashMap;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut lifecycle = Lifecycle::new();
//!     engrave::register(&mut lifecycle);
//!
//!     let settings: HashMap<String, String> = [
//!         ("SITEURL", "https://example.com"),
//!         ("OUTPUT_PATH", "output"),
//!     ]
//!     .into_iter()
//!     .map(|(k, v)| (k.to_string(), v.to_string()))
//!     .collect();
//!
//!     let mut pages = vec![Page::new("hello", "hello.html", "<p>Hello</p>")];
//!     lifecycle.run(&settings, pages.iter_mut());
//!
//!     println!("{:?}", pages[0].engrave_qrcode);
//!     let _ = EngraveConfig::load(None)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2024_compatibility)]

pub mod config;
pub mod engraver;
pub mod error;
pub mod logging;
pub mod qr;
pub mod site;

// Re-exports for convenience
pub use error::{Error, Result};

pub use config::{EngraveConfig, LoggingOptions, QrOptions};
pub use engraver::{
    BarcodeRenderer, EccLevel, EncodeOutcome, EncodeRequest, Engraver, QUIET_ZONE, QrSvgRenderer,
    Rejection, RenderOptions, Rendering, SvgImage, SymbolInfo, encode,
};
pub use qr::QrDecoder;
pub use site::{
    BuildReport, ContentItem, EngravePlugin, Lifecycle, Page, Plugin, Settings, register,
};
