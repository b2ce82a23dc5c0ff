//! QR code decoder using rqrr

use crate::error::{Error, Result};
use image::GrayImage;

/// QR code decoder used to confirm that rendered codes scan back to their payload
#[derive(Debug, Clone, Copy, Default)]
pub struct QrDecoder;

impl QrDecoder {
    /// Create a new QR decoder with default settings
    pub fn new() -> Self {
        Self
    }

    /// Decode the text of the first QR code found in a grayscale image
    pub fn decode_gray(&self, img: &GrayImage) -> Result<String> {
        let mut prepared = rqrr::PreparedImage::prepare(img.clone());

        let grids = prepared.detect_grids();
        let grid = grids.first().ok_or(Error::NoQrCodeFound)?;

        match grid.decode() {
            Ok((meta, content)) => {
                tracing::debug!(
                    version = ?meta.version,
                    ecc_level = ?meta.ecc_level,
                    length = content.len(),
                    "Decoded QR code",
                );

                Ok(content)
            }
            Err(e) => Err(Error::QrDecode(format!("Decode failed: {:?}", e))),
        }
    }
}
