//! QR code decoding
//!
//! Encoding lives in [`crate::engraver`]; this module scans bitmaps back into
//! their payload so rendered codes can be checked for scannability.

mod decoder;

pub use decoder::QrDecoder;
