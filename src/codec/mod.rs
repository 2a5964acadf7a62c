//! Raw pixel codec for uncompressed sequence frames

pub mod raw;

pub use raw::{decode_frame, encode_frame, PixelBuffer};

use crate::error::Result;
use std::path::Path;

/// Still-image codec collaborator used by the frame-extraction path.
///
/// norseq does not decode or encode PNG/BMP/TIFF itself; callers that want
/// frames extracted to still images supply an implementation of this trait.
pub trait ImageCodec {
    /// Decode an image file into a pixel buffer
    fn decode(&self, path: &Path) -> Result<PixelBuffer>;

    /// Encode a pixel buffer to an image file in the named format
    fn encode(&self, buffer: &PixelBuffer, path: &Path, format: &str) -> Result<()>;
}
