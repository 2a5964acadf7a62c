//! Raw frame decoding and encoding
//!
//! Sequence frames store uncompressed pixels. Stored rows may be wider than
//! the logical image when the recording software pads rows for alignment;
//! `decode_frame` infers the stored stride from the payload length and
//! slices each row back to its logical width. The stride is inferred per
//! frame; the format does not guarantee it stays uniform across a sequence.

use crate::error::{Error, Result};
use crate::util::PixelFormat;

/// A tightly packed, exclusively owned pixel buffer.
///
/// Samples are row-major with no stride padding. 24-bit buffers hold
/// channels in B,G,R order, matching the on-disk payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a buffer from packed row-major data
    pub fn from_packed(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(Error::DataIncomplete {
                need: expected,
                have: data.len(),
            });
        }
        Ok(PixelBuffer {
            width,
            height,
            format,
            data,
        })
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel format
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Packed sample data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer, returning the packed sample data
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Total number of samples (width * height * channels)
    pub fn sample_count(&self) -> usize {
        self.width as usize * self.height as usize * self.format.channel_count()
    }

    /// Copy out the rectangle with top-left corner (x, y) and the given size
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Result<PixelBuffer> {
        if x as u64 + width as u64 > self.width as u64
            || y as u64 + height as u64 > self.height as u64
        {
            return Err(Error::roi_out_of_bounds(format!(
                "rectangle ({}, {}) {}x{} exceeds buffer {}x{}",
                x, y, width, height, self.width, self.height
            )));
        }

        let bpp = self.format.bytes_per_pixel();
        let src_row_bytes = self.width as usize * bpp;
        let out_row_bytes = width as usize * bpp;

        let mut data = Vec::with_capacity(out_row_bytes * height as usize);
        for row in y..y + height {
            let start = row as usize * src_row_bytes + x as usize * bpp;
            data.extend_from_slice(&self.data[start..start + out_row_bytes]);
        }

        PixelBuffer::from_packed(width, height, self.format, data)
    }
}

/// Decode a raw frame payload into a pixel buffer.
///
/// Fails with [`Error::DataIncomplete`] when the payload holds fewer bytes
/// than the logical image needs. Payloads larger than the logical image are
/// treated as row-stride padded and each row is sliced to its logical width.
pub fn decode_frame(raw: &[u8], width: u32, height: u32, format: PixelFormat) -> Result<PixelBuffer> {
    if width == 0 || height == 0 {
        return Err(Error::header_invalid(format!(
            "cannot decode a {}x{} frame",
            width, height
        )));
    }

    let bpp = format.bytes_per_pixel();
    let row_bytes = width as usize * bpp;
    let packed_len = row_bytes * height as usize;

    if raw.len() < packed_len {
        return Err(Error::DataIncomplete {
            need: packed_len,
            have: raw.len(),
        });
    }

    // Stored stride inferred from the payload length. 16-bit rows are
    // measured in whole samples so a stray odd byte cannot shear the rows.
    let stride = match format {
        PixelFormat::Gray16 => (raw.len() / 2 / height as usize) * 2,
        _ => raw.len() / height as usize,
    };

    if stride == row_bytes && raw.len() == packed_len {
        return PixelBuffer::from_packed(width, height, format, raw.to_vec());
    }

    let mut data = Vec::with_capacity(packed_len);
    for row in 0..height as usize {
        let start = row * stride;
        data.extend_from_slice(&raw[start..start + row_bytes]);
    }

    PixelBuffer::from_packed(width, height, format, data)
}

/// Encode a pixel buffer to the packed on-disk payload.
///
/// The output carries no stride padding. 24-bit buffers must already hold
/// channels in B,G,R order (image format code 200); callers holding R,G,B
/// data convert before encoding.
pub fn encode_frame(buffer: &PixelBuffer) -> Vec<u8> {
    buffer.data().to_vec()
}
