//! Common test utilities for norseq integration tests
//!
//! Helpers for synthesizing sequence files and deterministic test frames.

use norseq::codec::PixelBuffer;
use norseq::format::seq::SeqWriter;
use norseq::util::PixelFormat;
use std::path::Path;

/// Create a deterministic test frame whose samples vary with position and
/// the given seed.
pub fn gradient_frame(width: u32, height: u32, format: PixelFormat, seed: u8) -> PixelBuffer {
    let mut data = Vec::with_capacity(width as usize * height as usize * format.bytes_per_pixel());

    for row in 0..height {
        for col in 0..width {
            match format {
                PixelFormat::Gray8 => {
                    data.push(((seed as u32 + row * 7 + col) % 256) as u8);
                }
                PixelFormat::Gray16 => {
                    let value = ((seed as u32 * 257 + row * 311 + col * 3) % 65_536) as u16;
                    data.extend_from_slice(&value.to_le_bytes());
                }
                PixelFormat::Bgr24 => {
                    let b = ((seed as u32 + row) % 256) as u8;
                    let g = ((seed as u32 + col) % 256) as u8;
                    let r = ((seed as u32 + row + col) % 256) as u8;
                    data.extend_from_slice(&[b, g, r]);
                }
            }
        }
    }

    PixelBuffer::from_packed(width, height, format, data).expect("packed gradient frame")
}

/// Write a sequence file with `frames` gradient frames and return the
/// buffers that were written, in order.
pub fn write_sequence(
    path: &Path,
    width: u32,
    height: u32,
    format: PixelFormat,
    frames: u32,
) -> Vec<PixelBuffer> {
    let mut writer =
        SeqWriter::create(path, width, height, format, 30.0).expect("create sequence");
    let mut written = Vec::new();

    for i in 0..frames {
        let frame = gradient_frame(width, height, format, i as u8);
        writer.write_frame(&frame).expect("write frame");
        written.push(frame);
    }

    writer.finalize().expect("finalize sequence");
    written
}
