//! Sequence file reading
//!
//! [`SeqReader`] gives random access to the frames of an open sequence
//! file. The header is parsed once at open and is immutable afterwards;
//! frame addressing derives from it alone.

use super::addressing;
use super::header::{SeqHeader, SeqTimestamp};
use super::HEADER_SIZE;
use crate::codec::{self, ImageCodec, PixelBuffer};
use crate::error::{Error, Result};
use crate::util::PixelFormat;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::Path;
use tracing::{debug, warn};

/// Random-access reader over an open sequence file
#[derive(Debug)]
pub struct SeqReader {
    file: File,
    raw_header: Vec<u8>,
    header: SeqHeader,
    pixel_format: PixelFormat,
    true_image_size: u32,
    frame_count: u32,
}

impl SeqReader {
    /// Open a sequence file, parse and validate its header, and derive the
    /// frame geometry.
    ///
    /// The computed block size is authoritative: the header's stated
    /// `true_image_size` is ignored because legacy writers recorded it
    /// without the frame trailer.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<SeqReader> {
        let mut file = File::open(path.as_ref())?;

        let mut raw_header = vec![0u8; HEADER_SIZE as usize];
        let have = read_full(&mut file, &mut raw_header)?;
        if have < raw_header.len() {
            return Err(Error::format(format!(
                "file too small for a sequence header: {} bytes",
                have
            )));
        }

        let header = SeqHeader::decode(&raw_header)?;
        header.validate()?;
        let pixel_format = header.pixel_format()?;

        let true_image_size = addressing::true_image_size(header.image_size_bytes);
        let file_size = file.metadata()?.len();
        let frame_count = addressing::effective_frame_count(
            file_size,
            header.header_size,
            true_image_size,
            header.allocated_frames,
        );

        debug!(
            width = header.width,
            height = header.height,
            bit_depth = header.bit_depth_real,
            frame_count,
            true_image_size,
            "parsed sequence header"
        );

        Ok(SeqReader {
            file,
            raw_header,
            header,
            pixel_format,
            true_image_size,
            frame_count,
        })
    }

    /// Parsed header
    pub fn header(&self) -> &SeqHeader {
        &self.header
    }

    /// The verbatim 8192-byte header image, for copy-then-patch derivation
    pub fn raw_header(&self) -> &[u8] {
        &self.raw_header
    }

    /// Pixel format of the stored frames
    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    /// Computed bytes per frame block
    pub fn true_image_size(&self) -> u32 {
        self.true_image_size
    }

    /// Number of addressable frames
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Read and decode the pixel payload of frame `index`
    pub fn frame(&mut self, index: u32) -> Result<PixelBuffer> {
        let raw = self.raw_frame(index)?;
        codec::raw::decode_frame(&raw, self.header.width, self.header.height, self.pixel_format)
    }

    /// Read the undecoded pixel payload of frame `index`.
    ///
    /// Exactly `image_size_bytes` bytes; the trailing timestamp and padding
    /// are not included. Fails with [`Error::DataIncomplete`] when the file
    /// is truncated inside the payload.
    pub fn raw_frame(&mut self, index: u32) -> Result<Vec<u8>> {
        self.check_index(index)?;

        let offset =
            addressing::frame_offset(self.header.header_size, index, self.true_image_size);
        self.file.seek(SeekFrom::Start(offset))?;

        let mut payload = vec![0u8; self.header.image_size_bytes as usize];
        let have = read_full(&mut self.file, &mut payload)?;
        if have < payload.len() {
            return Err(Error::DataIncomplete {
                need: payload.len(),
                have,
            });
        }
        Ok(payload)
    }

    /// Read the trailing timestamp recorded after frame `index`'s payload
    pub fn frame_timestamp(&mut self, index: u32) -> Result<SeqTimestamp> {
        self.check_index(index)?;

        let offset =
            addressing::frame_offset(self.header.header_size, index, self.true_image_size)
                + self.header.image_size_bytes as u64;
        self.file.seek(SeekFrom::Start(offset))?;

        let mut trailer = [0u8; SeqTimestamp::SIZE];
        let have = read_full(&mut self.file, &mut trailer)?;
        if have < trailer.len() {
            return Err(Error::DataIncomplete {
                need: trailer.len(),
                have,
            });
        }
        SeqTimestamp::from_bytes(&trailer)
    }

    /// Extract a range of frames to still images via the caller's codec.
    ///
    /// Output files are named `<prefix>_<index:06>.<ext>` inside
    /// `output_dir`. A frame whose payload is truncated on disk is skipped
    /// with a warning and the remaining frames still extract; the return
    /// value is the number actually written.
    pub fn extract_frames(
        &mut self,
        range: Range<u32>,
        output_dir: &Path,
        prefix: &str,
        image_format: &str,
        image_codec: &dyn ImageCodec,
    ) -> Result<u32> {
        let end = range.end.min(self.frame_count);
        let ext = image_format.to_ascii_lowercase();
        let mut written = 0u32;

        for index in range.start..end {
            let buffer = match self.frame(index) {
                Ok(buffer) => buffer,
                Err(Error::DataIncomplete { need, have }) => {
                    warn!(index, need, have, "frame payload incomplete, skipping");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let file_name = format!("{}_{:06}.{}", prefix, index, ext);
            image_codec.encode(&buffer, &output_dir.join(file_name), image_format)?;
            written += 1;
        }

        debug!(written, start = range.start, end, "frame extraction complete");
        Ok(written)
    }

    fn check_index(&self, index: u32) -> Result<()> {
        if index >= self.frame_count {
            return Err(Error::IndexOutOfRange {
                index,
                count: self.frame_count,
            });
        }
        Ok(())
    }
}

/// Read until the buffer is full or the file ends, returning the byte count.
///
/// `read_exact` reports a short read as an opaque error; frame recovery
/// needs the actual count.
fn read_full(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = file.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}
