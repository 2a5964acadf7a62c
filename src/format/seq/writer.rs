//! Sequence file writing
//!
//! [`SeqWriter`] stream-builds a sequence file: the header goes to disk
//! immediately with a frame count of zero, frames append one block at a
//! time, and [`finalize`](SeqWriter::finalize) seeks back to patch the true
//! count. A writer dropped without finalizing patches the count best-effort
//! so no exit path leaves it unwritten.

use super::header::{offset, SeqHeader, SeqTimestamp};
use super::{addressing, ProgressFn, HEADER_SIZE};
use crate::codec::{self, ImageCodec, PixelBuffer};
use crate::error::{Error, Result};
use crate::util::PixelFormat;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Stream-building sequence file writer
pub struct SeqWriter {
    writer: BufWriter<File>,
    header: SeqHeader,
    pixel_format: PixelFormat,
    true_image_size: u32,
    frames_written: u32,
    finalized: bool,
}

impl SeqWriter {
    /// Create a sequence file with a fresh header.
    ///
    /// The placeholder header is flushed before any frame data, so an
    /// interrupted run still leaves a structurally valid file.
    pub fn create<P: AsRef<Path>>(
        path: P,
        width: u32,
        height: u32,
        format: PixelFormat,
        frame_rate: f64,
    ) -> Result<SeqWriter> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("sequence.seq");
        let header = SeqHeader::new(name, width, height, format, frame_rate);
        Self::from_parts(path, header.encode(), header)
    }

    /// Create a sequence file from an existing header image.
    ///
    /// This is the copy-then-patch path: the bytes are written verbatim so
    /// vendor fields this crate does not model survive into the new file.
    /// The stated frame count is reset to zero until finalize.
    pub fn create_with_raw_header<P: AsRef<Path>>(path: P, raw_header: &[u8]) -> Result<SeqWriter> {
        if raw_header.len() != HEADER_SIZE as usize {
            return Err(Error::format(format!(
                "header image must be exactly {} bytes, got {}",
                HEADER_SIZE,
                raw_header.len()
            )));
        }
        let header = SeqHeader::decode(raw_header)?;
        let mut bytes = raw_header.to_vec();
        // placeholder until finalize
        bytes[offset::ALLOCATED_FRAMES..offset::ALLOCATED_FRAMES + 4]
            .copy_from_slice(&0u32.to_le_bytes());
        Self::from_parts(path.as_ref(), bytes, header)
    }

    fn from_parts(path: &Path, raw_header: Vec<u8>, header: SeqHeader) -> Result<SeqWriter> {
        header.validate()?;
        let pixel_format = header.pixel_format()?;
        let true_image_size = addressing::true_image_size(header.image_size_bytes);

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&raw_header)?;
        writer.flush()?;

        debug!(
            width = header.width,
            height = header.height,
            bit_depth = header.bit_depth_real,
            true_image_size,
            "created sequence file"
        );

        Ok(SeqWriter {
            writer,
            header,
            pixel_format,
            true_image_size,
            frames_written: 0,
            finalized: false,
        })
    }

    /// Width of the sequence being written
    pub fn width(&self) -> u32 {
        self.header.width
    }

    /// Height of the sequence being written
    pub fn height(&self) -> u32 {
        self.header.height
    }

    /// Frames appended so far
    pub fn frames_written(&self) -> u32 {
        self.frames_written
    }

    /// Append one frame: payload, fresh timestamp, zero padding.
    ///
    /// The buffer must match the sequence geometry exactly; there is no
    /// implicit resizing or format conversion.
    pub fn write_frame(&mut self, buffer: &PixelBuffer) -> Result<()> {
        if self.finalized {
            return Err(Error::invalid_state("writer already finalized"));
        }
        if buffer.width() != self.header.width || buffer.height() != self.header.height {
            return Err(Error::DimensionMismatch {
                expected_width: self.header.width,
                expected_height: self.header.height,
                width: buffer.width(),
                height: buffer.height(),
            });
        }
        if buffer.format() != self.pixel_format {
            return Err(Error::format(format!(
                "pixel format mismatch: sequence is {}, buffer is {}",
                self.pixel_format,
                buffer.format()
            )));
        }

        let payload = codec::raw::encode_frame(buffer);
        self.writer.write_all(&payload)?;

        let stamp = SeqTimestamp::now();
        self.writer.write_all(&stamp.to_bytes())?;

        let used = payload.len() + SeqTimestamp::SIZE;
        let padding = self.true_image_size as usize - used;
        if padding > 0 {
            self.writer.write_all(&vec![0u8; padding])?;
        }

        self.frames_written += 1;
        Ok(())
    }

    /// Append frames decoded from an ordered list of still-image files.
    ///
    /// Decoding goes through the caller's [`ImageCodec`]; every image must
    /// already match the sequence geometry (no implicit resizing). A decode
    /// or geometry failure is fatal. Returns the number of frames appended.
    pub fn append_images<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
        image_codec: &dyn ImageCodec,
        mut progress: Option<ProgressFn<'_>>,
    ) -> Result<u32> {
        let total = paths.len() as u64;
        let mut appended = 0u32;

        for (i, path) in paths.iter().enumerate() {
            let buffer = image_codec.decode(path.as_ref())?;
            self.write_frame(&buffer)?;
            appended += 1;

            if let Some(ref mut callback) = progress {
                callback(i as u64 + 1, total);
            }
        }

        Ok(appended)
    }

    /// Patch the true frame count into the header and close the file.
    ///
    /// Returns the number of frames written.
    pub fn finalize(mut self) -> Result<u32> {
        self.finalize_inner()?;
        Ok(self.frames_written)
    }

    /// Close the file without patching the frame count.
    ///
    /// The header keeps its zero placeholder, marking the output as never
    /// finalized. Used when an operation is cancelled and the caller will
    /// discard the file.
    pub fn abandon(mut self) {
        self.finalized = true;
        if let Err(e) = self.writer.flush() {
            warn!("failed to flush abandoned sequence file: {}", e);
        }
    }

    fn finalize_inner(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }

        self.writer
            .seek(SeekFrom::Start(offset::ALLOCATED_FRAMES as u64))?;
        self.writer.write_all(&self.frames_written.to_le_bytes())?;
        self.writer.flush()?;

        self.finalized = true;
        debug!(frames = self.frames_written, "finalized sequence file");
        Ok(())
    }
}

impl Drop for SeqWriter {
    fn drop(&mut self) {
        // errors on the normal path surface through finalize()
        if !self.finalized && self.finalize_inner().is_err() {
            warn!("sequence writer dropped without a clean finalize");
        }
    }
}
