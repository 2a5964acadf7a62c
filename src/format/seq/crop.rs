//! Region-of-interest re-cropping
//!
//! [`SeqCropper`] streams a spatially cropped copy of a sequence into a new
//! file: every frame is decoded, sliced to the ROI rectangle, re-encoded,
//! and appended with a fresh timestamp. The output header is the source
//! header byte-for-byte with only the geometry fields rewritten, so vendor
//! metadata survives the copy.

use super::reader::SeqReader;
use super::writer::SeqWriter;
use super::ProgressFn;
use crate::error::{Error, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Rectangular region of interest, specified by center point and size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    /// Center X coordinate in source pixels
    pub center_x: u32,
    /// Center Y coordinate in source pixels
    pub center_y: u32,
    /// Width of the region
    pub width: u32,
    /// Height of the region
    pub height: u32,
}

impl Roi {
    /// Create a region of interest
    pub fn new(center_x: u32, center_y: u32, width: u32, height: u32) -> Roi {
        Roi {
            center_x,
            center_y,
            width,
            height,
        }
    }

    /// Top-left corner derived from the center point.
    ///
    /// Fails with [`Error::RoiOutOfBounds`] when the rectangle does not fit
    /// inside a `source_width` x `source_height` image.
    pub fn top_left(&self, source_width: u32, source_height: u32) -> Result<(u32, u32)> {
        let x = self.center_x as i64 - (self.width / 2) as i64;
        let y = self.center_y as i64 - (self.height / 2) as i64;

        if self.width == 0
            || self.height == 0
            || x < 0
            || y < 0
            || x + self.width as i64 > source_width as i64
            || y + self.height as i64 > source_height as i64
        {
            return Err(Error::roi_out_of_bounds(format!(
                "{}x{} region centered at ({}, {}) spans ({}, {}) to ({}, {}), source is {}x{}",
                self.width,
                self.height,
                self.center_x,
                self.center_y,
                x,
                y,
                x + self.width as i64,
                y + self.height as i64,
                source_width,
                source_height
            )));
        }

        Ok((x as u32, y as u32))
    }
}

/// Cooperative cancellation flag, checked before each frame.
///
/// Clone the token and hand one half to the thread driving the crop;
/// cancellation mid-frame is not supported.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create an unset token
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Streams a spatially cropped copy of a sequence into a new file
pub struct SeqCropper {
    reader: SeqReader,
}

impl SeqCropper {
    /// Open the source sequence
    pub fn open<P: AsRef<Path>>(path: P) -> Result<SeqCropper> {
        Ok(SeqCropper {
            reader: SeqReader::open(path)?,
        })
    }

    /// Wrap an already-open reader
    pub fn from_reader(reader: SeqReader) -> SeqCropper {
        SeqCropper { reader }
    }

    /// Source sequence reader
    pub fn reader(&self) -> &SeqReader {
        &self.reader
    }

    /// Crop every source frame to `roi` and write a new sequence file.
    ///
    /// ROI validation runs before the output file is created; a rejected
    /// region leaves no file behind. Truncated source frames are skipped
    /// with a warning and the output header is patched with the count
    /// actually written. Output frames are stamped with the current
    /// wall-clock time rather than the source trailer.
    ///
    /// `progress` is invoked synchronously after each source frame. When
    /// `cancel` trips, the crop stops with [`Error::Cancelled`] and the
    /// output file is left unfinalized; callers must discard it.
    ///
    /// Returns the derived top-left corner, for callers that annotate the
    /// output name with it.
    pub fn crop_to_new_sequence<P: AsRef<Path>>(
        &mut self,
        output_path: P,
        roi: Roi,
        mut progress: Option<ProgressFn<'_>>,
        cancel: Option<&CancelToken>,
    ) -> Result<(u32, u32)> {
        let source = self.reader.header();
        let (left, top) = roi.top_left(source.width, source.height)?;

        // Derive the output header by patching geometry into a byte copy of
        // the source header; unmodeled fields survive untouched.
        let derived = source.with_geometry(roi.width, roi.height)?;
        derived.validate()?;
        let mut raw_header = self.reader.raw_header().to_vec();
        derived.patch_into(&mut raw_header);

        debug!(
            source_width = source.width,
            source_height = source.height,
            roi_width = roi.width,
            roi_height = roi.height,
            left,
            top,
            "starting sequence crop"
        );

        let mut writer = SeqWriter::create_with_raw_header(output_path, &raw_header)?;

        let total = self.reader.frame_count();
        for index in 0..total {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    writer.abandon();
                    return Err(Error::Cancelled);
                }
            }

            let frame = match self.reader.frame(index) {
                Ok(frame) => frame,
                Err(Error::DataIncomplete { need, have }) => {
                    warn!(index, need, have, "source frame incomplete, skipping");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let cropped = frame.crop(left, top, roi.width, roi.height)?;
            writer.write_frame(&cropped)?;

            if let Some(ref mut callback) = progress {
                callback(index as u64 + 1, total as u64);
            }
        }

        let written = writer.finalize()?;
        debug!(written, total, "sequence crop complete");
        Ok((left, top))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roi_top_left_centered() {
        let roi = Roi::new(320, 240, 100, 50);
        assert_eq!(roi.top_left(640, 480).unwrap(), (270, 215));
    }

    #[test]
    fn test_roi_top_left_full_frame() {
        let roi = Roi::new(320, 240, 640, 480);
        assert_eq!(roi.top_left(640, 480).unwrap(), (0, 0));
    }

    #[test]
    fn test_roi_rejects_negative_corner() {
        let roi = Roi::new(10, 240, 100, 50);
        assert!(matches!(
            roi.top_left(640, 480),
            Err(Error::RoiOutOfBounds(_))
        ));
    }

    #[test]
    fn test_roi_rejects_overflow_right() {
        let roi = Roi::new(630, 240, 100, 50);
        assert!(matches!(
            roi.top_left(640, 480),
            Err(Error::RoiOutOfBounds(_))
        ));
    }

    #[test]
    fn test_roi_rejects_empty() {
        let roi = Roi::new(320, 240, 0, 50);
        assert!(matches!(
            roi.top_left(640, 480),
            Err(Error::RoiOutOfBounds(_))
        ));
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let remote = token.clone();
        remote.cancel();
        assert!(token.is_cancelled());
    }
}
