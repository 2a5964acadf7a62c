//! SEQ file header structures and parsing

use super::addressing;
use super::{FORMAT_CODE_BGR, FORMAT_CODE_GRAY, HEADER_SIZE, SEQ_MAGIC};
use crate::error::{Error, Result};
use crate::util::PixelFormat;
use std::time::{SystemTime, UNIX_EPOCH};

/// Byte offsets of the modeled header fields
pub(crate) mod offset {
    pub const MAGIC: usize = 0;
    pub const NAME: usize = 4;
    pub const VERSION: usize = 28;
    pub const HEADER_SIZE: usize = 32;
    pub const DESCRIPTION: usize = 36;
    pub const WIDTH: usize = 548;
    pub const HEIGHT: usize = 552;
    pub const BIT_DEPTH: usize = 556;
    pub const BIT_DEPTH_REAL: usize = 560;
    pub const IMAGE_SIZE_BYTES: usize = 564;
    pub const IMAGE_FORMAT: usize = 568;
    pub const ALLOCATED_FRAMES: usize = 572;
    pub const ORIGIN: usize = 576;
    pub const TRUE_IMAGE_SIZE: usize = 580;
    pub const FRAME_RATE: usize = 584;
    pub const DESCRIPTION_FORMAT: usize = 592;
    pub const REFERENCE_FRAME: usize = 596;
    pub const FIXED_SIZE: usize = 600;
    pub const FLAGS: usize = 604;
    pub const BAYER_PATTERN: usize = 608;
    pub const COMPRESSION_FORMAT: usize = 624;
    pub const REFERENCE_TIME: usize = 628;
    pub const UUID: usize = 636;
}

const NAME_LEN: usize = 24;
const DESCRIPTION_LEN: usize = 512;
const UUID_LEN: usize = 16;

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn read_f64(data: &[u8], offset: usize) -> f64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    f64::from_le_bytes(bytes)
}

fn write_u16(data: &mut [u8], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn write_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn write_f64(data: &mut [u8], offset: usize, value: f64) {
    data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

/// Per-frame trailing timestamp: whole seconds plus split sub-second parts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeqTimestamp {
    /// Seconds since the Unix epoch
    pub seconds: u32,
    /// Milliseconds past the second
    pub milliseconds: u16,
    /// Microseconds past the millisecond
    pub microseconds: u16,
}

impl SeqTimestamp {
    /// Encoded size in bytes
    pub const SIZE: usize = 8;

    /// Current wall-clock time
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        SeqTimestamp {
            seconds: elapsed.as_secs() as u32,
            milliseconds: elapsed.subsec_millis() as u16,
            microseconds: (elapsed.subsec_micros() % 1000) as u16,
        }
    }

    /// Parse a timestamp from its 8-byte encoding
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::DataIncomplete {
                need: Self::SIZE,
                have: data.len(),
            });
        }
        Ok(SeqTimestamp {
            seconds: read_u32(data, 0),
            milliseconds: read_u16(data, 4),
            microseconds: read_u16(data, 6),
        })
    }

    /// Encode the timestamp to its 8-byte form
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        write_u32(&mut bytes, 0, self.seconds);
        write_u16(&mut bytes, 4, self.milliseconds);
        write_u16(&mut bytes, 6, self.microseconds);
        bytes
    }
}

/// Parsed 8192-byte sequence file header.
///
/// Only the fields below are modeled; a header image may carry additional
/// vendor bytes, which survive through the copy-then-patch path used when
/// deriving a header for a cropped copy.
#[derive(Debug, Clone, PartialEq)]
pub struct SeqHeader {
    /// Sequence name, NUL-padded ASCII
    pub name: [u8; NAME_LEN],
    /// Format version
    pub version: u32,
    /// Stated header size, normally 8192
    pub header_size: u32,
    /// Free-form description, NUL-padded
    pub description: [u8; DESCRIPTION_LEN],
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Nominal bit depth
    pub bit_depth: u32,
    /// Real stored bit depth, one of 8, 16, 24
    pub bit_depth_real: u32,
    /// Uncompressed bytes of one frame's pixel payload
    pub image_size_bytes: u32,
    /// Payload layout code: 100 grayscale, 200 packed BGR
    pub image_format: u32,
    /// Stated frame count; may be stale or zero
    pub allocated_frames: u32,
    /// Image origin corner
    pub origin: u16,
    /// Stated total bytes per frame block
    pub true_image_size: u32,
    /// Suggested playback rate in frames per second
    pub suggested_frame_rate: f64,
    /// Description encoding code
    pub description_format: u32,
    /// Reference frame number
    pub reference_frame: u32,
    /// Fixed frame size field
    pub fixed_size: u32,
    /// Feature flags
    pub flags: u32,
    /// Bayer color filter array code; carried, never interpreted
    pub bayer_pattern: u32,
    /// Compression code, 0 for uncompressed
    pub compression_format: u32,
    /// Recording reference time
    pub reference_time: SeqTimestamp,
    /// Sequence UUID
    pub uuid: [u8; UUID_LEN],
}

impl SeqHeader {
    /// Build a fresh version-5 header for a writer-created sequence
    pub fn new(name: &str, width: u32, height: u32, format: PixelFormat, frame_rate: f64) -> Self {
        let mut name_field = [0u8; NAME_LEN];
        let name_bytes = name.as_bytes();
        let len = name_bytes.len().min(NAME_LEN - 1);
        name_field[..len].copy_from_slice(&name_bytes[..len]);

        let mut description = [0u8; DESCRIPTION_LEN];
        let text = b"Created by norseq";
        description[..text.len()].copy_from_slice(text);

        let image_size_bytes = width * height * format.bytes_per_pixel() as u32;
        let image_format = match format {
            PixelFormat::Bgr24 => FORMAT_CODE_BGR,
            _ => FORMAT_CODE_GRAY,
        };

        SeqHeader {
            name: name_field,
            version: 5,
            header_size: HEADER_SIZE,
            description,
            width,
            height,
            bit_depth: format.bit_depth(),
            bit_depth_real: format.bit_depth(),
            image_size_bytes,
            image_format,
            allocated_frames: 0,
            origin: 0,
            true_image_size: addressing::true_image_size(image_size_bytes),
            suggested_frame_rate: frame_rate,
            description_format: 0,
            reference_frame: 0,
            fixed_size: image_size_bytes,
            flags: 0,
            bayer_pattern: 0,
            compression_format: 0,
            reference_time: SeqTimestamp::default(),
            uuid: [0u8; UUID_LEN],
        }
    }

    /// Parse a header from the first 8192 bytes of a sequence file.
    ///
    /// Checks the magic number only; geometry validation is a separate
    /// [`validate`](Self::validate) step.
    pub fn decode(data: &[u8]) -> Result<SeqHeader> {
        if data.len() < HEADER_SIZE as usize {
            return Err(Error::format(format!(
                "header too small: need {} bytes, have {}",
                HEADER_SIZE,
                data.len()
            )));
        }

        let magic = read_u32(data, offset::MAGIC);
        if magic != SEQ_MAGIC {
            return Err(Error::format(format!(
                "bad magic number: expected {:#06X}, got {:#X}",
                SEQ_MAGIC, magic
            )));
        }

        let mut name = [0u8; NAME_LEN];
        name.copy_from_slice(&data[offset::NAME..offset::NAME + NAME_LEN]);
        let mut description = [0u8; DESCRIPTION_LEN];
        description
            .copy_from_slice(&data[offset::DESCRIPTION..offset::DESCRIPTION + DESCRIPTION_LEN]);
        let mut uuid = [0u8; UUID_LEN];
        uuid.copy_from_slice(&data[offset::UUID..offset::UUID + UUID_LEN]);

        Ok(SeqHeader {
            name,
            version: read_u32(data, offset::VERSION),
            header_size: read_u32(data, offset::HEADER_SIZE),
            description,
            width: read_u32(data, offset::WIDTH),
            height: read_u32(data, offset::HEIGHT),
            bit_depth: read_u32(data, offset::BIT_DEPTH),
            bit_depth_real: read_u32(data, offset::BIT_DEPTH_REAL),
            image_size_bytes: read_u32(data, offset::IMAGE_SIZE_BYTES),
            image_format: read_u32(data, offset::IMAGE_FORMAT),
            allocated_frames: read_u32(data, offset::ALLOCATED_FRAMES),
            origin: read_u16(data, offset::ORIGIN),
            true_image_size: read_u32(data, offset::TRUE_IMAGE_SIZE),
            suggested_frame_rate: read_f64(data, offset::FRAME_RATE),
            description_format: read_u32(data, offset::DESCRIPTION_FORMAT),
            reference_frame: read_u32(data, offset::REFERENCE_FRAME),
            fixed_size: read_u32(data, offset::FIXED_SIZE),
            flags: read_u32(data, offset::FLAGS),
            bayer_pattern: read_u32(data, offset::BAYER_PATTERN),
            compression_format: read_u32(data, offset::COMPRESSION_FORMAT),
            reference_time: SeqTimestamp::from_bytes(
                &data[offset::REFERENCE_TIME..offset::REFERENCE_TIME + SeqTimestamp::SIZE],
            )?,
            uuid,
        })
    }

    /// Serialize the header to a fresh 8192-byte image.
    ///
    /// Unmodeled bytes come out zero; use [`patch_into`](Self::patch_into)
    /// on an existing image when vendor bytes must survive.
    pub fn encode(&self) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE as usize];

        write_u32(&mut data, offset::MAGIC, SEQ_MAGIC);
        data[offset::NAME..offset::NAME + NAME_LEN].copy_from_slice(&self.name);
        write_u32(&mut data, offset::VERSION, self.version);
        write_u32(&mut data, offset::HEADER_SIZE, self.header_size);
        data[offset::DESCRIPTION..offset::DESCRIPTION + DESCRIPTION_LEN]
            .copy_from_slice(&self.description);
        write_u32(&mut data, offset::BIT_DEPTH, self.bit_depth);
        write_u32(&mut data, offset::BIT_DEPTH_REAL, self.bit_depth_real);
        write_u32(&mut data, offset::IMAGE_FORMAT, self.image_format);
        write_u32(&mut data, offset::ALLOCATED_FRAMES, self.allocated_frames);
        write_u16(&mut data, offset::ORIGIN, self.origin);
        write_f64(&mut data, offset::FRAME_RATE, self.suggested_frame_rate);
        write_u32(&mut data, offset::DESCRIPTION_FORMAT, self.description_format);
        write_u32(&mut data, offset::REFERENCE_FRAME, self.reference_frame);
        write_u32(&mut data, offset::FIXED_SIZE, self.fixed_size);
        write_u32(&mut data, offset::FLAGS, self.flags);
        write_u32(&mut data, offset::BAYER_PATTERN, self.bayer_pattern);
        write_u32(&mut data, offset::COMPRESSION_FORMAT, self.compression_format);
        data[offset::REFERENCE_TIME..offset::REFERENCE_TIME + SeqTimestamp::SIZE]
            .copy_from_slice(&self.reference_time.to_bytes());
        data[offset::UUID..offset::UUID + UUID_LEN].copy_from_slice(&self.uuid);

        self.patch_into(&mut data);
        data
    }

    /// Rewrite the geometry fields inside an existing header image, leaving
    /// every other byte untouched.
    ///
    /// This is the copy-then-patch primitive: a derived header for a cropped
    /// copy starts from the source header's bytes so unknown fields survive.
    pub fn patch_into(&self, data: &mut [u8]) {
        write_u32(data, offset::WIDTH, self.width);
        write_u32(data, offset::HEIGHT, self.height);
        write_u32(data, offset::IMAGE_SIZE_BYTES, self.image_size_bytes);
        write_u32(data, offset::TRUE_IMAGE_SIZE, self.true_image_size);
    }

    /// Check that the header describes a sequence this crate can decode
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.bit_depth_real == 0 {
            return Err(Error::header_invalid(format!(
                "zero dimension or bit depth: {}x{} at {} bits",
                self.width, self.height, self.bit_depth_real
            )));
        }
        PixelFormat::from_bit_depth(self.bit_depth_real)?;
        if self.compression_format != 0 {
            return Err(Error::UnsupportedCompression(self.compression_format));
        }
        Ok(())
    }

    /// Pixel format implied by the real bit depth
    pub fn pixel_format(&self) -> Result<PixelFormat> {
        PixelFormat::from_bit_depth(self.bit_depth_real)
    }

    /// Derive the header for a spatially re-cropped copy: same sequence
    /// metadata, new geometry and recomputed sizes.
    pub fn with_geometry(&self, width: u32, height: u32) -> Result<SeqHeader> {
        let bpp = self.pixel_format()?.bytes_per_pixel() as u32;
        let image_size_bytes = width * height * bpp;

        let mut derived = self.clone();
        derived.width = width;
        derived.height = height;
        derived.image_size_bytes = image_size_bytes;
        derived.true_image_size = addressing::true_image_size(image_size_bytes);
        Ok(derived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let mut header = SeqHeader::new("camera1.seq", 640, 480, PixelFormat::Gray8, 125.0);
        header.bayer_pattern = 3;
        header.flags = 0x10;
        header.uuid = [7u8; 16];
        header.reference_time = SeqTimestamp {
            seconds: 1_700_000_000,
            milliseconds: 250,
            microseconds: 42,
        };

        let bytes = header.encode();
        assert_eq!(bytes.len(), HEADER_SIZE as usize);

        let decoded = SeqHeader::decode(&bytes).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let mut bytes = SeqHeader::new("x", 4, 4, PixelFormat::Gray8, 30.0).encode();
        bytes[0] = 0xAB;
        assert!(matches!(SeqHeader::decode(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_decode_rejects_short_input() {
        assert!(matches!(
            SeqHeader::decode(&[0u8; 1024]),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_new_header_fields() {
        let header = SeqHeader::new("out.seq", 640, 480, PixelFormat::Bgr24, 30.0);
        assert_eq!(header.version, 5);
        assert_eq!(header.header_size, HEADER_SIZE);
        assert_eq!(header.image_size_bytes, 640 * 480 * 3);
        assert_eq!(header.image_format, FORMAT_CODE_BGR);
        assert_eq!(header.allocated_frames, 0);
        assert_eq!(
            header.true_image_size,
            addressing::true_image_size(header.image_size_bytes)
        );
        assert_eq!(&header.name[..7], b"out.seq");
        assert!(header.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_geometry() {
        let mut header = SeqHeader::new("x", 4, 4, PixelFormat::Gray8, 30.0);
        header.height = 0;
        assert!(matches!(header.validate(), Err(Error::HeaderInvalid(_))));
    }

    #[test]
    fn test_validate_rejects_odd_bit_depth() {
        let mut header = SeqHeader::new("x", 4, 4, PixelFormat::Gray8, 30.0);
        header.bit_depth_real = 12;
        assert!(matches!(
            header.validate(),
            Err(Error::UnsupportedBitDepth(12))
        ));
    }

    #[test]
    fn test_validate_rejects_compression() {
        let mut header = SeqHeader::new("x", 4, 4, PixelFormat::Gray8, 30.0);
        header.compression_format = 1;
        assert!(matches!(
            header.validate(),
            Err(Error::UnsupportedCompression(1))
        ));
    }

    #[test]
    fn test_patch_into_preserves_unmodeled_bytes() {
        let source = SeqHeader::new("src.seq", 640, 480, PixelFormat::Gray8, 30.0);
        let mut bytes = source.encode();
        // vendor bytes outside the modeled fields
        bytes[700] = 0xAA;
        bytes[8191] = 0xBB;

        let derived = source.with_geometry(100, 80).unwrap();
        derived.patch_into(&mut bytes);

        let reread = SeqHeader::decode(&bytes).unwrap();
        assert_eq!(reread.width, 100);
        assert_eq!(reread.height, 80);
        assert_eq!(reread.image_size_bytes, 8000);
        assert_eq!(reread.true_image_size, addressing::true_image_size(8000));
        assert_eq!(bytes[700], 0xAA);
        assert_eq!(bytes[8191], 0xBB);
        // non-geometry fields untouched
        assert_eq!(reread.name, source.name);
        assert_eq!(reread.suggested_frame_rate, source.suggested_frame_rate);
    }

    #[test]
    fn test_timestamp_round_trip() {
        let stamp = SeqTimestamp {
            seconds: 1_650_000_000,
            milliseconds: 999,
            microseconds: 500,
        };
        assert_eq!(SeqTimestamp::from_bytes(&stamp.to_bytes()).unwrap(), stamp);
    }

    #[test]
    fn test_timestamp_short_input() {
        assert!(matches!(
            SeqTimestamp::from_bytes(&[0u8; 7]),
            Err(Error::DataIncomplete { need: 8, have: 7 })
        ));
    }
}
