//! The decoded pixel raster shared by the codec, steganography, and hash
//! modules.

/// An 8-bit RGBA raster, row-major, no padding between rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    /// `height * width * 4` bytes, R G B A per pixel.
    pub pixels: Vec<u8>,
}

/// Largest raster this codec will allocate for, guarding against decompression
/// bombs in the `IHDR` dimensions.
pub const MAX_DIMENSION_PIXELS: u64 = 64_000_000;

impl RasterImage {
    /// # Errors
    /// Returns [`CodecError::DimensionsTooLarge`] if `width * height` exceeds
    /// [`MAX_DIMENSION_PIXELS`], or if `width` or `height` is zero.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, CodecError> {
        if width == 0 || height == 0 {
            return Err(CodecError::DimensionsTooLarge);
        }
        let total_pixels = u64::from(width) * u64::from(height);
        if total_pixels > MAX_DIMENSION_PIXELS {
            return Err(CodecError::DimensionsTooLarge);
        }
        let expected_len = total_pixels as usize * 4;
        if pixels.len() != expected_len {
            return Err(CodecError::TruncatedChunk);
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Byte offset of a pixel's first (red) channel.
    #[must_use]
    pub fn pixel_offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Mutable view over one row's RGBA bytes.
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = self.pixel_offset(0, y);
        let end = start + self.width as usize * 4;
        &mut self.pixels[start..end]
    }

    /// Immutable view over one row's RGBA bytes.
    #[must_use]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = self.pixel_offset(0, y);
        let end = start + self.width as usize * 4;
        &self.pixels[start..end]
    }

    /// Number of rows available to the steganographic body region (every
    /// row except the last, which is reserved for the signature frame).
    #[must_use]
    pub fn body_row_count(&self) -> u32 {
        self.height.saturating_sub(1)
    }
}

/// Errors from decoding or canonically re-encoding a PNG.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("not a PNG file (bad signature)")]
    BadMagic,
    #[error("unsupported PNG color type or bit depth (only 8-bit RGB/RGBA is supported)")]
    UnsupportedColorType,
    #[error("PNG chunk data ends before its declared length")]
    TruncatedChunk,
    #[error("PNG chunk CRC does not match its declared value")]
    CrcMismatch,
    #[error("image dimensions exceed the maximum allowed pixel count")]
    DimensionsTooLarge,
}
