//! PNG decoding: a manual chunk walk for structural validation, followed by
//! the `png` crate for pixel reconstruction.

use crate::raster::{CodecError, RasterImage};

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Walk every chunk in `data`, verifying length framing and CRC, without
/// interpreting pixel content. Returns `Ok(())` once `IEND` is reached.
fn validate_chunk_structure(data: &[u8]) -> Result<(), CodecError> {
    if data.len() < 8 || data[0..8] != PNG_SIGNATURE {
        return Err(CodecError::BadMagic);
    }

    let mut pos = 8usize;
    loop {
        let header = data.get(pos..pos + 8).ok_or(CodecError::TruncatedChunk)?;
        let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let chunk_type = [header[4], header[5], header[6], header[7]];

        let data_start = pos + 8;
        let data_end = data_start + length;
        let crc_end = data_end + 4;
        let chunk_data = data
            .get(data_start..data_end)
            .ok_or(CodecError::TruncatedChunk)?;
        let crc_bytes = data
            .get(data_end..crc_end)
            .ok_or(CodecError::TruncatedChunk)?;
        let declared_crc = u32::from_be_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&chunk_type);
        hasher.update(chunk_data);
        if hasher.finalize() != declared_crc {
            return Err(CodecError::CrcMismatch);
        }

        if &chunk_type == b"IEND" {
            return Ok(());
        }
        pos = crc_end;
    }
}

/// Decode a PNG into an 8-bit RGBA raster.
///
/// Only 8-bit RGB and RGBA color types are supported; anything else
/// (grayscale, palette, 16-bit depth, interlacing artifacts the decoder
/// can't normalize) is rejected as [`CodecError::UnsupportedColorType`].
///
/// # Errors
/// Returns the relevant [`CodecError`] variant if the input is not a
/// well-formed, supported PNG.
pub fn decode(png_bytes: &[u8]) -> Result<RasterImage, CodecError> {
    validate_chunk_structure(png_bytes)?;

    let decoder = png::Decoder::new(png_bytes);
    let mut reader = decoder.read_info().map_err(|_| CodecError::TruncatedChunk)?;
    let info = reader.info();

    if info.bit_depth != png::BitDepth::Eight {
        return Err(CodecError::UnsupportedColorType);
    }
    let color_type = info.color_type;
    if !matches!(color_type, png::ColorType::Rgb | png::ColorType::Rgba) {
        return Err(CodecError::UnsupportedColorType);
    }

    let width = info.width;
    let height = info.height;
    let total_pixels = u64::from(width) * u64::from(height);
    if total_pixels > crate::raster::MAX_DIMENSION_PIXELS {
        return Err(CodecError::DimensionsTooLarge);
    }

    let mut buf = vec![0u8; reader.output_buffer_size()];
    let frame_info = reader
        .next_frame(&mut buf)
        .map_err(|_| CodecError::TruncatedChunk)?;
    buf.truncate(frame_info.buffer_size());

    let pixels = match color_type {
        png::ColorType::Rgba => buf,
        png::ColorType::Rgb => rgb_to_rgba(&buf),
        _ => unreachable!("color type already validated above"),
    };

    RasterImage::new(width, height, pixels)
}

fn rgb_to_rgba(rgb: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
    for chunk in rgb.chunks_exact(3) {
        rgba.extend_from_slice(chunk);
        rgba.push(0xFF);
    }
    rgba
}
