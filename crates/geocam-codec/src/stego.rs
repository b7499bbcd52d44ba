//! Alpha-channel steganography.
//!
//! The raster is split into two disjoint regions: the *body* (every row
//! except the last) carries the basic-info UTF-8 string terminated by a
//! fixed delimiter, and the *last row* carries a magic/length-framed JSON
//! blob (the signature frame). Each payload byte occupies exactly one
//! pixel's alpha channel byte — no bit-splitting across pixels. Unused alpha
//! bytes in either region are left at `0xFF`.

use crate::raster::RasterImage;

const LAST_ROW_MAGIC: &[u8; 4] = b"GCM1";
const LAST_ROW_HEADER_LEN: u64 = 8; // 4-byte magic + 4-byte big-endian length
const BODY_DELIMITER: &[u8] = b"###END###";
const PAD: u8 = 0xFF;

/// Errors embedding or reading alpha-channel payloads.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StegoError {
    #[error("payload does not fit in the body region's capacity")]
    PayloadTooLarge,
    #[error("body region delimiter not found")]
    DelimiterNotFound,
    #[error("frame does not fit in the last row's capacity")]
    FrameTooLarge,
    #[error("last row does not start with the expected magic bytes")]
    NoMagic,
    #[error("declared frame length is out of range for this image")]
    LengthOutOfRange,
}

fn body_capacity(image: &RasterImage) -> u64 {
    u64::from(image.width) * u64::from(image.body_row_count())
}

/// Alpha-channel byte offset of the `index`-th byte of the body region, in
/// row-major pixel order across rows `0..body_row_count`.
fn body_alpha_offset(image: &RasterImage, index: u64) -> usize {
    let width = u64::from(image.width);
    let row = index / width;
    let col = index % width;
    image.pixel_offset(col as u32, row as u32) + 3
}

/// Embed `basic_info_utf8` into the body region as `basic_info ‖
/// "###END###"`, left-padding nothing and leaving the remaining body alpha
/// bytes at `0xFF`.
///
/// # Errors
/// Returns [`StegoError::PayloadTooLarge`] if the payload plus delimiter
/// does not fit in the body region.
pub fn embed_body(image: &mut RasterImage, basic_info_utf8: &[u8]) -> Result<(), StegoError> {
    let capacity = body_capacity(image);
    let framed_len = basic_info_utf8.len() as u64 + BODY_DELIMITER.len() as u64;
    if framed_len > capacity {
        return Err(StegoError::PayloadTooLarge);
    }

    for i in 0..capacity {
        let offset = body_alpha_offset(image, i);
        image.pixels[offset] = PAD;
    }
    for (i, &b) in basic_info_utf8.iter().enumerate() {
        image.pixels[body_alpha_offset(image, i as u64)] = b;
    }
    for (i, &b) in BODY_DELIMITER.iter().enumerate() {
        image.pixels[body_alpha_offset(image, basic_info_utf8.len() as u64 + i as u64)] = b;
    }
    Ok(())
}

/// Read the body region's alpha bytes up to the first occurrence of the
/// delimiter, returning the bytes preceding it.
///
/// # Errors
/// Returns [`StegoError::DelimiterNotFound`] if the delimiter does not
/// appear anywhere in the body region.
pub fn read_body(image: &RasterImage) -> Result<Vec<u8>, StegoError> {
    let capacity = body_capacity(image) as usize;
    let alpha: Vec<u8> = (0..capacity as u64)
        .map(|i| image.pixels[body_alpha_offset(image, i)])
        .collect();

    let delim_pos = alpha
        .windows(BODY_DELIMITER.len())
        .position(|w| w == BODY_DELIMITER)
        .ok_or(StegoError::DelimiterNotFound)?;

    Ok(alpha[..delim_pos].to_vec())
}

/// Embed `frame_bytes` into the last row's alpha channel as `"GCM1" ‖
/// big-endian u32 length ‖ frame_bytes`, padding the remainder of the row
/// with `0xFF`.
///
/// # Errors
/// Returns [`StegoError::FrameTooLarge`] if the framed payload does not fit
/// in one row's width, or [`StegoError::LengthOutOfRange`] if `frame_bytes`
/// is longer than `u32::MAX`.
pub fn embed_last_row(image: &mut RasterImage, frame_bytes: &[u8]) -> Result<(), StegoError> {
    if frame_bytes.len() > u32::MAX as usize {
        return Err(StegoError::LengthOutOfRange);
    }
    let capacity = u64::from(image.width);
    let framed_len = LAST_ROW_HEADER_LEN + frame_bytes.len() as u64;
    if framed_len > capacity {
        return Err(StegoError::FrameTooLarge);
    }

    let mut framed = Vec::with_capacity(framed_len as usize);
    framed.extend_from_slice(LAST_ROW_MAGIC);
    framed.extend_from_slice(&(frame_bytes.len() as u32).to_be_bytes());
    framed.extend_from_slice(frame_bytes);

    let last_row = image.height - 1;
    let row = image.row_mut(last_row);
    for px in row.chunks_exact_mut(4) {
        px[3] = PAD;
    }
    for (i, &b) in framed.iter().enumerate() {
        row[i * 4 + 3] = b;
    }
    Ok(())
}

/// Read the last row's magic/length-framed payload.
///
/// # Errors
/// Returns [`StegoError::NoMagic`] if the row doesn't start with the
/// expected magic bytes, or [`StegoError::LengthOutOfRange`] if the declared
/// length doesn't fit in the row's remaining capacity.
pub fn read_last_row(image: &RasterImage) -> Result<Vec<u8>, StegoError> {
    let capacity = u64::from(image.width);
    if capacity < LAST_ROW_HEADER_LEN {
        return Err(StegoError::NoMagic);
    }

    let last_row = image.height - 1;
    let alpha: Vec<u8> = image
        .row(last_row)
        .chunks_exact(4)
        .map(|px| px[3])
        .collect();

    if &alpha[0..4] != LAST_ROW_MAGIC {
        return Err(StegoError::NoMagic);
    }

    let len = u32::from_be_bytes([alpha[4], alpha[5], alpha[6], alpha[7]]) as u64;
    if LAST_ROW_HEADER_LEN + len > capacity {
        return Err(StegoError::LengthOutOfRange);
    }

    Ok(alpha[LAST_ROW_HEADER_LEN as usize..(LAST_ROW_HEADER_LEN + len) as usize].to_vec())
}

/// Set every alpha byte of the last row to `0xFF`, used before computing the
/// canonical hash so the signature frame never affects what gets signed.
pub fn clear_last_row(image: &mut RasterImage) {
    let last_row = image.height - 1;
    let row = image.row_mut(last_row);
    for px in row.chunks_exact_mut(4) {
        px[3] = PAD;
    }
}
