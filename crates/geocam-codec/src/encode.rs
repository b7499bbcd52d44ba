//! Canonical PNG encoding: exactly one `IHDR`, one `IDAT`, one `IEND`, no
//! ancillary chunks, filter type `None` on every scanline. Two encoders
//! given the same [`RasterImage`] must produce byte-identical output, since
//! the canonical form is what gets hashed and signed.

use std::io::Write;

use crate::raster::{CodecError, RasterImage};

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Encode a raster into its canonical PNG byte representation.
///
/// # Errors
/// Returns [`CodecError::DimensionsTooLarge`] if the raster's dimensions
/// overflow PNG's 32-bit chunk length framing.
pub fn encode_canonical(image: &RasterImage) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(image.pixels.len() + 64);
    out.extend_from_slice(&PNG_SIGNATURE);
    write_chunk(&mut out, b"IHDR", &ihdr_data(image)?);
    write_chunk(&mut out, b"IDAT", &idat_data(image));
    write_chunk(&mut out, b"IEND", &[]);
    Ok(out)
}

fn ihdr_data(image: &RasterImage) -> Result<[u8; 13], CodecError> {
    let mut data = [0u8; 13];
    data[0..4].copy_from_slice(&image.width.to_be_bytes());
    data[4..8].copy_from_slice(&image.height.to_be_bytes());
    data[8] = 8; // bit depth
    data[9] = 6; // color type: RGBA
    data[10] = 0; // compression method: deflate
    data[11] = 0; // filter method
    data[12] = 0; // interlace method: none
    Ok(data)
}

/// Build the raw (pre-deflate) scanline stream: one filter-type byte (always
/// `0`, "None") followed by the row's raw RGBA bytes, for every row.
fn raw_scanlines(image: &RasterImage) -> Vec<u8> {
    let row_bytes = image.width as usize * 4;
    let mut raw = Vec::with_capacity((row_bytes + 1) * image.height as usize);
    for y in 0..image.height {
        raw.push(0);
        raw.extend_from_slice(image.row(y));
    }
    raw
}

fn idat_data(image: &RasterImage) -> Vec<u8> {
    let raw = raw_scanlines(image);
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::best());
    encoder
        .write_all(&raw)
        .expect("writing to an in-memory Vec never fails");
    encoder.finish().expect("zlib finish on an in-memory Vec never fails")
}

fn write_chunk(out: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(chunk_type);
    out.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    out.extend_from_slice(&hasher.finalize().to_be_bytes());
}
