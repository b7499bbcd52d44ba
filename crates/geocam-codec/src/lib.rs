//! PNG codec, alpha-channel steganography, and canonical hashing for GeoCam.
//!
//! These three concerns sit together because they all touch the same
//! invariant: the bytes that get hashed and signed must be reproducible,
//! byte for byte, from a decoded raster regardless of what produced the
//! original PNG.

mod decode;
mod encode;
mod hash;
mod raster;
mod stego;

pub use decode::decode;
pub use encode::encode_canonical;
pub use hash::canonical_hash_hex;
pub use raster::{CodecError, RasterImage, MAX_DIMENSION_PIXELS};
pub use stego::{
    clear_last_row, embed_body, embed_last_row, read_body, read_last_row, StegoError,
};
