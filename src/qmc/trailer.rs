//! Key trailer appended to trailer-bearing QMC files.
//!
//! Layout, relative to end of file:
//!
//! ```text
//! [ ciphertext body ][ base64(key), L bytes ][ L: u32 LE ]
//! ```
//!
//! `key` must decode to exactly [`KEY_LEN`] bytes.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::Engine as _;
use byteorder::{ByteOrder, LittleEndian};

use crate::decoder::DecodeError;

/// Decoded key length every valid trailer carries.
pub const KEY_LEN: usize = 272;

/// Width of the little-endian length field closing the file.
pub const LEN_FIELD: usize = 4;

/// Standard alphabet, but set bits after the last full byte are ignored
/// rather than rejected.
const KEY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// A parsed trailer: the key and where the ciphertext body ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTrailer {
    /// Always [`KEY_LEN`] bytes.
    pub key:      Vec<u8>,
    /// Length of the body preceding the trailer.
    pub body_len: usize,
}

impl KeyTrailer {
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        let len = data.len();
        if len < LEN_FIELD {
            return Err(DecodeError::FileLength);
        }
        let encoded_len = LittleEndian::read_u32(&data[len - LEN_FIELD..]) as usize;
        let body_len = (len - LEN_FIELD)
            .checked_sub(encoded_len)
            .ok_or(DecodeError::FileLength)?;

        let key = KEY_ENGINE
            .decode(&data[body_len..len - LEN_FIELD])
            .map_err(DecodeError::KeyDecode)?;
        if key.len() != KEY_LEN {
            return Err(DecodeError::KeyLength(key.len()));
        }
        Ok(Self { key, body_len })
    }

    /// Trailer bytes consumed from the end of the file.
    pub fn trailer_len(&self, file_len: usize) -> usize {
        file_len - self.body_len
    }
}

/// Append `base64(key)` and its length field to `body`.
pub fn append_trailer(body: &[u8], key: &[u8]) -> Vec<u8> {
    let encoded = STANDARD.encode(key);
    let mut out = Vec::with_capacity(body.len() + encoded.len() + LEN_FIELD);
    out.extend_from_slice(body);
    out.extend_from_slice(encoded.as_bytes());
    let mut len_field = [0u8; LEN_FIELD];
    LittleEndian::write_u32(&mut len_field, encoded.len() as u32);
    out.extend_from_slice(&len_field);
    out
}
