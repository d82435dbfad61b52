//! The decoder contract shared by every container family.
//!
//! Callers always drive a decoder the same way:
//!
//! ```no_run
//! use oldqmc::registry::DecoderRegistry;
//!
//! let registry = DecoderRegistry::with_builtin_formats();
//! let raw = std::fs::read("song.qmcflac")?;
//! let mut dec = registry.new_decoder("qmcflac", raw)?;
//! dec.validate()?;
//! dec.decode()?;
//! std::fs::write(format!("song{}", dec.audio_ext()), dec.audio_data())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use thiserror::Error;

use crate::mask::MaskError;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum DecodeError {
    /// The input is too short to hold the trailer it declares.
    #[error("Invalid qmc file length")]
    FileLength,
    #[error("Base64 decode of qmc key failed: {0}")]
    KeyDecode(#[source] base64::DecodeError),
    #[error("Unexpected decoded qmc key length {0}")]
    KeyLength(usize),
    #[error("Mask detection failed: {0}")]
    MaskDetection(#[from] MaskError),
    /// A plain-audio input whose header matches no known container.
    #[error("Audio format not recognised")]
    UnrecognizedAudio,
    /// `decode` was called before a mask was bound.
    #[error("Decoder has not been validated")]
    NotValidated,
}

// ── Traits ───────────────────────────────────────────────────────────────────

/// Track metadata recovered from a container, when the family carries any.
pub trait Meta {
    fn title(&self) -> &str;
    fn album(&self) -> &str;
    fn artists(&self) -> &[String];
}

/// Two-phase decoder: `validate` then `decode`.
///
/// A decoder is single-use and owned by one caller at a time.
pub trait Decoder: Send {
    /// Check the container and bind everything `decode` needs.
    /// Calling it again after success is a no-op.
    fn validate(&mut self) -> Result<(), DecodeError>;

    fn decode(&mut self) -> Result<(), DecodeError>;

    /// Decoded audio; empty until `decode` has run.
    fn audio_data(&self) -> &[u8];

    /// Output extension with a leading dot, or `""` when unknown.
    fn audio_ext(&self) -> String;

    fn cover_image(&self) -> Option<&[u8]> {
        None
    }

    fn meta(&self) -> Option<&dyn Meta> {
        None
    }
}

/// Format a bare extension (`"flac"`) as `".flac"`; empty stays empty.
pub fn dotted_ext(ext: &str) -> String {
    if ext.is_empty() {
        String::new()
    } else {
        format!(".{ext}")
    }
}
