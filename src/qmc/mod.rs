//! Legacy QMC container decoder.
//!
//! Every old-style variant is the original audio XOR-ed with a keystream.
//! Variants differ along three axes only, captured by [`DecoderConfig`]:
//!
//! - whether a base64 key trailer closes the file ([`trailer`]),
//! - where the mask comes from (shared default, or detected per file),
//! - which extension the decoded audio gets.
//!
//! # State
//! `Unvalidated → Validated → Decoded`.  Trailer stripping happens during
//! validation and only narrows a view over the owned input; the input bytes
//! themselves are never rewritten.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::decoder::{dotted_ext, DecodeError, Decoder};
use crate::mask::{default_mask, Mask, MaskDetector};

pub mod trailer;

pub use trailer::{append_trailer, KeyTrailer, KEY_LEN};

// ── Configuration ────────────────────────────────────────────────────────────

/// How a decoder obtains its keystream.
#[derive(Clone)]
pub enum MaskSource {
    /// Fixed mask bound at construction; no trailer is read.
    Default(Arc<dyn Mask>),
    /// Trailer required; the mask is derived from the stripped body.
    Detected(Arc<dyn MaskDetector>),
}

impl MaskSource {
    pub fn requires_trailer(&self) -> bool {
        matches!(self, MaskSource::Detected(_))
    }
}

impl fmt::Debug for MaskSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskSource::Default(_)  => f.write_str("Default"),
            MaskSource::Detected(_) => f.write_str("Detected"),
        }
    }
}

/// Immutable per-format settings, shared by every decoder the format builds.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    pub mask_source: MaskSource,
    /// Bare extension (`"flac"`), or empty when unknown.
    pub audio_ext:   String,
}

impl DecoderConfig {
    pub fn new(mask_source: MaskSource, audio_ext: impl Into<String>) -> Self {
        Self { mask_source, audio_ext: audio_ext.into() }
    }

    /// Default-mask mode with the process-wide keystream.
    pub fn with_default_mask(audio_ext: impl Into<String>) -> Self {
        Self::new(MaskSource::Default(default_mask()), audio_ext)
    }

    /// Trailer mode with the given detector.
    pub fn with_detector<D>(detector: D, audio_ext: impl Into<String>) -> Self
    where
        D: MaskDetector + 'static,
    {
        Self::new(MaskSource::Detected(Arc::new(detector)), audio_ext)
    }
}

// ── Decoder ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unvalidated,
    Validated,
    Decoded,
}

pub struct OldQmcDecoder {
    config:   Arc<DecoderConfig>,
    raw:      Vec<u8>,
    /// Bytes of `raw` that are ciphertext; shrinks once when a trailer is accepted.
    body_len: usize,
    mask:     Option<Arc<dyn Mask>>,
    key:      Option<Vec<u8>>,
    audio:    Vec<u8>,
    state:    State,
}

impl OldQmcDecoder {
    pub fn new(config: Arc<DecoderConfig>, raw: Vec<u8>) -> Self {
        let mask = match &config.mask_source {
            MaskSource::Default(mask) => Some(Arc::clone(mask)),
            MaskSource::Detected(_)   => None,
        };
        Self {
            body_len: raw.len(),
            config,
            raw,
            mask,
            key:   None,
            audio: Vec::new(),
            state: State::Unvalidated,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// The input exactly as received.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The ciphertext the mask will be applied to.
    pub fn body(&self) -> &[u8] {
        &self.raw[..self.body_len]
    }

    /// Key recovered from the trailer, once validated in trailer mode.
    pub fn key(&self) -> Option<&[u8]> {
        self.key.as_deref()
    }

    pub fn mask(&self) -> Option<&Arc<dyn Mask>> {
        self.mask.as_ref()
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }
}

impl Decoder for OldQmcDecoder {
    fn validate(&mut self) -> Result<(), DecodeError> {
        if self.mask.is_none() {
            let mask = match &self.config.mask_source {
                MaskSource::Default(mask) => Arc::clone(mask),
                MaskSource::Detected(detector) => {
                    let trailer = KeyTrailer::parse(&self.raw)?;
                    debug!(
                        body_len    = trailer.body_len,
                        trailer_len = trailer.trailer_len(self.raw.len()),
                        "qmc key trailer accepted"
                    );
                    // The narrowed view is committed only after detection succeeds.
                    let mask = detector.detect(&self.raw[..trailer.body_len])?;
                    self.body_len = trailer.body_len;
                    self.key      = Some(trailer.key);
                    mask
                }
            };
            self.mask = Some(mask);
        }
        if self.state == State::Unvalidated {
            self.state = State::Validated;
        }
        Ok(())
    }

    fn decode(&mut self) -> Result<(), DecodeError> {
        let mask = self.mask.as_ref().ok_or(DecodeError::NotValidated)?;
        self.audio = mask.apply(&self.raw[..self.body_len]);
        self.state = State::Decoded;
        Ok(())
    }

    fn audio_data(&self) -> &[u8] {
        &self.audio
    }

    fn audio_ext(&self) -> String {
        dotted_ext(&self.config.audio_ext)
    }
}
