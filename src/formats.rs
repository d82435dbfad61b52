//! Catalogue of supported format identifiers.
//!
//! Identifiers are either file extensions or hex-encoded literals.  Files
//! re-shared through cloud storage lose their extension and instead carry the
//! hex of the real one (`.666c6163` for a `flac`), so the literal bytes are
//! kept here and encoded once when the registry is built.

use crate::mask::{FlacMaskDetector, OggMaskDetector};
use crate::qmc::DecoderConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatId {
    Ext(&'static str),
    /// Raw literal; its registry key is the lowercase hex encoding.
    Magic(&'static [u8]),
}

impl FormatId {
    /// The string the registry is keyed by.
    pub fn key(self) -> String {
        match self {
            FormatId::Ext(ext)   => ext.to_owned(),
            FormatId::Magic(lit) => hex_identifier(lit),
        }
    }
}

/// Registry key for a literal magic sequence.
pub fn hex_identifier(literal: &[u8]) -> String {
    hex::encode(literal)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskMode {
    /// Shared default keystream, no trailer.
    Default,
    /// Key trailer + FLAC-header mask detection.
    DetectFlac,
    /// Key trailer + Ogg-header mask detection.
    DetectOgg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    pub id:        FormatId,
    pub audio_ext: &'static str,
    pub mask_mode: MaskMode,
    /// Human-readable origin, for listings only.
    pub label:     &'static str,
}

impl FormatSpec {
    const fn new(id: FormatId, audio_ext: &'static str, mask_mode: MaskMode, label: &'static str) -> Self {
        Self { id, audio_ext, mask_mode, label }
    }

    pub fn decoder_config(&self) -> DecoderConfig {
        match self.mask_mode {
            MaskMode::Default    => DecoderConfig::with_default_mask(self.audio_ext),
            MaskMode::DetectFlac => DecoderConfig::with_detector(FlacMaskDetector, self.audio_ext),
            MaskMode::DetectOgg  => DecoderConfig::with_detector(OggMaskDetector, self.audio_ext),
        }
    }
}

use FormatId::{Ext, Magic};
use MaskMode::{Default as Shared, DetectFlac, DetectOgg};

pub const OLD_QMC_FORMATS: &[FormatSpec] = &[
    FormatSpec::new(Ext("qmc0"),    "mp3",  Shared, "QQ Music MP3"),
    FormatSpec::new(Ext("qmc3"),    "mp3",  Shared, "QQ Music MP3"),
    FormatSpec::new(Ext("qmc2"),    "m4a",  Shared, "QQ Music M4A"),
    FormatSpec::new(Ext("qmc4"),    "m4a",  Shared, "QQ Music M4A"),
    FormatSpec::new(Ext("qmc6"),    "m4a",  Shared, "QQ Music M4A"),
    FormatSpec::new(Ext("qmc8"),    "m4a",  Shared, "QQ Music M4A"),
    FormatSpec::new(Ext("qmcflac"), "flac", Shared, "QQ Music FLAC"),
    FormatSpec::new(Ext("qmcogg"),  "ogg",  Shared, "QQ Music Ogg"),
    FormatSpec::new(Ext("tkm"),     "m4a",  Shared, "QQ Music accompaniment M4A"),
    FormatSpec::new(Ext("bkcmp3"),  "mp3",  Shared, "Moo Music MP3"),
    FormatSpec::new(Ext("bkcflac"), "flac", Shared, "Moo Music FLAC"),

    FormatSpec::new(Magic(b"flac"), "flac", Shared, "QQ Music Weiyun FLAC"),
    FormatSpec::new(Magic(b"mp3"),  "mp3",  Shared, "QQ Music Weiyun MP3"),
    FormatSpec::new(Magic(b"ogg"),  "ogg",  Shared, "QQ Music Weiyun Ogg"),
    FormatSpec::new(Magic(b"m4a"),  "m4a",  Shared, "QQ Music Weiyun M4A"),
    FormatSpec::new(Magic(b"wav"),  "wav",  Shared, "QQ Music Weiyun WAV"),

    FormatSpec::new(Ext("mgg"),   "ogg",  DetectOgg,  "QQ Music new Ogg"),
    FormatSpec::new(Ext("mflac"), "flac", DetectFlac, "QQ Music new FLAC"),
];

/// Catalogue entry for a registry key.
pub fn find(format_id: &str) -> Option<&'static FormatSpec> {
    OLD_QMC_FORMATS.iter().find(|spec| spec.id.key() == format_id)
}

/// Plain audio extensions registered as passthrough entries.
pub const PLAIN_FORMATS: &[&str] = &["mp3", "flac", "ogg", "m4a", "wav", "wma", "aac"];
