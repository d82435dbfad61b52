//! Passthrough decoder for files that are already plain audio.
//!
//! Registered as a no-op entry so batch drivers can recognise (and by default
//! skip) inputs that need no unwrapping.

use crate::decoder::{DecodeError, Decoder};
use crate::sniff::sniff_ext;

pub struct RawDecoder {
    data:      Vec<u8>,
    audio_ext: Option<&'static str>,
    decoded:   bool,
}

impl RawDecoder {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, audio_ext: None, decoded: false }
    }
}

impl Decoder for RawDecoder {
    /// The header itself decides the extension, whatever the file was named.
    fn validate(&mut self) -> Result<(), DecodeError> {
        if self.audio_ext.is_none() {
            self.audio_ext = Some(sniff_ext(&self.data).ok_or(DecodeError::UnrecognizedAudio)?);
        }
        Ok(())
    }

    fn decode(&mut self) -> Result<(), DecodeError> {
        if self.audio_ext.is_none() {
            return Err(DecodeError::NotValidated);
        }
        self.decoded = true;
        Ok(())
    }

    fn audio_data(&self) -> &[u8] {
        if self.decoded { &self.data[..] } else { &[] }
    }

    fn audio_ext(&self) -> String {
        self.audio_ext.unwrap_or_default().to_owned()
    }
}
