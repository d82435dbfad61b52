//! Format identifier → decoder factory dispatch.
//!
//! # Lifecycle
//! A [`DecoderRegistry`] is filled once at startup and only read afterwards.
//! It is `Sync`, so a single instance can be borrowed by every worker that
//! processes files.  Registering the same identifier twice is a programming
//! error and panics immediately.
//!
//! # Identity
//! Keys are matched exactly; callers normalise case before lookup.  Magic
//! literals are keyed by their hex encoding (see [`crate::formats`]).

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::decoder::Decoder;
use crate::formats::{FormatSpec, OLD_QMC_FORMATS, PLAIN_FORMATS};
use crate::qmc::OldQmcDecoder;
use crate::raw::RawDecoder;

/// Builds an `Unvalidated` decoder from the raw input bytes.
pub type DecoderFactory = Arc<dyn Fn(Vec<u8>) -> Box<dyn Decoder> + Send + Sync>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unsupported format: {format_id:?}")]
    Unsupported { format_id: String },
}

#[derive(Clone)]
pub struct RegistryEntry {
    /// The entry passes audio through untouched.
    pub noop: bool,
    factory:  DecoderFactory,
}

#[derive(Default)]
pub struct DecoderRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in format: the old-QMC catalogue plus plain-audio passthroughs.
    pub fn with_builtin_formats() -> Self {
        let mut registry = Self::new();
        for spec in OLD_QMC_FORMATS {
            registry.register_format(spec);
        }
        for ext in PLAIN_FORMATS {
            registry.register(*ext, true, |raw| Box::new(RawDecoder::new(raw)) as Box<dyn Decoder>);
        }
        registry
    }

    /// Register `factory` under `format_id`.
    ///
    /// # Panics
    /// If `format_id` is already registered.
    pub fn register<F>(&mut self, format_id: impl Into<String>, noop: bool, factory: F)
    where
        F: Fn(Vec<u8>) -> Box<dyn Decoder> + Send + Sync + 'static,
    {
        let format_id = format_id.into();
        assert!(
            !self.entries.contains_key(&format_id),
            "decoder already registered for format {format_id:?}",
        );
        self.entries.insert(format_id, RegistryEntry { noop, factory: Arc::new(factory) });
    }

    /// Register an old-QMC catalogue entry.  The config is built once and
    /// shared by every decoder the entry produces.
    pub fn register_format(&mut self, spec: &FormatSpec) {
        let config = Arc::new(spec.decoder_config());
        self.register(spec.id.key(), false, move |raw| {
            Box::new(OldQmcDecoder::new(Arc::clone(&config), raw)) as Box<dyn Decoder>
        });
    }

    /// Look up `format_id` and build a fresh decoder over `raw`.
    pub fn new_decoder(&self, format_id: &str, raw: Vec<u8>) -> Result<Box<dyn Decoder>, RegistryError> {
        let entry = self.entry(format_id)?;
        Ok((entry.factory)(raw))
    }

    pub fn entry(&self, format_id: &str) -> Result<&RegistryEntry, RegistryError> {
        self.entries.get(format_id).ok_or_else(|| RegistryError::Unsupported {
            format_id: format_id.to_owned(),
        })
    }

    pub fn contains(&self, format_id: &str) -> bool {
        self.entries.contains_key(format_id)
    }

    /// `Some(noop)` for registered identifiers.
    pub fn is_noop(&self, format_id: &str) -> Option<bool> {
        self.entries.get(format_id).map(|e| e.noop)
    }

    /// Registered identifiers, sorted.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
