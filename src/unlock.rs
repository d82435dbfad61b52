//! File-level driver: read, dispatch, decode, write.
//!
//! ```no_run
//! use oldqmc::registry::DecoderRegistry;
//! use oldqmc::unlock::{unlock_file, UnlockOptions};
//!
//! let registry = DecoderRegistry::with_builtin_formats();
//! let report = unlock_file(&registry, "song.qmcflac".as_ref(), &UnlockOptions::default())?;
//! assert_eq!(report.audio_ext, ".flac");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! One bad file never stops a batch: [`unlock_all`] returns a result per input.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::decoder::DecodeError;
use crate::registry::{DecoderRegistry, RegistryError};
use crate::sniff::sniff_ext;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum UnlockError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Input has no usable extension: {0}")]
    NoExtension(PathBuf),
    #[error("Output already exists: {0}")]
    OutputExists(PathBuf),
    #[error("Could not determine the audio type of the decoded output")]
    UnknownAudioType,
}

// ── UnlockOptions ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct UnlockOptions {
    /// Write outputs here instead of next to each input.
    pub output_dir:    Option<PathBuf>,
    /// Also copy inputs that are already plain audio.
    pub include_plain: bool,
    pub overwrite:     bool,
}

// ── Reports ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockStatus {
    Decoded,
    /// Plain audio left alone.
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnlockReport {
    pub input:       PathBuf,
    pub output:      Option<PathBuf>,
    pub format_id:   String,
    pub status:      UnlockStatus,
    pub input_size:  u64,
    pub output_size: u64,
    pub audio_ext:   String,
}

impl UnlockReport {
    fn skipped(input: &Path, format_id: String, input_size: u64, audio_ext: String) -> Self {
        Self {
            input:       input.to_owned(),
            output:      None,
            format_id,
            status:      UnlockStatus::Skipped,
            input_size,
            output_size: 0,
            audio_ext,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub input: PathBuf,
    pub error: String,
}

/// Summary of a batch, serialisable for `--json` output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub decoded: usize,
    pub skipped: usize,
    pub failed:  usize,
    pub files:   Vec<UnlockReport>,
    pub errors:  Vec<FailedFile>,
}

impl BatchReport {
    pub fn from_results(results: Vec<(PathBuf, Result<UnlockReport, UnlockError>)>) -> Self {
        let mut batch = Self::default();
        for (input, result) in results {
            match result {
                Ok(report) => {
                    match report.status {
                        UnlockStatus::Decoded => batch.decoded += 1,
                        UnlockStatus::Skipped => batch.skipped += 1,
                    }
                    batch.files.push(report);
                }
                Err(e) => {
                    batch.failed += 1;
                    batch.errors.push(FailedFile { input, error: e.to_string() });
                }
            }
        }
        batch
    }
}

// ── Inputs ───────────────────────────────────────────────────────────────────

/// Registry identifier for `path`: its extension, lowercased.
pub fn format_id_of(path: &Path) -> Option<String> {
    path.extension()?.to_str().map(str::to_ascii_lowercase)
}

/// Expand directories into the files they contain.  Plain file arguments are
/// kept as given; files found while walking a directory are kept only when
/// `registry` has a decoder for their extension.  Unreadable entries are
/// logged and skipped.
pub fn collect_inputs(registry: &DecoderRegistry, paths: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();
    for path in paths {
        for entry in WalkDir::new(path).max_depth(depth).sort_by_file_name() {
            match entry {
                Ok(e) if e.file_type().is_file() => {
                    let supported = format_id_of(e.path()).is_some_and(|id| registry.contains(&id));
                    if e.depth() == 0 || supported {
                        files.push(e.into_path());
                    } else {
                        debug!(path = %e.path().display(), "no suitable decoder, skipping");
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable entry"),
            }
        }
    }
    files
}

fn output_path(input: &Path, audio_ext: &str, output_dir: Option<&Path>) -> PathBuf {
    let mut name = input.file_stem().unwrap_or_default().to_os_string();
    name.push(audio_ext);
    match output_dir {
        Some(dir) => dir.join(name),
        None      => input.with_file_name(name),
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

// ── Driver ───────────────────────────────────────────────────────────────────

pub fn unlock_file(
    registry: &DecoderRegistry,
    input:    &Path,
    options:  &UnlockOptions,
) -> Result<UnlockReport, UnlockError> {
    let format_id = format_id_of(input).ok_or_else(|| UnlockError::NoExtension(input.to_owned()))?;
    let entry = registry.entry(&format_id)?;

    if entry.noop && !options.include_plain {
        debug!(input = %input.display(), "plain audio, skipping");
        let input_size = fs::metadata(input)?.len();
        return Ok(UnlockReport::skipped(input, format_id, input_size, String::new()));
    }

    let raw = fs::read(input)?;
    let input_size = raw.len() as u64;
    let mut decoder = registry.new_decoder(&format_id, raw)?;
    decoder.validate()?;
    decoder.decode()?;

    let audio   = decoder.audio_data();
    let sniffed = sniff_ext(audio);
    let audio_ext = match decoder.audio_ext() {
        ext if ext.is_empty() => sniffed.ok_or(UnlockError::UnknownAudioType)?.to_owned(),
        ext => {
            if let Some(found) = sniffed.filter(|found| *found != ext) {
                warn!(input = %input.display(), expected = %ext, found, "decoded header does not match format");
            }
            ext
        }
    };

    let output = output_path(input, &audio_ext, options.output_dir.as_deref());
    if is_same_file(input, &output) {
        debug!(input = %input.display(), "output would replace the input, skipping");
        return Ok(UnlockReport::skipped(input, format_id, input_size, audio_ext));
    }
    if !options.overwrite && output.exists() {
        return Err(UnlockError::OutputExists(output));
    }
    if let Some(dir) = &options.output_dir {
        fs::create_dir_all(dir)?;
    }
    fs::write(&output, audio)?;
    info!(input = %input.display(), output = %output.display(), "decoded");

    Ok(UnlockReport {
        input:       input.to_owned(),
        output:      Some(output),
        format_id,
        status:      UnlockStatus::Decoded,
        input_size,
        output_size: audio.len() as u64,
        audio_ext,
    })
}

fn unlock_logged(
    registry: &DecoderRegistry,
    input:    &Path,
    options:  &UnlockOptions,
) -> (PathBuf, Result<UnlockReport, UnlockError>) {
    let result = unlock_file(registry, input, options);
    if let Err(e) = &result {
        warn!(input = %input.display(), error = %e, "failed");
    }
    (input.to_owned(), result)
}

/// Unlock every input, one result per file, in input order.
#[cfg(not(feature = "parallel"))]
pub fn unlock_all(
    registry: &DecoderRegistry,
    inputs:   &[PathBuf],
    options:  &UnlockOptions,
) -> Vec<(PathBuf, Result<UnlockReport, UnlockError>)> {
    inputs.iter().map(|p| unlock_logged(registry, p, options)).collect()
}

/// Unlock every input across the rayon pool, one result per file, in input order.
#[cfg(feature = "parallel")]
pub fn unlock_all(
    registry: &DecoderRegistry,
    inputs:   &[PathBuf],
    options:  &UnlockOptions,
) -> Vec<(PathBuf, Result<UnlockReport, UnlockError>)> {
    use rayon::prelude::*;
    inputs.par_iter().map(|p| unlock_logged(registry, p, options)).collect()
}
