//! Keystream masks for the legacy QMC family.
//!
//! A [`Mask`] turns ciphertext into plaintext by XOR-ing each byte with a
//! position-dependent keystream byte.  Decoders only ever see masks as
//! `Arc<dyn Mask>`: either the process-wide [`default_mask`] or whatever a
//! [`MaskDetector`] derived from a file body.
//!
//! # Keystream layout
//! [`Key256Mask`] keeps a 128-byte matrix.  Byte `p` of the stream uses
//! `matrix[m]` where `m` advances with `p` modulo 128, except that both
//! counters skip one extra step at `p == 0x8000` and at every later `p` with
//! `(p + 1) % 0x8000 == 0`.
//!
//! The matrix is not free-form: it is a fixed walk over a 58-byte seed (an
//! 8×7 grid plus two turn bytes), so every seed byte lands in at least two
//! matrix slots.  [`Key256Mask::seed`] recovers the seed and fails on any
//! matrix that was not produced this way.

use std::sync::{Arc, OnceLock};
use thiserror::Error;

pub mod detect;

pub use detect::{FlacMaskDetector, OggMaskDetector};

/// Size of the keystream matrix in bytes.
pub const MATRIX_LEN: usize = 128;

/// Segment length after which the keystream skips one position.
pub const SEGMENT_LEN: usize = 0x8000;

/// Bytes in the seed a matrix is expanded from.
pub const SEED_LEN: usize = 58;

const GRID_ROWS: usize = 8;
const GRID_COLS: usize = 7;
const LEFT_TURN: usize = GRID_ROWS * GRID_COLS;
const RIGHT_TURN: usize = LEFT_TURN + 1;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MaskError {
    /// The body cannot hold a single candidate matrix.
    #[error("Body too short for mask detection ({len} bytes, need {MATRIX_LEN})")]
    BodyTooShort { len: usize },
    /// No candidate matrix produced a recognisable container header.
    #[error("Could not detect {container} mask")]
    NotFound { container: &'static str },
}

// ── Traits ───────────────────────────────────────────────────────────────────

/// A keystream capability.  `apply` is a pure function of the mask and input.
pub trait Mask: Send + Sync {
    fn apply(&self, data: &[u8]) -> Vec<u8>;
}

/// Derives a mask from a trailer-stripped ciphertext body.
///
/// Implemented for plain closures so callers can inject their own.
pub trait MaskDetector: Send + Sync {
    fn detect(&self, body: &[u8]) -> Result<Arc<dyn Mask>, MaskError>;
}

impl<F> MaskDetector for F
where
    F: Fn(&[u8]) -> Result<Arc<dyn Mask>, MaskError> + Send + Sync,
{
    fn detect(&self, body: &[u8]) -> Result<Arc<dyn Mask>, MaskError> {
        self(body)
    }
}

// ── Key256Mask ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key256Mask {
    matrix: [u8; MATRIX_LEN],
}

impl Key256Mask {
    pub fn new(matrix: [u8; MATRIX_LEN]) -> Self {
        Self { matrix }
    }

    /// Build a mask from a ciphertext block taken as the matrix itself.
    /// Returns `None` unless `block` is exactly [`MATRIX_LEN`] bytes.
    pub fn from_block(block: &[u8]) -> Option<Self> {
        <[u8; MATRIX_LEN]>::try_from(block).ok().map(Self::new)
    }

    /// Expand a seed along the walk.
    pub fn from_seed(seed: &[u8; SEED_LEN]) -> Self {
        let mut matrix = [0u8; MATRIX_LEN];
        for (b, &slot) in matrix.iter_mut().zip(walk_slots().iter()) {
            *b = seed[slot];
        }
        Self::new(matrix)
    }

    pub fn matrix(&self) -> &[u8; MATRIX_LEN] {
        &self.matrix
    }

    /// Fold the matrix back into its seed.  `None` when two slots that share
    /// a seed byte disagree.
    pub fn seed(&self) -> Option<[u8; SEED_LEN]> {
        let mut seen = [None; SEED_LEN];
        for (&b, &slot) in self.matrix.iter().zip(walk_slots().iter()) {
            match seen[slot] {
                None => seen[slot] = Some(b),
                Some(prev) if prev != b => return None,
                Some(_) => {}
            }
        }
        let mut seed = [0u8; SEED_LEN];
        for (out, b) in seed.iter_mut().zip(seen) {
            *out = b?;
        }
        Some(seed)
    }
}

impl Mask for Key256Mask {
    fn apply(&self, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len());
        let mut pos = 0usize;
        let mut m   = 0usize;
        for &byte in data {
            if pos == SEGMENT_LEN || (pos > SEGMENT_LEN && (pos + 1) % SEGMENT_LEN == 0) {
                pos += 1;
                m   += 1;
            }
            // m is at most MATRIX_LEN + 1 here
            if m >= MATRIX_LEN {
                m -= MATRIX_LEN;
            }
            out.push(byte ^ self.matrix[m]);
            pos += 1;
            m   += 1;
        }
        out
    }
}

// ── Default mask ─────────────────────────────────────────────────────────────

const SEED_MAP: [[u8; 7]; 8] = [
    [0x4a, 0xd6, 0xca, 0x90, 0x67, 0xf7, 0x52],
    [0x5e, 0x95, 0x23, 0x9f, 0x13, 0x11, 0x7e],
    [0x47, 0x74, 0x3d, 0x90, 0xaa, 0x3f, 0x51],
    [0xc6, 0x09, 0xd5, 0x9f, 0xfa, 0x66, 0xf9],
    [0xf3, 0xd6, 0xa1, 0x90, 0xa0, 0xf7, 0xf0],
    [0x1d, 0x95, 0xde, 0x9f, 0x84, 0x11, 0xf4],
    [0x0e, 0x74, 0xbb, 0x90, 0xbc, 0x3f, 0x92],
    [0x00, 0x09, 0x5b, 0x9f, 0x62, 0x66, 0xa1],
];

/// Seed index feeding each matrix slot.  The walk runs the grid in a
/// boustrophedon over rows 0,7,1,6,...; every turn reads the left or right
/// turn byte.  It repeats every 128 steps, so one period is the whole matrix.
fn walk_slots() -> &'static [usize; MATRIX_LEN] {
    static SLOTS: OnceLock<[usize; MATRIX_LEN]> = OnceLock::new();
    SLOTS.get_or_init(|| {
        let mut slots = [0usize; MATRIX_LEN];
        let (mut x, mut y, mut dx): (i32, usize, i32) = (-1, GRID_ROWS, 1);
        for slot in slots.iter_mut() {
            *slot = if x < 0 {
                dx = 1;
                y  = (GRID_ROWS - y) % GRID_ROWS;
                LEFT_TURN
            } else if x >= GRID_COLS as i32 {
                dx = -1;
                y  = GRID_ROWS - 1 - y;
                RIGHT_TURN
            } else {
                y * GRID_COLS + x as usize
            };
            x += dx;
        }
        slots
    })
}

fn default_seed() -> [u8; SEED_LEN] {
    let mut seed = [0u8; SEED_LEN];
    for (row, src) in seed.chunks_exact_mut(GRID_COLS).zip(SEED_MAP.iter()) {
        row.copy_from_slice(src);
    }
    seed[LEFT_TURN]  = 0xc3;
    seed[RIGHT_TURN] = 0xd8;
    seed
}

fn static_matrix() -> [u8; MATRIX_LEN] {
    *Key256Mask::from_seed(&default_seed()).matrix()
}

static DEFAULT_MASK: OnceLock<Arc<Key256Mask>> = OnceLock::new();

/// The shared keystream used by every non-trailer format.
pub fn default_mask() -> Arc<dyn Mask> {
    DEFAULT_MASK
        .get_or_init(|| Arc::new(Key256Mask::new(static_matrix())))
        .clone()
}
