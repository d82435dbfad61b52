pub mod decoder;
pub mod mask;
pub mod sniff;
pub mod qmc;
pub mod raw;
pub mod formats;
pub mod registry;
pub mod unlock;

pub use decoder::{Decoder, DecodeError, Meta};
pub use mask::{default_mask, Key256Mask, Mask, MaskDetector, MaskError};
pub use qmc::{DecoderConfig, MaskSource, OldQmcDecoder};
pub use registry::{DecoderRegistry, RegistryError};
pub use unlock::{unlock_all, unlock_file, UnlockError, UnlockOptions, UnlockReport};
