//! Audio container sniffing from the first bytes of a decoded stream.
//!
//! Used by the mask detectors to accept a candidate keystream, and by the
//! file driver to pick or double-check an output extension.

/// ASF header GUID that opens every WMA file.
const ASF_GUID: [u8; 8] = [0x30, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11];

pub fn is_flac(head: &[u8]) -> bool { head.starts_with(b"fLaC") }
pub fn is_ogg(head: &[u8])  -> bool { head.starts_with(b"OggS") }
pub fn is_wav(head: &[u8])  -> bool { head.starts_with(b"RIFF") }
pub fn is_wma(head: &[u8])  -> bool { head.starts_with(&ASF_GUID) }
pub fn is_dff(head: &[u8])  -> bool { head.starts_with(b"FRM8") }

/// ID3 tag, or a bare MPEG audio frame sync (11 set bits, layer bits non-zero).
pub fn is_mp3(head: &[u8]) -> bool {
    match head {
        [b'I', b'D', b'3', ..] => true,
        [0xFF, b, ..] => b & 0xE0 == 0xE0 && b & 0x06 != 0,
        _ => false,
    }
}

/// ADTS frame: 12-bit sync with layer bits `00` (`FF F1`, `FF F9`).
pub fn is_aac(head: &[u8]) -> bool {
    matches!(head, [0xFF, b, ..] if b & 0xF6 == 0xF0)
}

/// MP4 family: the `ftyp` box tag sits after the 4-byte box size.
pub fn is_m4a(head: &[u8]) -> bool {
    head.len() >= 8 && &head[4..8] == b"ftyp"
}

type Sniffer = fn(&[u8]) -> bool;

// Order matters only for overlapping signatures; none of these overlap.
const SNIFFERS: &[(Sniffer, &str)] = &[
    (is_m4a,  ".m4a"),
    (is_ogg,  ".ogg"),
    (is_flac, ".flac"),
    (is_aac,  ".aac"),
    (is_mp3,  ".mp3"),
    (is_wav,  ".wav"),
    (is_wma,  ".wma"),
    (is_dff,  ".dff"),
];

/// Returns the dotted extension of the container `head` starts with.
pub fn sniff_ext(head: &[u8]) -> Option<&'static str> {
    SNIFFERS
        .iter()
        .find(|(sniff, _)| sniff(head))
        .map(|&(_, ext)| ext)
}
