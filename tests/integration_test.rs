use oldqmc::mask::{default_mask, Key256Mask, Mask, SEED_LEN};
use oldqmc::qmc::{append_trailer, KEY_LEN};
use oldqmc::registry::DecoderRegistry;
use oldqmc::unlock::{
    collect_inputs, unlock_all, unlock_file, BatchReport, UnlockError, UnlockOptions, UnlockStatus,
};
use oldqmc::{DecodeError, RegistryError};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn flac_plain(len: usize) -> Vec<u8> {
    let mut plain = vec![0u8; len];
    plain[..8].copy_from_slice(b"fLaC\0\0\0\x22");
    for (i, b) in plain[8..100].iter_mut().enumerate() {
        *b = (i as u8) | 0x80;
    }
    plain
}

fn test_mask() -> Key256Mask {
    let seed: [u8; SEED_LEN] = std::array::from_fn(|i| (i as u8).wrapping_mul(13) ^ 0x5c);
    Key256Mask::from_seed(&seed)
}

fn write(dir: &Path, name: &str, data: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, data).unwrap();
    path
}

#[test]
fn test_qmcflac_default_mask() {
    let dir = tempdir().unwrap();
    let plain = flac_plain(4096);
    let input = write(dir.path(), "song.qmcflac", &default_mask().apply(&plain));

    let registry = DecoderRegistry::with_builtin_formats();
    let report = unlock_file(&registry, &input, &UnlockOptions::default()).unwrap();

    assert_eq!(report.status, UnlockStatus::Decoded);
    assert_eq!(report.audio_ext, ".flac");
    assert_eq!(report.output.as_deref(), Some(dir.path().join("song.flac").as_path()));
    assert_eq!(fs::read(dir.path().join("song.flac")).unwrap(), plain);
}

#[test]
fn test_hex_extension_default_mask() {
    let dir = tempdir().unwrap();
    let mut plain = vec![0u8; 512];
    plain[..4].copy_from_slice(b"OggS");
    let input = write(dir.path(), "track.6f6767", &default_mask().apply(&plain));

    let registry = DecoderRegistry::with_builtin_formats();
    let report = unlock_file(&registry, &input, &UnlockOptions::default()).unwrap();
    assert_eq!(report.audio_ext, ".ogg");
    assert_eq!(fs::read(dir.path().join("track.ogg")).unwrap(), plain);
}

#[test]
fn test_mflac_trailer_and_detection() {
    let dir = tempdir().unwrap();
    let plain = flac_plain(8192);
    let body = test_mask().apply(&plain);
    let container = append_trailer(&body, &[0x11u8; KEY_LEN]);
    let input = write(dir.path(), "new.mflac", &container);

    let registry = DecoderRegistry::with_builtin_formats();
    let out_dir = dir.path().join("out");
    let options = UnlockOptions { output_dir: Some(out_dir.clone()), ..Default::default() };
    let report = unlock_file(&registry, &input, &options).unwrap();

    assert_eq!(report.input_size, container.len() as u64);
    assert_eq!(report.output_size, plain.len() as u64);
    assert_eq!(fs::read(out_dir.join("new.flac")).unwrap(), plain);
}

#[test]
fn test_mflac_bad_trailer_is_reported() {
    let dir = tempdir().unwrap();
    let mut data = vec![0u8; 64];
    data.extend_from_slice(b"!!!!");
    data.extend_from_slice(&4u32.to_le_bytes());
    let input = write(dir.path(), "bad.mflac", &data);

    let registry = DecoderRegistry::with_builtin_formats();
    let err = unlock_file(&registry, &input, &UnlockOptions::default()).unwrap_err();
    assert!(matches!(err, UnlockError::Decode(DecodeError::KeyDecode(_))));
    assert!(!dir.path().join("bad.flac").exists());
}

#[test]
fn test_mgg_without_detectable_mask() {
    let dir = tempdir().unwrap();
    // Trailer is fine but the body is too short to detect a mask from.
    let container = append_trailer(&[0u8; 16], &[0u8; KEY_LEN]);
    let input = write(dir.path(), "short.mgg", &container);

    let registry = DecoderRegistry::with_builtin_formats();
    let err = unlock_file(&registry, &input, &UnlockOptions::default()).unwrap_err();
    assert!(matches!(err, UnlockError::Decode(DecodeError::MaskDetection(_))));
}

#[test]
fn test_unsupported_and_missing_extension() {
    let dir = tempdir().unwrap();
    let registry = DecoderRegistry::with_builtin_formats();

    let xyz = write(dir.path(), "file.xyz", b"data");
    match unlock_file(&registry, &xyz, &UnlockOptions::default()) {
        Err(UnlockError::Registry(RegistryError::Unsupported { format_id })) => {
            assert_eq!(format_id, "xyz")
        }
        other => panic!("unexpected: {other:?}"),
    }

    let bare = write(dir.path(), "README", b"data");
    assert!(matches!(
        unlock_file(&registry, &bare, &UnlockOptions::default()),
        Err(UnlockError::NoExtension(_)),
    ));
}

#[test]
fn test_plain_audio_skipped_unless_requested() {
    let dir = tempdir().unwrap();
    let registry = DecoderRegistry::with_builtin_formats();
    let input = write(dir.path(), "already.flac", &flac_plain(256));

    let report = unlock_file(&registry, &input, &UnlockOptions::default()).unwrap();
    assert_eq!(report.status, UnlockStatus::Skipped);
    assert!(report.output.is_none());

    let out_dir = dir.path().join("copies");
    let options = UnlockOptions {
        output_dir:    Some(out_dir.clone()),
        include_plain: true,
        ..Default::default()
    };
    let report = unlock_file(&registry, &input, &options).unwrap();
    assert_eq!(report.status, UnlockStatus::Decoded);
    assert_eq!(fs::read(out_dir.join("already.flac")).unwrap(), flac_plain(256));
}

#[test]
fn test_plain_audio_in_place_is_left_alone() {
    let dir = tempdir().unwrap();
    let registry = DecoderRegistry::with_builtin_formats();
    let input = write(dir.path(), "song.flac", &flac_plain(256));

    for overwrite in [false, true] {
        let options = UnlockOptions { include_plain: true, overwrite, ..Default::default() };
        let report = unlock_file(&registry, &input, &options).unwrap();
        assert_eq!(report.status, UnlockStatus::Skipped);
        assert_eq!(report.audio_ext, ".flac");
        assert!(report.output.is_none());
    }
    assert_eq!(fs::read(&input).unwrap(), flac_plain(256));

    // Same directory given explicitly.
    let options = UnlockOptions {
        output_dir:    Some(dir.path().to_path_buf()),
        include_plain: true,
        ..Default::default()
    };
    let report = unlock_file(&registry, &input, &options).unwrap();
    assert_eq!(report.status, UnlockStatus::Skipped);
}

#[test]
fn test_existing_output_is_not_overwritten() {
    let dir = tempdir().unwrap();
    let registry = DecoderRegistry::with_builtin_formats();
    let input = write(dir.path(), "song.qmc0", &default_mask().apply(b"ID3\x03rest of mp3"));
    write(dir.path(), "song.mp3", b"keep me");

    let err = unlock_file(&registry, &input, &UnlockOptions::default()).unwrap_err();
    assert!(matches!(err, UnlockError::OutputExists(_)));
    assert_eq!(fs::read(dir.path().join("song.mp3")).unwrap(), b"keep me");

    let options = UnlockOptions { overwrite: true, ..Default::default() };
    unlock_file(&registry, &input, &options).unwrap();
    assert_eq!(fs::read(dir.path().join("song.mp3")).unwrap(), b"ID3\x03rest of mp3");
}

#[test]
fn test_batch_continues_past_failures() {
    let dir = tempdir().unwrap();
    let registry = DecoderRegistry::with_builtin_formats();
    write(dir.path(), "a.qmc3", &default_mask().apply(b"ID3 first"));
    write(dir.path(), "b.mflac", &[1, 2]);
    write(dir.path(), "c.tkm", &default_mask().apply(b"\0\0\0\x18ftypM4A "));
    write(dir.path(), "d.wav", b"RIFF\0\0\0\0WAVE");

    let inputs = collect_inputs(&registry, &[dir.path().to_path_buf()], false);
    assert_eq!(inputs.len(), 4);

    let results = unlock_all(&registry, &inputs, &UnlockOptions::default());
    assert_eq!(results.len(), 4);
    assert_eq!(results[0].0, inputs[0]);

    let batch = BatchReport::from_results(results);
    assert_eq!((batch.decoded, batch.skipped, batch.failed), (2, 1, 1));
    assert!(batch.errors[0].input.ends_with("b.mflac"));
    assert_eq!(fs::read(dir.path().join("c.m4a")).unwrap(), b"\0\0\0\x18ftypM4A ");
}

#[test]
fn test_directory_walk_ignores_unsupported_files() {
    let dir = tempdir().unwrap();
    let registry = DecoderRegistry::with_builtin_formats();
    write(dir.path(), "a.qmc0", &default_mask().apply(b"ID3 song"));
    let cover = write(dir.path(), "cover.jpg", b"\xFF\xD8\xFF\xE0");
    write(dir.path(), "a.lrc", b"[00:00.00]");
    write(dir.path(), "notes", b"no extension");

    let inputs = collect_inputs(&registry, &[dir.path().to_path_buf()], false);
    assert_eq!(inputs, vec![dir.path().join("a.qmc0")]);

    let batch = BatchReport::from_results(unlock_all(&registry, &inputs, &UnlockOptions::default()));
    assert_eq!((batch.decoded, batch.skipped, batch.failed), (1, 0, 0));

    // Named explicitly, an unsupported file is still reported.
    let inputs = collect_inputs(&registry, &[cover], false);
    assert_eq!(inputs.len(), 1);
    let batch = BatchReport::from_results(unlock_all(&registry, &inputs, &UnlockOptions::default()));
    assert_eq!(batch.failed, 1);
    assert!(batch.errors[0].error.contains("jpg"));
}

#[test]
fn test_collect_inputs_recursion() {
    let dir = tempdir().unwrap();
    let registry = DecoderRegistry::with_builtin_formats();
    let nested = dir.path().join("nested");
    fs::create_dir(&nested).unwrap();
    write(dir.path(), "top.qmc0", b"x");
    write(&nested, "deep.qmc0", b"y");

    let root = [dir.path().to_path_buf()];
    assert_eq!(collect_inputs(&registry, &root, false).len(), 1);
    assert_eq!(collect_inputs(&registry, &root, true).len(), 2);

    let single = [dir.path().join("top.qmc0")];
    assert_eq!(collect_inputs(&registry, &single, false), single.to_vec());
}
