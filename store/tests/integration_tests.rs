//! Integration tests for the hypercube-store crate.

use std::fs;
use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use hypercube_store::{BlobStore, COMPRESSED_SUBDIR, SpiderConfig, StoreError};

fn setup() -> (tempfile::TempDir, BlobStore) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let store = BlobStore::new(dir.path().join("ugc"), dir.path().join("tmp"));
    store.init().expect("failed to init store");
    (dir, store)
}

fn put(store: &BlobStore, bytes: &[u8]) -> String {
    let mut writer = store.allocate().unwrap();
    writer.write_all(bytes).unwrap();
    let digest = writer.finish().unwrap();
    store.commit(&digest).unwrap();
    digest
}

#[test]
fn test_identical_bodies_share_one_blob() {
    let (_dir, store) = setup();
    let first = put(&store, b"{\"value\": [1]}");
    let second = put(&store, b"{\"value\": [1]}");
    let third = put(&store, b"{\"value\": [2]}");

    assert_eq!(first, second);
    assert_ne!(first, third);
    let files = fs::read_dir(store.blob_dir())
        .unwrap()
        .filter(|e| e.as_ref().unwrap().path().is_file())
        .count();
    assert_eq!(files, 2);
}

#[test]
fn test_compressed_blob_read_transparently() {
    let (_dir, store) = setup();
    let digest = put(&store, b"archived body");
    let plain = store.blob_dir().join(&digest);

    let gz_dir = store.blob_dir().join(COMPRESSED_SUBDIR);
    fs::create_dir_all(&gz_dir).unwrap();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&fs::read(&plain).unwrap()).unwrap();
    fs::write(gz_dir.join(&digest), encoder.finish().unwrap()).unwrap();
    fs::remove_file(&plain).unwrap();

    assert!(store.contains(&digest));
    assert_eq!(store.read(&digest).unwrap(), b"archived body");
    store.verify(&digest).unwrap();
}

#[test]
fn test_verify_detects_tampering() {
    let (_dir, store) = setup();
    let digest = put(&store, b"original");
    fs::write(store.blob_dir().join(&digest), b"tampered").unwrap();

    match store.verify(&digest) {
        Err(StoreError::DigestMismatch { expected, actual }) => {
            assert_eq!(expected, digest);
            assert_ne!(actual, digest);
        }
        other => panic!("expected digest mismatch, got {other:?}"),
    }
}

#[test]
fn test_config_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hypercube.yml");
    let mut config = SpiderConfig::default();
    config.retry.initial_secs = 1;
    config.extras_dir = Some("extras".into());
    config.save(&path).unwrap();

    let loaded = SpiderConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}
