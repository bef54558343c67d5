//! Content-addressed storage for fetched response bodies.
//!
//! Bodies come from outside and are never stored under a caller-supplied
//! name. A [`BlobWriter`] streams bytes into a per-process staging file while
//! hashing them; [`BlobWriter::finish`] renames the staging file to its
//! SHA-256 digest. The blob stays in the staging directory until
//! [`BlobStore::commit`] promotes it, so that the caller can record the
//! digest in a database transaction first and abandon the staged file if
//! that transaction fails.
//!
//! Committed blobs are immutable. Identical bodies share one file.
//!
//! # Example
//!
//! ```no_run
//! use std::io::{Read, Write};
//! use hypercube_store::BlobStore;
//!
//! let store = BlobStore::new("ugc", "tmp");
//! store.init().unwrap();
//!
//! let mut writer = store.allocate().unwrap();
//! writer.write_all(b"{\"value\": []}").unwrap();
//! let digest = writer.finish().unwrap();
//! store.commit(&digest).unwrap();
//!
//! let mut body = String::new();
//! store.open(&digest).unwrap().read_to_string(&mut body).unwrap();
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};

use crate::error::{Result, StoreError};

/// Subdirectory of the blob directory holding gzip-compressed blobs.
pub const COMPRESSED_SUBDIR: &str = "gz";

/// A directory pair holding staged and committed blobs.
#[derive(Debug, Clone)]
pub struct BlobStore {
    blob_dir: PathBuf,
    staging_dir: PathBuf,
}

impl BlobStore {
    pub fn new(blob_dir: impl Into<PathBuf>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            blob_dir: blob_dir.into(),
            staging_dir: staging_dir.into(),
        }
    }

    /// Creates the blob and staging directories if they are missing.
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.blob_dir)?;
        fs::create_dir_all(&self.staging_dir)?;
        Ok(())
    }

    pub fn blob_dir(&self) -> &Path {
        &self.blob_dir
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Opens a new staging file for this process.
    ///
    /// A stale staging file left by a crashed run with the same process id
    /// is truncated.
    pub fn allocate(&self) -> Result<BlobWriter> {
        let temp_path = self
            .staging_dir
            .join(format!("temp-{}", std::process::id()));
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        Ok(BlobWriter {
            file: BufWriter::new(file),
            temp_path,
            staging_dir: self.staging_dir.clone(),
            hasher: Sha256::new(),
            written: 0,
        })
    }

    /// Moves a finished blob from staging into permanent storage.
    pub fn commit(&self, digest: &str) -> Result<PathBuf> {
        validate_digest(digest)?;
        let target = self.blob_dir.join(digest);
        fs::rename(self.staging_dir.join(digest), &target)?;
        tracing::debug!(digest, "committed blob");
        Ok(target)
    }

    /// Removes a finished but uncommitted blob from staging.
    pub fn discard(&self, digest: &str) -> Result<()> {
        validate_digest(digest)?;
        match fs::remove_file(self.staging_dir.join(digest)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns `true` if a committed blob exists, plain or compressed.
    pub fn contains(&self, digest: &str) -> bool {
        validate_digest(digest).is_ok()
            && (self.blob_dir.join(digest).is_file()
                || self.compressed_path(digest).is_file())
    }

    /// Opens a committed blob for reading.
    ///
    /// The plain file is tried first, then a gzip-compressed copy under
    /// [`COMPRESSED_SUBDIR`], which is decompressed transparently.
    pub fn open(&self, digest: &str) -> Result<Box<dyn Read>> {
        validate_digest(digest)?;
        match File::open(self.blob_dir.join(digest)) {
            Ok(file) => return Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
            Err(_) => {}
        }
        match File::open(self.compressed_path(digest)) {
            Ok(file) => Ok(Box::new(GzDecoder::new(BufReader::new(file)))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::BlobNotFound(digest.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reads a committed blob fully into memory.
    pub fn read(&self, digest: &str) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.open(digest)?.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// Re-hashes a committed blob and checks it against its name.
    pub fn verify(&self, digest: &str) -> Result<()> {
        let mut hasher = Sha256::new();
        io::copy(&mut self.open(digest)?, &mut hasher)?;
        let actual = format!("{:x}", hasher.finalize());
        if actual != digest {
            return Err(StoreError::DigestMismatch {
                expected: digest.to_string(),
                actual,
            });
        }
        Ok(())
    }

    fn compressed_path(&self, digest: &str) -> PathBuf {
        self.blob_dir.join(COMPRESSED_SUBDIR).join(digest)
    }
}

/// Writable staging file that hashes everything written to it.
pub struct BlobWriter {
    file: BufWriter<File>,
    temp_path: PathBuf,
    staging_dir: PathBuf,
    hasher: Sha256,
    written: u64,
}

impl BlobWriter {
    /// Number of bytes accepted so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flushes the file and renames it to its digest inside staging.
    ///
    /// Returns the lowercase hex digest, which is the name to pass to
    /// [`BlobStore::commit`].
    pub fn finish(mut self) -> Result<String> {
        self.file.flush()?;
        self.file.get_ref().sync_all()?;
        let digest = format!("{:x}", self.hasher.finalize_reset());
        fs::rename(&self.temp_path, self.staging_dir.join(&digest))?;
        Ok(digest)
    }
}

impl Write for BlobWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.file.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Checks that a digest is 64 lowercase hex characters.
///
/// Digests become file names, so anything else is refused.
pub fn validate_digest(digest: &str) -> Result<()> {
    let ok = digest.len() == 64
        && digest
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidDigest(digest.to_string()))
    }
}
