//! Blob storage and configuration for the hypercube spider.
//!
//! - [`BlobStore`] keeps fetched response bodies under their SHA-256
//!   digest, with a staging area so that a body only becomes permanent
//!   once the caller has recorded it.
//! - [`SpiderConfig`] is the YAML configuration shared by the spider and
//!   the command-line tool.

mod blob;
mod config;
mod error;

pub use blob::{BlobStore, BlobWriter, COMPRESSED_SUBDIR, validate_digest};
pub use config::{DEFAULT_ENGLISH_BASE, DEFAULT_WELSH_BASE, RetryConfig, SpiderConfig};
pub use error::{Result, StoreError};
