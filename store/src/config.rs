//! Spider configuration.
//!
//! Defines the YAML-serializable settings for a crawl: where the database
//! and blob directories live, which hosts serve each language, and how
//! aggressively to back off on timeouts. Every field has a default, so an
//! empty file (or no file at all) yields a working configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! database: statswales2.hypercube.sqlite
//! blob_dir: ugc
//! staging_dir: tmp
//! extras_dir: extras
//! english_base: http://open.statswales.gov.wales/en-gb/
//! welsh_base: http://agored.statscymru.llyw.cymru/cy-gb/
//! retry:
//!   initial_secs: 64
//!   max_secs: 512
//! user_agent: hypercube/0.1
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default English service root.
pub const DEFAULT_ENGLISH_BASE: &str = "http://open.statswales.gov.wales/en-gb/";
/// Default Welsh service root.
pub const DEFAULT_WELSH_BASE: &str = "http://agored.statscymru.llyw.cymru/cy-gb/";

/// Timeout and backoff settings for fetches.
///
/// The first request uses `initial_secs` for both the connect and the read
/// timeout. After each timeout the fetcher sleeps for the current interval
/// and doubles it, up to `max_secs`.
///
/// # Examples
///
/// ```
/// # use hypercube_store::RetryConfig;
/// let retry = RetryConfig::default();
/// assert_eq!(retry.initial_secs, 64);
/// assert_eq!(retry.max_secs, 512);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub initial_secs: u64,
    pub max_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_secs: 64,
            max_secs: 512,
        }
    }
}

/// Top-level spider configuration.
///
/// # Examples
///
/// ```no_run
/// use hypercube_store::SpiderConfig;
///
/// let config = SpiderConfig::load("hypercube.yml").unwrap();
/// println!("writing to {}", config.database.display());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpiderConfig {
    /// SQLite database file.
    pub database: PathBuf,
    /// Directory of committed blobs.
    pub blob_dir: PathBuf,
    /// Directory of staged blobs. Must be on the same filesystem as
    /// `blob_dir` so that commits are atomic renames.
    pub staging_dir: PathBuf,
    /// Directory holding hand-authored `extra.*` supplementary files.
    pub extras_dir: Option<PathBuf>,
    pub english_base: String,
    pub welsh_base: String,
    pub retry: RetryConfig,
    pub user_agent: String,
}

impl Default for SpiderConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("statswales2.hypercube.sqlite"),
            blob_dir: PathBuf::from("ugc"),
            staging_dir: PathBuf::from("tmp"),
            extras_dir: None,
            english_base: DEFAULT_ENGLISH_BASE.to_string(),
            welsh_base: DEFAULT_WELSH_BASE.to_string(),
            retry: RetryConfig::default(),
            user_agent: concat!("hypercube/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl SpiderConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::StoreError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::StoreError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let config = serde_yaml::from_reader(BufReader::new(file))?;
        Ok(config)
    }

    /// Writes the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_yaml::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Path of a supplementary file, if an extras directory is configured.
    pub fn extra_path(&self, name: &str) -> Option<PathBuf> {
        self.extras_dir.as_ref().map(|dir| dir.join(name))
    }

    /// Rebases relative paths onto `root`.
    pub fn rooted_at(mut self, root: &Path) -> Self {
        let rebase = |p: PathBuf| if p.is_relative() { root.join(p) } else { p };
        self.database = rebase(self.database);
        self.blob_dir = rebase(self.blob_dir);
        self.staging_dir = rebase(self.staging_dir);
        self.extras_dir = self.extras_dir.map(rebase);
        self
    }
}
