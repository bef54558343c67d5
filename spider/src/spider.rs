//! The crawl context.
//!
//! [`Spider`] owns everything a crawl touches: the database connection,
//! the blob store, the transport and the configuration. Loaders borrow it;
//! nothing is global.

use std::time::Duration;

use hypercube_core::Lang;
use hypercube_sqlite::{SchemaManager, SchemaStatus, UpgradeReport, uri_cache};
use hypercube_store::{BlobStore, SpiderConfig};
use rusqlite::Connection;
use tracing::info;

use crate::error::{Result, SpiderError};
use crate::transport::{HttpTransport, Transport};

/// Blocks the current thread between retries.
pub type Sleeper = Box<dyn Fn(Duration)>;

/// An open warehouse plus everything needed to fill it.
pub struct Spider {
    pub(crate) conn: Connection,
    pub(crate) blobs: BlobStore,
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) sleeper: Sleeper,
    pub(crate) config: SpiderConfig,
    pub(crate) schema: SchemaManager,
}

impl Spider {
    /// Opens the configured database, brings its schema up to date and
    /// creates the blob directories, using the HTTP transport.
    pub fn initialise(config: SpiderConfig) -> Result<Self> {
        let conn = Connection::open(&config.database)?;
        let transport = HttpTransport::new(config.user_agent.clone());
        Self::with_transport(conn, config, Box::new(transport))
    }

    /// Like [`initialise`](Self::initialise) with a caller-supplied
    /// connection and transport.
    pub fn with_transport(
        conn: Connection,
        config: SpiderConfig,
        transport: Box<dyn Transport>,
    ) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let schema = SchemaManager::default();
        let UpgradeReport { from, to } = schema.upgrade(&conn)?;
        let blobs = BlobStore::new(&config.blob_dir, &config.staging_dir);
        blobs.init()?;
        info!(database = %config.database.display(), from, to, "initialised");

        Ok(Self {
            conn,
            blobs,
            transport,
            sleeper: Box::new(std::thread::sleep),
            config,
            schema,
        })
    }

    /// Replaces the function used to wait between retries.
    pub fn with_sleeper(mut self, sleeper: impl Fn(Duration) + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn config(&self) -> &SpiderConfig {
        &self.config
    }

    /// Base URI of the service in `lang`.
    pub fn base(&self, lang: Lang) -> &str {
        match lang {
            Lang::English => &self.config.english_base,
            Lang::Welsh => &self.config.welsh_base,
        }
    }

    pub fn schema_status(&self) -> Result<SchemaStatus> {
        Ok(self.schema.status(&self.conn)?)
    }

    pub fn cache_entries(&self) -> Result<usize> {
        Ok(uri_cache::count(&self.conn)?)
    }

    /// Drops every loaded table, keeping the fetch cache, and recreates an
    /// empty schema.
    pub fn purge_database(&self) -> Result<()> {
        self.schema.purge(&self.conn)?;
        self.schema.upgrade(&self.conn)?;
        Ok(())
    }

    /// Closes the database connection.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| SpiderError::from(e))
    }
}
