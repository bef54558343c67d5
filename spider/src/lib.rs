//! Crawls the StatsWales2 OData service in English and Welsh and loads it
//! into a SQLite warehouse whose foreign keys and check views tie the two
//! languages together.
//!
//! # Architecture
//!
//! - [`Spider`] owns the database connection, blob store and transport.
//! - [`Spider::fetch`] serves every document through a content-addressed
//!   cache, retrying timeouts with exponential backoff.
//! - [`Spider::walk`] follows paginated JSON feeds and applies declarative
//!   row procedures to each item.
//! - [`Loader`] fills one group of tables; [`Spider::load_all`] runs them
//!   all in dependency order.
//!
//! # Example
//!
//! ```no_run
//! use hypercube_spider::Spider;
//! use hypercube_store::SpiderConfig;
//!
//! let spider = Spider::initialise(SpiderConfig::default())?;
//! spider.load_all()?;
//! spider.close()?;
//! # Ok::<(), hypercube_spider::SpiderError>(())
//! ```

mod error;
mod fetch;
mod load;
mod reconcile;
mod signature;
mod spider;
mod transport;
mod walker;
pub mod xml;

pub use error::{Result, SpiderError};
pub use fetch::{Backoff, build_uri};
pub use load::{
    EXTRA_DATASET_DIMENSIONS, EXTRA_PROPERTIES, Loader, MISSING_FROM_CATALOGUE,
    MISSING_FROM_DIMENSIONS, UNCHECKED_PROPERTIES,
};
pub use reconcile::{IndexCounters, dimension_key};
pub use signature::{ColumnSignature, Columns, DatasetSignature};
pub use spider::{Sleeper, Spider};
pub use transport::{HttpTransport, Response, Transport, TransportError};
pub use walker::{JSON_MIME, PageSource, WalkStats};
