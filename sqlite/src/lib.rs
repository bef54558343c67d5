//! SQLite warehouse for the StatsWales2 OData catalogue.
//!
//! This crate owns everything that touches the relational store: the
//! versioned schema, nested transactions, the fetch cache index, and the
//! declarative row-loading primitives the feed loaders are built from.
//!
//! # Architecture
//!
//! - **`steps`**: the append-only list of DDL statements
//! - **`migration`**: version tracking, upgrade and purge
//! - **`txn`**: savepoint-based nested transactions
//! - **`rows`**: column maps, converters and insert/check/ignore procedures
//! - **`uri_cache`**: the `(uri, timestamp)` fetch index
//! - **`checks`**: cross-language consistency views
//!
//! # Quick start
//!
//! ```no_run
//! use hypercube_sqlite::{ColumnMap, RowProcedure, SchemaManager};
//! use rusqlite::Connection;
//!
//! let conn = Connection::open("statswales2.hypercube.sqlite").unwrap();
//! conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
//! SchemaManager::default().upgrade(&conn).unwrap();
//!
//! let insert = RowProcedure::insert(
//!     "odata_dimension_type",
//!     ColumnMap::new()
//!         .field("semantic_key", "SemanticKey")
//!         .field("type", "Type")
//!         .field("subtype", "SubType"),
//! )
//! .unwrap();
//! ```

mod checks;
mod error;
mod migration;
mod quote;
mod rows;
mod steps;
mod txn;
pub mod uri_cache;

pub use checks::{CheckResult, run_checks};
pub use error::{Result, SqliteError};
pub use migration::{SchemaManager, SchemaStatus, UpgradeReport, VERSION_KEY};
pub use quote::{quote_identifier, quote_list};
pub use rows::{
    Autoincrement, Binding, ColumnMap, Converter, RowOutcome, RowProcedure, Strategy, apply_all,
    json_to_sql,
};
pub use steps::{CACHE_TABLE, MIGRATIONS};
pub use txn::with_savepoint;
