//! Schema versioning for the warehouse database.
//!
//! Provides [`SchemaManager`], which applies the append-only
//! [`MIGRATIONS`](crate::MIGRATIONS) list and records how many steps have
//! been applied in `db_meta`. The count is the schema version: it never
//! decreases, and a database whose version exceeds the known steps was
//! written by newer code and is refused.
//!
//! # Example
//!
//! ```no_run
//! use hypercube_sqlite::SchemaManager;
//! use rusqlite::Connection;
//!
//! let conn = Connection::open("statswales2.hypercube.sqlite").unwrap();
//! let schema = SchemaManager::default();
//!
//! let report = schema.upgrade(&conn).unwrap();
//! println!("schema {} -> {}", report.from, report.to);
//!
//! // Destructive reset: drops everything but the fetch cache index.
//! schema.purge(&conn).unwrap();
//! schema.upgrade(&conn).unwrap();
//! ```

use rusqlite::{Connection, OptionalExtension};

use crate::error::{Result, SqliteError};
use crate::quote::quote_identifier;
use crate::steps::{CACHE_TABLE, MIGRATIONS};
use crate::txn::with_savepoint;

/// `db_meta` key holding the applied-step count.
pub const VERSION_KEY: &str = "schema_version";

/// Version movement performed by one [`SchemaManager::upgrade`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeReport {
    pub from: usize,
    pub to: usize,
}

impl UpgradeReport {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Snapshot of the schema state of a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaStatus {
    pub version: usize,
    pub known_steps: usize,
}

impl SchemaStatus {
    pub fn is_current(&self) -> bool {
        self.version == self.known_steps
    }
}

/// Applies an ordered list of migration steps to a connection.
///
/// The first step must create `db_meta(key, value)`. A database with the
/// table but no version row counts as version 1.
#[derive(Debug, Clone)]
pub struct SchemaManager {
    steps: Vec<String>,
}

impl Default for SchemaManager {
    fn default() -> Self {
        Self::new(MIGRATIONS.iter().copied())
    }
}

impl SchemaManager {
    /// Creates a manager for a custom step list.
    pub fn new<S: Into<String>>(steps: impl IntoIterator<Item = S>) -> Self {
        Self {
            steps: steps.into_iter().map(Into::into).collect(),
        }
    }

    pub fn known_steps(&self) -> usize {
        self.steps.len()
    }

    /// Returns the number of steps already applied.
    pub fn current_version(&self, conn: &Connection) -> Result<usize> {
        let has_meta: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'db_meta')",
            [],
            |row| row.get(0),
        )?;
        if !has_meta {
            return Ok(0);
        }

        let stored: Option<i64> = conn
            .query_row(
                "SELECT `value` FROM `db_meta` WHERE `key` = ?1",
                [VERSION_KEY],
                |row| row.get(0),
            )
            .optional()?;
        match stored {
            None => Ok(1),
            Some(v) => usize::try_from(v)
                .map_err(|_| SqliteError::MigrationError(format!("corrupt schema version {v}"))),
        }
    }

    pub fn status(&self, conn: &Connection) -> Result<SchemaStatus> {
        Ok(SchemaStatus {
            version: self.current_version(conn)?,
            known_steps: self.known_steps(),
        })
    }

    /// Applies every step not yet applied, then records the new version.
    ///
    /// All steps run inside one savepoint, so a failing step leaves the
    /// version unchanged. Calling this on a current database does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::SchemaTooNew`] if the stored version exceeds
    /// the known step count.
    pub fn upgrade(&self, conn: &Connection) -> Result<UpgradeReport> {
        let from = self.current_version(conn)?;
        let to = self.known_steps();
        if from > to {
            return Err(SqliteError::SchemaTooNew {
                found: from,
                known: to,
            });
        }
        if from == to {
            tracing::debug!(version = from, "schema is current");
            return Ok(UpgradeReport { from, to });
        }

        with_savepoint(conn, "schema_upgrade", |conn| {
            for (index, step) in self.steps.iter().enumerate().skip(from) {
                conn.execute_batch(step).map_err(|e| {
                    SqliteError::MigrationError(format!("step {index} failed: {e}"))
                })?;
            }
            conn.execute(
                "INSERT OR REPLACE INTO `db_meta` (`key`, `value`) VALUES (?1, ?2)",
                rusqlite::params![VERSION_KEY, to as i64],
            )?;
            Ok::<_, SqliteError>(())
        })?;

        tracing::info!(from, to, "upgraded schema");
        Ok(UpgradeReport { from, to })
    }

    /// Drops every table and view except the fetch cache index.
    ///
    /// The database is left at version 0; call [`upgrade`](Self::upgrade)
    /// afterwards to recreate an empty schema. Foreign keys are disabled
    /// for the drop and the file is vacuumed afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InTransaction`] if a transaction is open,
    /// since neither the foreign key pragma nor `VACUUM` work inside one.
    pub fn purge(&self, conn: &Connection) -> Result<()> {
        if !conn.is_autocommit() {
            return Err(SqliteError::InTransaction);
        }

        let foreign_keys: bool = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
        let dropped = with_savepoint(conn, "purge_database", drop_all);
        let restored = conn.execute_batch(if foreign_keys {
            "PRAGMA foreign_keys = ON;"
        } else {
            "PRAGMA foreign_keys = OFF;"
        });
        let dropped = dropped?;
        restored?;

        conn.execute_batch("VACUUM;")?;
        tracing::info!(dropped, "purged database");
        Ok(())
    }
}

fn drop_all(conn: &Connection) -> Result<usize> {
    let objects = {
        let mut stmt = conn.prepare(
            "SELECT type, name FROM sqlite_master
             WHERE type IN ('table', 'view') AND name != ?1 AND name NOT LIKE 'sqlite_%'
             ORDER BY type DESC, name",
        )?;
        stmt.query_map([CACHE_TABLE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?
    };

    for (kind, name) in &objects {
        let keyword = if kind == "view" { "VIEW" } else { "TABLE" };
        conn.execute_batch(&format!("DROP {keyword} {};", quote_identifier(name)?))?;
    }
    Ok(objects.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |r| r.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_version_of_empty_database() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(SchemaManager::default().current_version(&conn).unwrap(), 0);
    }

    #[test]
    fn test_meta_table_without_version_row_is_version_one() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS[0]).unwrap();
        assert_eq!(SchemaManager::default().current_version(&conn).unwrap(), 1);
    }

    #[test]
    fn test_upgrade_and_status() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = SchemaManager::default();
        let report = schema.upgrade(&conn).unwrap();
        assert_eq!(report.from, 0);
        assert_eq!(report.to, MIGRATIONS.len());
        assert!(schema.status(&conn).unwrap().is_current());
        assert!(tables(&conn).contains(&"odata_dataset_dimension_item".to_string()));
    }

    #[test]
    fn test_refuses_newer_schema() {
        let conn = Connection::open_in_memory().unwrap();
        SchemaManager::default().upgrade(&conn).unwrap();
        let older = SchemaManager::new(MIGRATIONS[..3].iter().copied());
        match older.upgrade(&conn) {
            Err(SqliteError::SchemaTooNew { found, known }) => {
                assert_eq!(found, MIGRATIONS.len());
                assert_eq!(known, 3);
            }
            other => panic!("expected SchemaTooNew, got {other:?}"),
        }
    }

    #[test]
    fn test_failing_step_leaves_version_unchanged() {
        let conn = Connection::open_in_memory().unwrap();
        let good = SchemaManager::new(MIGRATIONS[..2].iter().copied());
        good.upgrade(&conn).unwrap();

        let mut steps: Vec<&str> = MIGRATIONS[..2].to_vec();
        steps.push("CREATE TABLE extra (x);");
        steps.push("THIS IS NOT SQL;");
        let bad = SchemaManager::new(steps);
        assert!(matches!(bad.upgrade(&conn), Err(SqliteError::MigrationError(_))));
        assert_eq!(bad.current_version(&conn).unwrap(), 2);
        assert!(!tables(&conn).contains(&"extra".to_string()));
    }

    #[test]
    fn test_purge_refuses_inside_transaction() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = SchemaManager::default();
        schema.upgrade(&conn).unwrap();
        conn.execute_batch("BEGIN;").unwrap();
        assert!(matches!(schema.purge(&conn), Err(SqliteError::InTransaction)));
        conn.execute_batch("ROLLBACK;").unwrap();
    }
}
