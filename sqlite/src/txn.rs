//! Nested transactions built on SQLite savepoints.

use rusqlite::Connection;

use crate::error::SqliteError;
use crate::quote::quote_identifier;

/// Runs `f` inside `SAVEPOINT name`.
///
/// On success the savepoint is released. On error its work is rolled back
/// and the savepoint released before the error is returned, leaving any
/// enclosing transaction usable. Outside a transaction the savepoint
/// behaves like `BEGIN`/`COMMIT`, so sibling calls commit independently.
///
/// Works on a shared `&Connection`, so prepared statements cached on the
/// connection stay valid across savepoints.
pub fn with_savepoint<T, E, F>(conn: &Connection, name: &str, f: F) -> Result<T, E>
where
    F: FnOnce(&Connection) -> Result<T, E>,
    E: From<SqliteError>,
{
    let quoted = quote_identifier(name)?;
    conn.execute_batch(&format!("SAVEPOINT {quoted};"))
        .map_err(SqliteError::from)?;

    match f(conn) {
        Ok(value) => {
            conn.execute_batch(&format!("RELEASE {quoted};"))
                .map_err(SqliteError::from)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) =
                conn.execute_batch(&format!("ROLLBACK TO {quoted}; RELEASE {quoted};"))
            {
                tracing::warn!(savepoint = name, error = %rollback, "rollback failed");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (x INTEGER);").unwrap();
        conn
    }

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn test_release_keeps_work() {
        let conn = setup();
        let out: Result<i32, SqliteError> = with_savepoint(&conn, "sp", |c| {
            c.execute("INSERT INTO t VALUES (1)", [])?;
            Ok(7)
        });
        assert_eq!(out.unwrap(), 7);
        assert_eq!(count(&conn), 1);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn test_error_rolls_back_only_inner_work() {
        let conn = setup();
        let outer: Result<(), SqliteError> = with_savepoint(&conn, "outer", |c| {
            c.execute("INSERT INTO t VALUES (1)", [])?;
            let inner: Result<(), SqliteError> = with_savepoint(c, "inner", |c| {
                c.execute("INSERT INTO t VALUES (2)", [])?;
                Err(SqliteError::MigrationError("boom".into()))
            });
            assert!(inner.is_err());
            Ok(())
        });
        outer.unwrap();
        assert_eq!(count(&conn), 1);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn test_siblings_commit_independently() {
        let conn = setup();
        let first: Result<(), SqliteError> = with_savepoint(&conn, "first", |c| {
            c.execute("INSERT INTO t VALUES (1)", [])?;
            Ok(())
        });
        first.unwrap();
        let second: Result<(), SqliteError> = with_savepoint(&conn, "second", |c| {
            c.execute("INSERT INTO t VALUES (2)", [])?;
            Err(SqliteError::InTransaction)
        });
        assert!(second.is_err());
        assert_eq!(count(&conn), 1);
    }
}
