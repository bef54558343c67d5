//! Fetch cache index.
//!
//! One row per completed fetch, keyed by `(uri, timestamp)`. Column names
//! mirror the HTTP headers they record, so every statement quotes them.

use hypercube_core::CacheEntry;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::quote::{quote_identifier, quote_list};
use crate::steps::CACHE_TABLE;

const COLUMNS: [&str; 10] = [
    "uri",
    "timestamp",
    "status",
    "content-type",
    "content-length",
    "cache-control",
    "pragma",
    "expires",
    "date",
    "filename",
];

fn select_sql(filter: &str) -> Result<String> {
    Ok(format!(
        "SELECT {} FROM {} WHERE {filter}",
        quote_list(COLUMNS)?,
        quote_identifier(CACHE_TABLE)?
    ))
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<CacheEntry> {
    Ok(CacheEntry {
        uri: row.get(0)?,
        timestamp: row.get(1)?,
        status: row.get(2)?,
        content_type: row.get(3)?,
        content_length: row.get(4)?,
        cache_control: row.get(5)?,
        pragma: row.get(6)?,
        expires: row.get(7)?,
        date: row.get(8)?,
        digest: row.get(9)?,
    })
}

/// Returns the most recent fetch of `uri`, if any.
pub fn lookup(conn: &Connection, uri: &str) -> Result<Option<CacheEntry>> {
    let sql = select_sql("`uri` = ?1 ORDER BY `timestamp` DESC LIMIT 1")?;
    let mut stmt = conn.prepare_cached(&sql)?;
    Ok(stmt.query_row([uri], from_row).optional()?)
}

/// Returns the fetch of `uri` recorded at exactly `timestamp`.
pub fn get(conn: &Connection, uri: &str, timestamp: &str) -> Result<Option<CacheEntry>> {
    let sql = select_sql("`uri` = ?1 AND `timestamp` = ?2")?;
    let mut stmt = conn.prepare_cached(&sql)?;
    Ok(stmt.query_row([uri, timestamp], from_row).optional()?)
}

/// Appends one fetch record.
pub fn record(conn: &Connection, entry: &CacheEntry) -> Result<()> {
    let placeholders = (1..=COLUMNS.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({placeholders})",
        quote_identifier(CACHE_TABLE)?,
        quote_list(COLUMNS)?
    );
    conn.prepare_cached(&sql)?.execute(rusqlite::params![
        entry.uri,
        entry.timestamp,
        entry.status,
        entry.content_type,
        entry.content_length,
        entry.cache_control,
        entry.pragma,
        entry.expires,
        entry.date,
        entry.digest,
    ])?;
    Ok(())
}

/// Number of recorded fetches.
pub fn count(conn: &Connection) -> Result<usize> {
    let n: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_identifier(CACHE_TABLE)?),
        [],
        |row| row.get(0),
    )?;
    Ok(n as usize)
}

/// Distinct blob digests referenced by the index, in sorted order.
pub fn digests(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT DISTINCT `filename` FROM {} ORDER BY `filename`",
        quote_identifier(CACHE_TABLE)?
    ))?;
    let rows = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SchemaManager;

    fn entry(uri: &str, timestamp: &str, digest: &str) -> CacheEntry {
        CacheEntry {
            uri: uri.into(),
            timestamp: timestamp.into(),
            status: 200,
            content_type: Some("application/json".into()),
            content_length: Some(12),
            cache_control: Some("no-cache".into()),
            pragma: None,
            expires: Some("-1".into()),
            date: None,
            digest: digest.into(),
        }
    }

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        SchemaManager::default().upgrade(&conn).unwrap();
        conn
    }

    #[test]
    fn test_record_and_get() {
        let conn = setup();
        let e = entry("http://x/a", "2024-01-01T00:00:00Z", "d1");
        record(&conn, &e).unwrap();
        assert_eq!(get(&conn, "http://x/a", "2024-01-01T00:00:00Z").unwrap(), Some(e));
        assert_eq!(get(&conn, "http://x/a", "2025-01-01T00:00:00Z").unwrap(), None);
    }

    #[test]
    fn test_lookup_returns_latest() {
        let conn = setup();
        record(&conn, &entry("http://x/a", "2024-01-01T00:00:00Z", "old")).unwrap();
        record(&conn, &entry("http://x/a", "2024-06-01T00:00:00Z", "new")).unwrap();
        record(&conn, &entry("http://x/b", "2024-01-01T00:00:00Z", "old")).unwrap();

        assert_eq!(lookup(&conn, "http://x/a").unwrap().unwrap().digest, "new");
        assert!(lookup(&conn, "http://x/c").unwrap().is_none());
        assert_eq!(count(&conn).unwrap(), 3);
        assert_eq!(digests(&conn).unwrap(), vec!["new", "old"]);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let conn = setup();
        let e = entry("http://x/a", "2024-01-01T00:00:00Z", "d1");
        record(&conn, &e).unwrap();
        assert!(record(&conn, &e).is_err());
    }
}
