//! Integration tests for the hypercube-sqlite crate.

use hypercube_core::{CacheEntry, Item};
use hypercube_sqlite::{
    Autoincrement, ColumnMap, MIGRATIONS, RowOutcome, RowProcedure, SchemaManager, SqliteError,
    uri_cache, with_savepoint,
};
use rusqlite::Connection;
use serde_json::json;

fn item(value: serde_json::Value) -> Item {
    value.as_object().cloned().expect("fixture must be an object")
}

/// Dumps the full schema text so two states can be compared.
fn schema_dump(conn: &Connection) -> Vec<(String, String, Option<String>)> {
    let mut stmt = conn
        .prepare("SELECT type, name, sql FROM sqlite_master ORDER BY type, name")
        .unwrap();
    stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
        .unwrap()
        .collect::<rusqlite::Result<_>>()
        .unwrap()
}

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    SchemaManager::default().upgrade(&conn).unwrap();
    conn
}

fn cache_entry(uri: &str) -> CacheEntry {
    CacheEntry {
        uri: uri.to_string(),
        timestamp: "2024-08-09T17:33:00.000000Z".to_string(),
        status: 200,
        content_type: Some("application/json".to_string()),
        content_length: None,
        cache_control: None,
        pragma: None,
        expires: None,
        date: None,
        digest: "ab".repeat(32),
    }
}

// ---------------------------------------------------------------------------
// Migrations
// ---------------------------------------------------------------------------

#[test]
fn test_upgrade_is_idempotent() {
    let conn = Connection::open_in_memory().unwrap();
    let schema = SchemaManager::default();

    let first = schema.upgrade(&conn).unwrap();
    let dump = schema_dump(&conn);
    let second = schema.upgrade(&conn).unwrap();

    assert!(first.changed());
    assert!(!second.changed());
    assert_eq!(second.from, MIGRATIONS.len());
    assert_eq!(schema.current_version(&conn).unwrap(), MIGRATIONS.len());
    assert_eq!(schema_dump(&conn), dump);
}

#[test]
fn test_upgrade_is_monotonic() {
    let conn = Connection::open_in_memory().unwrap();
    let mut last = 0;
    for known in [1, 2, 5, 5, 12, MIGRATIONS.len()] {
        let schema = SchemaManager::new(MIGRATIONS[..known].iter().copied());
        let report = schema.upgrade(&conn).unwrap();
        assert_eq!(report.from, last);
        assert_eq!(report.to, known);
        assert!(report.to >= report.from);
        last = schema.current_version(&conn).unwrap();
        assert_eq!(last, known);
    }
}

#[test]
fn test_appended_step_applies_only_the_new_step() {
    let conn = Connection::open_in_memory().unwrap();
    SchemaManager::default().upgrade(&conn).unwrap();

    let mut steps: Vec<&str> = MIGRATIONS.to_vec();
    steps.push("CREATE TABLE `later_addition` (`x` INTEGER);");
    let report = SchemaManager::new(steps).upgrade(&conn).unwrap();
    assert_eq!(report.from, MIGRATIONS.len());
    assert_eq!(report.to, MIGRATIONS.len() + 1);

    let exists: bool = conn
        .query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE name = 'later_addition')",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert!(exists);
}

#[test]
fn test_stored_version_beyond_known_steps_is_fatal() {
    let conn = setup();
    conn.execute(
        "UPDATE db_meta SET value = ?1 WHERE key = 'schema_version'",
        [MIGRATIONS.len() as i64 + 3],
    )
    .unwrap();
    assert!(matches!(
        SchemaManager::default().upgrade(&conn),
        Err(SqliteError::SchemaTooNew { .. })
    ));
}

#[test]
fn test_purge_keeps_only_the_fetch_cache() {
    let dir = tempfile::tempdir().unwrap();
    let conn = Connection::open(dir.path().join("purge.sqlite")).unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    let schema = SchemaManager::default();
    schema.upgrade(&conn).unwrap();

    uri_cache::record(&conn, &cache_entry("http://x/dataset")).unwrap();
    conn.execute_batch(
        "INSERT INTO dataset_collection VALUES ('agri0001', 'agri0001');
         INSERT INTO dataset_collection_info VALUES ('agri0001', 'en-gb');",
    )
    .unwrap();

    schema.purge(&conn).unwrap();
    assert_eq!(schema.current_version(&conn).unwrap(), 0);
    let remaining: Vec<String> = schema_dump(&conn)
        .into_iter()
        .filter(|(kind, _, _)| kind == "table" || kind == "view")
        .map(|(_, name, _)| name)
        .collect();
    assert_eq!(remaining, vec!["spider_uri_cache".to_string()]);

    let fk: bool = conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0)).unwrap();
    assert!(fk);

    schema.upgrade(&conn).unwrap();
    assert_eq!(uri_cache::count(&conn).unwrap(), 1);
    let collections: i64 = conn
        .query_row("SELECT COUNT(*) FROM dataset_collection", [], |r| r.get(0))
        .unwrap();
    assert_eq!(collections, 0);
}

// ---------------------------------------------------------------------------
// Row procedures against the warehouse schema
// ---------------------------------------------------------------------------

#[test]
fn test_insert_then_check_collection() {
    let conn = setup();
    let insert = RowProcedure::insert(
        "dataset_collection",
        ColumnMap::new().field("dataset", "Dataset").field("href", "Href"),
    )
    .unwrap();
    let check = RowProcedure::check(
        "dataset_collection",
        ColumnMap::new().field("dataset", "Dataset").field("href", "Href"),
    )
    .unwrap();

    let row = item(json!({"Dataset": "equ1014", "Href": null}));
    assert_eq!(insert.apply(&conn, &row).unwrap(), RowOutcome::Inserted);
    // NULL matches NULL.
    assert_eq!(check.apply(&conn, &row).unwrap(), RowOutcome::Checked);

    let other = item(json!({"Dataset": "equ1014", "Href": "equ1014"}));
    assert!(matches!(
        check.apply(&conn, &other),
        Err(SqliteError::CheckFailed { matched: 0, .. })
    ));
}

#[test]
fn test_foreign_keys_are_enforced() {
    let conn = setup();
    let insert = RowProcedure::insert(
        "dataset_collection_info",
        ColumnMap::new()
            .field("dataset", "Dataset")
            .constant("lang", "en-gb".to_string()),
    )
    .unwrap();
    assert!(matches!(
        insert.apply(&conn, &item(json!({"Dataset": "nope0001"}))),
        Err(SqliteError::DatabaseError(_))
    ));
}

#[test]
fn test_failed_savepoint_discards_partial_rows() {
    let conn = setup();
    let index = Autoincrement::new(0);
    let insert = RowProcedure::insert(
        "odata_dimension_type",
        ColumnMap::new()
            .field("semantic_key", "SemanticKey")
            .field("type", "Type")
            .field("subtype", "SubType"),
    )
    .unwrap();

    let result: Result<(), SqliteError> = with_savepoint(&conn, "loader", |conn| {
        for key in ["Area", "Year"] {
            index.next_value();
            insert.apply(
                conn,
                &item(json!({"SemanticKey": key, "Type": "t", "SubType": "s"})),
            )?;
        }
        insert.apply(conn, &item(json!({"SemanticKey": "Broken"})))?;
        Ok(())
    });

    assert!(matches!(result, Err(SqliteError::MissingField(_))));
    assert_eq!(index.peek(), 2);
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM odata_dimension_type", [], |r| r.get(0))
        .unwrap();
    assert_eq!(rows, 0);
}
