//! Cross-language consistency reports.
//!
//! The schema defines views that list rows present in one language but not
//! the other. Views named `check_*` must be empty after a good load; the
//! others are informational reports on known source defects.

use rusqlite::Connection;

use crate::error::Result;
use crate::quote::quote_identifier;

/// Row count of one consistency view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub view: String,
    pub rows: usize,
}

impl CheckResult {
    /// Whether an empty result is required.
    pub fn is_check(&self) -> bool {
        self.view.starts_with("check_")
    }

    pub fn passed(&self) -> bool {
        !self.is_check() || self.rows == 0
    }
}

/// Counts the rows of every view in the database, sorted by name.
pub fn run_checks(conn: &Connection) -> Result<Vec<CheckResult>> {
    let views: Vec<String> = {
        let mut stmt =
            conn.prepare("SELECT name FROM sqlite_master WHERE type = 'view' ORDER BY name")?;
        stmt.query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?
    };

    let mut results = Vec::with_capacity(views.len());
    for view in views {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(&view)?);
        let rows: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        if rows > 0 {
            tracing::debug!(view = %view, rows, "view returned rows");
        }
        results.push(CheckResult {
            view,
            rows: rows as usize,
        });
    }
    Ok(results)
}
