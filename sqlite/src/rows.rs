//! Declarative row loading.
//!
//! A [`ColumnMap`] lists target columns with the [`Converter`] that
//! produces each value from a feed item. A [`RowProcedure`] pairs a column
//! map with a table and a [`Strategy`]: insert the row, check that exactly
//! one equal row already exists, or ignore it.
//!
//! Every converter in a map is evaluated for every item, even after another
//! converter has returned [`Binding::Skip`], so stateful converters such as
//! [`Autoincrement`] advance once per candidate row whatever its fate. A
//! skip suppresses only that row's write.
//!
//! # Example
//!
//! ```
//! use hypercube_sqlite::{Autoincrement, ColumnMap, RowProcedure};
//! use rusqlite::Connection;
//!
//! let conn = Connection::open_in_memory().unwrap();
//! conn.execute_batch("CREATE TABLE alt (n INTEGER, code TEXT NOT NULL);").unwrap();
//!
//! let counter = Autoincrement::new(0);
//! let insert = RowProcedure::insert(
//!     "alt",
//!     ColumnMap::new()
//!         .autoincrement("n", &counter)
//!         .non_empty("code", "AltCode1"),
//! )
//! .unwrap();
//!
//! let item = serde_json::json!({"AltCode1": ""});
//! insert.apply(&conn, item.as_object().unwrap()).unwrap();
//! assert_eq!(counter.peek(), 1);
//! ```

use std::cell::Cell;
use std::fmt::Write as _;
use std::rc::Rc;

use hypercube_core::Item;
use rusqlite::Connection;
use rusqlite::types::Value;

use crate::error::{Result, SqliteError};
use crate::quote::{quote_identifier, quote_list};

/// Result of one converter for one item.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Value(Value),
    /// The item has no usable value for this column; do not write the row.
    Skip,
}

/// A shared counter yielding `start`, `start + 1`, … on successive calls.
///
/// Clones share the same counter. Create a fresh one per loading pass.
#[derive(Debug, Clone)]
pub struct Autoincrement(Rc<Cell<i64>>);

impl Autoincrement {
    pub fn new(start: i64) -> Self {
        Self(Rc::new(Cell::new(start)))
    }

    /// Returns the current value and advances.
    pub fn next_value(&self) -> i64 {
        let n = self.0.get();
        self.0.set(n + 1);
        n
    }

    /// The value the next call will return.
    pub fn peek(&self) -> i64 {
        self.0.get()
    }
}

/// How a column value is produced from a feed item.
#[derive(Debug, Clone)]
pub enum Converter {
    /// The same value for every item.
    Constant(Value),
    /// The named field. A missing field is an error; JSON null binds NULL.
    Field(String),
    /// The named field, skipping the row when it is the empty string.
    NonEmptyField(String),
    /// The named field passed through a string transform.
    Mapped(String, fn(&str) -> String),
    /// The next value of a counter.
    Autoincrement(Autoincrement),
}

impl Converter {
    pub fn convert(&self, item: &Item) -> Result<Binding> {
        match self {
            Converter::Constant(value) => Ok(Binding::Value(value.clone())),
            Converter::Field(name) => Ok(Binding::Value(json_to_sql(lookup(item, name)?))),
            Converter::NonEmptyField(name) => match lookup(item, name)? {
                serde_json::Value::String(s) if s.is_empty() => Ok(Binding::Skip),
                other => Ok(Binding::Value(json_to_sql(other))),
            },
            Converter::Mapped(name, map) => match lookup(item, name)? {
                serde_json::Value::String(s) => Ok(Binding::Value(Value::Text(map(s)))),
                other => Err(SqliteError::MissingField(format!(
                    "{name} (expected a string, found {other})"
                ))),
            },
            Converter::Autoincrement(counter) => {
                Ok(Binding::Value(Value::Integer(counter.next_value())))
            }
        }
    }
}

fn lookup<'a>(item: &'a Item, name: &str) -> Result<&'a serde_json::Value> {
    item.get(name)
        .ok_or_else(|| SqliteError::MissingField(name.to_string()))
}

/// Maps a JSON value to the SQLite value it is stored as.
///
/// Booleans become 0/1. Arrays and objects are stored as JSON text.
pub fn json_to_sql(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Integer(i64::from(*b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map_or(Value::Null, Value::Real),
        },
        serde_json::Value::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

/// Ordered list of target columns and their converters.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    columns: Vec<(String, Converter)>,
}

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, name: impl Into<String>, converter: Converter) -> Self {
        self.columns.push((name.into(), converter));
        self
    }

    pub fn constant(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.column(name, Converter::Constant(value.into()))
    }

    pub fn field(self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.column(name, Converter::Field(field.into()))
    }

    pub fn non_empty(self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.column(name, Converter::NonEmptyField(field.into()))
    }

    pub fn mapped(
        self,
        name: impl Into<String>,
        field: impl Into<String>,
        map: fn(&str) -> String,
    ) -> Self {
        self.column(name, Converter::Mapped(field.into(), map))
    }

    pub fn autoincrement(self, name: impl Into<String>, counter: &Autoincrement) -> Self {
        self.column(name, Converter::Autoincrement(counter.clone()))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Evaluates every converter against `item`.
    ///
    /// Returns `None` if any converter skipped. Converters after the first
    /// skip still run.
    pub fn bind(&self, item: &Item) -> Result<Option<Vec<Value>>> {
        let mut values = Vec::with_capacity(self.columns.len());
        let mut skip = false;
        for (_, converter) in &self.columns {
            match converter.convert(item)? {
                Binding::Value(value) => values.push(value),
                Binding::Skip => skip = true,
            }
        }
        Ok(if skip { None } else { Some(values) })
    }
}

/// What a procedure does with a bound row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Insert,
    /// Assert exactly one NULL-safe equal row exists.
    Check,
    /// Evaluate converters, write nothing.
    Ignore,
}

/// Outcome of applying a procedure to one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    Inserted,
    Checked,
    Ignored,
    Skipped,
}

/// A table, a column map and a strategy, with its SQL prepared up front.
#[derive(Debug, Clone)]
pub struct RowProcedure {
    table: String,
    map: ColumnMap,
    strategy: Strategy,
    sql: String,
}

impl RowProcedure {
    /// Builds a procedure, generating its SQL.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidIdentifier`] if the table or a column
    /// name cannot be quoted.
    pub fn new(strategy: Strategy, table: impl Into<String>, map: ColumnMap) -> Result<Self> {
        let table = table.into();
        let quoted = quote_identifier(&table)?;
        let sql = match strategy {
            Strategy::Insert => {
                let placeholders = (1..=map.len())
                    .map(|i| format!("?{i}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "INSERT INTO {quoted} ({}) VALUES ({placeholders})",
                    quote_list(map.names())?
                )
            }
            Strategy::Check => {
                let mut sql = format!("SELECT COUNT(*) FROM {quoted} WHERE 1");
                for (i, name) in map.names().enumerate() {
                    let column = quote_identifier(name)?;
                    let n = i + 1;
                    let _ = write!(sql, " AND ({column} = ?{n} OR {column} IS ?{n})");
                }
                sql
            }
            Strategy::Ignore => String::new(),
        };
        Ok(Self {
            table,
            map,
            strategy,
            sql,
        })
    }

    pub fn insert(table: impl Into<String>, map: ColumnMap) -> Result<Self> {
        Self::new(Strategy::Insert, table, map)
    }

    pub fn check(table: impl Into<String>, map: ColumnMap) -> Result<Self> {
        Self::new(Strategy::Check, table, map)
    }

    pub fn ignore(table: impl Into<String>, map: ColumnMap) -> Result<Self> {
        Self::new(Strategy::Ignore, table, map)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Applies the procedure to one feed item.
    ///
    /// # Errors
    ///
    /// Converter failures and database errors propagate. A check matching
    /// zero or several rows returns [`SqliteError::CheckFailed`].
    pub fn apply(&self, conn: &Connection, item: &Item) -> Result<RowOutcome> {
        let Some(values) = self.map.bind(item)? else {
            return Ok(RowOutcome::Skipped);
        };

        match self.strategy {
            Strategy::Ignore => Ok(RowOutcome::Ignored),
            Strategy::Insert => {
                let mut stmt = conn.prepare_cached(&self.sql)?;
                if let Err(err) = stmt.execute(rusqlite::params_from_iter(values.iter())) {
                    tracing::error!(
                        table = %self.table,
                        sql = %self.sql,
                        bindings = %describe(&values),
                        error = %err,
                        "insert failed"
                    );
                    return Err(err.into());
                }
                Ok(RowOutcome::Inserted)
            }
            Strategy::Check => {
                let mut stmt = conn.prepare_cached(&self.sql)?;
                let matched: i64 =
                    stmt.query_row(rusqlite::params_from_iter(values.iter()), |row| row.get(0))?;
                if matched != 1 {
                    return Err(SqliteError::CheckFailed {
                        table: self.table.clone(),
                        matched: matched as usize,
                        bindings: describe(&values),
                    });
                }
                Ok(RowOutcome::Checked)
            }
        }
    }
}

/// Applies each procedure to `item` in order.
pub fn apply_all(conn: &Connection, procedures: &[RowProcedure], item: &Item) -> Result<()> {
    for procedure in procedures {
        procedure.apply(conn, item)?;
    }
    Ok(())
}

fn describe(values: &[Value]) -> String {
    let parts: Vec<String> = values
        .iter()
        .map(|v| match v {
            Value::Null => "NULL".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Real(r) => r.to_string(),
            Value::Text(s) => format!("{s:?}"),
            Value::Blob(b) => format!("<{} bytes>", b.len()),
        })
        .collect();
    format!("[{}]", parts.join(", "))
}
