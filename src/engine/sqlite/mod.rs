//! `SQLite` Database Engine Implementation
//!
//! This module implements the `DatabaseEngine` trait for `SQLite` databases.
//!
//! # Features
//! - File-based connections (`/path/to/library.db`)
//! - In-memory connections (`:memory:`)
//! - Stored procedures emulated through an in-database procedure catalog
//!
//! # Procedure Catalog
//! `SQLite` has no stored procedures. Procedure bodies live in the database
//! itself, in the `procedure_steps` table (see [`PROCEDURE_CATALOG_DDL`]):
//! each step is a single statement that may reference the call's arguments as
//! `?1..?N`. Steps run in `step` order on the session connection; the rows of
//! the last row-producing step are the call's result set.
//!
//! # Implementation Notes
//! - Uses `rusqlite` (synchronous driver, no async needed)
//! - BLOB data is Base64-encoded
//! - Lock waits bounded via `busy_timeout`
//! - Foreign keys are enforced (`PRAGMA foreign_keys = ON`)

use rusqlite::types::{ToSqlOutput, Value};
use rusqlite::{params_from_iter, Connection, OpenFlags, Row, ToSql};

use crate::engine::{
    validate_procedure_name, ConnectionConfig, DatabaseEngine, DatabaseType, Param, QueryResult,
};
use crate::error::{CirculateError, Result};

/// Table holding emulated stored procedures
pub const PROCEDURE_CATALOG_DDL: &str = "CREATE TABLE IF NOT EXISTS procedure_steps (
    procedure_name TEXT NOT NULL,
    step INTEGER NOT NULL,
    body TEXT NOT NULL,
    PRIMARY KEY (procedure_name, step)
)";

/// `SQLite` database engine implementation
pub struct SqliteEngine {
    conn: Connection,
}

impl DatabaseEngine for SqliteEngine {
    async fn connect(config: &ConnectionConfig) -> Result<Self> {
        // Validate config is for SQLite
        if config.engine != DatabaseType::SQLite {
            return Err(CirculateError::invalid_input(format!(
                "Expected SQLite engine, got {}",
                config.engine
            )));
        }

        // Extract file path
        let file_path = config
            .file
            .as_ref()
            .ok_or_else(|| CirculateError::invalid_input("SQLite requires 'file' parameter"))?;

        let path_str = file_path.to_str().ok_or_else(|| {
            CirculateError::invalid_input("SQLite file path contains invalid UTF-8 characters")
        })?;
        let conn = open_connection(path_str)?;

        conn.busy_timeout(config.connect_timeout()).map_err(|e| {
            CirculateError::engine_error("sqlite", format!("Failed to set timeout: {e}"))
        })?;
        conn.execute_batch("PRAGMA foreign_keys = ON").map_err(|e| {
            CirculateError::engine_error("sqlite", format!("Failed to enable foreign keys: {e}"))
        })?;

        log::info!("connected to sqlite database {path_str}");
        Ok(Self { conn })
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    async fn begin(&mut self) -> Result<()> {
        self.batch("BEGIN")
    }

    async fn commit(&mut self) -> Result<()> {
        self.batch("COMMIT")
    }

    async fn rollback(&mut self) -> Result<()> {
        self.batch("ROLLBACK")
    }

    async fn call(&mut self, procedure: &str, params: &[Param]) -> Result<()> {
        self.run_procedure(procedure, params).map(|_| ())
    }

    async fn call_query(&mut self, procedure: &str, params: &[Param]) -> Result<QueryResult> {
        self.run_procedure(procedure, params)
    }

    async fn query(&mut self, sql: &str, params: &[Param]) -> Result<QueryResult> {
        log::debug!("sqlite query: {sql}");
        run_statement(&self.conn, sql, params, true)
            .map_err(|e| CirculateError::query_failed(format!("Failed to execute query: {e}")))
    }

    async fn execute(&mut self, sql: &str, params: &[Param]) -> Result<u64> {
        log::debug!("sqlite execute: {sql}");
        let result = run_statement(&self.conn, sql, params, true)
            .map_err(|e| CirculateError::query_failed(format!("Failed to execute statement: {e}")))?;
        Ok(result.rows_affected.unwrap_or(0))
    }

    async fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| {
            CirculateError::engine_error("sqlite", format!("Failed to close database: {e}"))
        })
    }
}

impl SqliteEngine {
    fn batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql).map_err(|e| {
            CirculateError::engine_error("sqlite", format!("{sql} failed: {e}"))
        })
    }

    /// Load the ordered step bodies of a catalogued procedure
    fn load_procedure(&self, name: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT body FROM procedure_steps
                 WHERE procedure_name = ?1
                 ORDER BY step",
            )
            .map_err(|e| {
                CirculateError::engine_error(
                    "sqlite",
                    format!("Procedure catalog is not available: {e}"),
                )
            })?;

        let bodies = stmt
            .query_map([name], |row| row.get::<_, String>(0))
            .map_err(|e| {
                CirculateError::engine_error("sqlite", format!("Failed to read procedure {name}: {e}"))
            })?
            .collect::<std::result::Result<Vec<String>, _>>()
            .map_err(|e| {
                CirculateError::engine_error("sqlite", format!("Failed to read procedure {name}: {e}"))
            })?;

        if bodies.is_empty() {
            return Err(CirculateError::procedure_failed(name, "procedure does not exist"));
        }

        Ok(bodies)
    }

    fn run_procedure(&self, name: &str, params: &[Param]) -> Result<QueryResult> {
        validate_procedure_name(name)?;
        log::debug!("sqlite call {name} ({} params)", params.len());

        let steps = self.load_procedure(name)?;
        let mut last = QueryResult::default();

        for body in &steps {
            let result = run_statement(&self.conn, body, params, false)
                .map_err(|e| CirculateError::procedure_failed(name, e.to_string()))?;
            if !result.columns.is_empty() {
                last = result;
            }
        }

        Ok(last)
    }
}

/// Register a procedure in the catalog, replacing any previous definition
///
/// `steps` are single statements referencing arguments as `?1..?N`.
pub fn install_procedure(conn: &Connection, name: &str, steps: &[&str]) -> Result<()> {
    validate_procedure_name(name)?;

    let install = || -> rusqlite::Result<()> {
        conn.execute_batch(PROCEDURE_CATALOG_DDL)?;
        conn.execute("DELETE FROM procedure_steps WHERE procedure_name = ?1", [name])?;
        for (step, body) in steps.iter().enumerate() {
            conn.execute(
                "INSERT INTO procedure_steps (procedure_name, step, body) VALUES (?1, ?2, ?3)",
                rusqlite::params![name, step as i64 + 1, body],
            )?;
        }
        Ok(())
    };

    install().map_err(|e| {
        CirculateError::engine_error("sqlite", format!("Failed to install procedure {name}: {e}"))
    })
}

/// Open `SQLite` connection
///
/// Existing files only; a typo in the path should not create an empty library.
fn open_connection(path: &str) -> Result<Connection> {
    let conn = if path == ":memory:" {
        Connection::open_in_memory()
    } else {
        Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)
    };

    conn.map_err(|e| {
        CirculateError::connection_failed(format!("Failed to open SQLite database: {e}"))
    })
}

impl ToSql for Param {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Int(v) => ToSqlOutput::from(*v),
            Self::Text(s) => ToSqlOutput::from(s.as_str()),
            Self::Bool(b) => ToSqlOutput::from(*b),
            Self::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}

/// Prepare, bind and run a single statement
///
/// With `exact` the statement must use every parameter; procedure steps may
/// use a prefix of the call's arguments.
fn run_statement(
    conn: &Connection,
    sql: &str,
    params: &[Param],
    exact: bool,
) -> std::result::Result<QueryResult, rusqlite::Error> {
    let mut stmt = conn.prepare(sql)?;

    let expected = stmt.parameter_count();
    if expected > params.len() || (exact && expected != params.len()) {
        return Err(rusqlite::Error::InvalidParameterCount(params.len(), expected));
    }
    let bound = &params[..expected];

    let column_names: Vec<String> = stmt.column_names().iter().map(|s| (*s).to_string()).collect();

    if column_names.is_empty() {
        // Non-SELECT statement (INSERT, UPDATE, DELETE)
        let changed = stmt.execute(params_from_iter(bound.iter()))?;
        return Ok(QueryResult::affected(changed as u64));
    }

    let rows = stmt.query(params_from_iter(bound.iter()))?;
    let rows_data = rows
        .mapped(|row| row_to_json(&column_names, row))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(QueryResult { columns: column_names, rows: rows_data, rows_affected: None })
}

/// Convert a `SQLite` row to a JSON-safe `Vec`
fn row_to_json(
    column_names: &[String],
    row: &Row,
) -> std::result::Result<Vec<serde_json::Value>, rusqlite::Error> {
    let mut values = Vec::with_capacity(column_names.len());

    for idx in 0..column_names.len() {
        values.push(sqlite_value_to_json(row, idx)?);
    }

    Ok(values)
}

/// Convert `SQLite` value to JSON value
fn sqlite_value_to_json(
    row: &Row,
    idx: usize,
) -> std::result::Result<serde_json::Value, rusqlite::Error> {
    use rusqlite::types::ValueRef;

    let value_ref = row.get_ref(idx)?;

    Ok(match value_ref {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number), // NaN/Infinity as null
        ValueRef::Text(s) => {
            let text = std::str::from_utf8(s).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            serde_json::Value::String(text.to_string())
        }
        ValueRef::Blob(b) => {
            use base64::Engine;
            serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
        }
    })
}
