//! Database Engine Traits and Core Types
//!
//! This module defines the core abstractions for database engines.
//! Each engine (`PostgreSQL`, `MySQL`, `SQLite`) implements the `DatabaseEngine` trait.
//!
//! # Session-scoped Connections
//! An engine value owns one open connection for the whole login session.
//! The session loop brackets every command with `begin` / `commit` / `rollback`
//! on that connection, so a rollback covers all of the command's statements.
//!
//! # Engine Isolation
//! Each engine implementation is completely independent.
//! Dialect knowledge shared with the query builders lives on [`DatabaseType`].

use serde::Deserialize;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CirculateError, Result};

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;

/// Connection timeout used when a profile does not set one
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;

/// Supported database engine types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// `PostgreSQL` database
    Postgres,
    /// `MySQL` database (includes `MariaDB`)
    MySQL,
    /// `SQLite` database
    SQLite,
}

impl DatabaseType {
    /// Get the engine name as a string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySQL => "mysql",
            Self::SQLite => "sqlite",
        }
    }

    /// Positional placeholder for the 1-based parameter `index`
    #[must_use]
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${index}"),
            Self::MySQL | Self::SQLite => "?".to_string(),
        }
    }

    /// Equality operator that treats two NULLs as equal
    #[must_use]
    pub const fn null_safe_eq(&self) -> &'static str {
        match self {
            Self::Postgres => "IS NOT DISTINCT FROM",
            Self::MySQL => "<=>",
            Self::SQLite => "IS",
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Connection configuration for database engines
///
/// Fields are engine-specific (e.g., `file` only applies to `SQLite`).
/// `user` and `password` are normally filled in from the login prompt.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Database engine type
    pub engine: DatabaseType,

    /// Hostname (for postgres/mysql)
    pub host: Option<String>,

    /// Port number (for postgres/mysql)
    pub port: Option<u16>,

    /// Username (for postgres/mysql)
    pub user: Option<String>,

    /// Password (for postgres/mysql)
    /// WARNING: Sensitive data, do not log or include in error messages
    pub password: Option<String>,

    /// Database name (for postgres/mysql)
    pub database: Option<String>,

    /// Database file path (for sqlite)
    pub file: Option<PathBuf>,

    /// Seconds to wait for the connection to be established
    pub connect_timeout_secs: Option<u64>,
}

impl ConnectionConfig {
    /// Create a new `PostgreSQL` connection config
    #[must_use]
    pub const fn postgres(host: String, port: u16, database: String) -> Self {
        Self {
            engine: DatabaseType::Postgres,
            host: Some(host),
            port: Some(port),
            user: None,
            password: None,
            database: Some(database),
            file: None,
            connect_timeout_secs: None,
        }
    }

    /// Create a new `MySQL` connection config
    #[must_use]
    pub const fn mysql(host: String, port: u16, database: String) -> Self {
        Self {
            engine: DatabaseType::MySQL,
            host: Some(host),
            port: Some(port),
            user: None,
            password: None,
            database: Some(database),
            file: None,
            connect_timeout_secs: None,
        }
    }

    /// Create a new `SQLite` connection config
    #[must_use]
    pub const fn sqlite(file: PathBuf) -> Self {
        Self {
            engine: DatabaseType::SQLite,
            host: None,
            port: None,
            user: None,
            password: None,
            database: None,
            file: Some(file),
            connect_timeout_secs: None,
        }
    }

    /// Attach login credentials
    #[must_use]
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Effective connection timeout
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS))
    }
}

/// A positional statement parameter
///
/// Each engine converts these to its driver's native parameter type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Int(i64),
    Text(String),
    Bool(bool),
    Null,
}

impl Param {
    /// Text parameter
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Text parameter, or `Null` when the input is blank ("enter for N/A")
    #[must_use]
    pub fn optional_text(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Self::Null
        } else {
            Self::Text(trimmed.to_string())
        }
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Query or procedure result
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Column names in result set
    pub columns: Vec<String>,

    /// Result rows, each aligned with `columns`
    pub rows: Vec<Vec<serde_json::Value>>,

    /// Number of rows affected (for INSERT/UPDATE/DELETE)
    pub rows_affected: Option<u64>,
}

impl QueryResult {
    /// Empty result for statements that returned no rows
    #[must_use]
    pub fn affected(rows_affected: u64) -> Self {
        Self { columns: Vec::new(), rows: Vec::new(), rows_affected: Some(rows_affected) }
    }

    /// Index of a column, matched case-insensitively like JDBC column labels
    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(column))
    }

    /// Value of `column` in row `row`, `None` when the column is absent
    #[must_use]
    pub fn value(&self, row: usize, column: &str) -> Option<&serde_json::Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Integer value of `column` in the first row
    ///
    /// Accepts integers stored as text, which `MySQL` returns for some column types.
    #[must_use]
    pub fn first_i64(&self, column: &str) -> Option<i64> {
        match self.value(0, column)? {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Whether the result has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Database engine trait
///
/// An engine value is one open connection. All statements of a login session
/// go through it, inside the transaction opened by `begin`.
pub trait DatabaseEngine: Sized {
    /// Open a connection using the provided config
    ///
    /// Establishment is bounded by [`ConnectionConfig::connect_timeout`].
    fn connect(config: &ConnectionConfig) -> impl Future<Output = Result<Self>>;

    /// Dialect of this connection (placeholders, null-safe equality)
    fn database_type(&self) -> DatabaseType;

    /// Start a transaction
    fn begin(&mut self) -> impl Future<Output = Result<()>>;

    /// Commit the open transaction
    fn commit(&mut self) -> impl Future<Output = Result<()>>;

    /// Roll back the open transaction
    fn rollback(&mut self) -> impl Future<Output = Result<()>>;

    /// Call a stored procedure that produces no result set
    fn call(&mut self, procedure: &str, params: &[Param]) -> impl Future<Output = Result<()>>;

    /// Call a stored procedure and collect its result set
    fn call_query(
        &mut self,
        procedure: &str,
        params: &[Param],
    ) -> impl Future<Output = Result<QueryResult>>;

    /// Run a literal parameterized query and collect its rows
    fn query(&mut self, sql: &str, params: &[Param]) -> impl Future<Output = Result<QueryResult>>;

    /// Run a literal parameterized statement and return the affected row count
    fn execute(&mut self, sql: &str, params: &[Param]) -> impl Future<Output = Result<u64>>;

    /// Close the connection
    fn close(self) -> impl Future<Output = Result<()>>;
}

/// Check that a procedure name is a plain identifier
///
/// Procedure names are interpolated into `CALL` statements, so anything other
/// than `[A-Za-z_][A-Za-z0-9_]*` is refused.
pub fn validate_procedure_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(CirculateError::invalid_input(format!("Invalid procedure name '{name}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_database_type_deserialization() {
        let parse = |text: &str| serde_json::from_str::<DatabaseType>(text).unwrap();
        assert_eq!(parse(r#""postgres""#), DatabaseType::Postgres);
        assert_eq!(parse(r#""mysql""#), DatabaseType::MySQL);
        assert_eq!(parse(r#""sqlite""#), DatabaseType::SQLite);
        assert!(serde_json::from_str::<DatabaseType>(r#""oracle""#).is_err());
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(DatabaseType::Postgres.placeholder(3), "$3");
        assert_eq!(DatabaseType::MySQL.placeholder(3), "?");
        assert_eq!(DatabaseType::SQLite.placeholder(1), "?");
    }

    #[test]
    fn test_connection_config_constructors() {
        let pg_config =
            ConnectionConfig::postgres("localhost".to_string(), 5432, "Library".to_string());
        assert_eq!(pg_config.engine, DatabaseType::Postgres);
        assert_eq!(pg_config.port, Some(5432));
        assert!(pg_config.user.is_none());

        let mysql_config =
            ConnectionConfig::mysql("localhost".to_string(), 3306, "Library".to_string());
        assert_eq!(mysql_config.engine, DatabaseType::MySQL);

        let sqlite_config = ConnectionConfig::sqlite(PathBuf::from("/tmp/library.db"));
        assert_eq!(sqlite_config.engine, DatabaseType::SQLite);
        assert!(sqlite_config.file.is_some());
    }

    #[test]
    fn test_with_credentials_and_timeout() {
        let config = ConnectionConfig::postgres("db".to_string(), 5432, "Library".to_string())
            .with_credentials("employee_login", "pw");
        assert_eq!(config.user.as_deref(), Some("employee_login"));
        assert_eq!(config.password.as_deref(), Some("pw"));
        assert_eq!(config.connect_timeout(), Duration::from_secs(15));

        let config = ConnectionConfig { connect_timeout_secs: Some(3), ..config };
        assert_eq!(config.connect_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_optional_text_param() {
        assert_eq!(Param::optional_text("  "), Param::Null);
        assert_eq!(Param::optional_text(" 2nd "), Param::Text("2nd".to_string()));
    }

    #[test]
    fn test_query_result_lookup() {
        let result = QueryResult {
            columns: vec!["memberID".to_string(), "memFirstName".to_string()],
            rows: vec![vec![serde_json::json!(7), serde_json::json!("Jane")]],
            rows_affected: None,
        };

        assert_eq!(result.value(0, "memfirstname"), Some(&serde_json::json!("Jane")));
        assert_eq!(result.value(0, "memLastName"), None);
        assert_eq!(result.first_i64("memberID"), Some(7));

        let text_id = QueryResult {
            columns: vec!["bookID".to_string()],
            rows: vec![vec![serde_json::json!("12")]],
            rows_affected: None,
        };
        assert_eq!(text_id.first_i64("bookID"), Some(12));
    }

    #[test]
    fn test_validate_procedure_name() {
        assert!(validate_procedure_name("checkOutBook").is_ok());
        assert!(validate_procedure_name("_internal2").is_ok());
        assert!(validate_procedure_name("").is_err());
        assert!(validate_procedure_name("2fast").is_err());
        assert!(validate_procedure_name("drop table; --").is_err());
    }
}
