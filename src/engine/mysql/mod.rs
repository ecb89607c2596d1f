//! MySQL Database Engine Implementation
//!
//! This module implements the `DatabaseEngine` trait for MySQL databases (including MariaDB).
//!
//! # Features
//! - Client-server connections via TCP
//! - Native stored procedures via `CALL name(?, ...)`
//! - Transactions via `START TRANSACTION` / `COMMIT` / `ROLLBACK`
//!
//! # Implementation Notes
//! - Uses `mysql_async` (async driver, requires tokio runtime)
//! - Statements go through the binary protocol (`exec_*`) with positional params
//! - Only the first result set of a `CALL` is collected; the rest are drained
//! - BLOB data is Base64-encoded
//! - Connection establishment bounded via `tokio::time::timeout`

use mysql_async::consts::ColumnType;
use mysql_async::{prelude::*, Conn, OptsBuilder, Params, Row, Value};

use crate::engine::{
    validate_procedure_name, ConnectionConfig, DatabaseEngine, DatabaseType, Param, QueryResult,
};
use crate::error::{CirculateError, Result};

/// MySQL database engine implementation
pub struct MySqlEngine {
    conn: Conn,
}

impl DatabaseEngine for MySqlEngine {
    async fn connect(config: &ConnectionConfig) -> Result<Self> {
        // Validate config is for MySQL
        if config.engine != DatabaseType::MySQL {
            return Err(CirculateError::invalid_input(format!(
                "Expected MySQL engine, got {}",
                config.engine
            )));
        }

        // Build connection options
        let opts = build_mysql_opts(config)?;
        let timeout = config.connect_timeout();

        // Connect to MySQL
        let conn = tokio::time::timeout(timeout, Conn::new(opts))
            .await
            .map_err(|_| {
                CirculateError::connection_failed(format!(
                    "Timed out after {}s connecting to MySQL",
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| CirculateError::connection_failed(format!("Failed to connect to MySQL: {e}")))?;

        let (major, minor, patch) = conn.server_version();
        log::info!(
            "connected to mysql {major}.{minor}.{patch} database {}",
            config.database.as_deref().unwrap_or_default()
        );

        Ok(Self { conn })
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::MySQL
    }

    async fn begin(&mut self) -> Result<()> {
        self.control("START TRANSACTION").await
    }

    async fn commit(&mut self) -> Result<()> {
        self.control("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.control("ROLLBACK").await
    }

    async fn call(&mut self, procedure: &str, params: &[Param]) -> Result<()> {
        validate_procedure_name(procedure)?;
        let sql = call_statement(procedure, params.len());
        log::debug!("mysql call: {sql}");

        self.conn
            .exec_drop(sql, to_params(params))
            .await
            .map_err(|e| CirculateError::procedure_failed(procedure, e.to_string()))
    }

    async fn call_query(&mut self, procedure: &str, params: &[Param]) -> Result<QueryResult> {
        validate_procedure_name(procedure)?;
        let sql = call_statement(procedure, params.len());
        log::debug!("mysql call: {sql}");

        collect_first_result(&mut self.conn, &sql, params)
            .await
            .map_err(|e| CirculateError::procedure_failed(procedure, e.to_string()))
    }

    async fn query(&mut self, sql: &str, params: &[Param]) -> Result<QueryResult> {
        log::debug!("mysql query: {sql}");
        collect_first_result(&mut self.conn, sql, params)
            .await
            .map_err(|e| CirculateError::query_failed(format!("Failed to execute query: {e}")))
    }

    async fn execute(&mut self, sql: &str, params: &[Param]) -> Result<u64> {
        log::debug!("mysql execute: {sql}");
        self.conn
            .exec_drop(sql, to_params(params))
            .await
            .map_err(|e| CirculateError::query_failed(format!("Failed to execute statement: {e}")))?;
        Ok(self.conn.affected_rows())
    }

    async fn close(self) -> Result<()> {
        self.conn.disconnect().await.map_err(|e| {
            CirculateError::engine_error("mysql", format!("Failed to disconnect: {e}"))
        })
    }
}

impl MySqlEngine {
    async fn control(&mut self, sql: &str) -> Result<()> {
        self.conn
            .query_drop(sql)
            .await
            .map_err(|e| CirculateError::engine_error("mysql", format!("{sql} failed: {e}")))
    }
}

/// Build MySQL connection options from ConnectionConfig
fn build_mysql_opts(config: &ConnectionConfig) -> Result<OptsBuilder> {
    let host = config
        .host
        .as_ref()
        .ok_or_else(|| CirculateError::invalid_input("MySQL requires 'host' parameter"))?;

    let port = config
        .port
        .ok_or_else(|| CirculateError::invalid_input("MySQL requires 'port' parameter"))?;

    let user = config
        .user
        .as_ref()
        .ok_or_else(|| CirculateError::invalid_input("MySQL requires 'user' parameter"))?;

    let password = config
        .password
        .as_ref()
        .ok_or_else(|| CirculateError::invalid_input("MySQL requires 'password' parameter"))?;

    let database = config
        .database
        .as_ref()
        .ok_or_else(|| CirculateError::invalid_input("MySQL requires 'database' parameter"))?;

    let opts = OptsBuilder::default()
        .ip_or_hostname(host)
        .tcp_port(port)
        .user(Some(user))
        .pass(Some(password))
        .db_name(Some(database));

    Ok(opts)
}

fn call_statement(procedure: &str, arity: usize) -> String {
    let marks = vec!["?"; arity].join(", ");
    format!("CALL {procedure}({marks})")
}

fn to_mysql_value(param: &Param) -> Value {
    match param {
        Param::Int(v) => Value::Int(*v),
        Param::Text(s) => Value::Bytes(s.as_bytes().to_vec()),
        Param::Bool(b) => Value::Int(i64::from(*b)),
        Param::Null => Value::NULL,
    }
}

fn to_params(params: &[Param]) -> Params {
    if params.is_empty() {
        Params::Empty
    } else {
        Params::Positional(params.iter().map(to_mysql_value).collect())
    }
}

/// Run a statement, collect its first result set and drain the rest
async fn collect_first_result(
    conn: &mut Conn,
    sql: &str,
    params: &[Param],
) -> std::result::Result<QueryResult, mysql_async::Error> {
    let mut result = conn.exec_iter(sql, to_params(params)).await?;

    let column_names: Vec<String> =
        result.columns_ref().iter().map(|col| col.name_str().to_string()).collect();

    let rows: Vec<Row> = result.collect().await?;
    let affected = result.affected_rows();

    // A CALL also reports a trailing status result
    result.drop_result().await?;

    if column_names.is_empty() {
        return Ok(QueryResult::affected(affected));
    }

    let rows_data = rows.iter().map(row_to_json).collect();
    Ok(QueryResult { columns: column_names, rows: rows_data, rows_affected: None })
}

/// Convert a MySQL row to a JSON-safe `Vec`
fn row_to_json(row: &Row) -> Vec<serde_json::Value> {
    let columns = row.columns_ref();
    (0..row.len())
        .map(|idx| {
            let column_type = columns.get(idx).map(|c| c.column_type());
            row.as_ref(idx).map_or(serde_json::Value::Null, |v| mysql_value_to_json(v, column_type))
        })
        .collect()
}

/// Convert MySQL value to JSON value
fn mysql_value_to_json(value: &Value, column_type: Option<ColumnType>) -> serde_json::Value {
    match value {
        Value::NULL => serde_json::Value::Null,

        Value::Bytes(bytes) => {
            // Try to convert to UTF-8 string first
            if let Ok(s) = std::str::from_utf8(bytes) {
                serde_json::Value::String(s.to_string())
            } else {
                // Binary data - encode as Base64
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
                serde_json::Value::String(encoded)
            }
        }

        Value::Int(i) => serde_json::Value::Number((*i).into()),

        Value::UInt(u) => serde_json::json!(*u),

        Value::Float(f) => serde_json::Number::from_f64(f64::from(*f))
            .map_or(serde_json::Value::Null, serde_json::Value::Number),

        Value::Double(d) => serde_json::Number::from_f64(*d)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),

        Value::Date(year, month, day, hour, minute, second, micro) => {
            let text = if column_type == Some(ColumnType::MYSQL_TYPE_DATE) {
                format!("{year:04}-{month:02}-{day:02}")
            } else if *micro == 0 {
                format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}")
            } else {
                format!(
                    "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{micro:06}"
                )
            };
            serde_json::Value::String(text)
        }

        Value::Time(is_negative, days, hours, minutes, seconds, _micro) => {
            let sign = if *is_negative { "-" } else { "" };
            let total_hours = days * 24 + u32::from(*hours);
            serde_json::Value::String(format!("{sign}{total_hours}:{minutes:02}:{seconds:02}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // Note: Integration tests require a running MySQL instance with the
    // library schema and procedures loaded. Run them with:
    // cargo test --features mysql -- --ignored

    fn local_config() -> ConnectionConfig {
        ConnectionConfig::mysql("localhost".to_string(), 3306, "Library".to_string())
            .with_credentials("root", "password")
    }

    #[test]
    fn test_call_statement() {
        assert_eq!(call_statement("getAllAuthors", 0), "CALL getAllAuthors()");
        assert_eq!(call_statement("checkOutBook", 2), "CALL checkOutBook(?, ?)");
    }

    #[test]
    fn test_param_conversion() {
        assert_eq!(to_mysql_value(&Param::Int(7)), Value::Int(7));
        assert_eq!(to_mysql_value(&Param::text("Doe")), Value::Bytes(b"Doe".to_vec()));
        assert_eq!(to_mysql_value(&Param::Bool(true)), Value::Int(1));
        assert_eq!(to_mysql_value(&Param::Null), Value::NULL);
        assert!(matches!(to_params(&[]), Params::Empty));
    }

    #[test]
    fn test_date_values() {
        let date = Value::Date(2024, 3, 9, 0, 0, 0, 0);
        assert_eq!(
            mysql_value_to_json(&date, Some(ColumnType::MYSQL_TYPE_DATE)),
            serde_json::json!("2024-03-09")
        );
        assert_eq!(
            mysql_value_to_json(&date, Some(ColumnType::MYSQL_TYPE_DATETIME)),
            serde_json::json!("2024-03-09 00:00:00")
        );
    }

    #[test]
    fn test_binary_bytes_are_base64() {
        let blob = Value::Bytes(vec![0xff, 0xfe]);
        assert_eq!(mysql_value_to_json(&blob, None), serde_json::json!("//4="));
    }

    #[test]
    fn test_missing_database_error() {
        let config = ConnectionConfig { database: None, ..local_config() };

        let result = build_mysql_opts(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().message().contains("MySQL requires 'database' parameter"));
    }

    #[tokio::test]
    async fn test_connect_wrong_engine() {
        let mut config = local_config();
        config.engine = DatabaseType::Postgres;

        let result = MySqlEngine::connect(&config).await;
        assert!(result.is_err());
        assert!(result.err().unwrap().message().contains("Expected MySQL engine"));
    }

    #[tokio::test]
    async fn test_connect_missing_host() {
        let config = ConnectionConfig { host: None, ..local_config() };

        let result = MySqlEngine::connect(&config).await;
        assert!(result.is_err());
        assert!(result.err().unwrap().message().contains("MySQL requires 'host' parameter"));
    }

    #[tokio::test]
    #[ignore = "Requires running MySQL instance"]
    async fn test_call_query_returns_first_result_set() {
        let mut engine = MySqlEngine::connect(&local_config()).await.unwrap();

        let result = engine.call_query("getAllAuthors", &[]).await.unwrap();
        assert!(result.column_index("authorID").is_some());

        engine.close().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running MySQL instance"]
    async fn test_rollback_discards_writes() {
        let mut engine = MySqlEngine::connect(&local_config()).await.unwrap();
        engine.execute("CREATE TEMPORARY TABLE tx_probe (id INT)", &[]).await.unwrap();

        engine.begin().await.unwrap();
        engine.execute("INSERT INTO tx_probe VALUES (?)", &[Param::Int(1)]).await.unwrap();
        engine.rollback().await.unwrap();

        let result = engine.query("SELECT COUNT(*) AS n FROM tx_probe", &[]).await.unwrap();
        assert_eq!(result.first_i64("n"), Some(0));
    }
}
