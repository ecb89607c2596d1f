//! `PostgreSQL` Database Engine Implementation
//!
//! This module implements the `DatabaseEngine` trait for `PostgreSQL` databases.
//!
//! # Features
//! - Client-server connections via TCP
//! - Procedures without a result set run as `CALL name($1, ...)`
//! - Procedures with a result set are set-returning functions, run as
//!   `SELECT * FROM name($1, ...)`
//!
//! # Implementation Notes
//! - Uses `tokio-postgres` (async driver, requires tokio runtime)
//! - Console arguments arrive as text; [`Param`] converts them to the type the
//!   server declared for each placeholder (integers, dates, booleans)
//! - BYTEA data is Base64-encoded
//! - Connection establishment bounded via `tokio::time::timeout`

use bytes::BytesMut;
use tokio_postgres::types::{to_sql_checked, FromSql, IsNull, Kind, ToSql, Type};
use tokio_postgres::{Client, Config, NoTls, Row};

use crate::engine::{
    validate_procedure_name, ConnectionConfig, DatabaseEngine, DatabaseType, Param, QueryResult,
};
use crate::error::{CirculateError, Result};

/// `PostgreSQL` database engine implementation
pub struct PostgresEngine {
    client: Client,
}

impl DatabaseEngine for PostgresEngine {
    async fn connect(config: &ConnectionConfig) -> Result<Self> {
        // Validate config is for PostgreSQL
        if config.engine != DatabaseType::Postgres {
            return Err(CirculateError::invalid_input(format!(
                "Expected PostgreSQL engine, got {}",
                config.engine
            )));
        }

        // Build connection config
        let pg_config = build_pg_config(config)?;
        let timeout = config.connect_timeout();

        // Connect to PostgreSQL
        let (client, connection) = tokio::time::timeout(timeout, pg_config.connect(NoTls))
            .await
            .map_err(|_| {
                CirculateError::connection_failed(format!(
                    "Timed out after {}s connecting to PostgreSQL",
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                CirculateError::connection_failed(format!("Failed to connect to PostgreSQL: {e}"))
            })?;

        // Spawn connection handler
        // Note: Connection errors are not logged to prevent credential leakage
        tokio::spawn(async move {
            let _ = connection.await;
        });

        log::info!(
            "connected to postgres database {}",
            config.database.as_deref().unwrap_or_default()
        );
        Ok(Self { client })
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    async fn begin(&mut self) -> Result<()> {
        self.batch("BEGIN").await
    }

    async fn commit(&mut self) -> Result<()> {
        self.batch("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.batch("ROLLBACK").await
    }

    async fn call(&mut self, procedure: &str, params: &[Param]) -> Result<()> {
        validate_procedure_name(procedure)?;
        let sql = format!("CALL {procedure}({})", placeholders(params.len()));
        log::debug!("postgres call: {sql}");

        self.client
            .execute(sql.as_str(), &param_refs(params))
            .await
            .map_err(|e| CirculateError::procedure_failed(procedure, describe(&e)))?;
        Ok(())
    }

    async fn call_query(&mut self, procedure: &str, params: &[Param]) -> Result<QueryResult> {
        validate_procedure_name(procedure)?;
        let sql = format!("SELECT * FROM {procedure}({})", placeholders(params.len()));
        log::debug!("postgres call: {sql}");

        execute_query(&self.client, &sql, params)
            .await
            .map_err(|e| procedure_error(procedure, e))
    }

    async fn query(&mut self, sql: &str, params: &[Param]) -> Result<QueryResult> {
        log::debug!("postgres query: {sql}");
        execute_query(&self.client, sql, params).await
    }

    async fn execute(&mut self, sql: &str, params: &[Param]) -> Result<u64> {
        log::debug!("postgres execute: {sql}");
        self.client.execute(sql, &param_refs(params)).await.map_err(|e| {
            CirculateError::query_failed(format!("Failed to execute statement: {}", describe(&e)))
        })
    }

    async fn close(self) -> Result<()> {
        // Dropping the client ends the spawned connection task
        drop(self.client);
        Ok(())
    }
}

impl PostgresEngine {
    async fn batch(&self, sql: &str) -> Result<()> {
        self.client.batch_execute(sql).await.map_err(|e| {
            CirculateError::engine_error("postgres", format!("{sql} failed: {}", describe(&e)))
        })
    }
}

/// Build `PostgreSQL` connection config from `ConnectionConfig`
fn build_pg_config(config: &ConnectionConfig) -> Result<Config> {
    let host = config
        .host
        .as_ref()
        .ok_or_else(|| CirculateError::invalid_input("PostgreSQL requires 'host' parameter"))?;

    let port = config
        .port
        .ok_or_else(|| CirculateError::invalid_input("PostgreSQL requires 'port' parameter"))?;

    let user = config
        .user
        .as_ref()
        .ok_or_else(|| CirculateError::invalid_input("PostgreSQL requires 'user' parameter"))?;

    let password = config
        .password
        .as_ref()
        .ok_or_else(|| CirculateError::invalid_input("PostgreSQL requires 'password' parameter"))?;

    let database = config
        .database
        .as_ref()
        .ok_or_else(|| CirculateError::invalid_input("PostgreSQL requires 'database' parameter"))?;

    let mut pg_config = Config::new();
    pg_config.host(host).port(port).user(user).password(password).dbname(database);

    Ok(pg_config)
}

/// `$1, $2, ...` for `count` parameters
fn placeholders(count: usize) -> String {
    (1..=count).map(|i| DatabaseType::Postgres.placeholder(i)).collect::<Vec<_>>().join(", ")
}

fn param_refs(params: &[Param]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

/// Server-side message when there is one, driver message otherwise
/// Attribute a query failure to the procedure that raised it
fn procedure_error(procedure: &str, err: CirculateError) -> CirculateError {
    match err {
        CirculateError::QueryFailed(detail) => CirculateError::procedure_failed(procedure, detail),
        other => other,
    }
}

fn describe(err: &tokio_postgres::Error) -> String {
    err.as_db_error().map_or_else(|| err.to_string(), |db| db.message().to_string())
}

/// Execute query and return `QueryResult`
async fn execute_query(client: &Client, query: &str, params: &[Param]) -> Result<QueryResult> {
    let stmt = client.prepare(query).await.map_err(|e| {
        CirculateError::query_failed(format!("Failed to prepare query: {}", describe(&e)))
    })?;

    let rows = client.query(&stmt, &param_refs(params)).await.map_err(|e| {
        CirculateError::query_failed(format!("Failed to execute query: {}", describe(&e)))
    })?;

    // Get column names
    let column_names: Vec<String> = stmt.columns().iter().map(|c| c.name().to_string()).collect();

    // Convert rows to JSON
    let mut rows_data = Vec::with_capacity(rows.len());
    for row in rows {
        rows_data.push(row_to_json(&column_names, &row)?);
    }

    Ok(QueryResult { columns: column_names, rows: rows_data, rows_affected: None })
}

type EncodeResult = std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>>;

fn unsupported(param: &Param, ty: &Type) -> EncodeResult {
    Err(format!("cannot bind {param:?} to a PostgreSQL {ty} parameter").into())
}

impl ToSql for Param {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> EncodeResult {
        match self {
            Self::Null => Ok(IsNull::Yes),
            Self::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                Type::INT2 | Type::INT4 | Type::INT8 => Self::Int(i64::from(*b)).to_sql(ty, out),
                _ => unsupported(self, ty),
            },
            Self::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                Type::INT8 => v.to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => v.to_string().to_sql(ty, out),
                _ => unsupported(self, ty),
            },
            Self::Text(s) => match *ty {
                Type::INT2 => s.trim().parse::<i16>()?.to_sql(ty, out),
                Type::INT4 => s.trim().parse::<i32>()?.to_sql(ty, out),
                Type::INT8 => s.trim().parse::<i64>()?.to_sql(ty, out),
                Type::BOOL => s.trim().parse::<bool>()?.to_sql(ty, out),
                Type::DATE => {
                    chrono::NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?.to_sql(ty, out)
                }
                Type::TIMESTAMP => {
                    chrono::NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S")?
                        .to_sql(ty, out)
                }
                Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
                    s.as_str().to_sql(ty, out)
                }
                // Enum labels travel as their text in the binary format too
                _ if matches!(ty.kind(), Kind::Enum(_)) => {
                    out.extend_from_slice(s.as_bytes());
                    Ok(IsNull::No)
                }
                _ => unsupported(self, ty),
            },
        }
    }

    // NULL binds to any type; non-null values are checked in `to_sql`
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Decodes nothing; only used to ask whether a column is NULL
struct NullProbe;

impl<'a> FromSql<'a> for NullProbe {
    fn from_sql(
        _ty: &Type,
        _raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(Self)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Convert a `PostgreSQL` row to a JSON-safe `Vec`
fn row_to_json(column_names: &[String], row: &Row) -> Result<Vec<serde_json::Value>> {
    let mut values = Vec::with_capacity(column_names.len());

    for idx in 0..column_names.len() {
        let value = postgres_value_to_json(row, idx)?;
        values.push(value);
    }

    Ok(values)
}

/// Convert `PostgreSQL` value to JSON value
fn postgres_value_to_json(row: &Row, idx: usize) -> Result<serde_json::Value> {
    let column = &row.columns()[idx];
    let col_type = column.type_();

    // Handle NULL first
    if matches!(row.try_get::<_, Option<NullProbe>>(idx), Ok(None)) {
        return Ok(serde_json::Value::Null);
    }

    let fail = |e: tokio_postgres::Error| {
        CirculateError::query_failed(format!(
            "Failed to read column '{}' ({}): {e}",
            column.name(),
            col_type.name()
        ))
    };

    // Map PostgreSQL types to JSON
    let value = match *col_type {
        Type::BOOL => serde_json::Value::Bool(row.try_get(idx).map_err(fail)?),

        // Integers
        Type::INT2 => serde_json::Value::Number(row.try_get::<_, i16>(idx).map_err(fail)?.into()),
        Type::INT4 => serde_json::Value::Number(row.try_get::<_, i32>(idx).map_err(fail)?.into()),
        Type::INT8 => serde_json::Value::Number(row.try_get::<_, i64>(idx).map_err(fail)?.into()),

        // Floats
        Type::FLOAT4 => {
            let v: f32 = row.try_get(idx).map_err(fail)?;
            serde_json::Number::from_f64(f64::from(v))
                .map_or(serde_json::Value::Null, serde_json::Value::Number)
        }
        Type::FLOAT8 => {
            let v: f64 = row.try_get(idx).map_err(fail)?;
            serde_json::Number::from_f64(v)
                .map_or(serde_json::Value::Null, serde_json::Value::Number)
        }

        Type::JSON | Type::JSONB => row.try_get::<_, serde_json::Value>(idx).map_err(fail)?,

        // BYTEA (binary data) - encode as Base64
        Type::BYTEA => {
            use base64::Engine;
            let v: Vec<u8> = row.try_get(idx).map_err(fail)?;
            serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(&v))
        }

        Type::TIMESTAMP => {
            let v: chrono::NaiveDateTime = row.try_get(idx).map_err(fail)?;
            serde_json::Value::String(v.format("%Y-%m-%d %H:%M:%S").to_string())
        }
        Type::TIMESTAMPTZ => {
            let v: chrono::DateTime<chrono::Utc> = row.try_get(idx).map_err(fail)?;
            serde_json::Value::String(v.to_rfc3339())
        }
        Type::DATE => {
            let v: chrono::NaiveDate = row.try_get(idx).map_err(fail)?;
            serde_json::Value::String(v.format("%Y-%m-%d").to_string())
        }
        Type::TIME => {
            let v: chrono::NaiveTime = row.try_get(idx).map_err(fail)?;
            serde_json::Value::String(v.format("%H:%M:%S").to_string())
        }

        Type::UUID => {
            let v: uuid::Uuid = row.try_get(idx).map_err(fail)?;
            serde_json::Value::String(v.to_string())
        }

        // Default: text types (VARCHAR, TEXT, CHAR, NAME) and anything text-compatible
        _ => serde_json::Value::String(row.try_get::<_, String>(idx).map_err(fail)?),
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // Server-backed tests require a running PostgreSQL instance with the
    // library schema loaded. Run them with:
    // cargo test --features postgres -- --ignored

    fn local_config() -> ConnectionConfig {
        ConnectionConfig::postgres("localhost".to_string(), 5432, "library".to_string())
            .with_credentials("postgres", "postgres")
    }

    fn encode(param: &Param, ty: &Type) -> Vec<u8> {
        let mut buf = BytesMut::new();
        param.to_sql(ty, &mut buf).expect("encodable");
        buf.to_vec()
    }

    #[test]
    fn test_missing_user_error() {
        let config =
            ConnectionConfig::postgres("localhost".to_string(), 5432, "library".to_string());

        let result = build_pg_config(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().message().contains("PostgreSQL requires 'user' parameter"));
    }

    #[test]
    fn test_missing_database_error() {
        let config = ConnectionConfig { database: None, ..local_config() };

        let result = build_pg_config(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().message().contains("PostgreSQL requires 'database' parameter"));
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(0), "");
        assert_eq!(placeholders(3), "$1, $2, $3");
    }

    #[test]
    fn test_text_param_follows_declared_type() {
        assert_eq!(encode(&Param::text("42"), &Type::INT4), 42i32.to_be_bytes().to_vec());
        assert_eq!(encode(&Param::text(" 7 "), &Type::INT8), 7i64.to_be_bytes().to_vec());
        assert_eq!(encode(&Param::text("true"), &Type::BOOL), vec![1]);
        assert_eq!(encode(&Param::text("Doe"), &Type::VARCHAR), b"Doe".to_vec());
    }

    #[test]
    fn test_text_param_date() {
        // Days since 2000-01-01
        assert_eq!(encode(&Param::text("2000-01-02"), &Type::DATE), 1i32.to_be_bytes().to_vec());
    }

    #[test]
    fn test_int_param_narrowing() {
        assert_eq!(encode(&Param::Int(5), &Type::INT2), 5i16.to_be_bytes().to_vec());

        let mut buf = BytesMut::new();
        assert!(Param::Int(i64::from(i32::MAX) + 1).to_sql(&Type::INT4, &mut buf).is_err());
    }

    #[test]
    fn test_unparseable_text_param_is_an_error() {
        let mut buf = BytesMut::new();
        assert!(Param::text("abc").to_sql(&Type::INT4, &mut buf).is_err());
        assert!(Param::text("13/01/2020").to_sql(&Type::DATE, &mut buf).is_err());
    }

    #[test]
    fn test_types_without_conversion_are_rejected() {
        let mut buf = BytesMut::new();
        assert!(Param::text("3.50").to_sql(&Type::NUMERIC, &mut buf).is_err());
        assert!(Param::Int(3).to_sql(&Type::NUMERIC, &mut buf).is_err());
        assert!(Param::text("2024-01-01 00:00:00+00").to_sql(&Type::TIMESTAMPTZ, &mut buf).is_err());
        assert!(Param::Bool(true).to_sql(&Type::TEXT, &mut buf).is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_bool_param_on_integer_column() {
        assert_eq!(encode(&Param::Bool(true), &Type::INT4), 1i32.to_be_bytes().to_vec());
        assert_eq!(encode(&Param::Bool(true), &Type::BOOL), vec![1]);
    }

    #[test]
    fn test_procedure_error_wraps_once() {
        let err = procedure_error(
            "addMember",
            CirculateError::query_failed("Failed to execute query: duplicate key"),
        );
        assert_eq!(err.error_code(), "PROCEDURE_FAILED");
        assert_eq!(
            err.message(),
            "Procedure addMember failed: Failed to execute query: duplicate key"
        );

        let err = procedure_error("addMember", CirculateError::invalid_input("bad"));
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_null_param() {
        let mut buf = BytesMut::new();
        assert!(matches!(Param::Null.to_sql(&Type::INT4, &mut buf), Ok(IsNull::Yes)));
    }

    #[tokio::test]
    async fn test_connect_wrong_engine() {
        let mut config = local_config();
        config.engine = DatabaseType::SQLite;

        let result = PostgresEngine::connect(&config).await;
        assert!(result.is_err());
        assert!(result.err().unwrap().message().contains("Expected PostgreSQL engine"));
    }

    #[tokio::test]
    async fn test_connect_missing_host() {
        let config = ConnectionConfig { host: None, ..local_config() };

        let result = PostgresEngine::connect(&config).await;
        assert!(result.is_err());
        assert!(result.err().unwrap().message().contains("PostgreSQL requires 'host' parameter"));
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL instance"]
    async fn test_query_with_params() {
        let mut engine = PostgresEngine::connect(&local_config()).await.unwrap();

        let result = engine
            .query("SELECT $1::int4 AS num, $2::text AS str", &[Param::text("1"), Param::text("x")])
            .await
            .unwrap();
        assert_eq!(result.columns, vec!["num".to_string(), "str".to_string()]);
        assert_eq!(result.rows[0][0], serde_json::json!(1));
        assert_eq!(result.rows[0][1], serde_json::json!("x"));

        engine.close().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL instance"]
    async fn test_rollback_discards_writes() {
        let mut engine = PostgresEngine::connect(&local_config()).await.unwrap();
        engine.execute("CREATE TEMP TABLE tx_probe (id int)", &[]).await.unwrap();

        engine.begin().await.unwrap();
        engine.execute("INSERT INTO tx_probe VALUES ($1)", &[Param::Int(1)]).await.unwrap();
        engine.rollback().await.unwrap();

        let result = engine.query("SELECT COUNT(*) AS n FROM tx_probe", &[]).await.unwrap();
        assert_eq!(result.first_i64("n"), Some(0));
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL instance"]
    async fn test_unknown_procedure_fails() {
        let mut engine = PostgresEngine::connect(&local_config()).await.unwrap();

        let err = engine.call("noSuchProcedure", &[Param::Int(1)]).await.unwrap_err();
        assert_eq!(err.error_code(), "PROCEDURE_FAILED");
    }
}
