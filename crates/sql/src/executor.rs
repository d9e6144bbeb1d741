//! Contract database execution.
//!
//! Supports PostgreSQL, SQLite, and MySQL through the sqlx Any driver. The
//! executor is strictly read-only by contract: the orchestrator only hands it
//! statements the safety validator accepted.

use crate::types::SqlRowSet;
use helpdesk_core::{AppError, AppResult};
use sqlx::{any::AnyPoolOptions, AnyPool, Column, Row};

/// Trait for SQL-execution backends.
#[async_trait::async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Execute a validated statement and return its rows.
    async fn execute(&self, sql: &str) -> AppResult<SqlRowSet>;

    /// Produce a human-readable schema description for the SQL generator.
    async fn schema(&self) -> AppResult<String>;

    /// Check database connectivity.
    async fn ping(&self) -> bool;
}

/// Executor over a sqlx Any connection pool.
pub struct SqlxExecutor {
    pool: AnyPool,
    dialect: Dialect,
}

enum Dialect {
    Postgres,
    Sqlite,
    Mysql,
}

impl SqlxExecutor {
    /// Connect to the contracts database.
    pub async fn connect(url: &str) -> AppResult<Self> {
        sqlx::any::install_default_drivers();

        let dialect = detect_dialect(url);

        let pool = AnyPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| AppError::Sql(format!("Failed to connect to database: {}", e)))?;

        tracing::info!("Connected to contracts database");

        Ok(Self { pool, dialect })
    }

    /// Access the underlying pool (used by setup code and tests).
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    async fn postgres_schema(&self) -> AppResult<String> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            r#"SELECT table_name::text, column_name::text, data_type::text
               FROM information_schema.columns
               WHERE table_schema = 'public'
               ORDER BY table_name, ordinal_position"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Sql(format!("Failed to read schema: {}", e)))?;

        Ok(format_schema(rows))
    }

    async fn sqlite_schema(&self) -> AppResult<String> {
        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Sql(format!("Failed to list tables: {}", e)))?;

        let mut result = Vec::new();
        for (table,) in tables {
            let query = format!("PRAGMA table_info(\"{}\")", table);
            let cols: Vec<(i32, String, String, i32, Option<String>, i32)> =
                sqlx::query_as(&query)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| AppError::Sql(format!("Failed to read table info: {}", e)))?;

            for (_, name, dtype, _, _, _) in cols {
                result.push((table.clone(), name, dtype));
            }
        }

        Ok(format_schema(result))
    }

    async fn mysql_schema(&self) -> AppResult<String> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            r#"SELECT table_name, column_name, data_type
               FROM information_schema.columns
               WHERE table_schema = DATABASE()
               ORDER BY table_name, ordinal_position"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Sql(format!("Failed to read schema: {}", e)))?;

        Ok(format_schema(rows))
    }
}

#[async_trait::async_trait]
impl SqlExecutor for SqlxExecutor {
    async fn execute(&self, sql: &str) -> AppResult<SqlRowSet> {
        tracing::debug!("Executing SQL: {}", sql);

        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Sql(format!("Query execution failed: {}", e)))?;

        if rows.is_empty() {
            return Ok(SqlRowSet::empty());
        }

        let columns: Vec<String> = rows[0]
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let json_rows: Vec<Vec<serde_json::Value>> = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(i, _)| row_value_to_json(row, i))
                    .collect()
            })
            .collect();

        let row_count = json_rows.len();

        Ok(SqlRowSet {
            columns,
            rows: json_rows,
            row_count,
        })
    }

    async fn schema(&self) -> AppResult<String> {
        match self.dialect {
            Dialect::Postgres => self.postgres_schema().await,
            Dialect::Sqlite => self.sqlite_schema().await,
            Dialect::Mysql => self.mysql_schema().await,
        }
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}

/// Stand-in executor used when the contracts database is unreachable.
///
/// Every call fails with the stored reason, which the orchestrator converts
/// into a degraded answer. This keeps an unreachable database from aborting
/// startup while still surfacing the failure on every contract request.
pub struct OfflineExecutor {
    reason: String,
}

impl OfflineExecutor {
    /// Create an offline executor remembering why the database is down.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl SqlExecutor for OfflineExecutor {
    async fn execute(&self, _sql: &str) -> AppResult<SqlRowSet> {
        Err(AppError::Sql(format!(
            "contracts database unavailable: {}",
            self.reason
        )))
    }

    async fn schema(&self) -> AppResult<String> {
        Err(AppError::Sql(format!(
            "contracts database unavailable: {}",
            self.reason
        )))
    }

    async fn ping(&self) -> bool {
        false
    }
}

/// Figure out dialect from connection string.
fn detect_dialect(url: &str) -> Dialect {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        Dialect::Postgres
    } else if url.starts_with("mysql://") || url.starts_with("mariadb://") {
        Dialect::Mysql
    } else {
        Dialect::Sqlite
    }
}

/// Turn schema rows into readable text for the SQL generator.
fn format_schema(rows: Vec<(String, String, String)>) -> String {
    let mut result = String::new();
    let mut current_table = String::new();

    for (table, column, dtype) in rows {
        if table != current_table {
            if !current_table.is_empty() {
                result.push_str(")\n\n");
            }
            result.push_str(&format!("TABLE {table} (\n"));
            current_table = table;
        }
        result.push_str(&format!("  {column} {dtype}\n"));
    }

    if !current_table.is_empty() {
        result.push(')');
    }

    result
}

/// Convert database values to JSON (handling type mismatches gracefully).
fn row_value_to_json(row: &sqlx::any::AnyRow, index: usize) -> serde_json::Value {
    use sqlx::ValueRef;

    // Null check first
    if row.try_get_raw(index).map(|v| v.is_null()).unwrap_or(true) {
        return serde_json::Value::Null;
    }

    // Try types in order of how common they are
    if let Ok(v) = row.try_get::<String, _>(index) {
        return serde_json::Value::String(v);
    }
    if let Ok(v) = row.try_get::<i64, _>(index) {
        return serde_json::Value::Number(v.into());
    }
    if let Ok(v) = row.try_get::<i32, _>(index) {
        return serde_json::Value::Number(v.into());
    }
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return serde_json::Number::from_f64(v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<bool, _>(index) {
        return serde_json::Value::Bool(v);
    }

    // Some backend types just don't map through the Any driver
    serde_json::Value::String("<unsupported>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // A file-backed database: pooled connections to an anonymous in-memory
    // SQLite database would each see their own empty schema.
    async fn seeded_executor() -> (SqlxExecutor, tempfile::TempDir) {
        let dir = tempfile::TempDir::new().unwrap();
        let url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("contracts.db").display()
        );
        let executor = SqlxExecutor::connect(&url).await.unwrap();

        sqlx::query(
            "CREATE TABLE contracts (
                contract_id INTEGER PRIMARY KEY,
                customer_name TEXT NOT NULL,
                expiration_date TEXT NOT NULL,
                pricing REAL NOT NULL
            )",
        )
        .execute(executor.pool())
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO contracts (contract_id, customer_name, expiration_date, pricing)
             VALUES (12345, 'ACME Corp', '2024-12-31', 25000.0)",
        )
        .execute(executor.pool())
        .await
        .unwrap();

        (executor, dir)
    }

    #[tokio::test]
    async fn test_execute_select() {
        let (executor, _dir) = seeded_executor().await;

        let rows = executor
            .execute("SELECT customer_name, expiration_date FROM contracts")
            .await
            .unwrap();

        assert_eq!(rows.row_count, 1);
        assert_eq!(rows.columns, vec!["customer_name", "expiration_date"]);
        assert_eq!(rows.rows[0][0], serde_json::json!("ACME Corp"));
    }

    #[tokio::test]
    async fn test_execute_empty_result() {
        let (executor, _dir) = seeded_executor().await;

        let rows = executor
            .execute("SELECT * FROM contracts WHERE contract_id = 999")
            .await
            .unwrap();

        assert_eq!(rows.row_count, 0);
        assert_eq!(rows.to_text(), "No results found.");
    }

    #[tokio::test]
    async fn test_schema_lists_tables() {
        let (executor, _dir) = seeded_executor().await;

        let schema = executor.schema().await.unwrap();
        assert!(schema.contains("TABLE contracts"));
        assert!(schema.contains("customer_name"));
    }

    #[tokio::test]
    async fn test_ping() {
        let (executor, _dir) = seeded_executor().await;
        assert!(executor.ping().await);
    }

    #[tokio::test]
    async fn test_invalid_sql_is_error() {
        let (executor, _dir) = seeded_executor().await;
        assert!(executor.execute("SELECT FROM nowhere AT ALL").await.is_err());
    }

    #[tokio::test]
    async fn test_offline_executor_always_fails() {
        let executor = OfflineExecutor::new("connection refused");

        assert!(!executor.ping().await);
        let err = executor.execute("SELECT 1").await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
        assert!(executor.schema().await.is_err());
    }
}
