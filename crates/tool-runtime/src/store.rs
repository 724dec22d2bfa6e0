use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::path::Path;
use tracing::{debug, info};

/// A positional bind parameter for [`AnalyticStore::query`].
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i64),
    Real(f64),
    Text(String),
}

/// Rows returned by the analytic store, already converted to JSON mappings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

impl QueryRows {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_json(self) -> Value {
        Value::Array(self.rows.into_iter().map(Value::Object).collect())
    }
}

/// Read access to the analytic tables.
///
/// Implementations must be safe for concurrent use; the registry shares one
/// store across every run in the process.
#[async_trait]
pub trait AnalyticStore: Send + Sync {
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<QueryRows, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
}

/// SQLite-backed store over an `sqlx` connection pool.
///
/// [`SqliteStore::open_read_only`] opens every pooled connection with
/// `SQLITE_OPEN_READONLY`, so the file cannot be modified through this store
/// even if a statement slips past the SQL guard.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open_read_only(path: &Path, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;
        info!(path = %path.display(), max_connections, "Analytic store opened read-only");
        Ok(Self { pool })
    }
}

#[async_trait]
impl AnalyticStore for SqliteStore {
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<QueryRows, StoreError> {
        debug!(sql, params = params.len(), "store query");

        let mut query = sqlx::query(sql);
        for param in params {
            query = match param {
                SqlParam::Int(v) => query.bind(*v),
                SqlParam::Real(v) => query.bind(*v),
                SqlParam::Text(v) => query.bind(v.clone()),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;
        let columns: Vec<String> = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let rows = rows
            .iter()
            .map(row_to_map)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QueryRows { columns, rows })
    }
}

fn row_to_map(row: &SqliteRow) -> Result<Map<String, Value>, sqlx::Error> {
    let mut map = Map::with_capacity(row.columns().len());
    for (idx, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), column_value(row, idx)?);
    }
    Ok(map)
}

/// Decode one cell by its runtime storage class.
fn column_value(row: &SqliteRow, idx: usize) -> Result<Value, sqlx::Error> {
    let type_name = {
        let raw = row.try_get_raw(idx)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        raw.type_info().name().to_ascii_uppercase()
    };

    let value = match type_name.as_str() {
        "INTEGER" | "INT" | "INT8" | "BIGINT" => Value::from(row.try_get_unchecked::<i64, _>(idx)?),
        "BOOLEAN" | "BOOL" => Value::from(row.try_get_unchecked::<bool, _>(idx)?),
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
            let v = row.try_get_unchecked::<f64, _>(idx)?;
            serde_json::Number::from_f64(v)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }
        "BLOB" => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx)?;
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Value::String(row.try_get_unchecked::<String, _>(idx)?),
    };
    Ok(value)
}
