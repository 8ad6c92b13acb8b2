//! SQLite target store (`pb_data/data.db`).
//!
//! Every collection is a table named after the collection and registered in
//! `_collections`. Datetimes are stored as text in [`DATETIME_FORMAT`] and
//! JSON values as serialized text.
//!
//! [`DATETIME_FORMAT`]: crate::core::value::DATETIME_FORMAT

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::info;

use crate::core::identifier::quote_sqlite;
use crate::core::record::TargetRecord;
use crate::core::traits::{Collection, Condition, RecordFilter, TargetStore};
use crate::core::value::{format_datetime, parse_datetime, SqlValue};
use crate::error::{MigrateError, Result};

/// How long a statement waits on a locked database.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// SQLite target store.
pub struct SqliteTarget {
    pool: SqlitePool,
}

impl SqliteTarget {
    /// Open an existing database file.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(false)
            .busy_timeout(BUSY_TIMEOUT);

        // A single connection keeps reads consistent with the writes of the pass.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| MigrateError::pool(e, "opening target database"))?;

        info!("Opened target database {}", path.display());
        Ok(Self { pool })
    }

    fn table(collection: &Collection) -> Result<String> {
        quote_sqlite(&collection.name)
    }

    fn convert_value(row: &SqliteRow, i: usize) -> SqlValue {
        let type_name = match row.try_get_raw(i) {
            Ok(raw) if raw.is_null() => return SqlValue::Null,
            Ok(raw) => raw.type_info().name().to_uppercase(),
            Err(_) => return SqlValue::Null,
        };

        match type_name.as_str() {
            "INTEGER" | "BOOLEAN" => row.try_get::<i64, _>(i).map(SqlValue::I64).ok(),
            "REAL" => row.try_get::<f64, _>(i).map(SqlValue::F64).ok(),
            "BLOB" => row
                .try_get::<Vec<u8>, _>(i)
                .map(|b| SqlValue::Text(String::from_utf8_lossy(&b).into_owned()))
                .ok(),
            _ => row.try_get::<String, _>(i).map(SqlValue::Text).ok(),
        }
        .unwrap_or(SqlValue::Null)
    }

    fn row_to_record(row: &SqliteRow) -> Result<TargetRecord> {
        let mut record = TargetRecord::new(String::new());
        for (i, column) in row.columns().iter().enumerate() {
            let value = Self::convert_value(row, i);
            match column.name() {
                "id" => {
                    record.id = value
                        .to_text()
                        .ok_or_else(|| MigrateError::Store("record without an id".into()))?
                }
                "created" => record.created = value.to_text().and_then(|v| parse_datetime(&v)),
                "updated" => record.updated = value.to_text().and_then(|v| parse_datetime(&v)),
                name => {
                    record.fields.insert(name.to_string(), value);
                }
            }
        }
        Ok(record)
    }

    fn bind_value<'q>(
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        value: &SqlValue,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::I64(v) => query.bind(*v),
            SqlValue::F64(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::DateTime(v) => query.bind(format_datetime(v)),
            SqlValue::Json(v) => query.bind(v.to_string()),
        }
    }

    /// Build a WHERE clause and its bind values.
    fn build_where(filter: &RecordFilter) -> Result<(String, Vec<SqlValue>)> {
        if filter.conditions.is_empty() {
            return Ok(("1 = 1".to_string(), Vec::new()));
        }

        let mut clauses = Vec::with_capacity(filter.conditions.len());
        let mut values = Vec::with_capacity(filter.conditions.len());
        for condition in &filter.conditions {
            match condition {
                Condition::Eq(field, value) => {
                    clauses.push(format!("{} = ?", quote_sqlite(field)?));
                    values.push(value.clone());
                }
                Condition::EqIgnoreCase(field, value) => {
                    clauses.push(format!("LOWER({}) = LOWER(?)", quote_sqlite(field)?));
                    values.push(SqlValue::Text(value.clone()));
                }
                Condition::NotId(id) => {
                    clauses.push("\"id\" != ?".to_string());
                    values.push(SqlValue::Text(id.clone()));
                }
            }
        }
        Ok((clauses.join(" AND "), values))
    }

    /// Column names and values of a record in write order.
    fn record_columns(record: &TargetRecord) -> Result<Vec<(String, SqlValue)>> {
        // Unknown timestamps are written as empty text; the columns are NOT NULL.
        let datetime = |value: Option<DateTime<Utc>>| {
            SqlValue::Text(value.as_ref().map(format_datetime).unwrap_or_default())
        };
        let mut columns = vec![
            ("\"created\"".to_string(), datetime(record.created)),
            ("\"updated\"".to_string(), datetime(record.updated)),
        ];
        for (name, value) in &record.fields {
            columns.push((quote_sqlite(name)?, value.clone()));
        }
        Ok(columns)
    }
}

#[async_trait]
impl TargetStore for SqliteTarget {
    async fn find_collection(&self, name: &str) -> Result<Collection> {
        let row = sqlx::query("SELECT id, name FROM _collections WHERE name = ? LIMIT 1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MigrateError::target_db(format!("looking up collection {}", name), e))?
            .ok_or_else(|| MigrateError::CollectionNotFound(name.to_string()))?;

        Ok(Collection {
            id: row
                .try_get("id")
                .map_err(|e| MigrateError::target_db("reading _collections.id", e))?,
            name: row
                .try_get("name")
                .map_err(|e| MigrateError::target_db("reading _collections.name", e))?,
        })
    }

    async fn is_empty(&self, collection: &Collection) -> Result<bool> {
        let sql = format!("SELECT 1 FROM {} LIMIT 1", Self::table(collection)?);
        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MigrateError::target_db(format!("probing {}", collection.name), e))?;
        Ok(row.is_none())
    }

    async fn find_by_id(
        &self,
        collection: &Collection,
        id: &str,
    ) -> Result<Option<TargetRecord>> {
        self.find_first(collection, &RecordFilter::new().eq("id", id))
            .await
    }

    async fn find_first(
        &self,
        collection: &Collection,
        filter: &RecordFilter,
    ) -> Result<Option<TargetRecord>> {
        let (clause, values) = Self::build_where(filter)?;
        let sql = format!(
            "SELECT * FROM {} WHERE {} LIMIT 1",
            Self::table(collection)?,
            clause
        );
        let mut query = sqlx::query(&sql);
        for value in &values {
            query = Self::bind_value(query, value);
        }

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MigrateError::target_db(format!("reading {}", collection.name), e))?;
        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn count(&self, collection: &Collection, filter: &RecordFilter) -> Result<u64> {
        let (clause, values) = Self::build_where(filter)?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            Self::table(collection)?,
            clause
        );
        let mut query = sqlx::query(&sql);
        for value in &values {
            query = Self::bind_value(query, value);
        }

        let total: i64 = query
            .fetch_one(&self.pool)
            .await
            .and_then(|row| row.try_get(0))
            .map_err(|e| MigrateError::target_db(format!("counting {}", collection.name), e))?;
        Ok(total.max(0) as u64)
    }

    async fn list_ids(&self, collection: &Collection) -> Result<Vec<String>> {
        let sql = format!("SELECT id FROM {}", Self::table(collection)?);
        sqlx::query_scalar::<_, String>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::target_db(format!("listing {}", collection.name), e))
    }

    async fn insert(&self, collection: &Collection, record: &TargetRecord) -> Result<()> {
        let mut columns = vec![("\"id\"".to_string(), SqlValue::Text(record.id.clone()))];
        columns.extend(Self::record_columns(record)?);

        let names: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            Self::table(collection)?,
            names.join(", "),
            vec!["?"; columns.len()].join(", ")
        );

        let mut query = sqlx::query(&sql);
        for (_, value) in &columns {
            query = Self::bind_value(query, value);
        }
        query
            .execute(&self.pool)
            .await
            .map_err(|e| MigrateError::target_db(format!("inserting into {}", collection.name), e))?;
        Ok(())
    }

    async fn update(&self, collection: &Collection, record: &TargetRecord) -> Result<()> {
        let columns = Self::record_columns(record)?;
        let assignments: Vec<String> = columns
            .iter()
            .map(|(name, _)| format!("{} = ?", name))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE \"id\" = ?",
            Self::table(collection)?,
            assignments.join(", ")
        );

        let mut query = sqlx::query(&sql);
        for (_, value) in &columns {
            query = Self::bind_value(query, value);
        }
        let result = query
            .bind(record.id.clone())
            .execute(&self.pool)
            .await
            .map_err(|e| MigrateError::target_db(format!("updating {}", collection.name), e))?;

        if result.rows_affected() == 0 {
            return Err(MigrateError::Store(format!(
                "record {:?} not found in {}",
                record.id, collection.name
            )));
        }
        Ok(())
    }

    async fn delete(&self, collection: &Collection, id: &str) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE \"id\" = ?", Self::table(collection)?);
        sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| MigrateError::target_db(format!("deleting from {}", collection.name), e))?;
        Ok(())
    }

    fn db_type(&self) -> &str {
        "sqlite"
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
