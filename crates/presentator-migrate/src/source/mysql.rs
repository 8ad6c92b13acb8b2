//! MySQL/MariaDB legacy database.
//!
//! Uses SQLx for connection pooling and async query execution.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use sqlx::mysql::{MySql, MySqlArguments, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::{debug, info};

use super::dialect::SourceDialect;
use crate::config::SourceConfig;
use crate::core::record::SourceRow;
use crate::core::traits::{ColumnQuery, GroupQuery, PageQuery, SourceStore};
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

const DIALECT: SourceDialect = SourceDialect::Mysql;

/// MySQL source store.
pub struct MysqlSource {
    pool: MySqlPool,
}

impl MysqlSource {
    /// Connect using the configured connection URL.
    pub async fn connect(config: &SourceConfig) -> Result<Self> {
        let max_conns = config.get_max_connections();
        let pool = MySqlPoolOptions::new()
            .max_connections(max_conns)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect(&config.connection)
            .await
            .map_err(|e| MigrateError::pool(e, "creating MySQL source pool"))?;

        // Test connection
        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| MigrateError::pool(e, "testing MySQL source connection"))?;

        info!("Connected to MySQL source (pool_size={})", max_conns);
        Ok(Self { pool })
    }

    /// Convert a column of a MySQL row by its reported type name.
    fn convert_value(row: &MySqlRow, i: usize, type_name: &str) -> SqlValue {
        let is_null: bool = row.try_get_raw(i).map(|r| r.is_null()).unwrap_or(true);
        if is_null {
            return SqlValue::Null;
        }

        let type_name = type_name.to_lowercase();
        let unsigned = type_name.ends_with(" unsigned");
        let base = type_name.trim_end_matches(" unsigned");

        match base {
            "boolean" | "bool" => row
                .try_get::<bool, _>(i)
                .map(SqlValue::Bool)
                .unwrap_or(SqlValue::Null),

            "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "year" => {
                let value = if unsigned {
                    row.try_get::<u64, _>(i)
                        .ok()
                        .and_then(|v| i64::try_from(v).ok())
                } else {
                    row.try_get::<i64, _>(i).ok()
                };
                value.map(SqlValue::I64).unwrap_or(SqlValue::Null)
            }

            "float" => row
                .try_get::<f32, _>(i)
                .map(|v| SqlValue::F64(f64::from(v)))
                .unwrap_or(SqlValue::Null),
            "double" | "real" => row
                .try_get::<f64, _>(i)
                .map(SqlValue::F64)
                .unwrap_or(SqlValue::Null),
            "decimal" | "numeric" => row
                .try_get::<rust_decimal::Decimal, _>(i)
                .ok()
                .and_then(|d| d.to_f64())
                .map(SqlValue::F64)
                .unwrap_or(SqlValue::Null),

            "date" => row
                .try_get::<chrono::NaiveDate, _>(i)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| SqlValue::DateTime(dt.and_utc()))
                .unwrap_or(SqlValue::Null),
            "datetime" | "timestamp" => row
                .try_get::<chrono::NaiveDateTime, _>(i)
                .map(|dt| SqlValue::DateTime(dt.and_utc()))
                .unwrap_or(SqlValue::Null),

            "json" => row
                .try_get::<serde_json::Value, _>(i)
                .map(SqlValue::Json)
                .unwrap_or(SqlValue::Null),

            "binary" | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob" => row
                .try_get::<Vec<u8>, _>(i)
                .map(|b| SqlValue::Text(String::from_utf8_lossy(&b).into_owned()))
                .unwrap_or(SqlValue::Null),

            // char, varchar, text, enum, set and anything else readable as text
            _ => row
                .try_get::<String, _>(i)
                .map(SqlValue::Text)
                .unwrap_or(SqlValue::Null),
        }
    }

    fn row_to_source(row: &MySqlRow, table: &str) -> Result<SourceRow> {
        let mut columns = BTreeMap::new();
        for (i, column) in row.columns().iter().enumerate() {
            let value = Self::convert_value(row, i, column.type_info().name());
            columns.insert(column.name().to_string(), value);
        }
        SourceRow::from_columns(columns)
            .ok_or_else(|| MigrateError::Store(format!("{} row without an integer id", table)))
    }

    fn bind_value<'q>(
        query: Query<'q, MySql, MySqlArguments>,
        value: &SqlValue,
    ) -> Query<'q, MySql, MySqlArguments> {
        match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::I64(v) => query.bind(*v),
            SqlValue::F64(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::DateTime(v) => query.bind(v.naive_utc()),
            SqlValue::Json(v) => query.bind(v.to_string()),
        }
    }
}

#[async_trait]
impl SourceStore for MysqlSource {
    async fn select_page(
        &self,
        query: &PageQuery,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SourceRow>> {
        let sql = DIALECT.build_page_query(query, limit, offset)?;
        debug!("{}", sql);

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::source_db(format!("reading {}", query.table), e))?;

        rows.iter()
            .map(|row| Self::row_to_source(row, &query.table))
            .collect()
    }

    async fn select_column(&self, query: &ColumnQuery) -> Result<Vec<SqlValue>> {
        let sql = DIALECT.build_column_query(query)?;
        let mut prepared = sqlx::query(&sql);
        for (_, value) in &query.filters {
            prepared = Self::bind_value(prepared, value);
        }

        let rows = prepared.fetch_all(&self.pool).await.map_err(|e| {
            MigrateError::source_db(format!("reading {}.{}", query.table, query.column), e)
        })?;

        Ok(rows
            .iter()
            .map(|row| {
                let type_name = row
                    .columns()
                    .first()
                    .map(|c| c.type_info().name().to_string())
                    .unwrap_or_default();
                Self::convert_value(row, 0, &type_name)
            })
            .collect())
    }

    async fn select_grouped_having_count(&self, query: &GroupQuery) -> Result<Vec<i64>> {
        let sql = DIALECT.build_group_query(query)?;
        sqlx::query_scalar::<_, i64>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::source_db(format!("grouping {}", query.table), e))
    }

    fn db_type(&self) -> &str {
        DIALECT.name()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
