//! PostgreSQL legacy database.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow, Postgres};
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

const DIALECT: SourceDialect = SourceDialect::Postgres;

/// PostgreSQL source store.
pub struct PgSource {
    pool: PgPool,
}

impl PgSource {
    /// Connect using the configured connection URL.
    pub async fn connect(config: &SourceConfig) -> Result<Self> {
        let max_conns = config.get_max_connections();
        let pool = PgPoolOptions::new()
            .max_connections(max_conns)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect(&config.connection)
            .await
            .map_err(|e| MigrateError::pool(e, "creating PostgreSQL source pool"))?;

        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| MigrateError::pool(e, "testing PostgreSQL source connection"))?;

        info!("Connected to PostgreSQL source (pool_size={})", max_conns);
        Ok(Self { pool })
    }

    fn convert_value(row: &PgRow, i: usize, type_name: &str) -> SqlValue {
        let is_null: bool = row.try_get_raw(i).map(|r| r.is_null()).unwrap_or(true);
        if is_null {
            return SqlValue::Null;
        }

        match type_name.to_uppercase().as_str() {
            "BOOL" => row.try_get::<bool, _>(i).map(SqlValue::Bool).ok(),
            "INT2" => row.try_get::<i16, _>(i).map(|v| SqlValue::I64(v.into())).ok(),
            "INT4" => row.try_get::<i32, _>(i).map(|v| SqlValue::I64(v.into())).ok(),
            "INT8" => row.try_get::<i64, _>(i).map(SqlValue::I64).ok(),
            "FLOAT4" => row
                .try_get::<f32, _>(i)
                .map(|v| SqlValue::F64(f64::from(v)))
                .ok(),
            "FLOAT8" => row.try_get::<f64, _>(i).map(SqlValue::F64).ok(),
            "NUMERIC" => row
                .try_get::<rust_decimal::Decimal, _>(i)
                .ok()
                .and_then(|d| d.to_f64())
                .map(SqlValue::F64),
            "TIMESTAMPTZ" => row
                .try_get::<chrono::DateTime<chrono::Utc>, _>(i)
                .map(SqlValue::DateTime)
                .ok(),
            "TIMESTAMP" => row
                .try_get::<chrono::NaiveDateTime, _>(i)
                .map(|dt| SqlValue::DateTime(dt.and_utc()))
                .ok(),
            "DATE" => row
                .try_get::<chrono::NaiveDate, _>(i)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| SqlValue::DateTime(dt.and_utc())),
            "JSON" | "JSONB" => row
                .try_get::<serde_json::Value, _>(i)
                .map(SqlValue::Json)
                .ok(),
            "BYTEA" => row
                .try_get::<Vec<u8>, _>(i)
                .map(|b| SqlValue::Text(String::from_utf8_lossy(&b).into_owned()))
                .ok(),
            _ => row.try_get::<String, _>(i).map(SqlValue::Text).ok(),
        }
        .unwrap_or(SqlValue::Null)
    }

    fn row_to_source(row: &PgRow, table: &str) -> Result<SourceRow> {
        let mut columns = BTreeMap::new();
        for (i, column) in row.columns().iter().enumerate() {
            let value = Self::convert_value(row, i, column.type_info().name());
            columns.insert(column.name().to_string(), value);
        }
        SourceRow::from_columns(columns)
            .ok_or_else(|| MigrateError::Store(format!("{} row without an integer id", table)))
    }

    fn bind_value<'q>(
        query: Query<'q, Postgres, PgArguments>,
        value: &SqlValue,
    ) -> Query<'q, Postgres, PgArguments> {
        match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::I64(v) => query.bind(*v),
            SqlValue::F64(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::DateTime(v) => query.bind(*v),
            SqlValue::Json(v) => query.bind(v.clone()),
        }
    }
}

#[async_trait]
impl SourceStore for PgSource {
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
