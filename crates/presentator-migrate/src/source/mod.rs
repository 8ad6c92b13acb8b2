//! Legacy (v2) database access.

mod dialect;
mod memory;
mod mysql;
mod postgres;

pub use dialect::SourceDialect;
pub use memory::MemorySource;
pub use mysql::MysqlSource;
pub use postgres::PgSource;

use async_trait::async_trait;

use crate::config::{SourceConfig, SourceDriver};
use crate::core::record::SourceRow;
use crate::core::traits::{ColumnQuery, GroupQuery, PageQuery, SourceStore};
use crate::core::value::SqlValue;
use crate::error::Result;

/// Enum wrapper for the supported legacy databases.
pub enum SourcePoolImpl {
    Mysql(MysqlSource),
    Postgres(PgSource),
}

impl SourcePoolImpl {
    /// Create the source pool from configuration.
    pub async fn from_config(config: &SourceConfig) -> Result<Self> {
        match config.driver {
            SourceDriver::Mysql => Ok(Self::Mysql(MysqlSource::connect(config).await?)),
            SourceDriver::Postgres => Ok(Self::Postgres(PgSource::connect(config).await?)),
        }
    }
}

#[async_trait]
impl SourceStore for SourcePoolImpl {
    async fn select_page(
        &self,
        query: &PageQuery,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SourceRow>> {
        match self {
            Self::Mysql(p) => p.select_page(query, limit, offset).await,
            Self::Postgres(p) => p.select_page(query, limit, offset).await,
        }
    }

    async fn select_column(&self, query: &ColumnQuery) -> Result<Vec<SqlValue>> {
        match self {
            Self::Mysql(p) => p.select_column(query).await,
            Self::Postgres(p) => p.select_column(query).await,
        }
    }

    async fn select_grouped_having_count(&self, query: &GroupQuery) -> Result<Vec<i64>> {
        match self {
            Self::Mysql(p) => p.select_grouped_having_count(query).await,
            Self::Postgres(p) => p.select_grouped_having_count(query).await,
        }
    }

    fn db_type(&self) -> &str {
        match self {
            Self::Mysql(p) => p.db_type(),
            Self::Postgres(p) => p.db_type(),
        }
    }

    async fn close(&self) {
        match self {
            Self::Mysql(p) => p.close().await,
            Self::Postgres(p) => p.close().await,
        }
    }
}
