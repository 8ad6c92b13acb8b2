//! Store abstractions used by the sync engine.
//!
//! - [`SourceStore`]: read-only access to the legacy tables
//! - [`TargetStore`]: record-level access to the new collections
//!
//! Blob stores live in [`crate::blob`].

use async_trait::async_trait;

use crate::error::Result;

use super::record::{SourceRow, TargetRecord};
use super::value::SqlValue;

/// A page request against one legacy table.
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub table: String,
    /// Column the page is ordered by, ascending.
    pub order_by: String,
    /// Row ids left out of the result.
    pub exclude_ids: Vec<i64>,
}

impl PageQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            order_by: "id".to_string(),
            exclude_ids: Vec::new(),
        }
    }

    pub fn excluding(mut self, ids: Vec<i64>) -> Self {
        self.exclude_ids = ids;
        self
    }
}

/// Read a single column filtered by column equality.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnQuery {
    pub table: String,
    pub column: String,
    pub filters: Vec<(String, SqlValue)>,
    pub order_by: Option<String>,
}

impl ColumnQuery {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            filters: Vec::new(),
            order_by: None,
        }
    }

    pub fn filter(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(column.into());
        self
    }
}

/// `SELECT MIN(id) ... GROUP BY .. HAVING COUNT(id) >= min_count`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupQuery {
    pub table: String,
    pub group_by: Vec<String>,
    pub min_count: i64,
}

/// A single condition of a [`RecordFilter`].
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String, SqlValue),
    /// Case-insensitive text equality.
    EqIgnoreCase(String, String),
    /// Excludes the record with this id.
    NotId(String),
}

/// Conjunction of conditions used to look records up in a collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub conditions: Vec<Condition>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.conditions.push(Condition::Eq(field.into(), value.into()));
        self
    }

    pub fn eq_ignore_case(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions
            .push(Condition::EqIgnoreCase(field.into(), value.into()));
        self
    }

    pub fn not_id(mut self, id: impl Into<String>) -> Self {
        self.conditions.push(Condition::NotId(id.into()));
        self
    }

    /// Evaluate the filter against a record held in memory.
    pub fn matches(&self, record: &TargetRecord) -> bool {
        self.conditions.iter().all(|condition| match condition {
            Condition::Eq(field, value) => record
                .get(field)
                .is_some_and(|stored| stored.loosely_equals(value)),
            Condition::EqIgnoreCase(field, value) => record
                .get(field)
                .and_then(|stored| stored.to_text())
                .is_some_and(|stored| stored.to_lowercase() == value.to_lowercase()),
            Condition::NotId(id) => record.id != *id,
        })
    }
}

/// A target collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub id: String,
    pub name: String,
}

/// Read access to the legacy database.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Read one page of a table ordered by `query.order_by` ascending.
    async fn select_page(
        &self,
        query: &PageQuery,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SourceRow>>;

    /// Read a single column.
    async fn select_column(&self, query: &ColumnQuery) -> Result<Vec<SqlValue>>;

    /// Smallest id of every group with at least `min_count` rows.
    async fn select_grouped_having_count(&self, query: &GroupQuery) -> Result<Vec<i64>>;

    /// Get the database type identifier.
    fn db_type(&self) -> &str;

    /// Close all connections.
    async fn close(&self);
}

/// Record-level access to the new store.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Look a collection up by name. Missing collections are an error.
    async fn find_collection(&self, name: &str) -> Result<Collection>;

    /// Whether the collection holds no records.
    async fn is_empty(&self, collection: &Collection) -> Result<bool>;

    async fn find_by_id(&self, collection: &Collection, id: &str)
        -> Result<Option<TargetRecord>>;

    /// First record matching the filter, if any.
    async fn find_first(
        &self,
        collection: &Collection,
        filter: &RecordFilter,
    ) -> Result<Option<TargetRecord>>;

    /// Number of records matching the filter.
    async fn count(&self, collection: &Collection, filter: &RecordFilter) -> Result<u64>;

    /// Every record id of the collection.
    async fn list_ids(&self, collection: &Collection) -> Result<Vec<String>>;

    async fn insert(&self, collection: &Collection, record: &TargetRecord) -> Result<()>;

    async fn update(&self, collection: &Collection, record: &TargetRecord) -> Result<()>;

    async fn delete(&self, collection: &Collection, id: &str) -> Result<()>;

    /// Get the database type identifier.
    fn db_type(&self) -> &str;

    /// Close all connections.
    async fn close(&self);
}
