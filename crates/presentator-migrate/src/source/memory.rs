//! In-memory legacy database, used by tests and dry runs over fixtures.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::core::record::SourceRow;
use crate::core::traits::{ColumnQuery, GroupQuery, PageQuery, SourceStore};
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};

/// Tables of rows keyed by table name.
#[derive(Default)]
pub struct MemorySource {
    tables: Mutex<BTreeMap<String, Vec<SourceRow>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source with the given (empty) tables.
    pub fn with_tables(names: &[&str]) -> Self {
        let source = Self::new();
        {
            let mut tables = source.lock();
            for name in names {
                tables.entry(name.to_string()).or_default();
            }
        }
        source
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Vec<SourceRow>>> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert or replace a row, creating the table if needed.
    pub fn upsert(&self, table: &str, row: SourceRow) {
        let mut tables = self.lock();
        let rows = tables.entry(table.to_string()).or_default();
        match rows.iter_mut().find(|existing| existing.id == row.id) {
            Some(existing) => *existing = row,
            None => rows.push(row),
        }
    }

    pub fn remove(&self, table: &str, id: i64) -> Option<SourceRow> {
        let mut tables = self.lock();
        let rows = tables.get_mut(table)?;
        let position = rows.iter().position(|row| row.id == id)?;
        Some(rows.remove(position))
    }

    pub fn row(&self, table: &str, id: i64) -> Option<SourceRow> {
        self.lock()
            .get(table)
            .and_then(|rows| rows.iter().find(|row| row.id == id).cloned())
    }

    fn table(&self, table: &str) -> Result<Vec<SourceRow>> {
        self.lock()
            .get(table)
            .cloned()
            .ok_or_else(|| MigrateError::Store(format!("table {:?} does not exist", table)))
    }
}

#[async_trait]
impl SourceStore for MemorySource {
    async fn select_page(
        &self,
        query: &PageQuery,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SourceRow>> {
        let mut rows = self.table(&query.table)?;
        rows.retain(|row| !query.exclude_ids.contains(&row.id));
        rows.sort_by(|a, b| {
            a.value(&query.order_by)
                .compare(&b.value(&query.order_by))
                .then(a.id.cmp(&b.id))
        });
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn select_column(&self, query: &ColumnQuery) -> Result<Vec<SqlValue>> {
        let mut rows = self.table(&query.table)?;
        rows.retain(|row| {
            query
                .filters
                .iter()
                .all(|(column, value)| row.value(column).loosely_equals(value))
        });
        match &query.order_by {
            Some(column) => rows.sort_by(|a, b| a.value(column).compare(&b.value(column))),
            None => rows.sort_by_key(|row| row.id),
        }
        Ok(rows.iter().map(|row| row.value(&query.column)).collect())
    }

    async fn select_grouped_having_count(&self, query: &GroupQuery) -> Result<Vec<i64>> {
        let rows = self.table(&query.table)?;
        let mut groups: BTreeMap<Vec<Option<String>>, (i64, i64)> = BTreeMap::new();
        for row in &rows {
            let key = query
                .group_by
                .iter()
                .map(|column| row.value(column).to_text())
                .collect();
            let entry = groups.entry(key).or_insert((row.id, 0));
            entry.0 = entry.0.min(row.id);
            entry.1 += 1;
        }

        let mut ids: Vec<i64> = groups
            .into_values()
            .filter(|(_, count)| *count >= query.min_count)
            .map(|(min_id, _)| min_id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn db_type(&self) -> &str {
        "memory"
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> MemorySource {
        let source = MemorySource::with_tables(&["Screen", "UserAuth"]);
        for (id, order) in [(3, 2), (1, 3), (2, 1)] {
            source.upsert(
                "Screen",
                SourceRow::new(id).with("prototypeId", 7).with("order", order),
            );
        }
        source
    }

    #[tokio::test]
    async fn test_select_page_orders_by_id() {
        let source = source();
        let page = source
            .select_page(&PageQuery::new("Screen"), 2, 0)
            .await
            .unwrap();
        assert_eq!(page.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);

        let rest = source
            .select_page(&PageQuery::new("Screen"), 2, 2)
            .await
            .unwrap();
        assert_eq!(rest.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3]);
    }

    #[tokio::test]
    async fn test_select_page_missing_table() {
        let err = MemorySource::new()
            .select_page(&PageQuery::new("Nope"), 10, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::Store(_)));
    }

    #[tokio::test]
    async fn test_select_column_with_ordering() {
        let query = ColumnQuery::new("Screen", "id")
            .filter("prototypeId", 7)
            .order_by("order");
        let ids = source().select_column(&query).await.unwrap();
        assert_eq!(ids, vec![SqlValue::I64(2), SqlValue::I64(3), SqlValue::I64(1)]);
    }

    #[tokio::test]
    async fn test_grouped_having_count() {
        let source = source();
        for (id, user, provider) in [(1, 1, "google"), (2, 1, "google"), (3, 1, "github"), (4, 2, "google"), (5, 2, "google"), (6, 2, "google")] {
            source.upsert(
                "UserAuth",
                SourceRow::new(id).with("userId", user).with("source", provider),
            );
        }
        let query = GroupQuery {
            table: "UserAuth".into(),
            group_by: vec!["userId".into(), "source".into()],
            min_count: 2,
        };
        assert_eq!(
            source.select_grouped_having_count(&query).await.unwrap(),
            vec![1, 4]
        );
    }
}
