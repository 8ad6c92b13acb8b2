use tracing::debug;

use crate::core::record::SourceRow;
use crate::core::traits::{PageQuery, SourceStore};
use crate::error::Result;

/// Walks a legacy table in fixed-size pages ordered by primary key.
pub struct Paginator<'a> {
    source: &'a dyn SourceStore,
    query: PageQuery,
    page_size: usize,
    offset: usize,
    done: bool,
}

impl<'a> Paginator<'a> {
    pub fn new(source: &'a dyn SourceStore, query: PageQuery, page_size: usize) -> Self {
        Self {
            source,
            query,
            page_size: page_size.max(1),
            offset: 0,
            done: false,
        }
    }

    /// Next non-empty page, or `None` once the table is exhausted.
    ///
    /// A page shorter than the page size is the last one.
    pub async fn next_page(&mut self) -> Result<Option<Vec<SourceRow>>> {
        if self.done {
            return Ok(None);
        }

        let rows = self
            .source
            .select_page(&self.query, self.page_size, self.offset)
            .await?;
        if rows.len() < self.page_size {
            self.done = true;
        }
        if rows.is_empty() {
            return Ok(None);
        }

        debug!(
            "{}: read {} rows at offset {}",
            self.query.table,
            rows.len(),
            self.offset
        );
        self.offset += rows.len();
        Ok(Some(rows))
    }

    /// Rows yielded so far.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    fn source(rows: i64) -> MemorySource {
        let source = MemorySource::with_tables(&["Project"]);
        for id in (1..=rows).rev() {
            source.upsert("Project", SourceRow::new(id));
        }
        source
    }

    async fn page_sizes(source: &MemorySource, page_size: usize) -> Vec<usize> {
        let mut paginator = Paginator::new(source, PageQuery::new("Project"), page_size);
        let mut sizes = Vec::new();
        while let Some(page) = paginator.next_page().await.unwrap() {
            sizes.push(page.len());
        }
        sizes
    }

    #[tokio::test]
    async fn test_short_last_page() {
        assert_eq!(page_sizes(&source(2500), 1000).await, vec![1000, 1000, 500]);
    }

    #[tokio::test]
    async fn test_exact_multiple() {
        assert_eq!(page_sizes(&source(2000), 1000).await, vec![1000, 1000]);
    }

    #[tokio::test]
    async fn test_empty_table() {
        assert!(page_sizes(&source(0), 1000).await.is_empty());
    }

    #[tokio::test]
    async fn test_pages_are_ascending() {
        let source = source(25);
        let mut paginator = Paginator::new(&source, PageQuery::new("Project"), 10);
        let mut ids = Vec::new();
        while let Some(page) = paginator.next_page().await.unwrap() {
            ids.extend(page.into_iter().map(|row| row.id));
        }
        assert_eq!(ids, (1..=25).collect::<Vec<_>>());
        assert_eq!(paginator.offset(), 25);
        assert!(paginator.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_failure_is_an_error() {
        let source = MemorySource::new();
        let mut paginator = Paginator::new(&source, PageQuery::new("Project"), 10);
        assert!(paginator.next_page().await.is_err());
    }
}
