//! SQL text for the legacy databases.
//!
//! Identifiers are quoted per dialect; filter values are left as placeholders
//! and bound by the caller in the order of `ColumnQuery::filters`.

use crate::core::identifier::{quote_mysql, quote_pg};
use crate::core::traits::{ColumnQuery, GroupQuery, PageQuery};
use crate::error::Result;

/// SQL flavor of a legacy database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceDialect {
    Mysql,
    Postgres,
}

impl SourceDialect {
    pub fn name(&self) -> &'static str {
        match self {
            SourceDialect::Mysql => "mysql",
            SourceDialect::Postgres => "postgres",
        }
    }

    pub fn quote_ident(&self, name: &str) -> Result<String> {
        match self {
            SourceDialect::Mysql => quote_mysql(name),
            SourceDialect::Postgres => quote_pg(name),
        }
    }

    /// Bind placeholder for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            SourceDialect::Mysql => "?".to_string(),
            SourceDialect::Postgres => format!("${}", index),
        }
    }

    fn bigint_type(&self) -> &'static str {
        match self {
            SourceDialect::Mysql => "SIGNED",
            SourceDialect::Postgres => "BIGINT",
        }
    }

    /// `SELECT * ... ORDER BY .. ASC LIMIT .. OFFSET ..`.
    pub fn build_page_query(&self, query: &PageQuery, limit: usize, offset: usize) -> Result<String> {
        let mut sql = format!("SELECT * FROM {}", self.quote_ident(&query.table)?);

        if !query.exclude_ids.is_empty() {
            let ids: Vec<String> = query.exclude_ids.iter().map(i64::to_string).collect();
            sql.push_str(&format!(
                " WHERE {} NOT IN ({})",
                self.quote_ident("id")?,
                ids.join(", ")
            ));
        }

        sql.push_str(&format!(
            " ORDER BY {} ASC LIMIT {} OFFSET {}",
            self.quote_ident(&query.order_by)?,
            limit,
            offset
        ));
        Ok(sql)
    }

    /// `SELECT column ... WHERE a = ? AND b = ? [ORDER BY ..]`.
    pub fn build_column_query(&self, query: &ColumnQuery) -> Result<String> {
        let mut sql = format!(
            "SELECT {} FROM {}",
            self.quote_ident(&query.column)?,
            self.quote_ident(&query.table)?
        );

        if !query.filters.is_empty() {
            let conditions = query
                .filters
                .iter()
                .enumerate()
                .map(|(i, (column, _))| {
                    Ok(format!("{} = {}", self.quote_ident(column)?, self.placeholder(i + 1)))
                })
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        if let Some(order_by) = &query.order_by {
            sql.push_str(&format!(" ORDER BY {} ASC", self.quote_ident(order_by)?));
        }
        Ok(sql)
    }

    /// `SELECT CAST(MIN(id) ..) ... GROUP BY .. HAVING COUNT(id) >= n`.
    pub fn build_group_query(&self, query: &GroupQuery) -> Result<String> {
        let id = self.quote_ident("id")?;
        let group_by = query
            .group_by
            .iter()
            .map(|column| self.quote_ident(column))
            .collect::<Result<Vec<_>>>()?;

        Ok(format!(
            "SELECT CAST(MIN({id}) AS {}) FROM {} GROUP BY {} HAVING COUNT({id}) >= {}",
            self.bigint_type(),
            self.quote_ident(&query.table)?,
            group_by.join(", "),
            query.min_count
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_mysql() {
        let query = PageQuery::new("Screen");
        assert_eq!(
            SourceDialect::Mysql.build_page_query(&query, 1000, 2000).unwrap(),
            "SELECT * FROM `Screen` ORDER BY `id` ASC LIMIT 1000 OFFSET 2000"
        );
    }

    #[test]
    fn test_page_query_with_exclusions() {
        let query = PageQuery::new("UserAuth").excluding(vec![3, 9]);
        assert_eq!(
            SourceDialect::Postgres.build_page_query(&query, 10, 0).unwrap(),
            "SELECT * FROM \"UserAuth\" WHERE \"id\" NOT IN (3, 9) ORDER BY \"id\" ASC LIMIT 10 OFFSET 0"
        );
    }

    #[test]
    fn test_column_query_placeholders() {
        let query = ColumnQuery::new("User", "id")
            .filter("email", "a@example.com")
            .filter("status", "active")
            .order_by("id");
        assert_eq!(
            SourceDialect::Postgres.build_column_query(&query).unwrap(),
            "SELECT \"id\" FROM \"User\" WHERE \"email\" = $1 AND \"status\" = $2 ORDER BY \"id\" ASC"
        );
        assert_eq!(
            SourceDialect::Mysql.build_column_query(&query).unwrap(),
            "SELECT `id` FROM `User` WHERE `email` = ? AND `status` = ? ORDER BY `id` ASC"
        );
    }

    #[test]
    fn test_group_query() {
        let query = GroupQuery {
            table: "UserAuth".into(),
            group_by: vec!["userId".into(), "source".into()],
            min_count: 2,
        };
        assert_eq!(
            SourceDialect::Mysql.build_group_query(&query).unwrap(),
            "SELECT CAST(MIN(`id`) AS SIGNED) FROM `UserAuth` GROUP BY `userId`, `source` HAVING COUNT(`id`) >= 2"
        );
    }
}
