//! Source rows and target records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::value::SqlValue;

/// Named field values of a target record.
pub type FieldSet = BTreeMap<String, SqlValue>;

/// Primary key column of every legacy table.
pub const ID_COLUMN: &str = "id";
pub const CREATED_AT_COLUMN: &str = "createdAt";
pub const UPDATED_AT_COLUMN: &str = "updatedAt";

/// One row of a legacy table.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub id: i64,
    pub created_at: Option<DateTime<Utc>>,
    /// Last change of the row; `None` means unknown and is treated as changed.
    pub updated_at: Option<DateTime<Utc>>,
    pub columns: BTreeMap<String, SqlValue>,
}

impl SourceRow {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            created_at: None,
            updated_at: None,
            columns: BTreeMap::new(),
        }
    }

    /// Build a row from raw columns, lifting out the id and timestamps.
    ///
    /// Returns `None` when the id column is missing or not an integer.
    pub fn from_columns(mut columns: BTreeMap<String, SqlValue>) -> Option<Self> {
        let id = columns.remove(ID_COLUMN)?.as_i64()?;
        let created_at = columns
            .remove(CREATED_AT_COLUMN)
            .and_then(|v| v.as_datetime());
        let updated_at = columns
            .remove(UPDATED_AT_COLUMN)
            .and_then(|v| v.as_datetime());
        Some(Self {
            id,
            created_at,
            updated_at,
            columns,
        })
    }

    pub fn with_timestamps(
        mut self,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        self.created_at = Some(created_at);
        self.updated_at = Some(updated_at);
        self
    }

    pub fn with(mut self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.columns.insert(column.to_string(), value.into());
        self
    }

    /// Value of any column, including the lifted ones.
    pub fn value(&self, column: &str) -> SqlValue {
        match column {
            ID_COLUMN => SqlValue::I64(self.id),
            CREATED_AT_COLUMN => self.created_at.into(),
            UPDATED_AT_COLUMN => self.updated_at.into(),
            _ => self.columns.get(column).cloned().unwrap_or(SqlValue::Null),
        }
    }

    /// Text column; missing and NULL read as an empty string.
    pub fn text(&self, column: &str) -> String {
        self.opt_text(column).unwrap_or_default()
    }

    pub fn opt_text(&self, column: &str) -> Option<String> {
        self.columns.get(column).and_then(SqlValue::to_text)
    }

    pub fn int(&self, column: &str) -> Option<i64> {
        self.columns.get(column).and_then(SqlValue::as_i64)
    }

    /// Float column; missing and NULL read as zero.
    pub fn float(&self, column: &str) -> f64 {
        self.columns
            .get(column)
            .and_then(SqlValue::as_f64)
            .unwrap_or_default()
    }

    /// Flag column; missing and NULL read as false.
    pub fn flag(&self, column: &str) -> bool {
        self.columns
            .get(column)
            .and_then(SqlValue::as_bool)
            .unwrap_or(false)
    }
}

/// One record of a target collection.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetRecord {
    pub id: String,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub fields: FieldSet,
}

impl TargetRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created: None,
            updated: None,
            fields: FieldSet::new(),
        }
    }

    /// Field value, including `id`, `created` and `updated`.
    pub fn get(&self, field: &str) -> Option<SqlValue> {
        match field {
            "id" => Some(SqlValue::Text(self.id.clone())),
            "created" => Some(self.created.into()),
            "updated" => Some(self.updated.into()),
            _ => self.fields.get(field).cloned(),
        }
    }

    pub fn set(&mut self, field: &str, value: impl Into<SqlValue>) {
        self.fields.insert(field.to_string(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_from_columns_lifts_id_and_timestamps() {
        let mut columns = BTreeMap::new();
        columns.insert("id".to_string(), SqlValue::I64(42));
        columns.insert(
            "updatedAt".to_string(),
            SqlValue::Text("2020-01-02 03:04:05".into()),
        );
        columns.insert("title".to_string(), SqlValue::Text("Landing".into()));

        let row = SourceRow::from_columns(columns).unwrap();
        assert_eq!(row.id, 42);
        assert_eq!(row.created_at, None);
        assert_eq!(
            row.updated_at,
            Some(Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap())
        );
        assert_eq!(row.text("title"), "Landing");
        assert!(!row.columns.contains_key("updatedAt"));
    }

    #[test]
    fn test_from_columns_requires_id() {
        let mut columns = BTreeMap::new();
        columns.insert("title".to_string(), SqlValue::Text("x".into()));
        assert!(SourceRow::from_columns(columns).is_none());
    }

    #[test]
    fn test_lenient_accessors() {
        let row = SourceRow::new(1)
            .with("pinned", 1)
            .with("left", SqlValue::Null)
            .with("firstName", None::<String>);
        assert!(row.flag("pinned"));
        assert!(!row.flag("missing"));
        assert_eq!(row.float("left"), 0.0);
        assert_eq!(row.text("firstName"), "");
        assert_eq!(row.value("id"), SqlValue::I64(1));
    }

    #[test]
    fn test_target_record_get() {
        let mut record = TargetRecord::new("pr2_1");
        record.set("title", "Checkout");
        assert_eq!(record.get("id"), Some(SqlValue::Text("pr2_1".into())));
        assert_eq!(record.get("updated"), Some(SqlValue::Null));
        assert_eq!(record.get("title"), Some(SqlValue::Text("Checkout".into())));
        assert_eq!(record.get("missing"), None);
    }
}
