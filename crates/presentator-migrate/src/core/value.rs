//! Dynamically typed column values shared by every store.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDateTime, Utc};

/// Storage format of target datetimes (`2024-05-01 09:30:00.000Z`).
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3fZ";

/// A single column value read from or written to a store.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Text(String),
    DateTime(DateTime<Utc>),
    /// JSON document (multi-valued relations, hotspot settings).
    Json(serde_json::Value),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Integer view; booleans map to 0/1 and numeric text is parsed.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::I64(v) => Some(*v),
            SqlValue::Bool(v) => Some(i64::from(*v)),
            SqlValue::F64(v) if v.fract() == 0.0 => Some(*v as i64),
            SqlValue::Text(v) => v.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::F64(v) => Some(*v),
            SqlValue::I64(v) => Some(*v as f64),
            SqlValue::Text(v) => v.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean view; legacy flags are stored as tinyint/smallint.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(v) => Some(*v),
            SqlValue::I64(v) => Some(*v != 0),
            SqlValue::Text(v) => match v.as_str() {
                "1" | "true" => Some(true),
                "0" | "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            SqlValue::DateTime(v) => Some(*v),
            SqlValue::Text(v) => parse_datetime(v),
            _ => None,
        }
    }

    /// Render the value the way it is stored in a text column.
    pub fn to_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Bool(v) => Some(v.to_string()),
            SqlValue::I64(v) => Some(v.to_string()),
            SqlValue::F64(v) => Some(v.to_string()),
            SqlValue::Text(v) => Some(v.clone()),
            SqlValue::DateTime(v) => Some(format_datetime(v)),
            SqlValue::Json(v) => Some(v.to_string()),
        }
    }

    /// Total order used by in-memory stores when sorting rows.
    ///
    /// Nulls sort first; mixed numeric variants compare numerically and
    /// everything else falls back to the text rendering.
    pub fn compare(&self, other: &SqlValue) -> Ordering {
        match (self, other) {
            (SqlValue::Null, SqlValue::Null) => Ordering::Equal,
            (SqlValue::Null, _) => Ordering::Less,
            (_, SqlValue::Null) => Ordering::Greater,
            (SqlValue::I64(a), SqlValue::I64(b)) => a.cmp(b),
            (SqlValue::DateTime(a), SqlValue::DateTime(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => a.to_text().cmp(&b.to_text()),
            },
        }
    }

    /// Loose equality used by filters: numbers compare by value, everything
    /// else by its stored text.
    pub fn loosely_equals(&self, other: &SqlValue) -> bool {
        if self.is_null() || other.is_null() {
            return self.is_null() && other.is_null();
        }
        if let (Some(a), Some(b)) = (self.as_i64(), other.as_i64()) {
            if !matches!(self, SqlValue::Text(_)) || !matches!(other, SqlValue::Text(_)) {
                return a == b;
            }
        }
        self.to_text() == other.to_text()
    }
}

/// Format a timestamp in the target storage format.
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

/// Parse a stored timestamp. Accepts RFC 3339 and `YYYY-MM-DD HH:MM:SS[.fff][Z]`.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    let naive = value.strip_suffix('Z').unwrap_or(value);
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc())
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I64(i64::from(v))
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::DateTime(v)
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(v: serde_json::Value) -> Self {
        SqlValue::Json(v)
    }
}

impl From<Vec<String>> for SqlValue {
    fn from(v: Vec<String>) -> Self {
        SqlValue::Json(serde_json::Value::from(v))
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_datetime_formats() {
        let expected = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(parse_datetime("2021-03-04 05:06:07"), Some(expected));
        assert_eq!(parse_datetime("2021-03-04 05:06:07.000Z"), Some(expected));
        assert_eq!(parse_datetime("2021-03-04T05:06:07Z"), Some(expected));
        assert_eq!(parse_datetime("2021-03-04T07:06:07+02:00"), Some(expected));
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("yesterday"), None);
    }

    #[test]
    fn test_format_datetime() {
        let dt = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(format_datetime(&dt), "2021-03-04 05:06:07.000Z");
        assert_eq!(parse_datetime(&format_datetime(&dt)), Some(dt));
    }

    #[test]
    fn test_flags() {
        assert_eq!(SqlValue::I64(1).as_bool(), Some(true));
        assert_eq!(SqlValue::I64(0).as_bool(), Some(false));
        assert_eq!(SqlValue::Null.as_bool(), None);
        assert_eq!(SqlValue::Bool(true).as_i64(), Some(1));
    }

    #[test]
    fn test_loose_equality() {
        assert!(SqlValue::I64(5).loosely_equals(&SqlValue::Text("5".into())));
        assert!(SqlValue::Text("pr2_1".into()).loosely_equals(&"pr2_1".into()));
        assert!(!SqlValue::Text("05".into()).loosely_equals(&SqlValue::Text("5".into())));
        assert!(!SqlValue::Null.loosely_equals(&SqlValue::Text(String::new())));
    }

    #[test]
    fn test_compare_orders_nulls_first() {
        let mut values = vec![SqlValue::I64(3), SqlValue::Null, SqlValue::F64(1.5)];
        values.sort_by(|a, b| a.compare(b));
        assert_eq!(values, vec![SqlValue::Null, SqlValue::F64(1.5), SqlValue::I64(3)]);
    }

    #[test]
    fn test_relation_list() {
        let value = SqlValue::from(vec!["pr2_1".to_string(), "pr2_2".to_string()]);
        assert_eq!(value.to_text().unwrap(), r#"["pr2_1","pr2_2"]"#);
        assert_eq!(SqlValue::from(None::<String>), SqlValue::Null);
    }
}
