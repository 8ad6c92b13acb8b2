//! Per-kind rules that turn a legacy row into target record fields.
//!
//! Rules only read: they may query the source (relationship rows) and the
//! target (collection ids), but every write goes through the reconciler.

mod accounts;
mod comments;
mod projects;
mod prototypes;

use std::path::Path;

use crate::core::kind::EntityKind;
use crate::core::record::{FieldSet, SourceRow};
use crate::core::record_id::translate;
use crate::core::traits::{Collection, ColumnQuery, SourceStore, TargetStore};
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};
use crate::sync::unique::ScopedTitle;

/// Length of generated auth token keys.
pub const TOKEN_KEY_LENGTH: usize = 50;

/// Alphabet of generated secrets.
pub const ALPHANUMERIC: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Read-only view of the stores handed to a mapping rule.
pub struct MappingContext<'a> {
    pub source: &'a dyn SourceStore,
    pub target: &'a dyn TargetStore,
    /// Collection the record is written to.
    pub collection: &'a Collection,
    /// Translated id of the record being mapped.
    pub record_id: &'a str,
}

/// A legacy file referenced by a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub source_key: String,
    pub file_name: String,
}

/// Output of a mapping rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedRecord {
    pub fields: FieldSet,
    pub files: Vec<PendingFile>,
    /// Title to make unique within its scope before writing.
    pub scoped_title: Option<ScopedTitle>,
    /// Username base to make unique before writing.
    pub username: Option<String>,
}

impl MappedRecord {
    pub fn set(&mut self, field: &str, value: impl Into<SqlValue>) {
        self.fields.insert(field.to_string(), value.into());
    }

    /// Set `field` to the base name of a legacy file and queue its copy.
    ///
    /// An empty path clears the field.
    pub fn set_file(&mut self, field: &str, source_key: Option<String>) {
        match source_key.filter(|key| !key.trim().is_empty()) {
            Some(source_key) => {
                let file_name = base_name(&source_key);
                self.set(field, file_name.clone());
                self.files.push(PendingFile {
                    source_key,
                    file_name,
                });
            }
            None => self.set(field, ""),
        }
    }
}

impl EntityKind {
    /// Map a legacy row of this kind.
    pub async fn map(&self, row: &SourceRow, ctx: &MappingContext<'_>) -> Result<MappedRecord> {
        match self {
            EntityKind::Users => Ok(accounts::map_user(row)),
            EntityKind::ExternalAuths => accounts::map_external_auth(row, ctx).await,
            EntityKind::Projects => projects::map_project(row, ctx).await,
            EntityKind::ProjectUserPreferences => projects::map_preference(row),
            EntityKind::Prototypes => prototypes::map_prototype(row, ctx).await,
            EntityKind::Screens => prototypes::map_screen(row),
            EntityKind::Comments => comments::map_comment(row, ctx).await,
            EntityKind::HotspotTemplates => prototypes::map_hotspot_template(row, ctx).await,
            EntityKind::Hotspots => prototypes::map_hotspot(row),
            EntityKind::Links => projects::map_link(row, ctx).await,
            EntityKind::Notifications => projects::map_notification(row),
        }
    }
}

/// Translated id of a required foreign key column.
fn required_ref(kind: EntityKind, row: &SourceRow, column: &str, target: EntityKind) -> Result<String> {
    row.int(column)
        .map(|id| translate(target, id, &[]))
        .ok_or_else(|| MigrateError::mapping(kind.label(), row.id, format!("{} is missing", column)))
}

/// Translated id of an optional foreign key column, or an empty relation.
fn optional_ref(row: &SourceRow, column: &str, target: EntityKind) -> SqlValue {
    match row.int(column) {
        Some(id) => SqlValue::Text(translate(target, id, &[])),
        None => SqlValue::Text(String::new()),
    }
}

/// Translated ids read from a relationship table.
async fn related_ids(ctx: &MappingContext<'_>, target: EntityKind, query: ColumnQuery) -> Result<Vec<String>> {
    let values = ctx.source.select_column(&query).await?;
    Ok(values
        .iter()
        .filter_map(SqlValue::as_i64)
        .map(|id| translate(target, id, &[]))
        .collect())
}

/// Last path segment of a legacy file key.
fn base_name(key: &str) -> String {
    Path::new(key.trim_end_matches('/'))
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("uploads/users/1/avatar.png"), "avatar.png");
        assert_eq!(base_name("avatar.png"), "avatar.png");
        assert_eq!(base_name("uploads/screens/"), "screens");
    }

    #[test]
    fn test_set_file() {
        let mut mapped = MappedRecord::default();
        mapped.set_file("avatar", Some("uploads/users/3/me.jpg".into()));
        assert_eq!(mapped.fields["avatar"], SqlValue::Text("me.jpg".into()));
        assert_eq!(
            mapped.files,
            vec![PendingFile {
                source_key: "uploads/users/3/me.jpg".into(),
                file_name: "me.jpg".into()
            }]
        );

        let mut empty = MappedRecord::default();
        empty.set_file("avatar", Some("  ".into()));
        empty.set_file("file", None);
        assert!(empty.files.is_empty());
        assert_eq!(empty.fields["avatar"], SqlValue::Text(String::new()));
    }

    #[test]
    fn test_required_ref() {
        let row = SourceRow::new(9).with("projectId", 4);
        assert_eq!(
            required_ref(EntityKind::Prototypes, &row, "projectId", EntityKind::Projects).unwrap(),
            "pr2_4"
        );
        let err = required_ref(EntityKind::Prototypes, &row, "screenId", EntityKind::Screens).unwrap_err();
        assert!(matches!(err, MigrateError::Mapping { source_id: 9, .. }));
    }

    #[test]
    fn test_optional_ref() {
        let row = SourceRow::new(1).with("replyTo", SqlValue::Null);
        assert_eq!(optional_ref(&row, "replyTo", EntityKind::Comments), SqlValue::Text(String::new()));
    }
}
