//! Prototypes, screens and hotspots.

use serde_json::{Map, Value};

use super::{optional_ref, related_ids, required_ref, MappedRecord, MappingContext};
use crate::core::kind::EntityKind;
use crate::core::record::SourceRow;
use crate::core::record_id::ID_PREFIX;
use crate::core::traits::ColumnQuery;
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};
use crate::sync::unique::ScopedTitle;

pub(super) async fn map_prototype(row: &SourceRow, ctx: &MappingContext<'_>) -> Result<MappedRecord> {
    let kind = EntityKind::Prototypes;
    let project = required_ref(kind, row, "projectId", EntityKind::Projects)?;
    let screens = related_ids(
        ctx,
        EntityKind::Screens,
        ColumnQuery::new("Screen", "id")
            .filter("prototypeId", row.id)
            .order_by("order"),
    )
    .await?;

    let mut mapped = MappedRecord::default();
    mapped.set("project", project.clone());
    mapped.set("scale", row.float("scaleFactor"));
    mapped.set("size", prototype_size(row));
    mapped.set("screensOrder", screens);
    mapped.scoped_title = Some(ScopedTitle {
        field: "title",
        scope_field: "project",
        scope_value: project,
        base: row.text("title"),
    });
    Ok(mapped)
}

/// `"{width}x{height}"` of fixed size prototypes; desktop ones have none.
fn prototype_size(row: &SourceRow) -> String {
    if row.text("type") == "desktop" {
        return String::new();
    }
    format!(
        "{}x{}",
        row.float("width").trunc() as i64,
        row.float("height").trunc() as i64
    )
}

pub(super) fn map_screen(row: &SourceRow) -> Result<MappedRecord> {
    let mut mapped = MappedRecord::default();
    mapped.set(
        "prototype",
        required_ref(EntityKind::Screens, row, "prototypeId", EntityKind::Prototypes)?,
    );
    mapped.set("title", row.text("title"));
    mapped.set("alignment", row.text("alignment"));
    mapped.set("background", row.text("background"));
    mapped.set("fixedHeader", row.float("fixedHeader"));
    mapped.set("fixedFooter", row.float("fixedFooter"));
    mapped.set_file("file", row.opt_text("filePath"));
    Ok(mapped)
}

pub(super) async fn map_hotspot_template(
    row: &SourceRow,
    ctx: &MappingContext<'_>,
) -> Result<MappedRecord> {
    let kind = EntityKind::HotspotTemplates;
    let prototype = required_ref(kind, row, "prototypeId", EntityKind::Prototypes)?;
    let screens = related_ids(
        ctx,
        EntityKind::Screens,
        ColumnQuery::new("HotspotTemplateScreenRel", "screenId")
            .filter("hotspotTemplateId", row.id)
            .order_by("id"),
    )
    .await?;

    let mut mapped = MappedRecord::default();
    mapped.set("prototype", prototype.clone());
    mapped.set("screens", screens);
    mapped.scoped_title = Some(ScopedTitle {
        field: "title",
        scope_field: "prototype",
        scope_value: prototype,
        base: row.text("title"),
    });
    Ok(mapped)
}

pub(super) fn map_hotspot(row: &SourceRow) -> Result<MappedRecord> {
    let mut mapped = MappedRecord::default();
    mapped.set("type", row.text("type"));
    mapped.set("left", row.float("left"));
    mapped.set("top", row.float("top"));
    mapped.set("width", row.float("width"));
    mapped.set("height", row.float("height"));
    mapped.set("screen", optional_ref(row, "screenId", EntityKind::Screens));
    mapped.set(
        "hotspotTemplate",
        optional_ref(row, "hotspotTemplateId", EntityKind::HotspotTemplates),
    );

    let settings = match row.opt_text("settings").filter(|raw| !raw.trim().is_empty()) {
        Some(raw) => SqlValue::Json(
            convert_hotspot_settings(&raw)
                .map_err(|message| MigrateError::mapping(EntityKind::Hotspots.label(), row.id, message))?,
        ),
        None => SqlValue::Null,
    };
    mapped.set("settings", settings);
    Ok(mapped)
}

/// Rewrite legacy hotspot settings for the new schema.
///
/// A `"none"` transition becomes empty and a legacy `screenId` becomes a
/// translated `screen` reference. The settings must be a JSON object.
pub fn convert_hotspot_settings(raw: &str) -> std::result::Result<Value, String> {
    let mut settings: Map<String, Value> =
        serde_json::from_str(raw).map_err(|e| format!("invalid settings: {}", e))?;

    if settings.get("transition").and_then(Value::as_str) == Some("none") {
        settings.insert("transition".to_string(), Value::String(String::new()));
    }

    let screen_id = match settings.get("screenId") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => String::new(),
    };
    if !screen_id.is_empty() {
        settings.remove("screenId");
        settings.insert(
            "screen".to_string(),
            Value::String(format!("{}{}", ID_PREFIX, screen_id)),
        );
    }

    Ok(Value::Object(settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::TargetStore;
    use crate::source::MemorySource;
    use crate::target::MemoryTarget;
    use serde_json::json;

    #[test]
    fn test_convert_hotspot_settings() {
        let converted =
            convert_hotspot_settings(r#"{"transition":"none","screenId":"42","url":""}"#).unwrap();
        assert_eq!(converted, json!({"transition": "", "screen": "pr2_42", "url": ""}));

        let numeric = convert_hotspot_settings(r#"{"transition":"fade","screenId":7}"#).unwrap();
        assert_eq!(numeric, json!({"transition": "fade", "screen": "pr2_7"}));

        let untouched = convert_hotspot_settings(r#"{"screenId":""}"#).unwrap();
        assert_eq!(untouched, json!({"screenId": ""}));
    }

    #[test]
    fn test_invalid_settings_fail_the_hotspot() {
        assert!(convert_hotspot_settings("{not json").is_err());
        assert!(convert_hotspot_settings("[1, 2]").is_err());

        let row = SourceRow::new(5).with("type", "screen").with("settings", "{oops");
        let err = map_hotspot(&row).unwrap_err();
        assert!(matches!(err, MigrateError::Mapping { source_id: 5, .. }));
    }

    #[test]
    fn test_map_hotspot() {
        let row = SourceRow::new(5)
            .with("screenId", 9)
            .with("hotspotTemplateId", None::<i64>)
            .with("type", "screen")
            .with("left", 10.5)
            .with("top", 20)
            .with("width", 100)
            .with("height", 50)
            .with("settings", r#"{"screenId":"11","transition":"none"}"#);
        let mapped = map_hotspot(&row).unwrap();

        assert_eq!(mapped.fields["screen"], SqlValue::Text("pr2_9".into()));
        assert_eq!(mapped.fields["hotspotTemplate"], SqlValue::Text(String::new()));
        assert_eq!(mapped.fields["left"], SqlValue::F64(10.5));
        assert_eq!(mapped.fields["top"], SqlValue::F64(20.0));
        assert_eq!(
            mapped.fields["settings"],
            SqlValue::Json(json!({"screen": "pr2_11", "transition": ""}))
        );
    }

    #[test]
    fn test_prototype_size() {
        let tablet = SourceRow::new(1).with("type", "tablet").with("width", 768.9).with("height", 1024);
        assert_eq!(prototype_size(&tablet), "768x1024");
        let desktop = SourceRow::new(2).with("type", "desktop").with("width", 1440);
        assert_eq!(prototype_size(&desktop), "");
    }

    #[tokio::test]
    async fn test_map_prototype_orders_screens() {
        let source = MemorySource::new();
        for (id, order) in [(1, 3), (2, 1), (3, 2)] {
            source.upsert("Screen", SourceRow::new(id).with("prototypeId", 4).with("order", order));
        }
        source.upsert("Screen", SourceRow::new(9).with("prototypeId", 5).with("order", 0));
        let target = MemoryTarget::with_collections(&["prototypes"]);
        let prototypes = target.find_collection("prototypes").await.unwrap();
        let ctx = MappingContext {
            source: &source,
            target: &target,
            collection: &prototypes,
            record_id: "pr2_4",
        };

        let row = SourceRow::new(4)
            .with("projectId", 2)
            .with("title", "Mobile")
            .with("type", "mobile")
            .with("width", 375)
            .with("height", 812)
            .with("scaleFactor", 2);
        let mapped = map_prototype(&row, &ctx).await.unwrap();

        assert_eq!(
            mapped.fields["screensOrder"],
            SqlValue::from(vec!["pr2_2".to_string(), "pr2_3".to_string(), "pr2_1".to_string()])
        );
        assert_eq!(mapped.fields["size"], SqlValue::Text("375x812".into()));
        assert_eq!(mapped.fields["scale"], SqlValue::F64(2.0));
        let title = mapped.scoped_title.unwrap();
        assert_eq!(title.scope_field, "project");
        assert_eq!(title.scope_value, "pr2_2");
        assert_eq!(title.base, "Mobile");
    }

    #[test]
    fn test_map_screen() {
        let row = SourceRow::new(3)
            .with("prototypeId", 4)
            .with("title", "Home")
            .with("alignment", "center")
            .with("background", "#ffffff")
            .with("fixedHeader", 0)
            .with("fixedFooter", 40)
            .with("filePath", "uploads/screens/3/home.png");
        let mapped = map_screen(&row).unwrap();

        assert_eq!(mapped.fields["prototype"], SqlValue::Text("pr2_4".into()));
        assert_eq!(mapped.fields["fixedFooter"], SqlValue::F64(40.0));
        assert_eq!(mapped.fields["file"], SqlValue::Text("home.png".into()));
        assert_eq!(mapped.files.len(), 1);
    }
}
