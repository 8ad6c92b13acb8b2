//! Projects and the records hanging off a project or user.

use super::{related_ids, required_ref, MappedRecord, MappingContext, ALPHANUMERIC, TOKEN_KEY_LENGTH};
use crate::core::kind::EntityKind;
use crate::core::record::SourceRow;
use crate::core::traits::ColumnQuery;
use crate::error::Result;
use crate::sync::unique::random_string;

/// Length of the placeholder password of links without protection.
const UNUSABLE_PASSWORD_LENGTH: usize = 30;

pub(super) async fn map_project(row: &SourceRow, ctx: &MappingContext<'_>) -> Result<MappedRecord> {
    let members = related_ids(
        ctx,
        EntityKind::Users,
        ColumnQuery::new("UserProjectRel", "userId")
            .filter("projectId", row.id)
            .order_by("id"),
    )
    .await?;

    let mut mapped = MappedRecord::default();
    mapped.set("title", row.text("title"));
    mapped.set("archived", row.flag("archived"));
    mapped.set("users", members);
    Ok(mapped)
}

pub(super) fn map_preference(row: &SourceRow) -> Result<MappedRecord> {
    let kind = EntityKind::ProjectUserPreferences;
    let mut mapped = MappedRecord::default();
    mapped.set("user", required_ref(kind, row, "userId", EntityKind::Users)?);
    mapped.set("project", required_ref(kind, row, "projectId", EntityKind::Projects)?);
    mapped.set("watch", true);
    mapped.set("favorite", row.flag("pinned"));
    Ok(mapped)
}

pub(super) async fn map_link(row: &SourceRow, ctx: &MappingContext<'_>) -> Result<MappedRecord> {
    let prototypes = related_ids(
        ctx,
        EntityKind::Prototypes,
        ColumnQuery::new("ProjectLinkPrototypeRel", "prototypeId")
            .filter("projectLinkId", row.id)
            .order_by("id"),
    )
    .await?;

    let mut mapped = MappedRecord::default();
    mapped.set(
        "project",
        required_ref(EntityKind::Links, row, "projectId", EntityKind::Projects)?,
    );
    mapped.set("username", row.text("slug"));
    mapped.set("allowComments", row.flag("allowComments"));
    mapped.set("tokenKey", random_string(TOKEN_KEY_LENGTH, ALPHANUMERIC));
    mapped.set("onlyPrototypes", prototypes);

    match row.opt_text("passwordHash").filter(|hash| !hash.is_empty()) {
        Some(hash) => {
            mapped.set("password", hash);
            mapped.set("passwordProtect", true);
        }
        None => {
            // never a valid hash, so nobody can log in with it
            mapped.set("password", random_string(UNUSABLE_PASSWORD_LENGTH, ALPHANUMERIC));
            mapped.set("passwordProtect", false);
        }
    }
    Ok(mapped)
}

pub(super) fn map_notification(row: &SourceRow) -> Result<MappedRecord> {
    let kind = EntityKind::Notifications;
    let mut mapped = MappedRecord::default();
    mapped.set("user", required_ref(kind, row, "userId", EntityKind::Users)?);
    mapped.set(
        "comment",
        required_ref(kind, row, "screenCommentId", EntityKind::Comments)?,
    );
    mapped.set("read", row.flag("isRead"));
    mapped.set("processed", row.flag("isProcessed"));
    Ok(mapped)
}
