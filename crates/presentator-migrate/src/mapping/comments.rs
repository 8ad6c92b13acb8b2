//! Screen comments.

use super::{optional_ref, required_ref, MappedRecord, MappingContext};
use crate::core::kind::EntityKind;
use crate::core::record::SourceRow;
use crate::core::record_id::translate;
use crate::core::traits::ColumnQuery;
use crate::core::value::SqlValue;
use crate::error::Result;

pub(super) async fn map_comment(row: &SourceRow, ctx: &MappingContext<'_>) -> Result<MappedRecord> {
    let kind = EntityKind::Comments;
    let mut mapped = MappedRecord::default();
    mapped.set("screen", required_ref(kind, row, "screenId", EntityKind::Screens)?);
    mapped.set("replyTo", optional_ref(row, "replyTo", EntityKind::Comments));
    mapped.set("message", row.text("message"));
    mapped.set("left", row.float("left"));
    mapped.set("top", row.float("top"));
    mapped.set("resolved", row.text("status") == "resolved");

    let from = row.text("from");
    let author = match row.int("screenId") {
        Some(screen_id) => project_member_by_email(ctx, screen_id, &from).await?,
        None => None,
    };
    match author {
        Some(user_id) => {
            mapped.set("user", translate(EntityKind::Users, user_id, &[]));
            mapped.set("guestEmail", "");
        }
        None => {
            mapped.set("user", "");
            mapped.set("guestEmail", from);
        }
    }
    Ok(mapped)
}

/// Id of the member of the screen's project whose email is `email`.
///
/// Walks screen to prototype to project to members.
async fn project_member_by_email(
    ctx: &MappingContext<'_>,
    screen_id: i64,
    email: &str,
) -> Result<Option<i64>> {
    if email.trim().is_empty() {
        return Ok(None);
    }

    let Some(prototype_id) =
        first_int(ctx, ColumnQuery::new("Screen", "prototypeId").filter("id", screen_id)).await?
    else {
        return Ok(None);
    };
    let Some(project_id) =
        first_int(ctx, ColumnQuery::new("Prototype", "projectId").filter("id", prototype_id)).await?
    else {
        return Ok(None);
    };

    let members = ctx
        .source
        .select_column(
            &ColumnQuery::new("UserProjectRel", "userId")
                .filter("projectId", project_id)
                .order_by("id"),
        )
        .await?;

    for user_id in members.iter().filter_map(SqlValue::as_i64) {
        let emails = ctx
            .source
            .select_column(&ColumnQuery::new("User", "email").filter("id", user_id))
            .await?;
        let matches = emails
            .iter()
            .filter_map(SqlValue::to_text)
            .any(|stored| stored.eq_ignore_ascii_case(email));
        if matches {
            return Ok(Some(user_id));
        }
    }
    Ok(None)
}

async fn first_int(ctx: &MappingContext<'_>, query: ColumnQuery) -> Result<Option<i64>> {
    let values = ctx.source.select_column(&query).await?;
    Ok(values.first().and_then(SqlValue::as_i64))
}
