//! Users and their external auth links.

use super::{required_ref, MappedRecord, MappingContext, ALPHANUMERIC, TOKEN_KEY_LENGTH};
use crate::core::kind::EntityKind;
use crate::core::record::SourceRow;
use crate::error::Result;
use crate::sync::unique::random_string;

pub(super) fn map_user(row: &SourceRow) -> MappedRecord {
    let mut mapped = MappedRecord::default();
    let email = row.text("email");

    mapped.set("email", email.clone());
    mapped.set("emailVisibility", false);
    mapped.set("verified", row.text("status") == "active");
    mapped.set("password", row.text("passwordHash"));
    mapped.set("tokenKey", random_string(TOKEN_KEY_LENGTH, ALPHANUMERIC));
    mapped.set(
        "name",
        format!("{} {}", row.text("firstName"), row.text("lastName"))
            .trim()
            .to_string(),
    );
    mapped.set("allowEmailNotifications", true);
    mapped.set_file("avatar", row.opt_text("avatarFilePath"));

    let local_part = email.split('@').next().unwrap_or_default();
    mapped.username = Some(local_part.to_string());
    mapped
}

pub(super) async fn map_external_auth(row: &SourceRow, ctx: &MappingContext<'_>) -> Result<MappedRecord> {
    let users = ctx
        .target
        .find_collection(EntityKind::Users.collection())
        .await?;

    let mut mapped = MappedRecord::default();
    mapped.set("collectionRef", users.id);
    mapped.set(
        "recordRef",
        required_ref(EntityKind::ExternalAuths, row, "userId", EntityKind::Users)?,
    );
    mapped.set("provider", row.text("source"));
    mapped.set("providerId", row.text("sourceId"));
    Ok(mapped)
}
