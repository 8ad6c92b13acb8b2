//! Entity kinds and their migration order.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::traits::GroupQuery;

/// A category of data migrated as one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Users,
    ExternalAuths,
    Projects,
    ProjectUserPreferences,
    Prototypes,
    Screens,
    Comments,
    HotspotTemplates,
    Hotspots,
    Links,
    Notifications,
}

/// Every kind, parents before the kinds that reference them.
const MIGRATION_ORDER: [EntityKind; 11] = [
    EntityKind::Users,
    EntityKind::ExternalAuths,
    EntityKind::Projects,
    EntityKind::ProjectUserPreferences,
    EntityKind::Prototypes,
    EntityKind::Screens,
    EntityKind::Comments,
    EntityKind::HotspotTemplates,
    EntityKind::Hotspots,
    EntityKind::Links,
    EntityKind::Notifications,
];

impl EntityKind {
    /// All kinds in migration order.
    pub fn all() -> &'static [EntityKind] {
        &MIGRATION_ORDER
    }

    /// Human readable label used in logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Users => "users",
            EntityKind::ExternalAuths => "external auths",
            EntityKind::Projects => "projects",
            EntityKind::ProjectUserPreferences => "project user preferences",
            EntityKind::Prototypes => "prototypes",
            EntityKind::Screens => "screens",
            EntityKind::Comments => "screen comments",
            EntityKind::HotspotTemplates => "hotspot templates",
            EntityKind::Hotspots => "hotspots",
            EntityKind::Links => "project links",
            EntityKind::Notifications => "notifications",
        }
    }

    /// Legacy table the kind is read from.
    pub fn source_table(&self) -> &'static str {
        match self {
            EntityKind::Users => "User",
            EntityKind::ExternalAuths => "UserAuth",
            EntityKind::Projects => "Project",
            EntityKind::ProjectUserPreferences => "UserProjectRel",
            EntityKind::Prototypes => "Prototype",
            EntityKind::Screens => "Screen",
            EntityKind::Comments => "ScreenComment",
            EntityKind::HotspotTemplates => "HotspotTemplate",
            EntityKind::Hotspots => "Hotspot",
            EntityKind::Links => "ProjectLink",
            EntityKind::Notifications => "UserScreenCommentRel",
        }
    }

    /// Target collection the kind is written to.
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Users => "users",
            EntityKind::ExternalAuths => "_externalAuths",
            EntityKind::Projects => "projects",
            EntityKind::ProjectUserPreferences => "projectUserPreferences",
            EntityKind::Prototypes => "prototypes",
            EntityKind::Screens => "screens",
            EntityKind::Comments => "comments",
            EntityKind::HotspotTemplates => "hotspotTemplates",
            EntityKind::Hotspots => "hotspots",
            EntityKind::Links => "links",
            EntityKind::Notifications => "notifications",
        }
    }

    /// Extra prefix placed in front of the numeric id of translated ids.
    pub fn id_sub_prefix(&self) -> &'static str {
        match self {
            EntityKind::Links => "link",
            _ => "",
        }
    }

    /// Whether records missing from the source are deleted after a pass.
    ///
    /// External auths are left alone: v3 creates its own entries on login.
    pub fn prunes(&self) -> bool {
        !matches!(self, EntityKind::ExternalAuths)
    }

    /// Rows skipped by the pass: the oldest row of every duplicated group.
    pub fn excluded_duplicates(&self) -> Option<GroupQuery> {
        match self {
            EntityKind::ExternalAuths => Some(GroupQuery {
                table: self.source_table().to_string(),
                group_by: vec!["userId".to_string(), "source".to_string()],
                min_count: 2,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
