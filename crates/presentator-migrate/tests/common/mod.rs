//! Shared fixture: a small legacy installation held in memory.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use presentator_migrate::core::SourceRow;
use presentator_migrate::{EntityKind, MemoryBlobStore, MemorySource, MemoryTarget, Orchestrator};

/// Relationship tables read by the mapping rules.
pub const RELATION_TABLES: [&str; 3] = [
    "UserProjectRel",
    "HotspotTemplateScreenRel",
    "ProjectLinkPrototypeRel",
];

pub fn created() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap()
}

pub fn later() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap()
}

pub fn row(id: i64) -> SourceRow {
    SourceRow::new(id).with_timestamps(created(), created())
}

/// Source with every legacy table, all empty.
pub fn empty_source() -> MemorySource {
    let mut tables: Vec<&str> = EntityKind::all().iter().map(|k| k.source_table()).collect();
    tables.extend(RELATION_TABLES);
    MemorySource::with_tables(&tables)
}

/// Target with every collection, all empty.
pub fn empty_target() -> MemoryTarget {
    let names: Vec<&str> = EntityKind::all().iter().map(|k| k.collection()).collect();
    MemoryTarget::with_collections(&names)
}

/// Two users sharing one project with two prototypes, screens, comments,
/// hotspots and a share link.
pub fn populated_source() -> MemorySource {
    let source = empty_source();

    source.upsert(
        "User",
        row(1)
            .with("email", "alice@example.com")
            .with("passwordHash", "$2a$10$alice")
            .with("firstName", "Alice")
            .with("lastName", "Smith")
            .with("avatarFilePath", "uploads/users/1/a.png")
            .with("status", "active"),
    );
    source.upsert(
        "User",
        row(2)
            .with("email", "bob@example.com")
            .with("passwordHash", "$2a$10$bob")
            .with("firstName", "Bob")
            .with("lastName", "")
            .with("avatarFilePath", None::<String>)
            .with("status", "inactive"),
    );

    for (id, user, provider, provider_id) in [
        (1, 1, "google", "g-old"),
        (2, 1, "google", "g-new"),
        (3, 2, "github", "gh-1"),
    ] {
        source.upsert(
            "UserAuth",
            row(id)
                .with("userId", user)
                .with("source", provider)
                .with("sourceId", provider_id),
        );
    }

    for id in 1..=3 {
        source.upsert(
            "Project",
            row(id).with("title", format!("Project {}", id)).with("archived", 0),
        );
    }
    source.upsert(
        "UserProjectRel",
        row(1).with("userId", 1).with("projectId", 1).with("pinned", 1),
    );
    source.upsert(
        "UserProjectRel",
        row(2).with("userId", 2).with("projectId", 1).with("pinned", 0),
    );

    source.upsert(
        "Prototype",
        row(1)
            .with("projectId", 1)
            .with("title", "Web")
            .with("type", "desktop")
            .with("width", 0)
            .with("height", 0)
            .with("scaleFactor", 1),
    );
    source.upsert(
        "Prototype",
        row(2)
            .with("projectId", 1)
            .with("title", "Web")
            .with("type", "mobile")
            .with("width", 375)
            .with("height", 812)
            .with("scaleFactor", 2),
    );

    for (id, prototype, order, file) in [
        (1, 1, 2, Some("uploads/screens/1/home.png")),
        (2, 1, 1, Some("uploads/screens/2/missing.png")),
        (3, 2, 1, None),
    ] {
        source.upsert(
            "Screen",
            row(id)
                .with("prototypeId", prototype)
                .with("order", order)
                .with("title", format!("Screen {}", id))
                .with("alignment", "center")
                .with("background", "#ffffff")
                .with("fixedHeader", 0)
                .with("fixedFooter", 0)
                .with("filePath", file.map(str::to_string)),
        );
    }

    source.upsert(
        "ScreenComment",
        row(1)
            .with("screenId", 1)
            .with("replyTo", None::<i64>)
            .with("from", "alice@example.com")
            .with("message", "Nice")
            .with("left", 10)
            .with("top", 20)
            .with("status", "pending"),
    );
    source.upsert(
        "ScreenComment",
        row(2)
            .with("screenId", 1)
            .with("replyTo", 1)
            .with("from", "guest@example.com")
            .with("message", "Agreed")
            .with("left", 10)
            .with("top", 20)
            .with("status", "resolved"),
    );

    source.upsert(
        "HotspotTemplate",
        row(1).with("prototypeId", 1).with("title", "Header"),
    );
    source.upsert(
        "HotspotTemplateScreenRel",
        row(1).with("hotspotTemplateId", 1).with("screenId", 1),
    );

    source.upsert(
        "Hotspot",
        row(1)
            .with("screenId", 1)
            .with("hotspotTemplateId", None::<i64>)
            .with("type", "screen")
            .with("left", 1)
            .with("top", 2)
            .with("width", 30)
            .with("height", 40)
            .with("settings", r#"{"screenId":"2","transition":"none"}"#),
    );
    source.upsert(
        "Hotspot",
        row(2)
            .with("screenId", None::<i64>)
            .with("hotspotTemplateId", 1)
            .with("type", "back")
            .with("left", 0)
            .with("top", 0)
            .with("width", 10)
            .with("height", 10)
            .with("settings", None::<String>),
    );

    source.upsert(
        "ProjectLink",
        row(1)
            .with("projectId", 1)
            .with("slug", "share-me")
            .with("passwordHash", None::<String>)
            .with("allowComments", 1),
    );
    source.upsert(
        "ProjectLinkPrototypeRel",
        row(1).with("projectLinkId", 1).with("prototypeId", 1),
    );

    source.upsert(
        "UserScreenCommentRel",
        row(1)
            .with("userId", 2)
            .with("screenCommentId", 1)
            .with("isRead", 0)
            .with("isProcessed", 1),
    );

    source
}

/// Legacy files of [`populated_source`]; one screen file is missing.
pub fn populated_files() -> MemoryBlobStore {
    let files = MemoryBlobStore::new();
    files.insert("uploads/users/1/a.png", "avatar");
    files.insert("uploads/screens/1/home.png", "screen");
    files
}

pub struct Harness {
    pub source: Arc<MemorySource>,
    pub target: Arc<MemoryTarget>,
    pub source_files: Arc<MemoryBlobStore>,
    pub target_files: Arc<MemoryBlobStore>,
}

impl Harness {
    pub fn new(source: MemorySource, source_files: MemoryBlobStore) -> Self {
        Self {
            source: Arc::new(source),
            target: Arc::new(empty_target()),
            source_files: Arc::new(source_files),
            target_files: Arc::new(MemoryBlobStore::new()),
        }
    }

    pub fn populated() -> Self {
        Self::new(populated_source(), populated_files())
    }

    /// Orchestrator with a small page size so every pass spans several pages.
    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::with_stores(
            self.source.clone(),
            self.target.clone(),
            self.source_files.clone(),
            self.target_files.clone(),
        )
        .with_page_size(2)
        .with_blob_concurrency(4)
    }
}
