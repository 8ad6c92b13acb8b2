//! Incremental sync engine: pagination, reconciliation, pruning and file copies.

pub mod blobs;
pub mod manifest;
pub mod paginator;
pub mod pruner;
pub mod reconcile;
pub mod unique;

pub use blobs::{BlobMigrator, BlobStats};
pub use manifest::RunManifest;
pub use paginator::Paginator;
pub use pruner::{OrphanPruner, PruneStats};
pub use reconcile::{decide, FileTransfer, Reconciled, Reconciler, UpsertDecision};
pub use unique::{unique_scoped_title, unique_username, ScopedTitle};
