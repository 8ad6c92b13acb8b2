//! # presentator-migrate
//!
//! Incremental migration of a Presentator v2 installation into v3.
//!
//! Every run walks the legacy tables in dependency order and converges the
//! new record store on them:
//!
//! - **Deterministic ids** so re-runs update instead of duplicating
//! - **Timestamp based upserts** that skip unchanged rows
//! - **Orphan pruning** of records whose legacy row is gone
//! - **File copies** from local or S3 storage into the new storage dir
//!
//! ## Example
//!
//! ```rust,no_run
//! use presentator_migrate::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> presentator_migrate::Result<()> {
//!     let config = Config::load("config.json")?;
//!     let orchestrator = Orchestrator::new(&config).await?;
//!     let result = orchestrator.run().await?;
//!     println!("Inserted {} records", result.records_inserted);
//!     orchestrator.close().await;
//!     Ok(())
//! }
//! ```

pub mod blob;
pub mod config;
pub mod core;
pub mod error;
pub mod mapping;
pub mod orchestrator;
pub mod source;
pub mod sync;
pub mod target;

// Re-exports for convenient access
pub use blob::{BlobStore, LocalBlobStore, MemoryBlobStore, S3BlobStore};
pub use config::{Config, MigrationConfig, SourceConfig, StorageConfig, TargetConfig};
pub use crate::core::{EntityKind, SourceRow, SqlValue, TargetRecord};
pub use error::{MigrateError, Result};
pub use orchestrator::{EntityReport, MigrationResult, Orchestrator};
pub use source::{MemorySource, SourcePoolImpl};
pub use target::{MemoryTarget, SqliteTarget};
