//! New (v3) record store access.

mod memory;
mod sqlite;

pub use memory::{MemoryTarget, WriteCounters};
pub use sqlite::SqliteTarget;
