//! Core abstractions shared by the stores and the sync engine.
//!
//! - [`value`]: dynamically typed column values
//! - [`record`]: legacy rows and target records
//! - [`kind`]: entity kinds in migration order
//! - [`record_id`]: deterministic id translation
//! - [`traits`]: source and target store traits with their query types
//! - [`identifier`]: SQL identifier quoting

pub mod identifier;
pub mod kind;
pub mod record;
pub mod record_id;
pub mod traits;
pub mod value;

pub use kind::EntityKind;
pub use record::{FieldSet, SourceRow, TargetRecord};
pub use record_id::{translate, ID_PREFIX};
pub use traits::{
    Collection, ColumnQuery, Condition, GroupQuery, PageQuery, RecordFilter, SourceStore,
    TargetStore,
};
pub use value::SqlValue;
