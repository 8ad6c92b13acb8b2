//! Deterministic translation of legacy numeric ids into target record ids.
//!
//! The same source row always lands on the same target id, which is what
//! makes repeated runs converge instead of duplicating records.

use super::kind::EntityKind;

/// Prefix shared by every migrated record id.
pub const ID_PREFIX: &str = "pr2_";

/// Translate a legacy id: `pr2_` + kind sub-prefix + extra sub-prefixes + id.
///
/// Injective for a fixed kind and sub-prefix list.
pub fn translate(kind: EntityKind, source_id: i64, sub_prefixes: &[&str]) -> String {
    let mut id = String::from(ID_PREFIX);
    id.push_str(kind.id_sub_prefix());
    for prefix in sub_prefixes {
        id.push_str(prefix);
    }
    id.push_str(&source_id.to_string());
    id
}
