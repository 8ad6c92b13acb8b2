//! Bounded probes that keep titles and usernames unique in the target.
//!
//! Each probe excludes the record being written, so re-running a pass over
//! an already migrated record keeps its current value.

use rand::Rng;
use tracing::warn;

use crate::core::traits::{Collection, RecordFilter, TargetStore};
use crate::error::Result;

/// Counters tried after the plain title collides.
pub const TITLE_COUNTERS: std::ops::RangeInclusive<u32> = 2..=10;

/// Maximum username probes.
pub const USERNAME_ATTEMPTS: usize = 100;

/// Alphabet of random username suffixes.
pub const USERNAME_SUFFIX_ALPHABET: &str = "123456789";

/// Length of the first random username suffix; grows by one per attempt.
pub const USERNAME_SUFFIX_MIN_LENGTH: usize = 3;

/// A title that must be unique within a scope (e.g. prototypes of a project).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedTitle {
    pub field: &'static str,
    pub scope_field: &'static str,
    pub scope_value: String,
    pub base: String,
}

/// Find a title no other record of the scope uses.
///
/// Tries the plain title and then `"{title} 2"` through `"{title} 9"`. When
/// every probe collides, `"{title} 10"` is returned without a further probe.
pub async fn unique_scoped_title(
    target: &dyn TargetStore,
    collection: &Collection,
    record_id: &str,
    title: &ScopedTitle,
) -> Result<String> {
    let mut candidate = title.base.clone();

    for counter in TITLE_COUNTERS {
        let filter = RecordFilter::new()
            .eq(title.field, candidate.clone())
            .eq(title.scope_field, title.scope_value.clone())
            .not_id(record_id);
        if target.find_first(collection, &filter).await?.is_none() {
            return Ok(candidate);
        }
        candidate = format!("{} {}", title.base, counter);
    }

    warn!(
        "{}: no free {} found for {:?} in {} {}, using {:?}",
        collection.name, title.field, title.base, title.scope_field, title.scope_value, candidate
    );
    Ok(candidate)
}

/// Find a username no other record uses, ignoring case.
///
/// Starts from `base` and then appends random digit suffixes of growing length.
pub async fn unique_username(
    target: &dyn TargetStore,
    collection: &Collection,
    record_id: &str,
    base: &str,
) -> Result<String> {
    let mut candidate = base.to_string();

    for attempt in 0..USERNAME_ATTEMPTS {
        let filter = RecordFilter::new()
            .eq_ignore_case("username", candidate.clone())
            .not_id(record_id);
        if target.count(collection, &filter).await? == 0 {
            return Ok(candidate);
        }
        candidate = format!(
            "{}{}",
            base,
            random_string(USERNAME_SUFFIX_MIN_LENGTH + attempt, USERNAME_SUFFIX_ALPHABET)
        );
    }

    warn!(
        "{}: no free username found for {:?} after {} attempts, using {:?}",
        collection.name, base, USERNAME_ATTEMPTS, candidate
    );
    Ok(candidate)
}

/// Random string of `length` characters drawn from `alphabet`.
pub fn random_string(length: usize, alphabet: &str) -> String {
    let chars: Vec<char> = alphabet.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| chars[rng.gen_range(0..chars.len())])
        .collect()
}
