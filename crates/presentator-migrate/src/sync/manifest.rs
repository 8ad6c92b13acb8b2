use std::collections::HashSet;

/// Ids produced during one pass.
#[derive(Debug, Default, Clone)]
pub struct RunManifest {
    seen: HashSet<String>,
}

impl RunManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an id. Duplicates are ignored.
    pub fn push(&mut self, id: impl Into<String>) {
        self.seen.insert(id.into());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Stored ids that were not produced by this pass, in input order.
    pub fn orphans<I>(&self, stored: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        stored.into_iter().filter(|id| !self.contains(id)).collect()
    }
}
