//! Uniqueness checks for user-assigned IDs.

use std::collections::BTreeMap;

use thiserror::Error;

/// Two or more declarations share an ID.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("found {count} {kind}s with the ID '{id}', please fix your config")]
pub struct DuplicateIdError {
    pub kind: &'static str,
    pub id: String,
    pub count: usize,
}

/// Counts IDs of one kind of declaration (`build`, `archive`, ...).
#[derive(Debug, Clone)]
pub struct Ids {
    kind: &'static str,
    counts: BTreeMap<String, usize>,
}

impl Ids {
    pub fn new(kind: &'static str) -> Self {
        Ids {
            kind,
            counts: BTreeMap::new(),
        }
    }

    /// Record one use of `id`.
    pub fn inc(&mut self, id: &str) {
        *self.counts.entry(id.to_string()).or_default() += 1;
    }

    /// Fail on the first ID (in sorted order) used more than once.
    pub fn validate(&self) -> Result<(), DuplicateIdError> {
        match self.counts.iter().find(|(_, &count)| count > 1) {
            Some((id, &count)) => Err(DuplicateIdError {
                kind: self.kind,
                id: id.clone(),
                count,
            }),
            None => Ok(()),
        }
    }
}
