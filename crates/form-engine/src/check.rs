//! Bookkeeping for asynchronous field checks
//!
//! Every [`CheckTracker::begin`] hands out a ticket with a fresh generation.
//! Only the ticket holding the latest generation for its path may complete;
//! anything older was superseded.

use form_ir::FieldPath;
use std::collections::BTreeMap;

/// Handle of one in-flight check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTicket {
    path: FieldPath,
    generation: u64,
}

impl CheckTicket {
    #[must_use]
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Default)]
pub struct CheckTracker {
    next_generation: u64,
    pending: BTreeMap<FieldPath, u64>,
    failures: BTreeMap<FieldPath, String>,
}

impl CheckTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a check for `path`, superseding any check already running there
    pub fn begin(&mut self, path: FieldPath) -> CheckTicket {
        self.next_generation += 1;
        self.pending.insert(path.clone(), self.next_generation);
        CheckTicket {
            path,
            generation: self.next_generation,
        }
    }

    /// Record the outcome of `ticket`.
    ///
    /// Returns `false`, recording nothing, when the ticket was superseded.
    pub fn complete(&mut self, ticket: &CheckTicket, outcome: Result<(), String>) -> bool {
        if self.pending.get(&ticket.path) != Some(&ticket.generation) {
            return false;
        }
        self.pending.remove(&ticket.path);
        match outcome {
            Ok(()) => {
                self.failures.remove(&ticket.path);
            }
            Err(message) => {
                self.failures.insert(ticket.path.clone(), message);
            }
        }
        true
    }

    /// Drop pending checks and recorded failures at or below `prefix`
    pub fn supersede(&mut self, prefix: &FieldPath) {
        self.pending.retain(|path, _| !path.starts_with(prefix));
        self.failures.retain(|path, _| !path.starts_with(prefix));
    }

    /// Re-key after element `removed` of `array` was deleted.
    ///
    /// Pending checks whose path moved are superseded: their tickets name an
    /// index that now holds a different element.
    pub fn renumber_after_remove(&mut self, array: &FieldPath, removed: usize) {
        self.pending
            .retain(|path, _| path.shift_after_remove(array, removed).as_ref() == Some(path));
        self.failures = std::mem::take(&mut self.failures)
            .into_iter()
            .filter_map(|(path, message)| {
                path.shift_after_remove(array, removed)
                    .map(|path| (path, message))
            })
            .collect();
    }

    #[must_use]
    pub fn is_pending(&self, path: &FieldPath) -> bool {
        self.pending.contains_key(path)
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.pending.keys()
    }

    /// Message of the last failed check at `path`
    #[must_use]
    pub fn failure(&self, path: &FieldPath) -> Option<&str> {
        self.failures.get(path).map(String::as_str)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&FieldPath, &str)> {
        self.failures.iter().map(|(path, message)| (path, message.as_str()))
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.failures.clear();
    }
}
