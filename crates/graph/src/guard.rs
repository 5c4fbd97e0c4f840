//! In-flight operation guards
//!
//! At most one operation of a kind may run per id. Acquiring hands out a
//! ticket; dropping the ticket releases the id, including on early return
//! or panic.

use papergraph_common::errors::{AppError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Concept/citation expansion of a paper node
    Expansion,
    /// Relationship analysis of an edge
    Analysis,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expansion => "expansion",
            Self::Analysis => "analysis",
        }
    }
}

type Slots = HashMap<OperationKind, HashSet<String>>;

#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    slots: Arc<Mutex<Slots>>,
}

fn lock(slots: &Mutex<Slots>) -> MutexGuard<'_, Slots> {
    // Sets stay consistent even if a holder panicked
    slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `id` for `kind`, or fail with `OperationInFlight`
    pub fn try_acquire(&self, kind: OperationKind, id: &str) -> Result<InFlightTicket> {
        let mut slots = lock(&self.slots);
        if !slots.entry(kind).or_default().insert(id.to_string()) {
            return Err(AppError::OperationInFlight {
                operation: kind.as_str().to_string(),
                id: id.to_string(),
            });
        }

        Ok(InFlightTicket {
            slots: Arc::clone(&self.slots),
            kind,
            id: id.to_string(),
        })
    }

    pub fn is_in_flight(&self, kind: OperationKind, id: &str) -> bool {
        lock(&self.slots).get(&kind).is_some_and(|ids| ids.contains(id))
    }
}

/// Releases its id on drop
#[derive(Debug)]
pub struct InFlightTicket {
    slots: Arc<Mutex<Slots>>,
    kind: OperationKind,
    id: String,
}

impl InFlightTicket {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        if let Some(ids) = lock(&self.slots).get_mut(&self.kind) {
            ids.remove(&self.id);
        }
    }
}
