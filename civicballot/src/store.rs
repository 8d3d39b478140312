use crate::*;
use indexmap::IndexSet;
use std::collections::BTreeMap;

/// An election store
///
/// The ledger is written against this seam so tests run on `MemStore` and a
/// deployment can plug in a transactional table with a uniqueness constraint
/// on (election, identity).
pub trait ElectionStore {
    /// Hand out the next election id. Ids are unique and strictly increasing.
    fn allocate_id(&mut self) -> ElectionId;

    fn insert(&mut self, election: Election);

    fn get(&self, id: ElectionId) -> Option<&Election>;

    fn get_mut(&mut self, id: ElectionId) -> Option<&mut Election>;

    /// Drop an election from the active index. The election itself is kept;
    /// its status is owned by the `Election`.
    fn retire(&mut self, id: ElectionId);

    /// Ids in the active index, in creation order.
    fn active_ids(&self) -> Vec<ElectionId>;

    fn total(&self) -> u64;
}

/// A simple store that uses an in-memory BTreeMap
#[derive(Default, Clone)]
pub struct MemStore {
    elections: BTreeMap<ElectionId, Election>,
    active: IndexSet<ElectionId>,
    next_id: ElectionId,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ElectionStore for MemStore {
    fn allocate_id(&mut self) -> ElectionId {
        self.next_id += 1;
        self.next_id
    }

    fn insert(&mut self, election: Election) {
        self.active.insert(election.id);
        self.elections.insert(election.id, election);
    }

    fn get(&self, id: ElectionId) -> Option<&Election> {
        self.elections.get(&id)
    }

    fn get_mut(&mut self, id: ElectionId) -> Option<&mut Election> {
        self.elections.get_mut(&id)
    }

    fn retire(&mut self, id: ElectionId) {
        self.active.shift_remove(&id);
    }

    fn active_ids(&self) -> Vec<ElectionId> {
        self.active.iter().copied().collect()
    }

    fn total(&self) -> u64 {
        self.elections.len() as u64
    }
}
