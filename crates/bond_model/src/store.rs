//! Storage seam between the model and the host ledger
//!
//! The model only needs keyed access to bonds and their current batches,
//! plus a deterministic iteration order for the block clock. Hosts back
//! this with whatever store they have; [`MemStore`] is the in-process
//! implementation used by the CLI and tests.

use std::collections::BTreeMap;

use crate::batch::Batch;
use crate::bond::Bond;

pub trait BondStore {
    fn get_bond(&self, token: &str) -> Option<Bond>;
    fn set_bond(&mut self, bond: Bond);
    fn remove_bond(&mut self, token: &str);

    fn get_batch(&self, token: &str) -> Option<Batch>;
    fn set_batch(&mut self, batch: Batch);
    fn remove_batch(&mut self, token: &str);

    /// Every bond token, in a stable order shared by all replicas
    fn bond_tokens(&self) -> Vec<String>;
}

/// In-memory store over ordered maps
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    bonds: BTreeMap<String, Bond>,
    batches: BTreeMap<String, Batch>,
}

impl BondStore for MemStore {
    fn get_bond(&self, token: &str) -> Option<Bond> {
        self.bonds.get(token).cloned()
    }

    fn set_bond(&mut self, bond: Bond) {
        self.bonds.insert(bond.token.clone(), bond);
    }

    fn remove_bond(&mut self, token: &str) {
        self.bonds.remove(token);
    }

    fn get_batch(&self, token: &str) -> Option<Batch> {
        self.batches.get(token).cloned()
    }

    fn set_batch(&mut self, batch: Batch) {
        self.batches.insert(batch.token.clone(), batch);
    }

    fn remove_batch(&mut self, token: &str) {
        self.batches.remove(token);
    }

    fn bond_tokens(&self) -> Vec<String> {
        self.bonds.keys().cloned().collect()
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bonds(&self) -> impl Iterator<Item = &Bond> {
        self.bonds.values()
    }
}
