use crate::error::InventoryResult;
use crate::model::{ItemDocument, ItemName, Revision};
use crate::store::ItemStore;
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

struct Entry {
    doc: ItemDocument,
    revision: Revision,
}

/// In-memory implementation backed by a concurrent hash map.
///
/// Revisions come from one store-wide clock, so a name that is deleted and written
/// again never gets back a revision it had before.
#[derive(Default)]
pub struct InMemoryItemStore {
    entries: DashMap<ItemName, Entry>,
    clock: AtomicU64,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn tick(&self) -> Revision {
        Revision(self.clock.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

impl ItemStore for InMemoryItemStore {
    fn list(&self) -> InventoryResult<Vec<(ItemName, ItemDocument)>> {
        Ok(self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().doc.clone()))
            .collect())
    }

    fn get(&self, name: &ItemName) -> InventoryResult<Option<(ItemDocument, Revision)>> {
        Ok(self
            .entries
            .get(name)
            .map(|entry| (entry.doc.clone(), entry.revision)))
    }

    fn put(&self, name: &ItemName, doc: ItemDocument) -> InventoryResult<Revision> {
        doc.ensure_storable()?;
        let revision = self.tick();
        self.entries.insert(name.clone(), Entry { doc, revision });
        Ok(revision)
    }

    fn put_cas(
        &self,
        name: &ItemName,
        doc: ItemDocument,
        expected: Revision,
    ) -> InventoryResult<Result<Revision, Revision>> {
        doc.ensure_storable()?;
        match self.entries.entry(name.clone()) {
            MapEntry::Occupied(mut occ) => {
                let current = occ.get().revision;
                if current != expected {
                    return Ok(Err(current));
                }
                let next = self.tick();
                occ.insert(Entry {
                    doc,
                    revision: next,
                });
                Ok(Ok(next))
            }
            MapEntry::Vacant(vac) => {
                if expected != Revision::none() {
                    return Ok(Err(Revision::none()));
                }
                let next = self.tick();
                vac.insert(Entry {
                    doc,
                    revision: next,
                });
                Ok(Ok(next))
            }
        }
    }

    fn delete(&self, name: &ItemName) -> InventoryResult<bool> {
        Ok(self.entries.remove(name).is_some())
    }

    fn delete_cas(&self, name: &ItemName, expected: Revision) -> InventoryResult<Result<(), Revision>> {
        match self.entries.entry(name.clone()) {
            MapEntry::Occupied(occ) => {
                let current = occ.get().revision;
                if current != expected {
                    return Ok(Err(current));
                }
                occ.remove();
                Ok(Ok(()))
            }
            MapEntry::Vacant(_) => Ok(Err(Revision::none())),
        }
    }
}
