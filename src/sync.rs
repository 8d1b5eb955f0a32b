use crate::error::InventoryResult;
use crate::model::InventoryItem;
use crate::store::ItemStore;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

struct Listing {
    generation: u64,
    items: Arc<[InventoryItem]>,
}

/// Materializes the remote collection as an ordered in-memory list.
///
/// The list is only ever replaced wholesale: `refresh` swaps in a freshly built
/// `Arc<[InventoryItem]>`, so a reader holding a snapshot never sees a partially
/// updated list.
///
/// Every refresh and clear takes a ticket before it touches the store. A result is
/// installed only if no later ticket has been installed already, so a slow fetch that
/// started first cannot overwrite a newer list.
pub struct InventorySync {
    store: Arc<dyn ItemStore>,
    tickets: AtomicU64,
    listing: RwLock<Listing>,
}

impl InventorySync {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self {
            store,
            tickets: AtomicU64::new(0),
            listing: RwLock::new(Listing {
                generation: 0,
                items: Arc::from(Vec::new()),
            }),
        }
    }

    /// Store the engine reads from.
    pub fn store(&self) -> &Arc<dyn ItemStore> {
        &self.store
    }

    fn ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn install(&self, ticket: u64, items: Arc<[InventoryItem]>) -> bool {
        let mut listing = self.listing.write();
        if ticket <= listing.generation {
            return false;
        }
        listing.generation = ticket;
        listing.items = items;
        true
    }

    /// Fetches every document and replaces the in-memory list, ordered by name.
    ///
    /// On failure the previous list stays in place. The fetched list is returned even
    /// when a newer refresh has already been installed in its place.
    pub fn refresh(&self) -> InventoryResult<Arc<[InventoryItem]>> {
        let ticket = self.ticket();
        let documents = self.store.list().map_err(|err| {
            warn!(error = %err, "inventory refresh failed");
            err
        })?;
        let mut items: Vec<InventoryItem> = documents
            .into_iter()
            .map(|(name, doc)| InventoryItem::from_document(name, doc))
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));

        let items: Arc<[InventoryItem]> = Arc::from(items);
        if self.install(ticket, Arc::clone(&items)) {
            debug!(count = items.len(), "inventory refreshed");
        } else {
            debug!(ticket, "superseded refresh discarded");
        }
        Ok(items)
    }

    /// Current list without touching the store.
    pub fn snapshot(&self) -> Arc<[InventoryItem]> {
        self.listing.read().items.clone()
    }

    /// Drops the cached list, e.g. after sign-out. Refreshes already in flight do not
    /// bring it back.
    pub fn clear(&self) {
        let ticket = self.ticket();
        self.install(ticket, Arc::from(Vec::new()));
    }
}
