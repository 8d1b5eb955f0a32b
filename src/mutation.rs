//! Quantity mutations applied to single item documents.
//!
//! Every operation reads the document, decides on a write, delete or nothing, applies
//! it, and then re-fetches the whole list through [`InventorySync`]. Nothing is patched
//! locally. An error means nothing was written; if only the re-fetch fails, the
//! operation still returns its outcome and the cached list stays as it was.
//!
//! Under [`WriteMode::ReadModifyWrite`] the read and the write are separate store calls
//! with nothing in between to hold other writers off. Two callers mutating the same
//! name at the same time can both read quantity `n` and both write `n + 1`, so one
//! update is lost. [`WriteMode::CompareAndSwap`] makes the write conditional on the
//! revision seen by the read and retries from a fresh read when it loses.

use crate::config::{InventoryConfig, WriteMode};
use crate::error::{validation, InventoryError, InventoryResult};
use crate::model::{ItemDocument, ItemName, Revision};
use crate::store::ItemStore;
use crate::sync::InventorySync;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a mutation did to the stored document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationOutcome {
    /// A new document was written with quantity 1.
    Created,
    /// An existing document was overwritten with this quantity.
    Updated { quantity: u32 },
    /// The document was removed.
    Deleted,
    /// No document was stored under the name; nothing was written.
    Missing,
}

enum Step {
    Write(ItemDocument),
    Delete,
    Skip,
}

impl Step {
    fn outcome(&self, existed: bool) -> MutationOutcome {
        match self {
            Step::Write(doc) if existed => MutationOutcome::Updated {
                quantity: doc.quantity,
            },
            Step::Write(_) => MutationOutcome::Created,
            Step::Delete => MutationOutcome::Deleted,
            Step::Skip => MutationOutcome::Missing,
        }
    }
}

pub struct QuantityMutator {
    store: Arc<dyn ItemStore>,
    sync: Arc<InventorySync>,
    write_mode: WriteMode,
    max_cas_attempts: u32,
}

impl QuantityMutator {
    /// Builds a mutator writing through the sync engine's store.
    pub fn new(sync: Arc<InventorySync>, write_mode: WriteMode, max_cas_attempts: u32) -> Self {
        Self {
            store: Arc::clone(sync.store()),
            sync,
            write_mode,
            max_cas_attempts: max_cas_attempts.max(1),
        }
    }

    pub fn from_config(sync: Arc<InventorySync>, config: &InventoryConfig) -> Self {
        Self::new(sync, config.write_mode, config.max_cas_attempts)
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    pub fn sync(&self) -> &Arc<InventorySync> {
        &self.sync
    }

    /// Creates the item with quantity 1, or bumps the quantity of an existing one.
    ///
    /// On an existing item the category and image of this call replace the stored ones.
    pub fn add_or_increment(
        &self,
        name: &str,
        category: &str,
        image: Option<String>,
    ) -> InventoryResult<MutationOutcome> {
        if name.trim().is_empty() {
            return Err(validation("item name is required"));
        }
        if category.trim().is_empty() {
            return Err(validation("item category is required"));
        }
        let name = ItemName::from(name);
        let result = self.apply(&name, |current| {
            let quantity = match current {
                Some(doc) => bump(&name, doc.quantity)?,
                None => 1,
            };
            Ok(Step::Write(ItemDocument {
                category: category.to_string(),
                quantity,
                image: image.clone(),
            }))
        });
        self.finish("add_or_increment", &name, result)
    }

    /// Adds one to an existing item. Does not create missing items.
    pub fn increment(&self, name: &str) -> InventoryResult<MutationOutcome> {
        let name = ItemName::from(name);
        let result = self.apply(&name, |current| match current {
            Some(doc) => Ok(Step::Write(doc.with_quantity(bump(&name, doc.quantity)?))),
            None => Ok(Step::Skip),
        });
        self.finish("increment", &name, result)
    }

    /// Subtracts one from an existing item, deleting it instead of storing zero.
    pub fn decrement(&self, name: &str) -> InventoryResult<MutationOutcome> {
        let name = ItemName::from(name);
        let result = self.apply(&name, |current| match current {
            Some(doc) if doc.quantity <= 1 => Ok(Step::Delete),
            Some(doc) => Ok(Step::Write(doc.with_quantity(doc.quantity - 1))),
            None => Ok(Step::Skip),
        });
        self.finish("decrement", &name, result)
    }

    /// Deletes the item outright, whatever its quantity.
    pub fn remove(&self, name: &str) -> InventoryResult<MutationOutcome> {
        let name = ItemName::from(name);
        let result = self.apply(&name, |current| match current {
            Some(_) => Ok(Step::Delete),
            None => Ok(Step::Skip),
        });
        self.finish("remove", &name, result)
    }

    fn apply<F>(&self, name: &ItemName, mut plan: F) -> InventoryResult<MutationOutcome>
    where
        F: FnMut(Option<&ItemDocument>) -> InventoryResult<Step>,
    {
        match self.write_mode {
            WriteMode::ReadModifyWrite => {
                let current = self.store.get(name)?;
                let existed = current.is_some();
                let step = plan(current.as_ref().map(|(doc, _)| doc))?;
                self.commit(name, existed, step)
            }
            WriteMode::CompareAndSwap => {
                for attempt in 1..=self.max_cas_attempts {
                    let current = self.store.get(name)?;
                    let existed = current.is_some();
                    let revision = current
                        .as_ref()
                        .map(|(_, rev)| *rev)
                        .unwrap_or(Revision::none());
                    let step = plan(current.as_ref().map(|(doc, _)| doc))?;
                    if let Some(outcome) = self.commit_cas(name, existed, step, revision)? {
                        return Ok(outcome);
                    }
                    warn!(item = %name, attempt, "revision changed during mutation, retrying");
                }
                Err(InventoryError::Contention {
                    name: name.to_string(),
                    attempts: self.max_cas_attempts,
                })
            }
        }
    }

    fn commit(&self, name: &ItemName, existed: bool, step: Step) -> InventoryResult<MutationOutcome> {
        let outcome = step.outcome(existed);
        match step {
            Step::Write(doc) => {
                self.store.put(name, doc)?;
            }
            Step::Delete => {
                if !self.store.delete(name)? {
                    return Ok(MutationOutcome::Missing);
                }
            }
            Step::Skip => {}
        }
        Ok(outcome)
    }

    fn commit_cas(
        &self,
        name: &ItemName,
        existed: bool,
        step: Step,
        revision: Revision,
    ) -> InventoryResult<Option<MutationOutcome>> {
        let outcome = step.outcome(existed);
        let applied = match step {
            Step::Write(doc) => self.store.put_cas(name, doc, revision)?.is_ok(),
            Step::Delete => self.store.delete_cas(name, revision)?.is_ok(),
            Step::Skip => true,
        };
        Ok(applied.then_some(outcome))
    }

    fn finish(
        &self,
        op: &'static str,
        name: &ItemName,
        result: InventoryResult<MutationOutcome>,
    ) -> InventoryResult<MutationOutcome> {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(op, item = %name, error = %err, "inventory mutation failed");
                return Err(err);
            }
        };
        match outcome {
            MutationOutcome::Missing => debug!(op, item = %name, "no such item"),
            _ => info!(op, item = %name, ?outcome, "inventory mutated"),
        }
        // The write is durable at this point; a failed re-fetch only leaves the list stale.
        if let Err(err) = self.sync.refresh() {
            warn!(op, item = %name, error = %err, "list not refreshed after mutation");
        }
        Ok(outcome)
    }
}

fn bump(name: &ItemName, quantity: u32) -> InventoryResult<u32> {
    quantity
        .checked_add(1)
        .ok_or_else(|| validation(format!("quantity of `{name}` would overflow")))
}
