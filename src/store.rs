use crate::error::InventoryResult;
use crate::model::{ItemDocument, ItemName, Revision};

/// Document store holding one document per inventory item, keyed by item name.
///
/// Plain `put` is a full overwrite with no precondition, which is what the default
/// read-modify-write protocol uses. The `*_cas` variants only apply when the document
/// is still at the expected revision and report the current revision otherwise;
/// `Revision::none()` as the expectation means "only if absent".
pub trait ItemStore: Send + Sync + 'static {
    /// Returns every document in the collection. Order is backend-defined.
    fn list(&self) -> InventoryResult<Vec<(ItemName, ItemDocument)>>;

    /// Fetches one document and its current revision.
    fn get(&self, name: &ItemName) -> InventoryResult<Option<(ItemDocument, Revision)>>;

    /// Overwrites (or creates) the document and returns its new revision.
    fn put(&self, name: &ItemName, doc: ItemDocument) -> InventoryResult<Revision>;

    /// Writes the document only if its revision still equals `expected`.
    fn put_cas(
        &self,
        name: &ItemName,
        doc: ItemDocument,
        expected: Revision,
    ) -> InventoryResult<Result<Revision, Revision>>;

    /// Removes the document. Returns `false` when nothing was stored under `name`.
    fn delete(&self, name: &ItemName) -> InventoryResult<bool>;

    /// Removes the document only if its revision still equals `expected`.
    fn delete_cas(&self, name: &ItemName, expected: Revision) -> InventoryResult<Result<(), Revision>>;
}
