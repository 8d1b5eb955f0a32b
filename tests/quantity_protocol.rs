use inventory_sync::inmemory::InMemoryItemStore;
use inventory_sync::{
    InventoryError, InventoryResult, InventorySync, ItemDocument, ItemName, ItemStore,
    MutationOutcome, QuantityMutator, Revision, WriteMode,
};
use proptest::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

fn setup(mode: WriteMode) -> (Arc<InMemoryItemStore>, QuantityMutator) {
    let store = Arc::new(InMemoryItemStore::new());
    let sync = Arc::new(InventorySync::new(store.clone()));
    (store, QuantityMutator::new(sync, mode, 8))
}

fn stored_quantity(store: &InMemoryItemStore, name: &str) -> Option<u32> {
    store
        .get(&ItemName::from(name))
        .expect("get")
        .map(|(doc, _)| doc.quantity)
}

#[test]
fn add_to_empty_store_lists_one_item() {
    let (_store, mutator) = setup(WriteMode::ReadModifyWrite);

    let outcome = mutator
        .add_or_increment("apple", "Food", None)
        .expect("add succeeds");
    assert_eq!(outcome, MutationOutcome::Created);

    let items = mutator.sync().refresh().expect("refresh");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name.as_str(), "apple");
    assert_eq!(items[0].category, "Food");
    assert_eq!(items[0].quantity, 1);
    assert_eq!(items[0].image, None);
}

#[test]
fn mutation_refreshes_the_list() {
    let (_store, mutator) = setup(WriteMode::ReadModifyWrite);
    mutator
        .add_or_increment("apple", "Food", None)
        .expect("add succeeds");
    let snapshot = mutator.sync().snapshot();
    assert_eq!(snapshot.len(), 1, "list reflects the write without a manual refresh");
}

#[test]
fn repeat_add_overwrites_category_and_image() {
    let (store, mutator) = setup(WriteMode::ReadModifyWrite);
    mutator
        .add_or_increment("apple", "Food", Some("data:image/png;base64,AAAA".into()))
        .expect("first add");
    let outcome = mutator
        .add_or_increment("apple", "Supplies", None)
        .expect("second add");
    assert_eq!(outcome, MutationOutcome::Updated { quantity: 2 });

    let (doc, _) = store
        .get(&ItemName::from("apple"))
        .expect("get")
        .expect("present");
    assert_eq!(doc.quantity, 2);
    assert_eq!(doc.category, "Supplies");
    assert_eq!(doc.image, None);
}

#[test]
fn add_requires_name_and_category() {
    let (store, mutator) = setup(WriteMode::ReadModifyWrite);
    for (name, category) in [("", "Food"), ("apple", ""), ("   ", "Food"), ("apple", " ")] {
        let err = mutator
            .add_or_increment(name, category, None)
            .expect_err("missing field rejected");
        assert!(matches!(err, InventoryError::Validation(_)), "{err}");
    }
    assert!(store.is_empty(), "no write happened");
}

#[test]
fn increment_does_not_create() {
    let (store, mutator) = setup(WriteMode::ReadModifyWrite);
    let outcome = mutator.increment("ghost").expect("increment");
    assert_eq!(outcome, MutationOutcome::Missing);
    assert!(store.is_empty());
}

#[test]
fn increment_keeps_other_fields() {
    let (store, mutator) = setup(WriteMode::ReadModifyWrite);
    mutator
        .add_or_increment("cola", "Drinks", Some("https://img.example/cola.png".into()))
        .expect("add");
    mutator.increment("cola").expect("increment");
    let (doc, _) = store
        .get(&ItemName::from("cola"))
        .expect("get")
        .expect("present");
    assert_eq!(doc.quantity, 2);
    assert_eq!(doc.category, "Drinks");
    assert_eq!(doc.image.as_deref(), Some("https://img.example/cola.png"));
}

#[test]
fn decrement_counts_down_then_deletes() {
    let (store, mutator) = setup(WriteMode::ReadModifyWrite);
    for _ in 0..3 {
        mutator.add_or_increment("apple", "Food", None).expect("add");
    }
    assert_eq!(stored_quantity(&store, "apple"), Some(3));

    assert_eq!(
        mutator.decrement("apple").expect("first"),
        MutationOutcome::Updated { quantity: 2 }
    );
    assert_eq!(stored_quantity(&store, "apple"), Some(2));

    assert_eq!(
        mutator.decrement("apple").expect("second"),
        MutationOutcome::Updated { quantity: 1 }
    );
    assert_eq!(stored_quantity(&store, "apple"), Some(1));

    assert_eq!(
        mutator.decrement("apple").expect("third"),
        MutationOutcome::Deleted
    );
    assert_eq!(stored_quantity(&store, "apple"), None);
    assert!(mutator.sync().snapshot().is_empty());

    assert_eq!(
        mutator.decrement("apple").expect("on missing"),
        MutationOutcome::Missing
    );
}

#[test]
fn remove_deletes_regardless_of_quantity() {
    let (store, mutator) = setup(WriteMode::ReadModifyWrite);
    for _ in 0..5 {
        mutator.add_or_increment("chair", "Furniture", None).expect("add");
    }
    assert_eq!(mutator.remove("chair").expect("remove"), MutationOutcome::Deleted);
    assert!(store.is_empty());
    assert_eq!(mutator.remove("chair").expect("again"), MutationOutcome::Missing);
}

#[test]
fn increment_overflow_is_rejected() {
    let (store, mutator) = setup(WriteMode::ReadModifyWrite);
    store
        .put(
            &ItemName::from("sand"),
            ItemDocument {
                category: "Supplies".into(),
                quantity: u32::MAX,
                image: None,
            },
        )
        .expect("seed");
    let err = mutator.increment("sand").expect_err("overflow");
    assert!(matches!(err, InventoryError::Validation(_)));
    assert_eq!(stored_quantity(&store, "sand"), Some(u32::MAX));
}

/// In-memory store whose calls can be switched to fail like an unreachable backend.
#[derive(Default)]
struct FailingStore {
    inner: InMemoryItemStore,
    fail_get: AtomicBool,
    fail_put: AtomicBool,
    fail_delete: AtomicBool,
    fail_list: AtomicBool,
    lists: AtomicUsize,
}

impl FailingStore {
    fn check(flag: &AtomicBool) -> InventoryResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(InventoryError::StoreUnavailable("timeout".into()));
        }
        Ok(())
    }
}

impl ItemStore for FailingStore {
    fn list(&self) -> InventoryResult<Vec<(ItemName, ItemDocument)>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_list)?;
        self.inner.list()
    }

    fn get(&self, name: &ItemName) -> InventoryResult<Option<(ItemDocument, Revision)>> {
        Self::check(&self.fail_get)?;
        self.inner.get(name)
    }

    fn put(&self, name: &ItemName, doc: ItemDocument) -> InventoryResult<Revision> {
        Self::check(&self.fail_put)?;
        self.inner.put(name, doc)
    }

    fn put_cas(
        &self,
        name: &ItemName,
        doc: ItemDocument,
        expected: Revision,
    ) -> InventoryResult<Result<Revision, Revision>> {
        Self::check(&self.fail_put)?;
        self.inner.put_cas(name, doc, expected)
    }

    fn delete(&self, name: &ItemName) -> InventoryResult<bool> {
        Self::check(&self.fail_delete)?;
        self.inner.delete(name)
    }

    fn delete_cas(
        &self,
        name: &ItemName,
        expected: Revision,
    ) -> InventoryResult<Result<(), Revision>> {
        Self::check(&self.fail_delete)?;
        self.inner.delete_cas(name, expected)
    }
}

fn failing_setup(mode: WriteMode) -> (Arc<FailingStore>, QuantityMutator) {
    let store = Arc::new(FailingStore::default());
    let sync = Arc::new(InventorySync::new(store.clone()));
    let mutator = QuantityMutator::new(sync, mode, 8);
    mutator.add_or_increment("apple", "Food", None).expect("seed");
    (store, mutator)
}

fn assert_unavailable(result: InventoryResult<MutationOutcome>) {
    match result {
        Err(InventoryError::StoreUnavailable(reason)) => assert_eq!(reason, "timeout"),
        other => panic!("expected StoreUnavailable, got {other:?}"),
    }
}

#[test]
fn failed_read_writes_nothing_and_skips_refresh() {
    for mode in [WriteMode::ReadModifyWrite, WriteMode::CompareAndSwap] {
        let (store, mutator) = failing_setup(mode);
        let lists = store.lists.load(Ordering::SeqCst);
        store.fail_get.store(true, Ordering::SeqCst);

        assert_unavailable(mutator.increment("apple"));
        assert_unavailable(mutator.add_or_increment("pear", "Food", None));

        assert_eq!(store.lists.load(Ordering::SeqCst), lists, "no refresh after a failure");
        assert_eq!(stored_quantity(&store.inner, "apple"), Some(1));
        assert_eq!(stored_quantity(&store.inner, "pear"), None);
    }
}

#[test]
fn failed_write_keeps_previous_list() {
    for mode in [WriteMode::ReadModifyWrite, WriteMode::CompareAndSwap] {
        let (store, mutator) = failing_setup(mode);
        let before = mutator.sync().snapshot();
        store.fail_put.store(true, Ordering::SeqCst);

        assert_unavailable(mutator.increment("apple"));

        assert_eq!(stored_quantity(&store.inner, "apple"), Some(1));
        assert_eq!(mutator.sync().snapshot(), before);
    }
}

#[test]
fn failed_delete_leaves_document_in_place() {
    for mode in [WriteMode::ReadModifyWrite, WriteMode::CompareAndSwap] {
        let (store, mutator) = failing_setup(mode);
        store.fail_delete.store(true, Ordering::SeqCst);

        assert_unavailable(mutator.decrement("apple"));
        assert_unavailable(mutator.remove("apple"));

        assert_eq!(stored_quantity(&store.inner, "apple"), Some(1));
        assert_eq!(mutator.sync().snapshot().len(), 1);
    }
}

#[test]
fn failed_refresh_keeps_previous_list() {
    let (store, mutator) = failing_setup(WriteMode::ReadModifyWrite);
    let before = mutator.sync().snapshot();
    store
        .inner
        .put(&ItemName::from("milk"), ItemDocument::fresh("Drinks", None))
        .expect("second item");
    store.fail_list.store(true, Ordering::SeqCst);

    let err = mutator.sync().refresh().expect_err("list fails");
    assert!(matches!(err, InventoryError::StoreUnavailable(_)), "{err}");
    assert_eq!(mutator.sync().snapshot(), before);
}

#[test]
fn committed_write_reports_outcome_when_refresh_fails() {
    let (store, mutator) = failing_setup(WriteMode::ReadModifyWrite);
    store.fail_list.store(true, Ordering::SeqCst);

    let outcome = mutator.increment("apple").expect("write itself succeeded");
    assert_eq!(outcome, MutationOutcome::Updated { quantity: 2 });
    assert_eq!(stored_quantity(&store.inner, "apple"), Some(2));
    assert_eq!(mutator.sync().snapshot()[0].quantity, 1, "list left as it was");

    store.fail_list.store(false, Ordering::SeqCst);
    mutator.sync().refresh().expect("refresh recovers");
    assert_eq!(mutator.sync().snapshot()[0].quantity, 2);
}

#[derive(Clone, Debug)]
enum Op {
    Add(u8),
    Inc(u8),
    Dec(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..3).prop_map(Op::Add),
        (0u8..3).prop_map(Op::Inc),
        (0u8..3).prop_map(Op::Dec),
    ]
}

proptest! {
    #[test]
    fn increment_then_decrement_restores_quantity(start in 1u32..50) {
        let (store, mutator) = setup(WriteMode::ReadModifyWrite);
        for _ in 0..start {
            mutator.add_or_increment("widget", "Electronics", None).expect("add");
        }
        mutator.increment("widget").expect("increment");
        mutator.decrement("widget").expect("decrement");
        prop_assert_eq!(stored_quantity(&store, "widget"), Some(start));
    }

    #[test]
    fn store_never_holds_non_positive_quantity(
        ops in proptest::collection::vec(op(), 1..60),
        mode in prop_oneof![Just(WriteMode::ReadModifyWrite), Just(WriteMode::CompareAndSwap)],
    ) {
        let (store, mutator) = setup(mode);
        let mut model = [0u32; 3];
        for op in ops {
            match op {
                Op::Add(i) => {
                    mutator.add_or_increment(&format!("item-{i}"), "Food", None).expect("add");
                    model[i as usize] += 1;
                }
                Op::Inc(i) => {
                    mutator.increment(&format!("item-{i}")).expect("inc");
                    if model[i as usize] > 0 {
                        model[i as usize] += 1;
                    }
                }
                Op::Dec(i) => {
                    mutator.decrement(&format!("item-{i}")).expect("dec");
                    model[i as usize] = model[i as usize].saturating_sub(1);
                }
            }
            for item in mutator.sync().snapshot().iter() {
                prop_assert!(item.quantity >= 1);
            }
        }
        for (i, expected) in model.iter().enumerate() {
            let stored = stored_quantity(&store, &format!("item-{i}"));
            let expected = (*expected > 0).then_some(*expected);
            prop_assert_eq!(stored, expected);
        }
    }
}
