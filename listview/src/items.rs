use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::element::{ElementId, ElementTree};
use crate::promise::{Promise, Resolver};
use crate::source::ItemHandle;

/// The realized state of one item.
#[derive(Clone, Debug)]
pub struct ItemRecord {
    /// The rendered item element.
    pub element: ElementId,
    pub item_box: Option<ElementId>,
    pub container: Option<ElementId>,
    /// The element exists but has not been attached to a container yet.
    pub detached: bool,
    pub item: Option<ItemHandle>,
}

/// Sparse index → realized element map with deferred lookup.
///
/// Records are exclusively owned here; other components refer to items by index.
#[derive(Debug, Default)]
pub struct ItemsContainer {
    records: BTreeMap<usize, ItemRecord>,
    waiting: BTreeMap<usize, Vec<Resolver<ElementId>>>,
}

impl ItemsContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a promise for the element at `index`.
    ///
    /// Resolves immediately when an attached record exists, otherwise once
    /// [`Self::set_item_at`] stores an attached record for `index`. Each call is resolved at most
    /// once.
    pub fn request_item(&mut self, index: usize) -> Promise<ElementId> {
        if let Some(record) = self.records.get(&index).filter(|r| !r.detached) {
            return Promise::resolved(record.element);
        }
        let (promise, resolver) = Promise::new();
        self.waiting.entry(index).or_default().push(resolver);
        promise
    }

    pub fn set_item_at(&mut self, index: usize, record: ItemRecord) {
        let element = record.element;
        let attached = !record.detached;
        self.records.insert(index, record);
        if attached {
            self.notify(index, element);
        }
    }

    /// Marks a detached record as attached to `container` and releases its waiters.
    pub fn attach(&mut self, index: usize, container: ElementId, item_box: Option<ElementId>) {
        let Some(record) = self.records.get_mut(&index) else {
            return;
        };
        record.container = Some(container);
        record.item_box = item_box;
        record.detached = false;
        let element = record.element;
        self.notify(index, element);
    }

    /// Resolves (and forgets) every pending request for `index`.
    pub fn notify(&mut self, index: usize, element: ElementId) {
        if let Some(waiters) = self.waiting.remove(&index) {
            vtrace!(index, waiters = waiters.len(), "ItemsContainer::notify");
            for waiter in waiters {
                waiter.resolve(element);
            }
        }
    }

    pub fn pending_requests(&self, index: usize) -> usize {
        self.waiting
            .get(&index)
            .map(|w| w.iter().filter(|r| !r.is_settled()).count())
            .unwrap_or(0)
    }

    pub fn item_at(&self, index: usize) -> Option<ElementId> {
        self.records.get(&index).map(|r| r.element)
    }

    pub fn record_at(&self, index: usize) -> Option<&ItemRecord> {
        self.records.get(&index)
    }

    pub fn record_at_mut(&mut self, index: usize) -> Option<&mut ItemRecord> {
        self.records.get_mut(&index)
    }

    pub fn container_at(&self, index: usize) -> Option<ElementId> {
        self.records.get(&index).and_then(|r| r.container)
    }

    pub fn item_box_at(&self, index: usize) -> Option<ElementId> {
        self.records.get(&index).and_then(|r| r.item_box)
    }

    pub fn item_data_at(&self, index: usize) -> Option<&ItemHandle> {
        self.records.get(&index).and_then(|r| r.item.as_ref())
    }

    pub fn is_realized(&self, index: usize) -> bool {
        self.records.get(&index).is_some_and(|r| !r.detached)
    }

    /// Drops the record for `index`. Pending requests are not resolved.
    pub fn remove_item(&mut self, index: usize) -> Option<ItemRecord> {
        self.records.remove(&index)
    }

    /// Drops every record. Pending requests are not resolved.
    pub fn remove_items(&mut self) -> Vec<(usize, ItemRecord)> {
        core::mem::take(&mut self.records).into_iter().collect()
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn each_index(&self, mut f: impl FnMut(usize)) {
        for &index in self.records.keys() {
            f(index);
        }
    }

    pub fn indexes(&self) -> Vec<usize> {
        self.records.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &ItemRecord)> {
        self.records.iter().map(|(i, r)| (*i, r))
    }

    /// Renumbers records and waiters after the data changed.
    ///
    /// `f(old)` returns the new index, or `None` when the item no longer exists. Records mapped to
    /// `None` are returned to the caller; waiters mapped to `None` are dropped unresolved.
    pub fn remap(&mut self, mut f: impl FnMut(usize) -> Option<usize>) -> Vec<ItemRecord> {
        let mut evicted = Vec::new();
        let mut records = BTreeMap::new();
        for (old, record) in core::mem::take(&mut self.records) {
            match f(old) {
                Some(new) => {
                    // Two records claiming one slot: the later one wins.
                    if let Some(displaced) = records.insert(new, record) {
                        evicted.push(displaced);
                    }
                }
                None => evicted.push(record),
            }
        }
        self.records = records;

        let mut waiting: BTreeMap<usize, Vec<Resolver<ElementId>>> = BTreeMap::new();
        for (old, waiters) in core::mem::take(&mut self.waiting) {
            if let Some(new) = f(old) {
                waiting.entry(new).or_default().extend(waiters);
            }
        }
        self.waiting = waiting;
        evicted
    }

    /// Finds the item index owning `element`.
    ///
    /// Walks from `element` up its ancestors to the first element accepted by `is_container`,
    /// then matches it against the records' containers and elements.
    pub fn index(
        &self,
        tree: &ElementTree,
        element: ElementId,
        is_container: impl Fn(&ElementTree, ElementId) -> bool,
    ) -> Option<usize> {
        let container = self.container_from(tree, element, is_container)?;
        self.records
            .iter()
            .find(|(_, r)| r.container == Some(container) || r.element == container)
            .map(|(i, _)| *i)
    }

    pub fn container_from(
        &self,
        tree: &ElementTree,
        element: ElementId,
        is_container: impl Fn(&ElementTree, ElementId) -> bool,
    ) -> Option<ElementId> {
        tree.ancestors(element).find(|e| is_container(tree, *e))
    }

    pub fn item_box_from(
        &self,
        tree: &ElementTree,
        element: ElementId,
        is_item_box: impl Fn(&ElementTree, ElementId) -> bool,
    ) -> Option<ElementId> {
        tree.ancestors(element).find(|e| is_item_box(tree, *e))
    }
}
