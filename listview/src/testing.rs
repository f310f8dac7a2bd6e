//! In-memory collaborators for tests, demos and headless hosts.
//!
//! [`VecSource`] is a key-stable data source whose mutators return the notification batch the
//! change produces, [`StaticRenderer`] renders fixed-size elements (optionally deferred until
//! [`StaticRenderer::flush`]), and [`ManualAnimations`] records plans and finishes them on demand.

use alloc::vec::Vec;

use crate::element::{ElementId, ElementTree};
use crate::promise::{Promise, Resolver};
use crate::source::{
    AnimationDriver, AnimationPlan, DataSource, GroupDescriptor, ItemHandle, Notification,
    Renderer, Target, UserData,
};
use crate::{GroupKey, ItemKey, Size};

#[derive(Clone, Debug)]
struct SourceGroup {
    key: GroupKey,
    items: Vec<ItemKey>,
}

/// A vector-backed data source.
///
/// Group keys start at the group's initial index; item keys are unique for the source's lifetime.
#[derive(Clone, Debug)]
pub struct VecSource {
    groups: Vec<SourceGroup>,
    grouped: bool,
    next_item_key: ItemKey,
    next_group_key: GroupKey,
    requests: Vec<usize>,
}

impl VecSource {
    /// An ungrouped source with `count` items.
    pub fn ungrouped(count: usize) -> Self {
        let mut source = Self::empty(false);
        let items = source.fresh_keys(count);
        source.groups.push(SourceGroup { key: 0, items });
        source
    }

    /// A grouped source with one group per entry of `sizes`.
    pub fn grouped(sizes: &[usize]) -> Self {
        let mut source = Self::empty(true);
        for &size in sizes {
            let key = source.next_group_key;
            source.next_group_key += 1;
            let items = source.fresh_keys(size);
            source.groups.push(SourceGroup { key, items });
        }
        source
    }

    fn empty(grouped: bool) -> Self {
        Self {
            groups: Vec::new(),
            grouped,
            next_item_key: 0,
            next_group_key: 0,
            requests: Vec::new(),
        }
    }

    fn fresh_keys(&mut self, count: usize) -> Vec<ItemKey> {
        let start = self.next_item_key;
        self.next_item_key += count as u64;
        (start..self.next_item_key).collect()
    }

    pub fn is_grouped(&self) -> bool {
        self.grouped
    }

    /// Item indexes requested through [`DataSource::item`], in request order.
    pub fn requests(&self) -> &[usize] {
        &self.requests
    }

    pub fn clear_requests(&mut self) {
        self.requests.clear();
    }

    pub fn key_at(&self, index: usize) -> Option<ItemKey> {
        let (group, local) = self.locate(index)?;
        self.groups[group].items.get(local).copied()
    }

    pub fn group_key(&self, group: usize) -> Option<GroupKey> {
        self.groups.get(group).map(|g| g.key)
    }

    /// Group position and index within that group of flat item `index`.
    fn locate(&self, index: usize) -> Option<(usize, usize)> {
        let mut start = 0;
        for (g, group) in self.groups.iter().enumerate() {
            if index < start + group.items.len() {
                return Some((g, index - start));
            }
            start += group.items.len();
        }
        None
    }

    /// Group position and local index where an item inserted at flat `index` lands.
    fn insertion_point(&self, index: usize) -> Option<(usize, usize)> {
        if let Some(found) = self.locate(index) {
            return Some(found);
        }
        let last = self.groups.len().checked_sub(1)?;
        Some((last, self.groups[last].items.len()))
    }

    fn group_start(&self, group: usize) -> usize {
        self.groups[..group].iter().map(|g| g.items.len()).sum()
    }

    fn group_changed(&self, group: usize) -> Option<Notification> {
        self.grouped.then(|| Notification::Changed {
            target: Target::Group,
            key: self.groups[group].key,
            index: group,
            size: Some(self.groups[group].items.len()),
            data: UserData::none(),
        })
    }

    fn batch(changes: impl IntoIterator<Item = Notification>) -> Vec<Notification> {
        let mut batch = alloc::vec![Notification::BeginNotifications];
        batch.extend(changes);
        batch.push(Notification::EndNotifications);
        batch
    }

    /// Inserts a new item at flat `index` (appending to the last group past the end).
    pub fn insert_item(&mut self, index: usize) -> Vec<Notification> {
        if self.grouped && self.groups.is_empty() {
            return self.insert_group(0, 1);
        }
        if self.groups.is_empty() {
            self.groups.push(SourceGroup {
                key: self.next_group_key,
                items: Vec::new(),
            });
            self.next_group_key += 1;
        }
        let Some((group, local)) = self.insertion_point(index) else {
            return Vec::new();
        };
        let key = self.next_item_key;
        self.next_item_key += 1;
        self.groups[group].items.insert(local, key);
        let index = self.group_start(group) + local;
        let items = &self.groups[group].items;
        let previous = local.checked_sub(1).map(|i| items[i]);
        let next = items.get(local + 1).copied();
        let inserted = Notification::Inserted {
            target: Target::Item,
            key,
            index,
            previous,
            next,
            size: 0,
            data: UserData::none(),
        };
        Self::batch(core::iter::once(inserted).chain(self.group_changed(group)))
    }

    pub fn remove_item(&mut self, index: usize) -> Vec<Notification> {
        let Some((group, local)) = self.locate(index) else {
            return Vec::new();
        };
        let key = self.groups[group].items.remove(local);
        let removed = Notification::Removed {
            target: Target::Item,
            key,
            index,
        };
        Self::batch(core::iter::once(removed).chain(self.group_changed(group)))
    }

    /// Moves an item within the flat sequence.
    pub fn move_item(&mut self, from: usize, to: usize) -> Vec<Notification> {
        let Some((group, local)) = self.locate(from) else {
            return Vec::new();
        };
        let key = self.groups[group].items.remove(local);
        let Some((target, target_local)) = self.insertion_point(to) else {
            self.groups[group].items.insert(local, key);
            return Vec::new();
        };
        self.groups[target].items.insert(target_local, key);
        let new_index = self.group_start(target) + target_local;
        let items = &self.groups[target].items;
        let moved = Notification::Moved {
            target: Target::Item,
            key,
            old_index: from,
            new_index,
            previous: target_local.checked_sub(1).map(|i| items[i]),
            next: items.get(target_local + 1).copied(),
        };
        let mut changes = alloc::vec![moved];
        if group != target {
            changes.extend(self.group_changed(group));
            changes.extend(self.group_changed(target));
        }
        Self::batch(changes)
    }

    /// Marks the item at `index` as changed (its data is re-rendered).
    pub fn change_item(&mut self, index: usize) -> Vec<Notification> {
        let Some(key) = self.key_at(index) else {
            return Vec::new();
        };
        Self::batch([Notification::Changed {
            target: Target::Item,
            key,
            index,
            size: None,
            data: UserData::none(),
        }])
    }

    /// Inserts a new group of `size` items before group position `index`.
    pub fn insert_group(&mut self, index: usize, size: usize) -> Vec<Notification> {
        let index = index.min(self.groups.len());
        let key = self.next_group_key;
        self.next_group_key += 1;
        let items = self.fresh_keys(size);
        self.groups.insert(index, SourceGroup { key, items });
        let previous = index.checked_sub(1).map(|i| self.groups[i].key);
        let next = self.groups.get(index + 1).map(|g| g.key);
        Self::batch([Notification::Inserted {
            target: Target::Group,
            key,
            index,
            previous,
            next,
            size,
            data: UserData::none(),
        }])
    }

    pub fn remove_group(&mut self, index: usize) -> Vec<Notification> {
        if index >= self.groups.len() {
            return Vec::new();
        }
        let group = self.groups.remove(index);
        Self::batch([Notification::Removed {
            target: Target::Group,
            key: group.key,
            index,
        }])
    }

    /// Moves group `from` so that it ends up at group position `to`.
    pub fn move_group(&mut self, from: usize, to: usize) -> Vec<Notification> {
        if from >= self.groups.len() {
            return Vec::new();
        }
        let group = self.groups.remove(from);
        let to = to.min(self.groups.len());
        let key = group.key;
        self.groups.insert(to, group);
        let previous = to.checked_sub(1).map(|i| self.groups[i].key);
        let next = self.groups.get(to + 1).map(|g| g.key);
        Self::batch([Notification::Moved {
            target: Target::Group,
            key,
            old_index: from,
            new_index: to,
            previous,
            next,
        }])
    }

    /// Grows or shrinks group `index` at its end to `size` items.
    pub fn resize_group(&mut self, index: usize, size: usize) -> Vec<Notification> {
        if index >= self.groups.len() {
            return Vec::new();
        }
        let start = self.group_start(index);
        let mut changes = Vec::new();
        while self.groups[index].items.len() > size {
            if let Some(key) = self.groups[index].items.pop() {
                changes.push(Notification::Removed {
                    target: Target::Item,
                    key,
                    index: start + self.groups[index].items.len(),
                });
            }
        }
        while self.groups[index].items.len() < size {
            let key = self.next_item_key;
            self.next_item_key += 1;
            let items = &mut self.groups[index].items;
            let previous = items.last().copied();
            items.push(key);
            changes.push(Notification::Inserted {
                target: Target::Item,
                key,
                index: start + items.len() - 1,
                previous,
                next: None,
                size: 0,
                data: UserData::none(),
            });
        }
        changes.extend(self.group_changed(index));
        Self::batch(changes)
    }
}

impl DataSource for VecSource {
    fn item_count(&self) -> usize {
        self.groups.iter().map(|g| g.items.len()).sum()
    }

    fn item(&mut self, index: usize) -> Promise<ItemHandle> {
        self.requests.push(index);
        let Some((group, local)) = self.locate(index) else {
            return Promise::canceled();
        };
        let group = &self.groups[group];
        Promise::resolved(ItemHandle {
            key: group.items[local],
            index,
            group_key: self.grouped.then_some(group.key),
            data: UserData::none(),
        })
    }

    fn group_count(&self) -> Option<usize> {
        self.grouped.then_some(self.groups.len())
    }

    fn group(&self, index: usize) -> Option<GroupDescriptor> {
        if !self.grouped {
            return None;
        }
        let group = self.groups.get(index)?;
        Some(GroupDescriptor {
            key: group.key,
            first_item_index_hint: self.group_start(index),
            size: group.items.len(),
            data: UserData::none(),
        })
    }
}

#[derive(Debug)]
struct DeferredRender {
    item: Promise<ItemHandle>,
    element: ElementId,
    resolver: Resolver<ElementId>,
}

/// Renders every item and header as an empty element with a fixed content size.
#[derive(Debug)]
pub struct StaticRenderer {
    item_size: Size,
    header_size: Size,
    deferred: bool,
    pending: Vec<DeferredRender>,
    rendered: Vec<usize>,
    headers: Vec<GroupKey>,
}

impl StaticRenderer {
    pub fn new(item_size: Size, header_size: Size) -> Self {
        Self {
            item_size,
            header_size,
            deferred: false,
            pending: Vec::new(),
            rendered: Vec::new(),
            headers: Vec::new(),
        }
    }

    /// Keeps item renders pending until [`Self::flush`].
    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }

    pub fn set_deferred(&mut self, deferred: bool) {
        self.deferred = deferred;
    }

    /// Item indexes rendered so far, in request order.
    pub fn rendered(&self) -> &[usize] {
        &self.rendered
    }

    pub fn headers(&self) -> &[GroupKey] {
        &self.headers
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn clear_log(&mut self) {
        self.rendered.clear();
        self.headers.clear();
    }

    /// Resolves every pending render whose item is available. Renders whose item request was
    /// canceled are canceled and their elements removed.
    pub fn flush(&mut self, tree: &mut ElementTree) -> usize {
        let mut resolved = 0;
        let mut still = Vec::new();
        for render in self.pending.drain(..) {
            if render.item.is_canceled() {
                render.resolver.cancel();
                tree.remove(render.element);
            } else if render.item.is_ready() {
                if render.resolver.resolve(render.element) {
                    resolved += 1;
                } else {
                    tree.remove(render.element);
                }
            } else {
                still.push(render);
            }
        }
        self.pending = still;
        resolved
    }
}

impl Renderer for StaticRenderer {
    fn render_item(
        &mut self,
        tree: &mut ElementTree,
        item: Promise<ItemHandle>,
    ) -> Promise<ElementId> {
        if let Some(handle) = item.value() {
            self.rendered.push(handle.index);
        }
        let element = tree.create(&[]);
        tree.set_content_size(element, self.item_size);
        if !self.deferred && item.is_ready() {
            return Promise::resolved(element);
        }
        let (promise, resolver) = Promise::new();
        self.pending.push(DeferredRender {
            item,
            element,
            resolver,
        });
        promise
    }

    fn render_header(
        &mut self,
        tree: &mut ElementTree,
        group: &GroupDescriptor,
    ) -> Promise<ElementId> {
        self.headers.push(group.key);
        let element = tree.create(&[]);
        tree.set_content_size(element, self.header_size);
        Promise::resolved(element)
    }
}

/// Records every plan and keeps it running until [`Self::finish`].
#[derive(Debug, Default)]
pub struct ManualAnimations {
    plans: Vec<AnimationPlan>,
    running: Vec<Resolver<()>>,
}

impl ManualAnimations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plans(&self) -> &[AnimationPlan] {
        &self.plans
    }

    pub fn is_running(&self) -> bool {
        self.running.iter().any(|r| !r.is_settled())
    }

    /// Completes every running plan.
    pub fn finish(&mut self) -> usize {
        self.running.drain(..).filter(|r| r.resolve(())).count()
    }
}

impl AnimationDriver for ManualAnimations {
    fn play(&mut self, _tree: &mut ElementTree, plan: &AnimationPlan) -> Promise<()> {
        self.plans.push(plan.clone());
        let (promise, resolver) = Promise::new();
        self.running.push(resolver);
        promise
    }

    fn finish_all(&mut self, _tree: &mut ElementTree) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouped_source_reports_groups_and_keys() {
        let source = VecSource::grouped(&[2, 3]);
        assert_eq!(source.item_count(), 5);
        assert_eq!(source.group_count(), Some(2));
        let g1 = source.group(1).unwrap();
        assert_eq!((g1.key, g1.first_item_index_hint, g1.size), (1, 2, 3));
        assert_eq!(source.key_at(2), Some(2));
        assert_eq!(VecSource::ungrouped(3).group_count(), None);
    }

    #[test]
    fn mutators_produce_batches() {
        let mut source = VecSource::grouped(&[2, 2]);
        let batch = source.insert_item(3);
        assert!(matches!(batch[0], Notification::BeginNotifications));
        assert!(matches!(
            batch[1],
            Notification::Inserted {
                target: Target::Item,
                index: 3,
                ..
            }
        ));
        assert!(matches!(
            batch[2],
            Notification::Changed {
                target: Target::Group,
                key: 1,
                size: Some(3),
                ..
            }
        ));
        assert!(matches!(batch.last(), Some(Notification::EndNotifications)));
        assert_eq!(source.item_count(), 5);

        let batch = source.remove_item(0);
        assert!(matches!(
            batch[1],
            Notification::Removed {
                target: Target::Item,
                key: 0,
                index: 0
            }
        ));
        assert_eq!(source.key_at(0), Some(1));
    }

    #[test]
    fn deferred_renders_wait_for_flush() {
        let mut tree = ElementTree::new();
        let mut source = VecSource::ungrouped(2);
        let mut renderer = StaticRenderer::new(Size::new(10, 10), Size::new(10, 5)).deferred();
        let p = renderer.render_item(&mut tree, source.item(1));
        assert!(p.is_pending());
        assert_eq!(renderer.rendered(), [1]);
        assert_eq!(renderer.flush(&mut tree), 1);
        let element = p.value().unwrap();
        assert_eq!(tree.content_size(element), Some(Size::new(10, 10)));
    }

    #[test]
    fn manual_animations_finish_on_demand() {
        let mut tree = ElementTree::new();
        let mut driver = ManualAnimations::new();
        let p = driver.play(&mut tree, &AnimationPlan::default());
        assert!(driver.is_running());
        assert_eq!(driver.finish(), 1);
        assert!(p.is_ready());
        assert_eq!(driver.plans().len(), 1);
    }
}
