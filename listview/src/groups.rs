//! The ordered group sequence.
//!
//! Groups are kept in ascending `start_index` (and, once laid out, ascending `offset`) order with
//! `start_index[i + 1] == start_index[i] + count[i]`. Lookups binary search over that order, so
//! every mutation restores it before returning.

use alloc::vec::Vec;

use crate::element::ElementId;
use crate::promise::Promise;
use crate::source::{DataSource, Notification, Target, UserData};
use crate::version::VersionManager;
use crate::GroupKey;

/// Lifecycle of one group entry: `Inserted → Changed* → (removed)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GroupState {
    Inserted,
    Changed,
}

#[derive(Clone, Debug)]
pub struct Group {
    pub key: GroupKey,
    pub start_index: usize,
    pub count: usize,
    /// Position along the layout axis, written by the layout pass.
    pub offset: u64,
    pub header: Option<ElementId>,
    pub data: UserData,
    pub state: GroupState,
}

impl Group {
    pub fn new(key: GroupKey, count: usize, data: UserData) -> Self {
        Self {
            key,
            start_index: 0,
            count,
            offset: 0,
            header: None,
            data,
            state: GroupState::Inserted,
        }
    }

    /// One past the last item of the group.
    pub fn end_index(&self) -> usize {
        self.start_index + self.count
    }

    pub fn contains_item(&self, index: usize) -> bool {
        index >= self.start_index && index < self.end_index()
    }
}

/// Key of the implicit group used when the data source is not grouped.
pub const UNGROUPED_KEY: GroupKey = 0;

#[derive(Debug, Default)]
pub struct GroupsContainer {
    groups: Vec<Group>,
    ungrouped: bool,
    dirty: bool,
    needs_reload: bool,
    removed: Vec<Group>,
}

impl GroupsContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, index: usize) -> Option<&Group> {
        self.groups.get(index)
    }

    pub fn group_mut(&mut self, index: usize) -> Option<&mut Group> {
        self.groups.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn is_ungrouped(&self) -> bool {
        self.ungrouped
    }

    /// Whether the sequence changed since the last layout pass consumed it.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns and clears the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        core::mem::take(&mut self.dirty)
    }

    /// Total number of items across every group.
    pub fn item_count(&self) -> usize {
        self.groups.last().map(Group::end_index).unwrap_or(0)
    }

    pub fn group_index_from_key(&self, key: GroupKey) -> Option<usize> {
        self.groups.iter().position(|g| g.key == key)
    }

    /// Finds the last group for which `comp` is false.
    ///
    /// `comp(group)` answers "is the target before this group" and must be monotone over the
    /// sequence. Returns `None` only when there are no groups; a target before the first group
    /// clamps to group 0.
    pub fn group_from_impl(&self, comp: impl Fn(&Group) -> bool) -> Option<usize> {
        let last = self.groups.len().checked_sub(1)?;
        if !comp(&self.groups[last]) {
            return Some(last);
        }
        let (mut lo, mut hi) = (0, last);
        while hi - lo > 1 {
            let center = lo + (hi - lo) / 2;
            if comp(&self.groups[center]) {
                hi = center;
            } else {
                lo = center;
            }
        }
        Some(lo)
    }

    pub fn group_from_item(&self, index: usize) -> Option<usize> {
        self.group_from_impl(|g| index < g.start_index)
    }

    pub fn group_from_offset(&self, offset: u64) -> Option<usize> {
        self.group_from_impl(|g| offset < g.offset)
    }

    pub fn set_offset(&mut self, index: usize, offset: u64) {
        if let Some(g) = self.groups.get_mut(index) {
            g.offset = offset;
        }
    }

    /// Writes the offsets of a completed layout pass, in group order.
    pub fn set_offsets(&mut self, offsets: impl IntoIterator<Item = u64>) {
        for (group, offset) in self.groups.iter_mut().zip(offsets) {
            group.offset = offset;
        }
        debug_assert!(
            self.groups.windows(2).all(|w| w[0].offset <= w[1].offset),
            "group offsets must stay ascending"
        );
    }

    pub fn set_header(&mut self, index: usize, header: Option<ElementId>) -> Option<ElementId> {
        self.groups
            .get_mut(index)
            .and_then(|g| core::mem::replace(&mut g.header, header))
    }

    /// Drops every group. Returns the header elements the caller must detach.
    pub fn reset_groups(&mut self) -> Vec<ElementId> {
        self.dirty = true;
        let mut headers: Vec<ElementId> = self.groups.drain(..).filter_map(|g| g.header).collect();
        headers.extend(self.removed.drain(..).filter_map(|g| g.header));
        headers
    }

    /// Groups removed since the last call, with their headers still set.
    pub fn take_removed(&mut self) -> Vec<Group> {
        core::mem::take(&mut self.removed)
    }

    /// Re-reads the whole sequence from `source`.
    ///
    /// Groups whose key survives keep their identity (header element and last offset); the others
    /// move to the removed list.
    pub fn rebuild(&mut self, source: &dyn DataSource) {
        let mut previous = core::mem::take(&mut self.groups);
        let next: Vec<Group> = match source.group_count() {
            None => {
                self.ungrouped = true;
                let count = source.item_count();
                if count == 0 {
                    Vec::new()
                } else {
                    alloc::vec![Group::new(UNGROUPED_KEY, count, UserData::none())]
                }
            }
            Some(n) => {
                self.ungrouped = false;
                (0..n)
                    .filter_map(|i| source.group(i))
                    .map(|d| Group::new(d.key, d.size, d.data))
                    .collect()
            }
        };

        self.groups = next
            .into_iter()
            .map(|mut group| {
                if let Some(pos) = previous.iter().position(|p| p.key == group.key) {
                    let old = previous.swap_remove(pos);
                    group.header = old.header;
                    group.offset = old.offset;
                    group.state = if old.count != group.count {
                        GroupState::Changed
                    } else {
                        old.state
                    };
                }
                group
            })
            .collect();
        self.removed.extend(previous);
        self.needs_reload = false;
        self.dirty = true;
        self.recompute_start_indices();
        vdebug!(
            groups = self.groups.len(),
            items = self.item_count(),
            ungrouped = self.ungrouped,
            "groups rebuilt"
        );
    }

    /// Reconciles the sequence with `source` inside a notification scope.
    ///
    /// The returned promise resolves once no more notifications are outstanding; while an outer
    /// notification batch is open it stays pending until that batch ends.
    pub fn synchronize_groups(
        &mut self,
        versions: &mut VersionManager,
        source: &dyn DataSource,
    ) -> Promise<()> {
        versions.begin_notifications();
        if self.needs_reload || self.dirty || !self.matches(source) {
            self.rebuild(source);
        }
        versions.end_notifications();
        versions.unlocked()
    }

    fn matches(&self, source: &dyn DataSource) -> bool {
        match source.group_count() {
            None => self.ungrouped && self.item_count() == source.item_count(),
            Some(n) => {
                !self.ungrouped
                    && n == self.groups.len()
                    && self.groups.iter().enumerate().all(|(i, g)| {
                        source
                            .group(i)
                            .is_some_and(|d| d.key == g.key && d.size == g.count)
                    })
            }
        }
    }

    /// Applies one data-source notification incrementally.
    ///
    /// Returns whether the sequence changed. Layout is never run from here; the container is
    /// only marked dirty.
    pub fn notify(&mut self, notification: &Notification) -> bool {
        let changed = match notification {
            Notification::BeginNotifications | Notification::EndNotifications => false,
            Notification::Reload => {
                self.needs_reload = true;
                true
            }
            Notification::Inserted {
                target: Target::Group,
                key,
                index,
                previous,
                next,
                size,
                data,
            } => {
                let at = self.splice_position(*previous, *next, *index);
                self.groups.insert(at, Group::new(*key, *size, data.clone()));
                true
            }
            Notification::Removed {
                target: Target::Group,
                key,
                index,
            } => match self.find(*key, *index) {
                Some(pos) => {
                    let group = self.groups.remove(pos);
                    self.removed.push(group);
                    true
                }
                None => false,
            },
            Notification::Moved {
                target: Target::Group,
                key,
                old_index,
                new_index,
                previous,
                next,
            } => match self.find(*key, *old_index) {
                Some(pos) => {
                    let group = self.groups.remove(pos);
                    let at = self.splice_position(*previous, *next, *new_index);
                    self.groups.insert(at, group);
                    true
                }
                None => false,
            },
            Notification::Changed {
                target: Target::Group,
                key,
                index,
                size,
                data,
            } => match self.find(*key, *index) {
                Some(pos) => {
                    let group = &mut self.groups[pos];
                    group.state = GroupState::Changed;
                    group.data = data.clone();
                    if let Some(size) = size {
                        group.count = *size;
                    }
                    true
                }
                None => false,
            },
            Notification::CountChanged {
                target: Target::Group,
                new_count,
                ..
            } => {
                if *new_count != self.groups.len() {
                    self.needs_reload = true;
                }
                true
            }
            Notification::IndexChanged {
                target: Target::Group,
                ..
            } => true,

            Notification::Inserted {
                target: Target::Item,
                index,
                ..
            } => self.adjust_item_insert(*index),
            Notification::Removed {
                target: Target::Item,
                index,
                ..
            } => self.adjust_item_remove(*index),
            Notification::Moved {
                target: Target::Item,
                old_index,
                new_index,
                ..
            } => {
                let removed = self.adjust_item_remove(*old_index);
                let inserted = self.adjust_item_insert(*new_index);
                removed || inserted
            }
            Notification::CountChanged {
                target: Target::Item,
                new_count,
                ..
            } => {
                if self.ungrouped {
                    self.set_ungrouped_count(*new_count);
                } else if *new_count != self.item_count() {
                    self.needs_reload = true;
                }
                true
            }
            Notification::Changed {
                target: Target::Item,
                ..
            }
            | Notification::IndexChanged {
                target: Target::Item,
                ..
            } => false,
        };
        if changed {
            self.dirty = true;
            self.recompute_start_indices();
        }
        changed
    }

    /// Whether a notification asked for a full re-read of the source.
    pub fn needs_reload(&self) -> bool {
        self.needs_reload
    }

    fn find(&self, key: GroupKey, index_hint: usize) -> Option<usize> {
        if self.groups.get(index_hint).is_some_and(|g| g.key == key) {
            return Some(index_hint);
        }
        self.group_index_from_key(key)
    }

    fn splice_position(&self, previous: Option<u64>, next: Option<u64>, hint: usize) -> usize {
        if let Some(pos) = previous.and_then(|k| self.group_index_from_key(k)) {
            return pos + 1;
        }
        if let Some(pos) = next.and_then(|k| self.group_index_from_key(k)) {
            return pos;
        }
        hint.min(self.groups.len())
    }

    // Grouped sources report absolute group sizes through group notifications, so item-level
    // notifications only adjust the implicit group.
    fn adjust_item_insert(&mut self, index: usize) -> bool {
        if !self.ungrouped {
            return true;
        }
        match self.groups.first_mut() {
            Some(group) => {
                debug_assert!(index <= group.count);
                group.count += 1;
            }
            None => self
                .groups
                .push(Group::new(UNGROUPED_KEY, 1, UserData::none())),
        }
        true
    }

    fn adjust_item_remove(&mut self, index: usize) -> bool {
        if !self.ungrouped {
            return true;
        }
        let Some(group) = self.groups.first_mut() else {
            return false;
        };
        if !group.contains_item(index) {
            vwarn!(index, "item removal outside the item range");
            return false;
        }
        group.count -= 1;
        if group.count == 0 {
            let group = self.groups.remove(0);
            self.removed.push(group);
        }
        true
    }

    fn set_ungrouped_count(&mut self, count: usize) {
        match (self.groups.first_mut(), count) {
            (Some(_), 0) => {
                let group = self.groups.remove(0);
                self.removed.push(group);
            }
            (Some(group), n) => group.count = n,
            (None, 0) => {}
            (None, n) => self
                .groups
                .push(Group::new(UNGROUPED_KEY, n, UserData::none())),
        }
    }

    fn recompute_start_indices(&mut self) {
        let mut start = 0;
        for group in &mut self.groups {
            group.start_index = start;
            start += group.count;
        }
    }
}
