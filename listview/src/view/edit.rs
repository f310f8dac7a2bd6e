//! Structural edits: renumbering realized items, capturing pre-edit positions and playing the
//! removal / move / entrance choreography once the new onscreen items are realized.

use alloc::vec::Vec;

use super::{ContentsView, ViewState};
use crate::Bounds;
use crate::element::ElementId;
use crate::items::ItemRecord;
use crate::key::KeyMap;
use crate::promise::Promise;
use crate::source::{
    AnimationDriver, AnimationPlan, AnimationTarget, DataSource, Notification, Renderer, Target,
};

/// Positions of realized items before an edit, plus the elements the edit removed.
#[derive(Debug, Default)]
pub(super) struct EditCapture {
    pub previous: KeyMap<Bounds>,
    pub removed: Vec<ElementId>,
}

#[derive(Debug)]
pub(super) struct RunningAnimation {
    pub promise: Promise<()>,
    pub plan: AnimationPlan,
}

/// How a notification renumbers realized items.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Remap {
    Insert { at: usize, count: usize },
    Remove { at: usize, count: usize },
    Move { from: usize, to: usize },
    Evict(usize),
    Truncate(usize),
    EvictAll,
}

impl Remap {
    pub fn apply(self, index: usize) -> Option<usize> {
        match self {
            Self::Insert { at, count } => Some(if index >= at { index + count } else { index }),
            Self::Remove { at, count } => {
                if index < at {
                    Some(index)
                } else if index < at + count {
                    None
                } else {
                    Some(index - count)
                }
            }
            Self::Move { from, to } => Some(if index == from {
                to
            } else if from < to && index > from && index <= to {
                index - 1
            } else if to < from && index >= to && index < from {
                index + 1
            } else {
                index
            }),
            Self::Evict(at) => (index != at).then_some(index),
            Self::Truncate(len) => (index < len).then_some(index),
            Self::EvictAll => None,
        }
    }
}

impl<S: DataSource, R: Renderer, A: AnimationDriver> ContentsView<S, R, A> {
    /// Applies the data side of a notification: version, groups and realized records.
    pub(super) fn apply_structural(&mut self, notification: &Notification) {
        if notification.is_structural() {
            self.versions.received_notification();
        }
        let before = self.remap_before(notification);
        self.groups.notify(notification);
        let remap = before.or_else(|| self.remap_after(notification));
        let Some(remap) = remap else {
            return;
        };
        let evicted = self.items.remap(|i| remap.apply(i));
        vtrace!(?remap, evicted = evicted.len(), "items renumbered");
        for record in evicted {
            self.retire(record);
        }
    }

    fn remap_before(&self, notification: &Notification) -> Option<Remap> {
        match *notification {
            Notification::Inserted {
                target: Target::Item,
                index,
                ..
            } => Some(Remap::Insert { at: index, count: 1 }),
            Notification::Removed {
                target: Target::Item,
                index,
                ..
            } => Some(Remap::Remove { at: index, count: 1 }),
            Notification::Moved {
                target: Target::Item,
                old_index,
                new_index,
                ..
            } => Some(Remap::Move {
                from: old_index,
                to: new_index,
            }),
            Notification::Changed {
                target: Target::Item,
                index,
                ..
            } => Some(Remap::Evict(index)),
            Notification::CountChanged {
                target: Target::Item,
                new_count,
                ..
            } => Some(Remap::Truncate(new_count)),
            Notification::Removed {
                target: Target::Group,
                key,
                ..
            } => {
                let group = self
                    .groups
                    .group_index_from_key(key)
                    .and_then(|g| self.groups.group(g))?;
                (group.count > 0).then_some(Remap::Remove {
                    at: group.start_index,
                    count: group.count,
                })
            }
            Notification::Moved {
                target: Target::Group,
                ..
            }
            | Notification::CountChanged {
                target: Target::Group,
                ..
            }
            | Notification::Reload => Some(Remap::EvictAll),
            _ => None,
        }
    }

    fn remap_after(&self, notification: &Notification) -> Option<Remap> {
        let Notification::Inserted {
            target: Target::Group,
            key,
            ..
        } = *notification
        else {
            return None;
        };
        let group = self
            .groups
            .group_index_from_key(key)
            .and_then(|g| self.groups.group(g))?;
        (group.count > 0).then_some(Remap::Insert {
            at: group.start_index,
            count: group.count,
        })
    }

    /// Records where every realized item sits so the edit can animate from there.
    pub(super) fn capture_edit(&mut self) {
        if !self.options.animations_enabled
            || self.edit.is_some()
            || !self.laid_out
            || !self.state.shows_content()
        {
            return;
        }
        let mut previous = KeyMap::default();
        for (_, record) in self.items.iter() {
            let bounds = record.container.and_then(|c| self.tree.bounds(c));
            if let (Some(item), Some(bounds)) = (record.item.as_ref(), bounds) {
                previous.insert(item.key, bounds);
            }
        }
        self.edit = Some(EditCapture {
            previous,
            removed: Vec::new(),
        });
    }

    /// Takes an evicted record off the skeleton. While an edit is captured the element stays on
    /// the surface at its last position until the removal animation finishes.
    pub(super) fn retire(&mut self, record: ItemRecord) {
        let node = record.item_box.unwrap_or(record.element);
        if !self.tree.contains(node) {
            return;
        }
        match self.edit.as_mut() {
            Some(edit) => {
                let bounds = record.container.and_then(|c| self.tree.bounds(c));
                self.tree.append_child(self.surface, node);
                if let Some(bounds) = bounds {
                    self.tree.set_bounds(node, bounds);
                }
                edit.removed.push(node);
            }
            None => self.tree.remove(node),
        }
    }

    /// Drops a captured edit without animating it.
    pub(super) fn discard_edit(&mut self) {
        if let Some(edit) = self.edit.take() {
            for element in edit.removed {
                self.tree.remove(element);
            }
        }
    }

    /// Plans the choreography for the captured edit against the onscreen items and starts it.
    ///
    /// Returns `false` when there is nothing to animate.
    pub(super) fn start_animation(&mut self) -> bool {
        let Some(edit) = self.edit.take() else {
            return false;
        };
        let mut plan = AnimationPlan {
            removals: edit
                .removed
                .iter()
                .map(|&element| AnimationTarget::Removal { element })
                .collect(),
            ..AnimationPlan::default()
        };
        if let Some(visible) = self.visible {
            for index in visible.first..=visible.last {
                let Some(record) = self.items.record_at(index) else {
                    continue;
                };
                let Some(item) = record.item.as_ref() else {
                    continue;
                };
                let element = record.item_box.unwrap_or(record.element);
                let Some(to) = record.container.and_then(|c| self.tree.bounds(c)) else {
                    continue;
                };
                match edit.previous.get(&item.key) {
                    Some(&from) if from != to => {
                        let dx = from.x as i64 - to.x as i64;
                        let dy = from.y as i64 - to.y as i64;
                        self.tree.set_translation(element, dx, dy);
                        plan.moves.push(AnimationTarget::Move { element, from, to });
                    }
                    Some(_) => {}
                    None => {
                        self.tree.set_opacity(element, 0.0);
                        plan.entrances.push(AnimationTarget::Entrance { element });
                    }
                }
            }
        }
        if plan.is_empty() {
            return false;
        }
        vdebug!(
            removals = plan.removals.len(),
            moves = plan.moves.len(),
            entrances = plan.entrances.len(),
            "edit animation"
        );
        let promise = self.animations.play(&mut self.tree, &plan);
        self.animation = Some(RunningAnimation { promise, plan });
        self.transition(ViewState::RealizingAnimating);
        true
    }

    fn settle_targets(&mut self, plan: &AnimationPlan) {
        for target in plan.targets() {
            match *target {
                AnimationTarget::Removal { element } => self.tree.remove(element),
                AnimationTarget::Move { element, .. } => self.tree.set_translation(element, 0, 0),
                AnimationTarget::Entrance { element } => self.tree.set_opacity(element, 1.0),
            }
        }
    }

    /// Jumps a running animation to its end state.
    pub(super) fn settle_animation(&mut self) {
        if let Some(animation) = self.animation.take() {
            self.animations.finish_all(&mut self.tree);
            self.settle_targets(&animation.plan);
        }
    }

    /// Finishes the animation once its promise settled, then replays the notifications that
    /// arrived meanwhile.
    pub(super) fn poll_animation(&mut self) {
        let Some(animation) = self.animation.as_ref() else {
            return;
        };
        if animation.promise.is_pending() {
            return;
        }
        let Some(animation) = self.animation.take() else {
            return;
        };
        self.settle_targets(&animation.plan);
        vdebug!(buffered = self.buffered.len(), "edit animation finished");
        let next = if self.scroll.is_scrolling() {
            ViewState::Scrolling
        } else {
            ViewState::Realizing
        };
        self.transition(next);

        let buffered = core::mem::take(&mut self.buffered);
        if !buffered.is_empty() {
            self.versions.begin_notifications();
            for notification in buffered {
                self.apply_edit(notification);
            }
            self.versions.end_notifications();
            self.settle_edit();
        } else if core::mem::take(&mut self.scroll_pending) {
            self.start_realize_pass(ViewState::Scrolling);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remap_shifts_around_edits() {
        let insert = Remap::Insert { at: 2, count: 3 };
        assert_eq!(insert.apply(1), Some(1));
        assert_eq!(insert.apply(2), Some(5));

        let remove = Remap::Remove { at: 2, count: 2 };
        assert_eq!(remove.apply(3), None);
        assert_eq!(remove.apply(4), Some(2));

        let forward = Remap::Move { from: 1, to: 4 };
        let moved: Vec<_> = (0..6).map(|i| forward.apply(i).unwrap()).collect();
        assert_eq!(moved, [0, 4, 1, 2, 3, 5]);
        let backward = Remap::Move { from: 4, to: 1 };
        let moved: Vec<_> = (0..6).map(|i| backward.apply(i).unwrap()).collect();
        assert_eq!(moved, [0, 2, 3, 4, 1, 5]);

        assert_eq!(Remap::Evict(3).apply(3), None);
        assert_eq!(Remap::Truncate(3).apply(2), Some(2));
        assert_eq!(Remap::EvictAll.apply(0), None);
    }
}
