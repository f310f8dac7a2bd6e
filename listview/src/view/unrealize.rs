use alloc::vec::Vec;
use core::cmp::Reverse;

use super::{ContentsView, Task, ViewEvent, ViewState};
use crate::ExpandedRange;
use crate::scheduler::{JobInfo, JobStep, Priority};
use crate::source::{AnimationDriver, DataSource, Renderer};

/// How far `index` lies outside `range`.
fn distance(range: ExpandedRange, index: usize) -> usize {
    if index < range.begin {
        range.begin - index
    } else {
        index + 1 - range.end
    }
}

/// Realized indexes outside `range` that exceed the `slack` nearest ones, furthest first.
pub(super) fn eviction_order(
    realized: impl IntoIterator<Item = usize>,
    range: ExpandedRange,
    slack: usize,
) -> Vec<usize> {
    let mut outside: Vec<usize> = realized
        .into_iter()
        .filter(|&i| !range.contains(i))
        .collect();
    if outside.len() <= slack {
        return Vec::new();
    }
    outside.sort_by_key(|&i| Reverse(distance(range, i)));
    outside.truncate(outside.len() - slack);
    outside
}

impl<S: DataSource, R: Renderer, A: AnimationDriver> ContentsView<S, R, A> {
    pub(super) fn begin_unrealize(&mut self) {
        self.scheduler
            .cancel_where(|t| matches!(t, Task::Unrealize { .. }));
        let evict = eviction_order(
            self.items.indexes(),
            self.expanded,
            self.options.max_deferred_item_cleanup,
        );
        vdebug!(evict = evict.len(), realized = self.items.count(), "unrealize");
        self.transition(ViewState::Unrealizing);
        self.scheduler
            .schedule(Task::Unrealize { evict, pos: 0 }, Priority::Idle, "unrealize");
    }

    pub(super) fn run_unrealize(
        &mut self,
        evict: &[usize],
        pos: &mut usize,
        info: &mut JobInfo,
    ) -> JobStep {
        while *pos < evict.len() {
            let index = evict[*pos];
            *pos += 1;
            if let Some(record) = self.items.remove_item(index) {
                self.tree.remove(record.item_box.unwrap_or(record.element));
                info.consume(1);
            }
            if info.should_yield() && *pos < evict.len() {
                return JobStep::Yield;
            }
        }
        let items = &self.items;
        let _collapsed = self.structure.collapse_outside(
            &mut self.tree,
            &self.groups,
            self.expanded,
            |i| items.is_realized(i),
        );
        vtrace!(collapsed = _collapsed, "blocks collapsed");
        JobStep::Complete
    }

    /// Completes the view once eviction finished and no render is outstanding.
    pub(super) fn advance_unrealize(&mut self) {
        if self.state != ViewState::Unrealizing
            || self
                .scheduler
                .tasks()
                .any(|t| matches!(t, Task::Unrealize { .. }))
            || !self.renders.is_empty()
        {
            return;
        }
        self.transition(ViewState::Completed);
        self.events.push(ViewEvent::ViewComplete);
        self.aria_due = Some(self.now_ms + self.options.aria_delay_ms);
        vdebug!(realized = self.items.count(), "view complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_furthest_beyond_slack() {
        let range = ExpandedRange::new(10, 20);
        let realized = [0, 5, 9, 12, 15, 20, 28];
        assert_eq!(eviction_order(realized, range, 2), [0, 28, 5]);
        assert!(eviction_order(realized, range, 5).is_empty());
        assert_eq!(eviction_order(realized, range, 0).len(), 5);
    }
}
