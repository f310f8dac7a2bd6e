//! Accessibility attributes: roles, set size and position, stable ids and a reading-order
//! `aria-flowto` chain through realized headers and items.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use super::ContentsView;
use crate::element::ElementId;
use crate::scheduler::{JobInfo, JobStep};
use crate::source::{AnimationDriver, DataSource, Renderer};
use crate::{GroupKey, ItemKey};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AriaNode {
    Header {
        element: ElementId,
        key: GroupKey,
    },
    Item {
        element: ElementId,
        index: usize,
        key: ItemKey,
    },
}

/// Reading order snapshot and progress of one ARIA pass.
#[derive(Debug)]
pub(super) struct AriaCursor {
    nodes: Vec<AriaNode>,
    pos: usize,
}

impl<S: DataSource, R: Renderer, A: AnimationDriver> ContentsView<S, R, A> {
    /// Snapshots the reading order: each group's header, then its realized items.
    pub(super) fn aria_cursor(&self) -> AriaCursor {
        let items: Vec<(usize, ElementId, ItemKey)> = self
            .items
            .iter()
            .filter(|(_, r)| !r.detached)
            .map(|(i, r)| (i, r.element, r.item.as_ref().map_or(i as u64, |h| h.key)))
            .collect();
        let mut nodes = Vec::with_capacity(items.len() + self.groups.len());
        for group in self.groups.groups() {
            if let Some(element) = group.header {
                nodes.push(AriaNode::Header {
                    element,
                    key: group.key,
                });
            }
            let from = items.partition_point(|(i, ..)| *i < group.start_index);
            let to = items.partition_point(|(i, ..)| *i < group.end_index());
            nodes.extend(
                items[from..to]
                    .iter()
                    .map(|&(index, element, key)| AriaNode::Item {
                        element,
                        index,
                        key,
                    }),
            );
        }
        AriaCursor { nodes, pos: 0 }
    }

    fn aria_id(&self, node: AriaNode) -> String {
        match node {
            AriaNode::Header { key, .. } => format!("lv{}-h{}", self.instance, key),
            AriaNode::Item { key, .. } => format!("lv{}-i{}", self.instance, key),
        }
    }

    pub(super) fn run_aria(&mut self, cursor: &mut AriaCursor, info: &mut JobInfo) -> JobStep {
        let total = self.groups.item_count();
        while cursor.pos < cursor.nodes.len() {
            let node = cursor.nodes[cursor.pos];
            let next = cursor.nodes.get(cursor.pos + 1).map(|&n| self.aria_id(n));
            let id = self.aria_id(node);
            cursor.pos += 1;

            let element = match node {
                AriaNode::Header { element, .. } | AriaNode::Item { element, .. } => element,
            };
            if !self.tree.contains(element) {
                continue;
            }
            match node {
                AriaNode::Header { .. } => self.tree.set_attribute(element, "role", "heading"),
                AriaNode::Item { index, .. } => {
                    self.tree
                        .set_attribute(element, "role", self.options.item_role.as_str());
                    self.tree
                        .set_attribute(element, "aria-setsize", format!("{total}"));
                    self.tree
                        .set_attribute(element, "aria-posinset", format!("{}", index + 1));
                }
            }
            self.tree.set_attribute(element, "id", id);
            match next {
                Some(next) => self.tree.set_attribute(element, "aria-flowto", next),
                None => self.tree.remove_attribute(element, "aria-flowto"),
            }
            info.consume(1);
            if info.should_yield() && cursor.pos < cursor.nodes.len() {
                return JobStep::Yield;
            }
        }
        vdebug!(nodes = cursor.nodes.len(), "aria pass complete");
        JobStep::Complete
    }
}
