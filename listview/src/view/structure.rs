//! The element skeleton under the surface: one node per group (header container plus items
//! container), items chunked into fixed-size blocks, blocks expanded into containers on demand.

use alloc::vec::Vec;

use crate::element::{ElementId, ElementTree, classes};
use crate::groups::{Group, GroupsContainer};
use crate::layout::ContainerLookup;
use crate::{ExpandedRange, GroupKey};

#[derive(Debug)]
pub(crate) struct Block {
    pub element: ElementId,
    pub len: usize,
    /// Empty while the block is collapsed.
    pub containers: Vec<ElementId>,
}

impl Block {
    fn is_expanded(&self) -> bool {
        !self.containers.is_empty()
    }
}

#[derive(Debug)]
pub(crate) struct GroupNode {
    pub key: GroupKey,
    pub element: ElementId,
    pub header_container: ElementId,
    pub items_container: ElementId,
    pub blocks: Vec<Block>,
}

impl GroupNode {
    fn create(tree: &mut ElementTree, key: GroupKey) -> Self {
        let element = tree.create(&[classes::GROUP]);
        let header_container = tree.create(&[classes::HEADER_CONTAINER]);
        let items_container = tree.create(&[classes::ITEMS_CONTAINER]);
        tree.append_child(element, header_container);
        tree.append_child(element, items_container);
        Self {
            key,
            element,
            header_container,
            items_container,
            blocks: Vec::new(),
        }
    }

    /// Adjusts the block list to hold `count` items. Expanded blocks keep one container per item.
    fn resize(&mut self, tree: &mut ElementTree, count: usize, block_size: usize) -> usize {
        let wanted = count.div_ceil(block_size);
        while self.blocks.len() > wanted {
            if let Some(block) = self.blocks.pop() {
                tree.remove(block.element);
            }
        }
        let mut created = 0;
        while self.blocks.len() < wanted {
            let element = tree.create(&[classes::BLOCK]);
            tree.append_child(self.items_container, element);
            self.blocks.push(Block {
                element,
                len: 0,
                containers: Vec::new(),
            });
            created += 1;
        }
        for (i, block) in self.blocks.iter_mut().enumerate() {
            block.len = (count - i * block_size).min(block_size);
            if block.is_expanded() {
                fill_containers(tree, block);
            }
        }
        created
    }
}

fn fill_containers(tree: &mut ElementTree, block: &mut Block) {
    while block.containers.len() > block.len {
        if let Some(container) = block.containers.pop() {
            tree.remove(container);
        }
    }
    while block.containers.len() < block.len {
        let container = tree.create(&[classes::CONTAINER]);
        tree.append_child(block.element, container);
        block.containers.push(container);
    }
}

#[derive(Debug)]
pub(crate) struct Structure {
    nodes: Vec<GroupNode>,
    block_size: usize,
}

impl Structure {
    pub fn new(block_size: usize) -> Self {
        Self {
            nodes: Vec::new(),
            block_size: block_size.max(1),
        }
    }

    pub fn nodes(&self) -> &[GroupNode] {
        &self.nodes
    }

    pub fn is_built(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// Removes every group node.
    pub fn clear(&mut self, tree: &mut ElementTree) {
        for node in self.nodes.drain(..) {
            tree.remove(node.element);
        }
    }

    /// Appends the node for `group`. Returns the number of blocks created.
    pub fn build_group(&mut self, tree: &mut ElementTree, surface: ElementId, group: &Group) -> usize {
        let mut node = GroupNode::create(tree, group.key);
        tree.append_child(surface, node.element);
        let blocks = node.resize(tree, group.count, self.block_size);
        self.nodes.push(node);
        blocks
    }

    /// Brings the nodes in line with `groups`: surviving keys keep their node (and expanded
    /// blocks), new keys get a node, vanished keys lose theirs.
    pub fn reconcile(&mut self, tree: &mut ElementTree, surface: ElementId, groups: &[Group]) {
        let mut old = core::mem::take(&mut self.nodes);
        for (pos, group) in groups.iter().enumerate() {
            let mut node = match old.iter().position(|n| n.key == group.key) {
                Some(i) => old.swap_remove(i),
                None => GroupNode::create(tree, group.key),
            };
            tree.insert_child(surface, pos, node.element);
            node.resize(tree, group.count, self.block_size);
            self.nodes.push(node);
        }
        for node in old {
            vtrace!(key = node.key, "group node removed");
            tree.remove(node.element);
        }
    }

    fn locate(&self, groups: &GroupsContainer, index: usize) -> Option<(usize, usize, usize)> {
        let g = groups.group_from_item(index)?;
        let local = index - groups.group(g)?.start_index;
        Some((g, local / self.block_size, local % self.block_size))
    }

    /// The live container of item `index`; `None` while its block is collapsed.
    pub fn container(&self, groups: &GroupsContainer, index: usize) -> Option<ElementId> {
        let (g, block, slot) = self.locate(groups, index)?;
        self.nodes
            .get(g)?
            .blocks
            .get(block)?
            .containers
            .get(slot)
            .copied()
    }

    pub fn header_container(&self, group: usize) -> Option<ElementId> {
        self.nodes.get(group).map(|n| n.header_container)
    }

    /// Widens `[first, last]` to whole blocks.
    pub fn block_span(&self, groups: &GroupsContainer, first: usize, last: usize) -> ExpandedRange {
        let bs = self.block_size;
        let begin = groups
            .group_from_item(first)
            .and_then(|g| groups.group(g))
            .map(|g| g.start_index + (first - g.start_index) / bs * bs)
            .unwrap_or(first);
        let end = groups
            .group_from_item(last)
            .and_then(|g| groups.group(g))
            .map(|g| g.start_index + ((last - g.start_index) / bs * bs + bs).min(g.count))
            .unwrap_or(last + 1);
        ExpandedRange::new(begin, end)
    }

    /// Creates containers for every block overlapping `range`. Returns how many blocks expanded.
    pub fn expand(&mut self, tree: &mut ElementTree, groups: &GroupsContainer, range: ExpandedRange) -> usize {
        let bs = self.block_size;
        let mut expanded = 0;
        for (node, group) in self.nodes.iter_mut().zip(groups.groups()) {
            if group.end_index() <= range.begin || group.start_index >= range.end {
                continue;
            }
            for (i, block) in node.blocks.iter_mut().enumerate() {
                let start = group.start_index + i * bs;
                let end = start + block.len;
                if end <= range.begin || start >= range.end || block.is_expanded() {
                    continue;
                }
                fill_containers(tree, block);
                expanded += 1;
            }
        }
        expanded
    }

    /// Collapses blocks entirely outside `range` that hold no item accepted by `occupied`.
    pub fn collapse_outside(
        &mut self,
        tree: &mut ElementTree,
        groups: &GroupsContainer,
        range: ExpandedRange,
        occupied: impl Fn(usize) -> bool,
    ) -> usize {
        let bs = self.block_size;
        let mut collapsed = 0;
        for (node, group) in self.nodes.iter_mut().zip(groups.groups()) {
            for (i, block) in node.blocks.iter_mut().enumerate() {
                let start = group.start_index + i * bs;
                let end = start + block.len;
                let outside = end <= range.begin || start >= range.end;
                if !outside || !block.is_expanded() || (start..end).any(&occupied) {
                    continue;
                }
                for container in block.containers.drain(..) {
                    tree.remove(container);
                }
                collapsed += 1;
            }
        }
        collapsed
    }

    /// Number of live containers.
    pub fn container_count(&self) -> usize {
        self.nodes
            .iter()
            .flat_map(|n| n.blocks.iter())
            .map(|b| b.containers.len())
            .sum()
    }

    pub fn block_count(&self) -> usize {
        self.nodes.iter().map(|n| n.blocks.len()).sum()
    }
}

/// Adapts the skeleton to the layout apply passes.
pub(crate) struct Containers<'a> {
    pub structure: &'a Structure,
    pub groups: &'a GroupsContainer,
}

impl ContainerLookup for Containers<'_> {
    fn item_container(&self, index: usize) -> Option<ElementId> {
        self.structure.container(self.groups, index)
    }

    fn header_container(&self, group: usize) -> Option<ElementId> {
        self.structure.header_container(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::VecSource;

    fn setup(sizes: &[usize], block_size: usize) -> (ElementTree, ElementId, GroupsContainer, Structure) {
        let mut tree = ElementTree::new();
        let surface = tree.create(&[classes::SURFACE]);
        let mut groups = GroupsContainer::new();
        groups.rebuild(&VecSource::grouped(sizes));
        let mut structure = Structure::new(block_size);
        for group in groups.groups() {
            structure.build_group(&mut tree, surface, group);
        }
        (tree, surface, groups, structure)
    }

    #[test]
    fn blocks_chunk_each_group() {
        let (tree, surface, _groups, structure) = setup(&[25, 3], 10);
        assert_eq!(structure.block_count(), 4);
        assert_eq!(structure.container_count(), 0);
        let lens: Vec<_> = structure.nodes()[0].blocks.iter().map(|b| b.len).collect();
        assert_eq!(lens, [10, 10, 5]);
        assert_eq!(tree.children(surface).len(), 2);
    }

    #[test]
    fn expansion_creates_containers_for_whole_blocks() {
        let (mut tree, _surface, groups, mut structure) = setup(&[25, 3], 10);
        let span = structure.block_span(&groups, 12, 26);
        assert_eq!(span, ExpandedRange::new(10, 28));
        assert_eq!(structure.expand(&mut tree, &groups, span), 3);
        assert_eq!(structure.container_count(), 18);
        assert!(structure.container(&groups, 9).is_none());
        let c = structure.container(&groups, 26).unwrap();
        assert!(tree.has_class(c, classes::CONTAINER));

        let collapsed =
            structure.collapse_outside(&mut tree, &groups, ExpandedRange::new(25, 28), |i| i == 12);
        assert_eq!(collapsed, 1, "block holding a realized item survives");
        assert!(structure.container(&groups, 12).is_some());
        assert!(structure.container(&groups, 20).is_none());
    }

    #[test]
    fn reconcile_keeps_surviving_nodes() {
        let (mut tree, surface, mut groups, mut structure) = setup(&[5, 5, 5], 10);
        let second = structure.nodes()[1].element;
        let mut source = VecSource::grouped(&[5, 5, 5]);
        source.remove_group(0);
        source.resize_group(1, 12);
        groups.rebuild(&source);
        structure.reconcile(&mut tree, surface, groups.groups());
        assert_eq!(structure.nodes().len(), 2);
        assert_eq!(structure.nodes()[0].element, second);
        assert_eq!(structure.nodes()[1].blocks.len(), 2);
        assert_eq!(tree.children(surface), [second, structure.nodes()[1].element]);
    }
}
