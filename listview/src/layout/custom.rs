//! Host-defined layouts.
//!
//! A [`CustomLayout`] only has to produce bounds for every item and header. The adapter caches
//! that geometry and answers the remaining [`Layout`] queries from it unless the custom layout
//! provides its own answer.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use super::{
    Layout, LayoutContext, LayoutProgress, adjacent_header, allocate_class, insert_after,
    release_class, snapshot, write_common_rules,
};
use crate::scheduler::JobInfo;
use crate::style::StyleRegistry;
use crate::{
    Adjacent, Bounds, Direction, GroupKey, HitTestResult, ItemRange, ItemTarget, Orientation,
    Point, Result, Size, TargetKind,
};

/// What a custom layout sees of a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupSummary {
    pub key: GroupKey,
    pub start_index: usize,
    pub count: usize,
}

/// Geometry produced by [`CustomLayout::layout`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CustomLayoutGeometry {
    /// Bounds of every item, by item index.
    pub item_bounds: Vec<Bounds>,
    /// Bounds of every group header, by group index. `None` hides the header.
    pub header_bounds: Vec<Option<Bounds>>,
    /// Content size along the scroll axis.
    pub extent: u64,
}

/// A layout supplied by the host.
///
/// The query methods are optional: returning `None` makes the adapter derive the answer from the
/// cached geometry.
pub trait CustomLayout: fmt::Debug {
    fn orientation(&self) -> Orientation;

    fn initialize(&mut self) {}

    fn uninitialize(&mut self) {}

    fn layout(&mut self, groups: &[GroupSummary], viewport: Size) -> Result<CustomLayoutGeometry>;

    /// Items intersecting `[first_offset, last_offset]`. An empty range means no items.
    fn items_from_range(&self, _first_offset: u64, _last_offset: u64) -> Option<ItemRange> {
        None
    }

    fn get_adjacent(&self, _current: ItemTarget, _direction: Direction) -> Option<Adjacent> {
        None
    }

    fn hit_test(&self, _point: Point) -> Option<HitTestResult> {
        None
    }

    fn drag_over(&mut self, _point: Point) -> Option<HitTestResult> {
        None
    }
}

/// Runs a [`CustomLayout`] behind the [`Layout`] protocol.
pub struct CustomLayoutAdapter<L> {
    inner: L,
    class: Option<String>,
    groups: Vec<GroupSummary>,
    geometry: Option<CustomLayoutGeometry>,
    snapshot: Vec<(usize, usize)>,
    viewport: Size,
    drag: Option<HitTestResult>,
}

impl<L: CustomLayout> CustomLayoutAdapter<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            class: None,
            groups: Vec::new(),
            geometry: None,
            snapshot: Vec::new(),
            viewport: Size::default(),
            drag: None,
        }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut L {
        &mut self.inner
    }

    pub fn drag_target(&self) -> Option<HitTestResult> {
        self.drag
    }

    fn item_count(&self) -> usize {
        self.groups.last().map_or(0, |g| g.start_index + g.count)
    }

    fn fallback_range(&self, first_offset: u64, last_offset: u64) -> Option<ItemRange> {
        let orientation = self.inner.orientation();
        let geometry = self.geometry.as_ref()?;
        let mut hits = geometry.item_bounds.iter().enumerate().filter(|(_, b)| {
            b.main_end(orientation) > first_offset && b.main_start(orientation) <= last_offset
        });
        let first = hits.next()?.0;
        let last = hits.last().map_or(first, |(i, _)| i);
        Some(ItemRange::new(first, last))
    }

    fn fallback_hit_test(&self, point: Point) -> HitTestResult {
        let Some(geometry) = &self.geometry else {
            return HitTestResult::default();
        };
        let orientation = self.inner.orientation();
        let (main, _) = orientation.split(point);
        if let Some((index, bounds)) = geometry
            .item_bounds
            .iter()
            .enumerate()
            .find(|(_, b)| b.contains(point))
        {
            let size = orientation.main(Size::new(bounds.width, bounds.height));
            return HitTestResult {
                index: Some(index),
                insert_after_index: insert_after(index, main, bounds.main_start(orientation), size),
            };
        }
        let before = geometry
            .item_bounds
            .iter()
            .rposition(|b| b.main_start(orientation) <= main);
        HitTestResult {
            index: None,
            insert_after_index: before,
        }
    }

    fn group_of(&self, index: usize) -> Option<&GroupSummary> {
        let pos = self
            .groups
            .partition_point(|g| g.start_index <= index)
            .checked_sub(1)?;
        let group = &self.groups[pos];
        (index < group.start_index + group.count).then_some(group)
    }
}

impl<L: CustomLayout> fmt::Debug for CustomLayoutAdapter<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomLayoutAdapter")
            .field("inner", &self.inner)
            .field("class", &self.class)
            .field("groups", &self.groups.len())
            .field("ready", &self.geometry.is_some())
            .finish_non_exhaustive()
    }
}

impl<L: CustomLayout> Layout for CustomLayoutAdapter<L> {
    fn initialize(&mut self, styles: &mut StyleRegistry) {
        allocate_class(styles, &mut self.class);
        self.inner.initialize();
    }

    fn uninitialize(&mut self, styles: &mut StyleRegistry) {
        self.inner.uninitialize();
        release_class(styles, &mut self.class);
        self.invalidate();
    }

    fn orientation(&self) -> Orientation {
        self.inner.orientation()
    }

    fn class_name(&self) -> Option<&str> {
        self.class.as_deref()
    }

    fn invalidate(&mut self) {
        self.geometry = None;
        self.snapshot.clear();
    }

    fn prepare_layout(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        info: &mut JobInfo,
    ) -> Result<LayoutProgress> {
        if ctx.viewport.is_empty() {
            return Ok(LayoutProgress::Hidden);
        }
        let snapshot = snapshot(ctx.groups);
        if self.geometry.is_some() && snapshot == self.snapshot && ctx.viewport == self.viewport {
            return Ok(LayoutProgress::Ready);
        }

        self.groups = ctx
            .groups
            .iter()
            .map(|g| GroupSummary {
                key: g.key,
                start_index: g.start_index,
                count: g.count,
            })
            .collect();
        self.geometry = None;
        let geometry = self.inner.layout(&self.groups, ctx.viewport)?;
        if geometry.item_bounds.len() != self.item_count() {
            vwarn!(
                expected = self.item_count(),
                got = geometry.item_bounds.len(),
                "custom layout returned a mismatched item count"
            );
        }
        info.consume(geometry.item_bounds.len() as u32);

        if let Some(class) = self.class.as_deref() {
            write_common_rules(
                ctx.styles,
                class,
                self.inner.orientation(),
                geometry.extent,
                None,
                None,
            );
        }
        self.geometry = Some(geometry);
        self.snapshot = snapshot;
        self.viewport = ctx.viewport;
        Ok(LayoutProgress::Ready)
    }

    fn provide_measurement(&mut self, _target: ItemTarget, _size: Size) {}

    fn group_count(&self) -> usize {
        self.groups.len()
    }

    fn group_offset(&self, group: usize) -> Option<u64> {
        let orientation = self.inner.orientation();
        if let Some(header) = self.header_bounds(group) {
            return Some(header.main_start(orientation));
        }
        let summary = self.groups.get(group)?;
        let geometry = self.geometry.as_ref()?;
        geometry
            .item_bounds
            .get(summary.start_index..summary.start_index + summary.count)?
            .iter()
            .map(|b| b.main_start(orientation))
            .min()
    }

    fn item_bounds(&self, index: usize) -> Option<Bounds> {
        self.geometry.as_ref()?.item_bounds.get(index).copied()
    }

    fn header_bounds(&self, group: usize) -> Option<Bounds> {
        self.geometry.as_ref()?.header_bounds.get(group).copied().flatten()
    }

    fn content_extent(&self) -> u64 {
        self.geometry.as_ref().map_or(0, |g| g.extent)
    }

    fn items_from_range(&self, first_offset: u64, last_offset: u64) -> Option<ItemRange> {
        self.geometry.as_ref()?;
        match self.inner.items_from_range(first_offset, last_offset) {
            Some(range) if range.is_empty() => None,
            Some(range) => Some(range),
            None => self.fallback_range(first_offset, last_offset),
        }
    }

    fn get_adjacent(&self, current: ItemTarget, direction: Direction) -> Option<Adjacent> {
        if let Some(adjacent) = self.inner.get_adjacent(current, direction) {
            return Some(adjacent);
        }
        if current.kind == TargetKind::Header {
            return (current.index < self.groups.len())
                .then(|| adjacent_header(current.index, self.groups.len(), direction));
        }
        let total = self.item_count();
        if current.index >= total {
            return None;
        }
        let target = match direction {
            Direction::Home => 0,
            Direction::End => total - 1,
            d if d.is_backward() => current.index.saturating_sub(1),
            _ => (current.index + 1).min(total - 1),
        };
        Some(Adjacent::Target(ItemTarget::item(target)))
    }

    fn group_entry(&self, group: usize, from_end: bool, _slot: usize) -> Option<usize> {
        let g = self.groups.get(group)?;
        if g.count == 0 {
            return None;
        }
        Some(if from_end {
            g.start_index + g.count - 1
        } else {
            g.start_index
        })
    }

    fn hit_test(&self, point: Point) -> HitTestResult {
        self.inner
            .hit_test(point)
            .unwrap_or_else(|| self.fallback_hit_test(point))
    }

    fn drag_over(&mut self, point: Point) -> HitTestResult {
        let result = match self.inner.drag_over(point) {
            Some(result) => result,
            None => self.fallback_hit_test(point),
        };
        self.drag = Some(result);
        result
    }

    fn drag_leave(&mut self) {
        self.drag = None;
    }
}

impl<L: CustomLayout> CustomLayoutAdapter<L> {
    /// The group summary owning item `index`.
    pub fn group_summary(&self, index: usize) -> Option<GroupSummary> {
        self.group_of(index).copied()
    }
}
