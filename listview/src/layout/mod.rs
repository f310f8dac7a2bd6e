//! Geometry for items and group headers.
//!
//! Layouts run in two passes. [`Layout::prepare_layout`] computes geometry from a snapshot of the
//! group sequence and never touches the element tree; it may ask the view to measure a
//! representative item first, or yield when its budget runs out. [`Layout::layout_realized_range`]
//! and [`Layout::layout_unrealized_range`] then apply the computed bounds to live containers.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::element::{ElementId, ElementTree};
use crate::groups::Group;
use crate::scheduler::{JobInfo, JobStep};
use crate::style::{StyleRegistry, px};
use crate::{
    Adjacent, Bounds, Direction, ExpandedRange, HeaderPosition, HitTestResult, ItemRange,
    ItemTarget, Orientation, Point, Result, Size,
};

mod cell_spanning;
mod custom;
mod uniform;

pub use cell_spanning::{CellSpanningLayout, OccupancyMap, OccupancyMapEntry};
pub use custom::{CustomLayout, CustomLayoutAdapter, CustomLayoutGeometry, GroupSummary};
pub use uniform::UniformLayout;

/// Input of [`Layout::prepare_layout`].
pub struct LayoutContext<'a> {
    pub groups: &'a [Group],
    /// Whether groups carry headers. Ungrouped data has none.
    pub headers: bool,
    pub viewport: Size,
    pub styles: &'a mut StyleRegistry,
}

impl LayoutContext<'_> {
    pub fn item_count(&self) -> usize {
        self.groups.last().map(Group::end_index).unwrap_or(0)
    }
}

/// Resolves live containers for the apply passes.
pub trait ContainerLookup {
    fn item_container(&self, index: usize) -> Option<ElementId>;
    fn header_container(&self, group: usize) -> Option<ElementId>;
}

/// Input of the apply passes.
pub struct LayoutSurface<'a> {
    pub tree: &'a mut ElementTree,
    pub containers: &'a dyn ContainerLookup,
}

/// Outcome of one [`Layout::prepare_layout`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutProgress {
    /// Geometry is complete for the current snapshot.
    Ready,
    /// The budget ran out; call again with a fresh budget.
    Yielded,
    /// The layout needs the intrinsic size of this item or header before it can continue.
    NeedsMeasure(ItemTarget),
    /// The viewport has no usable size.
    Hidden,
}

/// Continuation of [`Layout::layout_unrealized_range`].
///
/// Walks the containers of the expanded window that lie outside the realized range, alternating
/// between the index just before and the index just after the realized range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnrealizedCursor {
    window: ExpandedRange,
    before: usize,
    after: usize,
    take_after: bool,
}

impl UnrealizedCursor {
    pub fn new(window: ExpandedRange, realized: ItemRange) -> Self {
        Self {
            window,
            before: realized.first.max(window.begin),
            after: realized.last.saturating_add(1).max(window.begin),
            take_after: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.before <= self.window.begin && self.after >= self.window.end
    }

    fn next_before(&mut self) -> Option<usize> {
        if self.before > self.window.begin {
            self.before -= 1;
            Some(self.before)
        } else {
            None
        }
    }

    fn next_after(&mut self) -> Option<usize> {
        if self.after < self.window.end {
            let index = self.after;
            self.after += 1;
            Some(index)
        } else {
            None
        }
    }
}

impl Iterator for UnrealizedCursor {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        self.take_after = !self.take_after;
        if self.take_after {
            self.next_after().or_else(|| self.next_before())
        } else {
            self.next_before().or_else(|| self.next_after())
        }
    }
}

/// The protocol every layout implements.
pub trait Layout: fmt::Debug {
    /// Allocates the layout's per-instance style class.
    fn initialize(&mut self, styles: &mut StyleRegistry);

    /// Releases everything [`Self::initialize`] allocated.
    fn uninitialize(&mut self, styles: &mut StyleRegistry);

    fn orientation(&self) -> Orientation;

    /// The class the view puts on the surface element so the layout's rules apply.
    fn class_name(&self) -> Option<&str>;

    /// Drops cached measurements and geometry; the next prepare starts from scratch.
    fn invalidate(&mut self);

    /// Computes geometry for the groups in `ctx`.
    ///
    /// Calling this again with an unchanged snapshot produces identical geometry.
    fn prepare_layout(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        info: &mut JobInfo,
    ) -> Result<LayoutProgress>;

    /// Delivers the size requested by [`LayoutProgress::NeedsMeasure`]. Empty sizes are ignored so
    /// the request repeats until the element can be measured.
    fn provide_measurement(&mut self, target: ItemTarget, size: Size);

    fn group_count(&self) -> usize;

    fn group_offset(&self, group: usize) -> Option<u64>;

    fn item_bounds(&self, index: usize) -> Option<Bounds>;

    fn header_bounds(&self, group: usize) -> Option<Bounds>;

    /// Size of the laid-out content along the scroll axis.
    fn content_extent(&self) -> u64;

    /// Items intersecting `[first_offset, last_offset]` on the scroll axis.
    fn items_from_range(&self, first_offset: u64, last_offset: u64) -> Option<ItemRange>;

    /// The target reached from `current` by keyboard movement.
    fn get_adjacent(&self, current: ItemTarget, direction: Direction) -> Option<Adjacent>;

    /// The item of `group` at bar `slot` in its first (or last) bar, used to continue a movement
    /// that hit [`Adjacent::Boundary`].
    fn group_entry(&self, group: usize, from_end: bool, slot: usize) -> Option<usize>;

    fn hit_test(&self, point: Point) -> HitTestResult;

    /// Tracks a drag hovering over the surface and returns the insertion point.
    fn drag_over(&mut self, point: Point) -> HitTestResult;

    fn drag_leave(&mut self);

    /// Applies geometry to the containers of `range` and to every live header container.
    fn layout_realized_range(&mut self, surface: &mut LayoutSurface<'_>, range: ItemRange) {
        if !range.is_empty() {
            for index in range.first..=range.last {
                apply_item(self, surface, index);
            }
        }
        for group in 0..self.group_count() {
            if let (Some(container), Some(bounds)) = (
                surface.containers.header_container(group),
                self.header_bounds(group),
            ) {
                surface.tree.set_bounds(container, bounds);
            }
        }
    }

    /// Applies geometry to live containers outside the realized range, one slice at a time.
    fn layout_unrealized_range(
        &mut self,
        surface: &mut LayoutSurface<'_>,
        cursor: &mut UnrealizedCursor,
        info: &mut JobInfo,
    ) -> JobStep {
        while let Some(index) = cursor.next() {
            apply_item(self, surface, index);
            info.consume(1);
            if info.should_yield() && !cursor.is_done() {
                return JobStep::Yield;
            }
        }
        JobStep::Complete
    }
}

fn apply_item<L: Layout + ?Sized>(layout: &L, surface: &mut LayoutSurface<'_>, index: usize) {
    if let (Some(container), Some(bounds)) = (
        surface.containers.item_container(index),
        layout.item_bounds(index),
    ) {
        surface.tree.set_bounds(container, bounds);
    }
}

/// Whether a movement runs along the scroll axis or across it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Axis {
    Main,
    Cross,
}

/// Maps arrow keys to an axis and a direction for `orientation`. Paging and Home/End are not
/// axis moves.
pub(crate) fn arrow_axis(orientation: Orientation, direction: Direction) -> Option<(Axis, bool)> {
    let horizontal = orientation.is_horizontal();
    match direction {
        Direction::Left => Some((if horizontal { Axis::Main } else { Axis::Cross }, true)),
        Direction::Right => Some((if horizontal { Axis::Main } else { Axis::Cross }, false)),
        Direction::Up => Some((if horizontal { Axis::Cross } else { Axis::Main }, true)),
        Direction::Down => Some((if horizontal { Axis::Cross } else { Axis::Main }, false)),
        Direction::PageUp | Direction::PageDown | Direction::Home | Direction::End => None,
    }
}

/// Header movement: headers form a flat sequence regardless of orientation.
pub(crate) fn adjacent_header(group: usize, groups: usize, direction: Direction) -> Adjacent {
    let last = groups.saturating_sub(1);
    let target = match direction {
        Direction::Home => 0,
        Direction::End => last,
        d if d.is_backward() => group.saturating_sub(1),
        _ => (group + 1).min(last),
    };
    Adjacent::Target(ItemTarget::header(target))
}

/// Placement of one group along the scroll axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct GroupFrame {
    pub start_index: usize,
    pub count: usize,
    pub offset: u64,
    pub extent: u64,
    pub header: Option<Bounds>,
    /// Scroll-axis start of the items area.
    pub items_main: u64,
    /// Cross-axis start of the items area.
    pub items_cross: u64,
    /// Cross-axis space available to items.
    pub capacity: u32,
}

impl GroupFrame {
    pub fn end_index(&self) -> usize {
        self.start_index + self.count
    }
}

/// How headers share space with items.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct HeaderPlacement {
    pub orientation: Orientation,
    pub position: HeaderPosition,
}

impl HeaderPlacement {
    /// Headers stacked across the scroll axis share the group's scroll span with the items;
    /// inline headers precede the items along the scroll axis.
    fn stacked(self) -> bool {
        matches!(
            (self.orientation, self.position),
            (Orientation::Horizontal, HeaderPosition::Top)
                | (Orientation::Vertical, HeaderPosition::Left)
        )
    }

    /// Cross-axis capacity left for items once the header is placed.
    pub fn capacity(self, viewport_cross: u32, header: Option<Size>) -> u32 {
        match header {
            Some(size) if self.stacked() => {
                viewport_cross.saturating_sub(self.orientation.cross(size))
            }
            _ => viewport_cross,
        }
    }

    /// Lays out one group starting at `offset` whose items need `items_extent` along the scroll
    /// axis.
    pub fn frame(
        self,
        group: &Group,
        offset: u64,
        viewport_cross: u32,
        header: Option<Size>,
        items_extent: u64,
    ) -> GroupFrame {
        let capacity = self.capacity(viewport_cross, header);
        let mut frame = GroupFrame {
            start_index: group.start_index,
            count: group.count,
            offset,
            extent: items_extent,
            header: None,
            items_main: offset,
            items_cross: 0,
            capacity,
        };
        if let Some(size) = header {
            let header_main = self.orientation.main(size);
            let header_cross = self.orientation.cross(size);
            frame.header = Some(self.orientation.bounds(offset, 0, header_main, header_cross));
            if self.stacked() {
                frame.items_cross = header_cross as u64;
                frame.extent = items_extent.max(header_main as u64);
            } else {
                frame.items_main = offset + header_main as u64;
                frame.extent = items_extent + header_main as u64;
            }
        }
        frame
    }
}

impl AsRef<GroupFrame> for GroupFrame {
    fn as_ref(&self) -> &GroupFrame {
        self
    }
}

/// Index of the frame containing item `index`.
pub(crate) fn frame_from_item<F: AsRef<GroupFrame>>(frames: &[F], index: usize) -> Option<usize> {
    let found = frames
        .partition_point(|f| f.as_ref().start_index <= index)
        .checked_sub(1)?;
    (index < frames[found].as_ref().end_index()).then_some(found)
}

/// Index of the last frame starting at or before `offset`, clamped to the first frame.
pub(crate) fn frame_from_offset<F: AsRef<GroupFrame>>(frames: &[F], offset: u64) -> Option<usize> {
    if frames.is_empty() {
        return None;
    }
    Some(
        frames
            .partition_point(|f| f.as_ref().offset <= offset)
            .saturating_sub(1),
    )
}

/// Total extent of a frame sequence.
pub(crate) fn frames_extent<F: AsRef<GroupFrame>>(frames: &[F]) -> u64 {
    frames
        .last()
        .map(|f| f.as_ref().offset + f.as_ref().extent)
        .unwrap_or(0)
}

/// Writes the rules shared by every layout: surface extent and header container size.
///
/// `cross_extent` sizes the surface across the scroll axis when content can outgrow the
/// viewport there.
pub(crate) fn write_common_rules(
    styles: &mut StyleRegistry,
    class: &str,
    orientation: Orientation,
    extent: u64,
    cross_extent: Option<u64>,
    header: Option<Size>,
) {
    let clamp = |v: u64| u32::try_from(v).unwrap_or(u32::MAX);
    let (main, cross) = if orientation.is_horizontal() {
        ("width", "height")
    } else {
        ("height", "width")
    };
    let mut declarations = alloc::vec![px(main, clamp(extent))];
    if let Some(cross_extent) = cross_extent {
        declarations.push(px(cross, clamp(cross_extent)));
    }
    styles.set_rule(class, "", declarations);
    if let Some(size) = header {
        styles.set_rule(
            class,
            ".lv-headercontainer",
            alloc::vec![px("width", size.width), px("height", size.height)],
        );
    }
}

/// Snapshot of the group sequence a layout was computed for.
pub(crate) fn snapshot(groups: &[Group]) -> Vec<(usize, usize)> {
    groups.iter().map(|g| (g.start_index, g.count)).collect()
}

pub(crate) fn allocate_class(styles: &mut StyleRegistry, slot: &mut Option<String>) {
    if slot.is_none() {
        *slot = Some(styles.allocate_class("lv-layout"));
    }
}

pub(crate) fn release_class(styles: &mut StyleRegistry, slot: &mut Option<String>) {
    if let Some(class) = slot.take() {
        styles.release_class(&class);
    }
}

/// Insertion point for a hit at `pos` within an item spanning `[start, start + size)`.
pub(crate) fn insert_after(index: usize, pos: u64, start: u64, size: u32) -> Option<usize> {
    if pos.saturating_sub(start) < (size / 2) as u64 {
        index.checked_sub(1)
    } else {
        Some(index)
    }
}
