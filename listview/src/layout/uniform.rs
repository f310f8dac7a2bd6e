use alloc::string::String;
use alloc::vec::Vec;

use super::{
    Axis, GroupFrame, HeaderPlacement, Layout, LayoutContext, LayoutProgress, adjacent_header,
    allocate_class, arrow_axis, frame_from_item, frame_from_offset, frames_extent, insert_after,
    release_class, snapshot, write_common_rules,
};
use crate::options::{GridOptions, ListOptions};
use crate::scheduler::JobInfo;
use crate::style::{StyleRegistry, px};
use crate::{
    Adjacent, Bounds, Direction, HitTestResult, ItemRange, ItemTarget, Orientation, Point, Result,
    Size, TargetKind,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct UniformGroup {
    frame: GroupFrame,
    items_per_bar: usize,
    bars: usize,
}

impl AsRef<GroupFrame> for UniformGroup {
    fn as_ref(&self) -> &GroupFrame {
        &self.frame
    }
}

/// Grid and list layout: every item has the size of a representative item.
///
/// Items fill bars (columns when horizontal, rows when vertical) of `items_per_bar` slots each.
/// A list is a grid with one stretched item per bar.
#[derive(Debug)]
pub struct UniformLayout {
    placement: HeaderPlacement,
    maximum: usize,
    list: bool,
    class: Option<String>,
    item_size: Option<Size>,
    header_size: Option<Size>,
    groups: Vec<UniformGroup>,
    snapshot: Vec<(usize, usize)>,
    viewport: Size,
    headers: bool,
    ready: bool,
    drag: Option<HitTestResult>,
}

impl UniformLayout {
    pub fn grid(options: GridOptions) -> Self {
        Self::new(
            HeaderPlacement {
                orientation: options.orientation,
                position: options.group_header_position,
            },
            options.maximum_rows_or_columns,
            false,
        )
    }

    pub fn list(options: ListOptions) -> Self {
        Self::new(
            HeaderPlacement {
                orientation: options.orientation,
                position: options.group_header_position,
            },
            1,
            true,
        )
    }

    fn new(placement: HeaderPlacement, maximum: usize, list: bool) -> Self {
        Self {
            placement,
            maximum,
            list,
            class: None,
            item_size: None,
            header_size: None,
            groups: Vec::new(),
            snapshot: Vec::new(),
            viewport: Size::default(),
            headers: false,
            ready: false,
            drag: None,
        }
    }

    pub fn is_list(&self) -> bool {
        self.list
    }

    /// Items per bar of `group`, once laid out.
    pub fn items_per_bar(&self, group: usize) -> Option<usize> {
        self.groups.get(group).map(|g| g.items_per_bar)
    }

    /// The last drag insertion point reported by [`Layout::drag_over`].
    pub fn drag_target(&self) -> Option<HitTestResult> {
        self.drag
    }

    fn item_main(&self) -> u32 {
        self.item_size
            .map(|s| self.placement.orientation.main(s))
            .unwrap_or(0)
            .max(1)
    }

    fn item_cross(&self, group: &UniformGroup) -> u32 {
        if self.list {
            return group.frame.capacity.max(1);
        }
        self.item_size
            .map(|s| self.placement.orientation.cross(s))
            .unwrap_or(0)
            .max(1)
    }

    fn items_per_bar_for(&self, capacity: u32) -> usize {
        if self.list {
            return 1;
        }
        let cross = self
            .item_size
            .map(|s| self.placement.orientation.cross(s))
            .unwrap_or(0)
            .max(1);
        let fit = (capacity / cross) as usize;
        let fit = fit.max(1);
        if self.maximum > 0 {
            fit.min(self.maximum)
        } else {
            fit
        }
    }

    fn group_for_item(&self, index: usize) -> Option<&UniformGroup> {
        frame_from_item(&self.groups, index).map(|pos| &self.groups[pos])
    }

    fn rebuild(&mut self, ctx: &LayoutContext<'_>) {
        let cross = self.placement.orientation.cross(ctx.viewport);
        let header = if ctx.headers { self.header_size } else { None };
        let item_main = self.item_main() as u64;
        let mut offset = 0u64;
        self.groups = ctx
            .groups
            .iter()
            .map(|group| {
                let capacity = self.placement.capacity(cross, header);
                let items_per_bar = self.items_per_bar_for(capacity);
                let bars = group.count.div_ceil(items_per_bar);
                let frame =
                    self.placement
                        .frame(group, offset, cross, header, bars as u64 * item_main);
                offset += frame.extent;
                UniformGroup {
                    frame,
                    items_per_bar,
                    bars,
                }
            })
            .collect();
    }

    fn write_rules(&self, styles: &mut StyleRegistry) {
        let Some(class) = self.class.as_deref() else {
            return;
        };
        let header = if self.headers { self.header_size } else { None };
        write_common_rules(
            styles,
            class,
            self.placement.orientation,
            self.content_extent(),
            None,
            header,
        );
        if let (Some(size), Some(group)) = (self.item_size, self.groups.first()) {
            let cross = self.item_cross(group);
            let (width, height) = if self.placement.orientation.is_horizontal() {
                (size.width, cross)
            } else {
                (cross, size.height)
            };
            styles.set_rule(
                class,
                ".lv-container",
                alloc::vec![px("width", width), px("height", height)],
            );
        }
    }

    /// First item at or after `offset`, searching forward from group `from`.
    fn first_item_from(&self, from: usize, offset: u64) -> Option<usize> {
        let item_main = self.item_main() as u64;
        for group in &self.groups[from..] {
            if group.frame.count == 0 {
                continue;
            }
            let bar = offset.saturating_sub(group.frame.items_main) / item_main;
            if (bar as usize) < group.bars {
                return Some(group.frame.start_index + bar as usize * group.items_per_bar);
            }
        }
        None
    }

    /// Last item at or before `offset`, searching backward from group `from`.
    fn last_item_until(&self, from: usize, offset: u64) -> Option<usize> {
        let item_main = self.item_main() as u64;
        for group in self.groups[..=from].iter().rev() {
            if group.frame.count == 0 {
                continue;
            }
            if offset < group.frame.items_main {
                continue;
            }
            let bar = ((offset - group.frame.items_main) / item_main) as usize;
            let bar = bar.min(group.bars - 1);
            let last = group.frame.start_index + (bar + 1) * group.items_per_bar - 1;
            return Some(last.min(group.frame.end_index() - 1));
        }
        None
    }

    fn page_bars(&self) -> usize {
        (self.placement.orientation.main(self.viewport) / self.item_main()).max(1) as usize
    }
}

impl Layout for UniformLayout {
    fn initialize(&mut self, styles: &mut StyleRegistry) {
        allocate_class(styles, &mut self.class);
    }

    fn uninitialize(&mut self, styles: &mut StyleRegistry) {
        release_class(styles, &mut self.class);
        self.invalidate();
    }

    fn orientation(&self) -> Orientation {
        self.placement.orientation
    }

    fn class_name(&self) -> Option<&str> {
        self.class.as_deref()
    }

    fn invalidate(&mut self) {
        self.item_size = None;
        self.header_size = None;
        self.groups.clear();
        self.snapshot.clear();
        self.ready = false;
    }

    fn prepare_layout(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        info: &mut JobInfo,
    ) -> Result<LayoutProgress> {
        if ctx.viewport.is_empty() {
            return Ok(LayoutProgress::Hidden);
        }
        if ctx.headers && !ctx.groups.is_empty() && self.header_size.is_none() {
            return Ok(LayoutProgress::NeedsMeasure(ItemTarget::header(0)));
        }
        if ctx.item_count() > 0 && self.item_size.is_none() {
            return Ok(LayoutProgress::NeedsMeasure(ItemTarget::item(0)));
        }

        let snapshot = snapshot(ctx.groups);
        if self.ready
            && snapshot == self.snapshot
            && ctx.viewport == self.viewport
            && ctx.headers == self.headers
        {
            return Ok(LayoutProgress::Ready);
        }
        self.viewport = ctx.viewport;
        self.headers = ctx.headers;
        self.rebuild(ctx);
        info.consume(self.groups.len().max(1) as u32);
        self.snapshot = snapshot;
        self.ready = true;
        self.write_rules(ctx.styles);
        vdebug!(
            groups = self.groups.len(),
            extent = self.content_extent(),
            list = self.list,
            "uniform layout prepared"
        );
        Ok(LayoutProgress::Ready)
    }

    fn provide_measurement(&mut self, target: ItemTarget, size: Size) {
        if size.is_empty() {
            return;
        }
        match target.kind {
            TargetKind::Item => self.item_size = Some(size),
            TargetKind::Header => self.header_size = Some(size),
        }
        self.ready = false;
    }

    fn group_count(&self) -> usize {
        self.groups.len()
    }

    fn group_offset(&self, group: usize) -> Option<u64> {
        self.groups.get(group).map(|g| g.frame.offset)
    }

    fn item_bounds(&self, index: usize) -> Option<Bounds> {
        let group = self.group_for_item(index)?;
        let local = index - group.frame.start_index;
        let (bar, slot) = (local / group.items_per_bar, local % group.items_per_bar);
        let item_main = self.item_main();
        let item_cross = self.item_cross(group);
        Some(self.placement.orientation.bounds(
            group.frame.items_main + bar as u64 * item_main as u64,
            group.frame.items_cross + slot as u64 * item_cross as u64,
            item_main,
            item_cross,
        ))
    }

    fn header_bounds(&self, group: usize) -> Option<Bounds> {
        self.groups.get(group).and_then(|g| g.frame.header)
    }

    fn content_extent(&self) -> u64 {
        frames_extent(&self.groups)
    }

    fn items_from_range(&self, first_offset: u64, last_offset: u64) -> Option<ItemRange> {
        if first_offset > last_offset {
            return None;
        }
        let first_group = frame_from_offset(&self.groups, first_offset)?;
        let last_group = frame_from_offset(&self.groups, last_offset)?;
        let first = self.first_item_from(first_group, first_offset)?;
        let last = self.last_item_until(last_group, last_offset)?;
        (first <= last).then(|| ItemRange::new(first, last))
    }

    fn get_adjacent(&self, current: ItemTarget, direction: Direction) -> Option<Adjacent> {
        if current.kind == TargetKind::Header {
            return (current.index < self.groups.len())
                .then(|| adjacent_header(current.index, self.groups.len(), direction));
        }
        let total = self.groups.last().map(|g| g.frame.end_index())?;
        let group = self.group_for_item(current.index)?;
        let start = group.frame.start_index;
        let local = current.index - start;
        let ipb = group.items_per_bar;
        let (bar, slot) = (local / ipb, local % ipb);
        let last_local = group.frame.count - 1;

        let target = match direction {
            Direction::Home => 0,
            Direction::End => total - 1,
            Direction::PageUp => start + local.saturating_sub(self.page_bars() * ipb),
            Direction::PageDown => start + (local + self.page_bars() * ipb).min(last_local),
            _ => match arrow_axis(self.placement.orientation, direction)? {
                (Axis::Main, true) if bar == 0 => return Some(Adjacent::Boundary { slot }),
                (Axis::Main, true) => current.index - ipb,
                (Axis::Main, false) if bar + 1 >= group.bars => {
                    return Some(Adjacent::Boundary { slot });
                }
                (Axis::Main, false) => start + (local + ipb).min(last_local),
                // Across bars: step through the group in index order.
                (Axis::Cross, true) if local == 0 => {
                    return Some(Adjacent::Boundary { slot: usize::MAX });
                }
                (Axis::Cross, true) => current.index - 1,
                (Axis::Cross, false) if local == last_local => {
                    return Some(Adjacent::Boundary { slot: 0 });
                }
                (Axis::Cross, false) => current.index + 1,
            },
        };
        Some(Adjacent::Target(ItemTarget::item(target)))
    }

    fn group_entry(&self, group: usize, from_end: bool, slot: usize) -> Option<usize> {
        let g = self.groups.get(group)?;
        if g.frame.count == 0 {
            return None;
        }
        let last_local = g.frame.count - 1;
        let local = if from_end {
            ((g.bars - 1) * g.items_per_bar).saturating_add(slot)
        } else {
            slot.min(g.items_per_bar - 1)
        };
        Some(g.frame.start_index + local.min(last_local))
    }

    fn hit_test(&self, point: Point) -> HitTestResult {
        let (main, cross) = self.placement.orientation.split(point);
        let Some(pos) = frame_from_offset(&self.groups, main) else {
            return HitTestResult::default();
        };
        let group = &self.groups[pos];
        let start = group.frame.start_index;
        if group.frame.count == 0
            || main < group.frame.items_main
            || cross < group.frame.items_cross
        {
            return HitTestResult {
                index: None,
                insert_after_index: start.checked_sub(1),
            };
        }
        let item_main = self.item_main();
        let item_cross = self.item_cross(group);
        let bar = (((main - group.frame.items_main) / item_main as u64) as usize).min(group.bars - 1);
        let slot = (((cross - group.frame.items_cross) / item_cross as u64) as usize)
            .min(group.items_per_bar - 1);
        let local = bar * group.items_per_bar + slot;
        if local >= group.frame.count {
            let last = group.frame.end_index() - 1;
            return HitTestResult {
                index: Some(last),
                insert_after_index: Some(last),
            };
        }
        let index = start + local;
        let after = if group.items_per_bar > 1 {
            let item_start = group.frame.items_cross + slot as u64 * item_cross as u64;
            insert_after(index, cross, item_start, item_cross)
        } else {
            let item_start = group.frame.items_main + bar as u64 * item_main as u64;
            insert_after(index, main, item_start, item_main)
        };
        HitTestResult {
            index: Some(index),
            insert_after_index: after,
        }
    }

    fn drag_over(&mut self, point: Point) -> HitTestResult {
        let result = self.hit_test(point);
        self.drag = Some(result);
        result
    }

    fn drag_leave(&mut self) {
        self.drag = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::Group;
    use crate::source::UserData;
    use crate::{HeaderPosition, Orientation};

    fn groups(sizes: &[usize]) -> Vec<Group> {
        let mut start = 0;
        sizes
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                let mut g = Group::new(i as u64, n, UserData::none());
                g.start_index = start;
                start += n;
                g
            })
            .collect()
    }

    fn prepare(layout: &mut UniformLayout, groups: &[Group], headers: bool, viewport: Size) {
        let mut styles = StyleRegistry::new(0);
        layout.initialize(&mut styles);
        let mut info = JobInfo::unbounded(0);
        loop {
            let mut ctx = LayoutContext {
                groups,
                headers,
                viewport,
                styles: &mut styles,
            };
            match layout.prepare_layout(&mut ctx, &mut info).unwrap() {
                LayoutProgress::Ready => break,
                LayoutProgress::NeedsMeasure(t) if t.kind == TargetKind::Header => {
                    layout.provide_measurement(t, Size::new(100, 20));
                }
                LayoutProgress::NeedsMeasure(t) => {
                    layout.provide_measurement(t, Size::new(50, 40));
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn horizontal_grid_fills_columns() {
        let mut layout = UniformLayout::grid(GridOptions::default());
        let g = groups(&[5]);
        // 120 cross pixels: 3 items of 40 per column.
        prepare(&mut layout, &g, false, Size::new(200, 120));
        assert_eq!(layout.items_per_bar(0), Some(3));
        assert_eq!(layout.item_bounds(0), Some(Bounds::new(0, 0, 50, 40)));
        assert_eq!(layout.item_bounds(2), Some(Bounds::new(0, 80, 50, 40)));
        assert_eq!(layout.item_bounds(4), Some(Bounds::new(50, 40, 50, 40)));
        assert_eq!(layout.content_extent(), 100);
        assert_eq!(layout.item_bounds(5), None);
    }

    #[test]
    fn maximum_rows_clamps_items_per_bar() {
        let mut layout =
            UniformLayout::grid(GridOptions::default().with_maximum_rows_or_columns(2));
        prepare(&mut layout, &groups(&[5]), false, Size::new(200, 400));
        assert_eq!(layout.items_per_bar(0), Some(2));

        let mut tiny = UniformLayout::grid(GridOptions::default());
        prepare(&mut tiny, &groups(&[5]), false, Size::new(200, 10));
        assert_eq!(tiny.items_per_bar(0), Some(1), "at least one item per bar");
    }

    #[test]
    fn headers_on_top_share_the_group_span() {
        let mut layout = UniformLayout::grid(GridOptions::default());
        let g = groups(&[2, 3]);
        prepare(&mut layout, &g, true, Size::new(500, 100));
        // 100 - 20 header = 80 cross: two items per column.
        assert_eq!(layout.items_per_bar(0), Some(2));
        assert_eq!(layout.header_bounds(0), Some(Bounds::new(0, 0, 100, 20)));
        assert_eq!(layout.item_bounds(0), Some(Bounds::new(0, 20, 50, 40)));
        // Group 0 is as wide as its header.
        assert_eq!(layout.group_offset(1), Some(100));
        assert_eq!(layout.item_bounds(4), Some(Bounds::new(150, 20, 50, 40)));
    }

    #[test]
    fn vertical_list_with_left_headers() {
        let options = ListOptions::default().with_group_header_position(HeaderPosition::Left);
        let mut layout = UniformLayout::list(options);
        assert_eq!(layout.orientation(), Orientation::Vertical);
        prepare(&mut layout, &groups(&[2, 1]), true, Size::new(300, 200));
        // Header takes 100 of the 300 cross pixels; items stretch across the rest.
        assert_eq!(layout.item_bounds(0), Some(Bounds::new(100, 0, 200, 40)));
        assert_eq!(layout.item_bounds(1), Some(Bounds::new(100, 40, 200, 40)));
        assert_eq!(layout.group_offset(1), Some(80));
        assert_eq!(layout.item_bounds(2), Some(Bounds::new(100, 80, 200, 40)));
    }

    #[test]
    fn items_from_range_skips_headers_and_gaps() {
        let mut layout = UniformLayout::grid(GridOptions::default());
        let g = groups(&[4, 4]);
        prepare(&mut layout, &g, false, Size::new(100, 80));
        // Two items per column, each group two columns of 50.
        assert_eq!(layout.items_from_range(0, 49), Some(ItemRange::new(0, 1)));
        assert_eq!(layout.items_from_range(60, 160), Some(ItemRange::new(2, 7)));
        assert_eq!(layout.items_from_range(500, 600), None);
        assert_eq!(layout.items_from_range(10, 5), None);
    }

    #[test]
    fn adjacency_reports_group_boundaries() {
        let mut layout = UniformLayout::grid(GridOptions::default());
        prepare(&mut layout, &groups(&[5, 5]), false, Size::new(200, 120));
        let right = layout.get_adjacent(ItemTarget::item(1), Direction::Right);
        assert_eq!(right, Some(Adjacent::Target(ItemTarget::item(4))));
        let right = layout.get_adjacent(ItemTarget::item(4), Direction::Right);
        assert_eq!(right, Some(Adjacent::Boundary { slot: 1 }));
        let left = layout.get_adjacent(ItemTarget::item(1), Direction::Left);
        assert_eq!(left, Some(Adjacent::Boundary { slot: 1 }));
        let down = layout.get_adjacent(ItemTarget::item(2), Direction::Down);
        assert_eq!(down, Some(Adjacent::Target(ItemTarget::item(3))));
        assert_eq!(layout.group_entry(1, false, 1), Some(6));
        assert_eq!(layout.group_entry(0, true, 2), Some(4));
        let end = layout.get_adjacent(ItemTarget::item(0), Direction::End);
        assert_eq!(end, Some(Adjacent::Target(ItemTarget::item(9))));
    }

    #[test]
    fn hit_test_reports_insertion_point() {
        let mut layout = UniformLayout::grid(GridOptions::default());
        prepare(&mut layout, &groups(&[5]), false, Size::new(200, 120));
        let hit = layout.hit_test(Point::new(10, 5));
        assert_eq!(hit.index, Some(0));
        assert_eq!(hit.insert_after_index, None);
        let hit = layout.hit_test(Point::new(60, 70));
        assert_eq!(hit.index, Some(4));
        assert_eq!(hit.insert_after_index, Some(4));
        let hit = layout.drag_over(Point::new(60, 100));
        assert_eq!(hit.index, Some(4), "past the last item");
        assert_eq!(layout.drag_target(), Some(hit));
        layout.drag_leave();
        assert_eq!(layout.drag_target(), None);
    }

    #[test]
    fn prepare_is_idempotent() {
        let mut layout = UniformLayout::grid(GridOptions::default());
        let g = groups(&[3, 7, 2]);
        prepare(&mut layout, &g, true, Size::new(300, 200));
        let first: Vec<_> = (0..12).map(|i| layout.item_bounds(i)).collect();
        layout.ready = false;
        prepare(&mut layout, &g, true, Size::new(300, 200));
        let second: Vec<_> = (0..12).map(|i| layout.item_bounds(i)).collect();
        assert_eq!(first, second);
    }
}
