//! Cell-spanning layout.
//!
//! Each group is a grid of `slots_per_column` rows and as many columns as needed. Items occupy
//! `columns x rows` cells and are packed greedily in index order: the scan for a free region
//! starts at the previous placement and only moves forward, so a later small item never fills a
//! hole left earlier. Placement is incremental and yields between items; any change to counts,
//! sizes or group metadata rebuilds the whole map.

use alloc::string::String;
use alloc::vec::Vec;

use super::{
    Axis, GroupFrame, HeaderPlacement, Layout, LayoutContext, LayoutProgress, adjacent_header,
    allocate_class, arrow_axis, frame_from_item, frame_from_offset, frames_extent, insert_after,
    release_class, snapshot, write_common_rules,
};
use crate::options::{CellSpanningOptions, GroupInfo, ItemInfo};
use crate::scheduler::JobInfo;
use crate::style::StyleRegistry;
use crate::{
    Adjacent, Bounds, Direction, Error, HitTestResult, ItemRange, ItemTarget, Orientation, Point,
    Result, Size, TargetKind,
};

/// One placed item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OccupancyMapEntry {
    pub index: usize,
    pub content_width: u32,
    pub content_height: u32,
    pub columns: usize,
    pub rows: usize,
    pub column: usize,
    pub row: usize,
}

/// Claimed cells of one group, indexed `column * slots_per_column + row`.
#[derive(Clone, Debug, Default)]
pub struct OccupancyMap {
    slots_per_column: usize,
    cells: Vec<Option<u32>>,
    entries: Vec<OccupancyMapEntry>,
    overflow_rows: usize,
    column_count: usize,
    max_columns: usize,
    last: Option<(usize, usize)>,
}

impl OccupancyMap {
    pub fn new(slots_per_column: usize) -> Self {
        Self {
            slots_per_column: slots_per_column.max(1),
            ..Self::default()
        }
    }

    pub fn slots_per_column(&self) -> usize {
        self.slots_per_column
    }

    /// Columns touched by any placed item.
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Rows by which spans taller than a column overflow it.
    pub fn overflow_rows(&self) -> usize {
        self.overflow_rows
    }

    pub fn occupancy_map_item_count(&self) -> usize {
        self.entries.len()
    }

    /// Entries in placement (item) order.
    pub fn entries(&self) -> &[OccupancyMapEntry] {
        &self.entries
    }

    fn cell(&self, column: usize, row: usize) -> Option<usize> {
        if row >= self.slots_per_column {
            return None;
        }
        self.cells
            .get(column * self.slots_per_column + row)
            .copied()
            .flatten()
            .map(|pos| pos as usize)
    }

    /// Position in [`Self::entries`] of the entry covering `(column, row)`.
    pub fn entry_at(&self, column: usize, row: usize) -> Option<usize> {
        self.cell(column, row)
    }

    /// Whether a `columns x rows` region at `(column, row)` is free.
    ///
    /// Spans taller than a column only fit at row 0, where they overflow the column.
    pub fn is_slot_empty(&self, column: usize, row: usize, columns: usize, rows: usize) -> bool {
        let spc = self.slots_per_column;
        if row >= spc || (row + rows > spc && row != 0) {
            return false;
        }
        let rows_in_column = rows.min(spc - row);
        (column..column + columns)
            .all(|c| (row..row + rows_in_column).all(|r| self.cell(c, r).is_none()))
    }

    /// First free region at or after the previous placement, in column-major order.
    ///
    /// `new_column` starts the scan one column after the previous placement.
    pub fn find_empty_slot(&self, columns: usize, rows: usize, new_column: bool) -> (usize, usize) {
        let (mut column, mut row) = match self.last {
            None => (0, 0),
            Some((c, _)) if new_column => (c + 1, 0),
            Some(pos) => pos,
        };
        loop {
            while row < self.slots_per_column {
                if self.is_slot_empty(column, row, columns, rows) {
                    return (column, row);
                }
                row += 1;
            }
            column += 1;
            row = 0;
        }
    }

    /// Claims the cells of `entry` at `(column, row)`.
    pub fn mark_slot_as_full(&mut self, column: usize, row: usize, mut entry: OccupancyMapEntry) {
        let spc = self.slots_per_column;
        let needed = (column + entry.columns) * spc;
        if self.cells.len() < needed {
            self.cells.resize(needed, None);
        }
        let pos = self.entries.len() as u32;
        let rows_in_column = entry.rows.min(spc - row);
        for c in column..column + entry.columns {
            for r in row..row + rows_in_column {
                self.cells[c * spc + r] = Some(pos);
            }
        }
        if row + entry.rows > spc {
            self.overflow_rows = self.overflow_rows.max(row + entry.rows - spc);
        }
        entry.column = column;
        entry.row = row;
        self.column_count = self.column_count.max(column + entry.columns);
        self.max_columns = self.max_columns.max(entry.columns);
        self.last = Some((column, row));
        self.entries.push(entry);
    }

    /// Places the next item and returns its `(column, row)`.
    pub fn place(
        &mut self,
        index: usize,
        content: Size,
        columns: usize,
        rows: usize,
        new_column: bool,
    ) -> (usize, usize) {
        let columns = columns.max(1);
        let rows = rows.max(1);
        let (column, row) = self.find_empty_slot(columns, rows, new_column);
        self.mark_slot_as_full(
            column,
            row,
            OccupancyMapEntry {
                index,
                content_width: content.width,
                content_height: content.height,
                columns,
                rows,
                column,
                row,
            },
        );
        (column, row)
    }

    /// Nearest entry in `column`, preferring `row`, then rows above, then rows below.
    fn nearest_in_column(&self, column: usize, row: usize) -> Option<usize> {
        let row = row.min(self.slots_per_column - 1);
        (0..=row)
            .rev()
            .chain(row + 1..self.slots_per_column)
            .find_map(|r| self.cell(column, r))
    }

    /// Position of the first entry intersecting `column`.
    fn first_touching(&self, column: usize) -> Option<usize> {
        let start = self
            .entries
            .partition_point(|e| e.column + self.max_columns <= column);
        self.entries[start..]
            .iter()
            .position(|e| e.column + e.columns > column)
            .map(|p| start + p)
    }

    /// Position of the last entry starting at or before `column`.
    fn last_starting(&self, column: usize) -> Option<usize> {
        self.entries
            .partition_point(|e| e.column <= column)
            .checked_sub(1)
    }
}

#[derive(Clone, Debug)]
struct CellGroup {
    frame: GroupFrame,
    /// Cell size along the scroll axis.
    cell_main: u32,
    /// Cell size across the scroll axis.
    cell_cross: u32,
    map: OccupancyMap,
}

impl AsRef<GroupFrame> for CellGroup {
    fn as_ref(&self) -> &GroupFrame {
        &self.frame
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct PlacementCursor {
    group: usize,
    item: usize,
}

/// Variable-size grid layout over an occupancy map.
#[derive(Debug)]
pub struct CellSpanningLayout {
    options: CellSpanningOptions,
    placement: HeaderPlacement,
    class: Option<String>,
    item_size: Option<Size>,
    header_size: Option<Size>,
    groups: Vec<CellGroup>,
    cursor: Option<PlacementCursor>,
    snapshot: Vec<(usize, usize)>,
    viewport: Size,
    headers: bool,
    ready: bool,
    drag: Option<HitTestResult>,
}

impl CellSpanningLayout {
    pub fn new(options: CellSpanningOptions) -> Self {
        let placement = HeaderPlacement {
            orientation: options.orientation,
            position: options.group_header_position,
        };
        Self {
            options,
            placement,
            class: None,
            item_size: None,
            header_size: None,
            groups: Vec::new(),
            cursor: None,
            snapshot: Vec::new(),
            viewport: Size::default(),
            headers: false,
            ready: false,
            drag: None,
        }
    }

    /// The occupancy map of `group`, complete once prepare returned `Ready`.
    pub fn occupancy_map(&self, group: usize) -> Option<&OccupancyMap> {
        self.groups.get(group).map(|g| &g.map)
    }

    /// Number of items placed across every group.
    pub fn occupancy_map_item_count(&self) -> usize {
        self.groups
            .iter()
            .map(|g| g.map.occupancy_map_item_count())
            .sum()
    }

    /// Size of the content across the scroll axis, including spans that overflow their column.
    pub fn cross_extent(&self) -> u64 {
        self.groups
            .iter()
            .map(|g| {
                let header = g
                    .frame
                    .header
                    .map_or(0, |b| b.cross_end(self.placement.orientation));
                if g.map.occupancy_map_item_count() == 0 {
                    return header;
                }
                let rows = (g.map.slots_per_column() + g.map.overflow_rows()) as u64;
                header.max(g.frame.items_cross + rows * g.cell_cross as u64)
            })
            .max()
            .unwrap_or(0)
    }

    pub fn drag_target(&self) -> Option<HitTestResult> {
        self.drag
    }

    fn restart(&mut self) {
        self.groups.clear();
        self.cursor = Some(PlacementCursor::default());
        self.ready = false;
    }

    fn fail(&mut self, err: Error) -> Result<LayoutProgress> {
        vwarn!(error = %err, "cell spanning layout aborted");
        self.groups.clear();
        self.cursor = None;
        self.snapshot.clear();
        self.ready = false;
        Err(err)
    }

    /// Cell size of `group` as `(main, cross)`.
    ///
    /// Empty groups place nothing and get a unit cell without consulting the callback.
    fn cell_size(&self, group: usize, count: usize) -> Result<(u32, u32)> {
        let orientation = self.placement.orientation;
        let info = match (&self.options.group_info, self.item_size) {
            _ if count == 0 => return Ok((1, 1)),
            (Some(group_info), _) => group_info(group),
            (None, Some(size)) => GroupInfo {
                cell_width: size.width as f64,
                cell_height: size.height as f64,
            },
            (None, None) => return Ok((1, 1)),
        };
        if !valid_length(info.cell_width) || !valid_length(info.cell_height) {
            return Err(Error::InvalidGroupInfo {
                group,
                cell_width: info.cell_width,
                cell_height: info.cell_height,
            });
        }
        let cell = Size::new(pixels(info.cell_width), pixels(info.cell_height));
        Ok((orientation.main(cell).max(1), orientation.cross(cell).max(1)))
    }

    fn place_groups(&mut self, ctx: &LayoutContext<'_>, info: &mut JobInfo) -> Result<bool> {
        let orientation = self.placement.orientation;
        let cross = orientation.cross(ctx.viewport);
        let header = if ctx.headers { self.header_size } else { None };
        let capacity = self.placement.capacity(cross, header);
        let mut cursor = self.cursor.unwrap_or_default();

        while cursor.group < ctx.groups.len() {
            let group = &ctx.groups[cursor.group];
            if cursor.group == self.groups.len() {
                let (cell_main, cell_cross) = self.cell_size(cursor.group, group.count)?;
                let mut slots = (capacity / cell_cross).max(1) as usize;
                if self.options.maximum_rows_or_columns > 0 {
                    slots = slots.min(self.options.maximum_rows_or_columns);
                }
                self.groups.push(CellGroup {
                    frame: GroupFrame::default(),
                    cell_main,
                    cell_cross,
                    map: OccupancyMap::new(slots),
                });
            }
            let item_info = self.options.item_info.clone();
            let cell = &mut self.groups[cursor.group];
            while cursor.item < group.count {
                let index = group.start_index + cursor.item;
                let item = match &item_info {
                    Some(f) => f(index),
                    None => ItemInfo::new(
                        cell_width(orientation, cell) as f64,
                        cell_height(orientation, cell) as f64,
                    ),
                };
                if !valid_length(item.width) || !valid_length(item.height) {
                    return Err(Error::InvalidItemInfo {
                        index,
                        width: item.width,
                        height: item.height,
                    });
                }
                let content = Size::new(pixels(item.width), pixels(item.height));
                let columns = span(orientation.main(content) as f64, cell.cell_main as f64);
                let rows = span(orientation.cross(content) as f64, cell.cell_cross as f64);
                cell.map
                    .place(index, content, columns, rows, item.new_column);
                cursor.item += 1;
                info.consume(1);
                if info.should_yield() && cursor.item < group.count {
                    self.cursor = Some(cursor);
                    vtrace!(group = cursor.group, item = cursor.item, "placement yielded");
                    return Ok(false);
                }
            }
            cursor = PlacementCursor {
                group: cursor.group + 1,
                item: 0,
            };
        }

        let mut offset = 0u64;
        for (cell, group) in self.groups.iter_mut().zip(ctx.groups) {
            let items_extent = cell.map.column_count() as u64 * cell.cell_main as u64;
            cell.frame = self
                .placement
                .frame(group, offset, cross, header, items_extent);
            offset += cell.frame.extent;
        }
        self.cursor = None;
        Ok(true)
    }

    fn entry(&self, index: usize) -> Option<(usize, &OccupancyMapEntry)> {
        let pos = frame_from_item(&self.groups, index)?;
        let group = &self.groups[pos];
        let entry = group.map.entries().get(index - group.frame.start_index)?;
        Some((pos, entry))
    }

    fn entry_bounds(&self, group: &CellGroup, entry: &OccupancyMapEntry) -> Bounds {
        self.placement.orientation.bounds(
            group.frame.items_main + entry.column as u64 * group.cell_main as u64,
            group.frame.items_cross + entry.row as u64 * group.cell_cross as u64,
            (entry.columns as u32).saturating_mul(group.cell_main),
            (entry.rows as u32).saturating_mul(group.cell_cross),
        )
    }

    fn column_at(group: &CellGroup, main: u64) -> usize {
        (main.saturating_sub(group.frame.items_main) / group.cell_main as u64) as usize
    }
}

fn cell_width(orientation: Orientation, cell: &CellGroup) -> u32 {
    if orientation.is_horizontal() {
        cell.cell_main
    } else {
        cell.cell_cross
    }
}

fn cell_height(orientation: Orientation, cell: &CellGroup) -> u32 {
    if orientation.is_horizontal() {
        cell.cell_cross
    } else {
        cell.cell_main
    }
}

fn valid_length(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn pixels(v: f64) -> u32 {
    if v >= u32::MAX as f64 {
        u32::MAX
    } else {
        (v + 0.5) as u32
    }
}

/// Cells needed to cover `size`, at least one.
fn span(size: f64, cell: f64) -> usize {
    let q = size / cell;
    let n = q as usize;
    let n = if (n as f64) < q - 1e-9 { n + 1 } else { n };
    n.max(1)
}

impl Layout for CellSpanningLayout {
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
        self.cursor = None;
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
        if self.options.group_info.is_none() && ctx.item_count() > 0 && self.item_size.is_none() {
            return Ok(LayoutProgress::NeedsMeasure(ItemTarget::item(0)));
        }

        let snapshot = snapshot(ctx.groups);
        let unchanged = snapshot == self.snapshot
            && ctx.viewport == self.viewport
            && ctx.headers == self.headers;
        if unchanged && self.ready {
            return Ok(LayoutProgress::Ready);
        }
        if !unchanged || self.cursor.is_none() {
            self.snapshot = snapshot;
            self.viewport = ctx.viewport;
            self.headers = ctx.headers;
            self.restart();
        }

        match self.place_groups(ctx, info) {
            Ok(false) => Ok(LayoutProgress::Yielded),
            Ok(true) => {
                self.ready = true;
                if let Some(class) = self.class.as_deref() {
                    let header = if self.headers { self.header_size } else { None };
                    write_common_rules(
                        ctx.styles,
                        class,
                        self.placement.orientation,
                        self.content_extent(),
                        Some(self.cross_extent()),
                        header,
                    );
                }
                vdebug!(
                    groups = self.groups.len(),
                    items = self.occupancy_map_item_count(),
                    extent = self.content_extent(),
                    "cell spanning layout prepared"
                );
                Ok(LayoutProgress::Ready)
            }
            Err(err) => self.fail(err),
        }
    }

    fn provide_measurement(&mut self, target: ItemTarget, size: Size) {
        if size.is_empty() {
            return;
        }
        match target.kind {
            TargetKind::Item => self.item_size = Some(size),
            TargetKind::Header => self.header_size = Some(size),
        }
        self.snapshot.clear();
        self.ready = false;
    }

    fn group_count(&self) -> usize {
        self.groups.len()
    }

    fn group_offset(&self, group: usize) -> Option<u64> {
        self.groups.get(group).map(|g| g.frame.offset)
    }

    fn item_bounds(&self, index: usize) -> Option<Bounds> {
        if !self.ready {
            return None;
        }
        let (pos, entry) = self.entry(index)?;
        Some(self.entry_bounds(&self.groups[pos], entry))
    }

    fn header_bounds(&self, group: usize) -> Option<Bounds> {
        self.groups.get(group).and_then(|g| g.frame.header)
    }

    fn content_extent(&self) -> u64 {
        frames_extent(&self.groups)
    }

    fn items_from_range(&self, first_offset: u64, last_offset: u64) -> Option<ItemRange> {
        if !self.ready || first_offset > last_offset {
            return None;
        }
        let first_group = frame_from_offset(&self.groups, first_offset)?;
        let last_group = frame_from_offset(&self.groups, last_offset)?;

        let first = self.groups[first_group..].iter().find_map(|g| {
            let column = Self::column_at(g, first_offset);
            g.map
                .first_touching(column)
                .map(|p| g.frame.start_index + p)
        })?;
        let last = self.groups[..=last_group].iter().rev().find_map(|g| {
            if last_offset < g.frame.items_main {
                return None;
            }
            let column = Self::column_at(g, last_offset);
            g.map.last_starting(column).map(|p| g.frame.start_index + p)
        })?;
        (first <= last).then(|| ItemRange::new(first, last))
    }

    fn get_adjacent(&self, current: ItemTarget, direction: Direction) -> Option<Adjacent> {
        if current.kind == TargetKind::Header {
            return (current.index < self.groups.len())
                .then(|| adjacent_header(current.index, self.groups.len(), direction));
        }
        let total = self.groups.last().map(|g| g.frame.end_index())?;
        let (pos, entry) = self.entry(current.index)?;
        let group = &self.groups[pos];
        let map = &group.map;
        let start = group.frame.start_index;
        let local = current.index - start;
        let last_local = group.frame.count - 1;
        let to_item = |p: usize| Some(Adjacent::Target(ItemTarget::item(start + p)));

        match direction {
            Direction::Home => return Some(Adjacent::Target(ItemTarget::item(0))),
            Direction::End => return Some(Adjacent::Target(ItemTarget::item(total - 1))),
            Direction::PageUp | Direction::PageDown => {
                let page = (self.placement.orientation.main(self.viewport) / group.cell_main)
                    .max(1) as usize;
                let column = if direction == Direction::PageUp {
                    entry.column.saturating_sub(page)
                } else {
                    (entry.column + page).min(map.column_count().saturating_sub(1))
                };
                return map
                    .nearest_in_column(column, entry.row)
                    .map_or_else(|| to_item(local), to_item);
            }
            _ => {}
        }

        match arrow_axis(self.placement.orientation, direction)? {
            (Axis::Cross, true) => {
                if let Some(p) = (0..entry.row)
                    .rev()
                    .find_map(|r| map.entry_at(entry.column, r))
                {
                    return to_item(p);
                }
                if local == 0 {
                    Some(Adjacent::Boundary { slot: usize::MAX })
                } else {
                    to_item(local - 1)
                }
            }
            (Axis::Cross, false) => {
                if let Some(p) = (entry.row + entry.rows..map.slots_per_column())
                    .find_map(|r| map.entry_at(entry.column, r))
                {
                    return to_item(p);
                }
                if local == last_local {
                    Some(Adjacent::Boundary { slot: 0 })
                } else {
                    to_item(local + 1)
                }
            }
            (Axis::Main, true) => (0..entry.column)
                .rev()
                .find_map(|c| map.nearest_in_column(c, entry.row))
                .map_or(Some(Adjacent::Boundary { slot: entry.row }), to_item),
            (Axis::Main, false) => (entry.column + entry.columns..map.column_count())
                .find_map(|c| map.nearest_in_column(c, entry.row))
                .map_or(Some(Adjacent::Boundary { slot: entry.row }), to_item),
        }
    }

    fn group_entry(&self, group: usize, from_end: bool, slot: usize) -> Option<usize> {
        let g = self.groups.get(group)?;
        if g.frame.count == 0 {
            return None;
        }
        let column = if from_end {
            g.map.column_count().saturating_sub(1)
        } else {
            0
        };
        let p = g
            .map
            .nearest_in_column(column, slot)
            .unwrap_or(if from_end { g.frame.count - 1 } else { 0 });
        Some(g.frame.start_index + p)
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
        let column = Self::column_at(group, main);
        let row = ((cross - group.frame.items_cross) / group.cell_cross as u64) as usize;
        match group.map.entry_at(column, row) {
            Some(p) => {
                let entry = &group.map.entries()[p];
                let index = start + p;
                let entry_cross = group.frame.items_cross + entry.row as u64 * group.cell_cross as u64;
                let size = (entry.rows as u32).saturating_mul(group.cell_cross);
                HitTestResult {
                    index: Some(index),
                    insert_after_index: insert_after(index, cross, entry_cross, size),
                }
            }
            None => HitTestResult {
                index: None,
                insert_after_index: group
                    .map
                    .last_starting(column)
                    .map(|p| start + p)
                    .or(start.checked_sub(1)),
            },
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
    use alloc::vec;

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

    fn run(layout: &mut CellSpanningLayout, groups: &[Group], viewport: Size) -> Result<()> {
        run_in(layout, groups, viewport, &mut StyleRegistry::new(0))
    }

    fn run_in(
        layout: &mut CellSpanningLayout,
        groups: &[Group],
        viewport: Size,
        styles: &mut StyleRegistry,
    ) -> Result<()> {
        layout.initialize(styles);
        loop {
            let mut info = JobInfo::new(2, 0);
            let mut ctx = LayoutContext {
                groups,
                headers: false,
                viewport,
                styles: &mut *styles,
            };
            match layout.prepare_layout(&mut ctx, &mut info)? {
                LayoutProgress::Ready => return Ok(()),
                LayoutProgress::Yielded => {}
                LayoutProgress::NeedsMeasure(t) => {
                    layout.provide_measurement(t, Size::new(100, 100));
                }
                LayoutProgress::Hidden => panic!("hidden"),
            }
        }
    }

    fn sized(sizes: Vec<(f64, f64)>) -> CellSpanningOptions {
        CellSpanningOptions::new()
            .with_group_info(|_| GroupInfo {
                cell_width: 100.0,
                cell_height: 100.0,
            })
            .with_item_info(move |i| {
                let (w, h) = sizes[i];
                ItemInfo::new(w, h)
            })
    }

    fn placements(layout: &CellSpanningLayout, group: usize) -> Vec<(usize, usize, usize)> {
        layout
            .occupancy_map(group)
            .unwrap()
            .entries()
            .iter()
            .map(|e| (e.column, e.row, e.rows))
            .collect()
    }

    #[test]
    fn greedy_placement_scenario() {
        let options = sized(vec![
            (100.0, 100.0),
            (100.0, 100.0),
            (100.0, 200.0),
            (100.0, 100.0),
        ]);
        let mut layout = CellSpanningLayout::new(options);
        run(&mut layout, &groups(&[4]), Size::new(1000, 200)).unwrap();

        assert_eq!(layout.occupancy_map(0).unwrap().slots_per_column(), 2);
        assert_eq!(
            placements(&layout, 0),
            [(0, 0, 1), (0, 1, 1), (1, 0, 2), (2, 0, 1)]
        );
        assert_eq!(layout.occupancy_map_item_count(), 4);
        assert_eq!(layout.item_bounds(2), Some(Bounds::new(100, 0, 100, 200)));
        assert_eq!(layout.content_extent(), 300);
    }

    #[test]
    fn placement_never_backtracks() {
        // The tall item leaves a hole at (0, 1) that the following 1x1 item does not fill.
        let options = sized(vec![(100.0, 100.0), (100.0, 200.0), (100.0, 100.0)]);
        let mut layout = CellSpanningLayout::new(options);
        run(&mut layout, &groups(&[3]), Size::new(1000, 200)).unwrap();
        assert_eq!(placements(&layout, 0), [(0, 0, 1), (1, 0, 2), (2, 0, 1)]);

        let options = sized(vec![(100.0, 200.0), (100.0, 100.0), (100.0, 200.0), (100.0, 100.0)]);
        let mut layout = CellSpanningLayout::new(options);
        run(&mut layout, &groups(&[4]), Size::new(1000, 200)).unwrap();
        assert_eq!(
            placements(&layout, 0),
            [(0, 0, 2), (1, 0, 1), (2, 0, 2), (3, 0, 1)]
        );
    }

    #[test]
    fn column_break_and_overflow() {
        let options = CellSpanningOptions::new()
            .with_group_info(|_| GroupInfo {
                cell_width: 100.0,
                cell_height: 100.0,
            })
            .with_item_info(|i| match i {
                1 => ItemInfo::new(100.0, 100.0).with_new_column(true),
                2 => ItemInfo::new(100.0, 300.0),
                _ => ItemInfo::new(100.0, 100.0),
            });
        let mut layout = CellSpanningLayout::new(options);
        let mut styles = StyleRegistry::new(0);
        run_in(&mut layout, &groups(&[3]), Size::new(1000, 200), &mut styles).unwrap();
        assert_eq!(placements(&layout, 0), [(0, 0, 1), (1, 0, 1), (2, 0, 3)]);
        assert_eq!(layout.occupancy_map(0).unwrap().overflow_rows(), 1);

        // Two rows fit the column; the overflowing span adds a third.
        assert_eq!(layout.cross_extent(), 300);
        let class = layout.class_name().unwrap();
        let rule = styles.rule(class, "").unwrap();
        assert_eq!(rule.declaration("width"), Some("300px"));
        assert_eq!(rule.declaration("height"), Some("300px"));
    }

    #[test]
    fn cross_extent_without_overflow_is_the_column() {
        let options = sized(vec![(100.0, 100.0); 3]);
        let mut layout = CellSpanningLayout::new(options);
        run(&mut layout, &groups(&[3]), Size::new(1000, 250)).unwrap();
        assert_eq!(layout.occupancy_map(0).unwrap().overflow_rows(), 0);
        assert_eq!(layout.cross_extent(), 200);
    }

    #[test]
    fn empty_groups_lay_out_without_a_cell_size() {
        let mut layout = CellSpanningLayout::new(CellSpanningOptions::new());
        run(&mut layout, &groups(&[0, 0]), Size::new(1000, 200)).unwrap();
        assert_eq!(layout.group_count(), 2);
        assert_eq!(layout.occupancy_map_item_count(), 0);
        assert_eq!(layout.content_extent(), 0);
        assert_eq!(layout.cross_extent(), 0);
        assert_eq!(layout.items_from_range(0, 100), None);

        // The callback is not consulted for a group with nothing to place.
        let options = CellSpanningOptions::new().with_group_info(|_| GroupInfo {
            cell_width: 0.0,
            cell_height: 0.0,
        });
        let mut layout = CellSpanningLayout::new(options);
        run(&mut layout, &groups(&[0]), Size::new(1000, 200)).unwrap();
        assert_eq!(layout.group_count(), 1);
    }

    #[test]
    fn invalid_item_info_aborts_the_pass() {
        let options = CellSpanningOptions::new()
            .with_group_info(|_| GroupInfo {
                cell_width: 100.0,
                cell_height: 100.0,
            })
            .with_item_info(|i| {
                if i == 2 {
                    ItemInfo::new(f64::NAN, 100.0)
                } else {
                    ItemInfo::new(100.0, 100.0)
                }
            });
        let mut layout = CellSpanningLayout::new(options);
        let err = run(&mut layout, &groups(&[4]), Size::new(1000, 200)).unwrap_err();
        assert!(matches!(err, Error::InvalidItemInfo { index: 2, .. }));
        assert!(err.is_configuration());
        assert_eq!(layout.occupancy_map_item_count(), 0);
        assert_eq!(layout.item_bounds(0), None);
    }

    #[test]
    fn invalid_group_info_is_reported() {
        let options = CellSpanningOptions::new().with_group_info(|_| GroupInfo {
            cell_width: 0.0,
            cell_height: 100.0,
        });
        let mut layout = CellSpanningLayout::new(options);
        let err = run(&mut layout, &groups(&[1]), Size::new(1000, 200)).unwrap_err();
        assert!(matches!(err, Error::InvalidGroupInfo { group: 0, .. }));
    }

    #[test]
    fn measured_cell_without_callbacks() {
        let mut layout = CellSpanningLayout::new(CellSpanningOptions::new());
        run(&mut layout, &groups(&[3]), Size::new(1000, 250)).unwrap();
        // 100x100 measured cell, two rows fit in 250.
        assert_eq!(placements(&layout, 0), [(0, 0, 1), (0, 1, 1), (1, 0, 1)]);
    }

    #[test]
    fn range_queries_follow_columns() {
        let options = sized(vec![(100.0, 100.0); 6]);
        let mut layout = CellSpanningLayout::new(options);
        run(&mut layout, &groups(&[6]), Size::new(1000, 200)).unwrap();
        assert_eq!(layout.items_from_range(0, 99), Some(ItemRange::new(0, 1)));
        assert_eq!(layout.items_from_range(150, 250), Some(ItemRange::new(2, 5)));
        assert_eq!(layout.items_from_range(400, 500), None);

        let right = layout.get_adjacent(ItemTarget::item(1), Direction::Right);
        assert_eq!(right, Some(Adjacent::Target(ItemTarget::item(3))));
        let right = layout.get_adjacent(ItemTarget::item(5), Direction::Right);
        assert_eq!(right, Some(Adjacent::Boundary { slot: 1 }));
        let up = layout.get_adjacent(ItemTarget::item(3), Direction::Up);
        assert_eq!(up, Some(Adjacent::Target(ItemTarget::item(2))));

        let hit = layout.hit_test(Point::new(150, 160));
        assert_eq!(hit.index, Some(3));
        assert_eq!(hit.insert_after_index, Some(3));
    }

    #[test]
    fn yielding_placement_matches_unbounded_placement() {
        let sizes: Vec<(f64, f64)> = (0..40)
            .map(|i| match i % 5 {
                0 => (200.0, 100.0),
                3 => (100.0, 200.0),
                _ => (100.0, 100.0),
            })
            .collect();
        let g = groups(&[15, 25]);

        let mut sliced = CellSpanningLayout::new(sized(sizes.clone()));
        run(&mut sliced, &g, Size::new(1000, 300)).unwrap();

        let mut whole = CellSpanningLayout::new(sized(sizes));
        let mut styles = StyleRegistry::new(1);
        whole.initialize(&mut styles);
        let mut ctx = LayoutContext {
            groups: &g,
            headers: false,
            viewport: Size::new(1000, 300),
            styles: &mut styles,
        };
        let progress = whole
            .prepare_layout(&mut ctx, &mut JobInfo::unbounded(0))
            .unwrap();
        assert_eq!(progress, LayoutProgress::Ready);

        for i in 0..40 {
            assert_eq!(sliced.item_bounds(i), whole.item_bounds(i), "item {i}");
        }
        assert_eq!(sliced.occupancy_map_item_count(), 40);
    }
}
