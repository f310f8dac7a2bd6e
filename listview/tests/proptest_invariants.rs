//! Property-based invariant tests for the group model and the layouts.
//!
//! These hold for **any** group sizes, viewport and item sizes:
//!
//! 1. Rebuilt groups tile the flat item index space without gaps.
//! 2. `group_from_item` returns the group that contains the item.
//! 3. `group_from_offset` returns the last group starting at or before the offset.
//!    Incremental group and item notifications keep 1 and 2 true and the sequence identical
//!    to the source after every batch.
//! 4. Occupancy-map placements never claim the same cell twice.
//! 5. Uniform layouts are deterministic for an unchanged snapshot.
//! 6. Uniform item bounds never overlap and stay inside the content extent.
//! 7. `items_from_range` over an item's own span includes that item.

use listview::testing::VecSource;
use listview::{
    Bounds, DataSource, GridOptions, Group, GroupsContainer, HeaderPosition, JobInfo, Layout, LayoutContext,
    LayoutProgress, ListOptions, OccupancyMap, Orientation, Size, StyleRegistry, TargetKind,
    UniformLayout,
};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn group_sizes() -> impl Strategy<Value = Vec<usize>> {
    proptest::collection::vec(0usize..=12, 1..=6)
}

/// A source mutation; positions are reduced modulo the current length when applied.
#[derive(Clone, Debug)]
enum Edit {
    InsertGroup(usize, usize),
    RemoveGroup(usize),
    MoveGroup(usize, usize),
    ResizeGroup(usize, usize),
    InsertItem(usize),
    RemoveItem(usize),
    MoveItem(usize, usize),
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0usize..8, 0usize..=6).prop_map(|(at, size)| Edit::InsertGroup(at, size)),
        (0usize..8).prop_map(Edit::RemoveGroup),
        (0usize..8, 0usize..8).prop_map(|(from, to)| Edit::MoveGroup(from, to)),
        (0usize..8, 0usize..=10).prop_map(|(at, size)| Edit::ResizeGroup(at, size)),
        (0usize..64).prop_map(Edit::InsertItem),
        (0usize..64).prop_map(Edit::RemoveItem),
        (0usize..64, 0usize..64).prop_map(|(from, to)| Edit::MoveItem(from, to)),
    ]
}

fn apply(source: &mut VecSource, edit: &Edit) -> Vec<listview::Notification> {
    let groups = source.group_count().unwrap_or(0);
    let items = source.item_count();
    match *edit {
        Edit::InsertGroup(at, size) => source.insert_group(at % (groups + 1), size),
        Edit::RemoveGroup(at) if groups > 0 => source.remove_group(at % groups),
        Edit::MoveGroup(from, to) if groups > 0 => source.move_group(from % groups, to % groups),
        Edit::ResizeGroup(at, size) if groups > 0 => source.resize_group(at % groups, size),
        Edit::InsertItem(at) => source.insert_item(at % (items + 1)),
        Edit::RemoveItem(at) if items > 0 => source.remove_item(at % items),
        Edit::MoveItem(from, to) if items > 0 => source.move_item(from % items, to % items),
        _ => Vec::new(),
    }
}

fn assert_tiled(groups: &GroupsContainer) -> Result<(), TestCaseError> {
    let mut next = 0;
    for group in groups.groups() {
        prop_assert_eq!(group.start_index, next);
        next = group.end_index();
    }
    prop_assert_eq!(groups.item_count(), next);
    Ok(())
}

fn orientation_strategy() -> impl Strategy<Value = Orientation> {
    prop_oneof![Just(Orientation::Horizontal), Just(Orientation::Vertical)]
}

fn header_position_strategy() -> impl Strategy<Value = HeaderPosition> {
    prop_oneof![Just(HeaderPosition::Top), Just(HeaderPosition::Left)]
}

fn size_strategy(min: u32, max: u32) -> impl Strategy<Value = Size> {
    (min..=max, min..=max).prop_map(|(w, h)| Size::new(w, h))
}

fn rebuilt(sizes: &[usize]) -> GroupsContainer {
    let source = VecSource::grouped(sizes);
    let mut groups = GroupsContainer::new();
    groups.rebuild(&source);
    groups
}

fn prepare(
    layout: &mut dyn Layout,
    groups: &[Group],
    viewport: Size,
    item: Size,
    header: Size,
) -> Result<(), TestCaseError> {
    let mut styles = StyleRegistry::new(0);
    layout.initialize(&mut styles);
    for _ in 0..64 {
        let mut ctx = LayoutContext {
            groups,
            headers: true,
            viewport,
            styles: &mut styles,
        };
        let mut info = JobInfo::unbounded(0);
        match layout.prepare_layout(&mut ctx, &mut info) {
            Ok(LayoutProgress::Ready) => return Ok(()),
            Ok(LayoutProgress::Yielded) => {}
            Ok(LayoutProgress::NeedsMeasure(t)) if t.kind == TargetKind::Header => {
                layout.provide_measurement(t, header);
            }
            Ok(LayoutProgress::NeedsMeasure(t)) => layout.provide_measurement(t, item),
            Ok(LayoutProgress::Hidden) => return Err(TestCaseError::fail("viewport hidden")),
            Err(err) => return Err(TestCaseError::fail(format!("layout failed: {err}"))),
        }
    }
    Err(TestCaseError::fail("layout never became ready"))
}

fn overlaps(a: Bounds, b: Bounds) -> bool {
    a.x < b.right() && b.x < a.right() && a.y < b.bottom() && b.y < a.bottom()
}

fn all_bounds(layout: &dyn Layout, count: usize) -> Vec<Option<Bounds>> {
    (0..count).map(|i| layout.item_bounds(i)).collect()
}

fn uniform_strategy() -> impl Strategy<Value = (bool, Orientation, HeaderPosition)> {
    (any::<bool>(), orientation_strategy(), header_position_strategy())
}

fn uniform(list: bool, orientation: Orientation, position: HeaderPosition) -> UniformLayout {
    if list {
        UniformLayout::list(
            ListOptions::new()
                .with_orientation(orientation)
                .with_group_header_position(position),
        )
    } else {
        UniformLayout::grid(
            GridOptions::new()
                .with_orientation(orientation)
                .with_group_header_position(position),
        )
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1-3. Group model
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn groups_tile_the_item_space(sizes in group_sizes()) {
        let groups = rebuilt(&sizes);
        prop_assert_eq!(groups.len(), sizes.len());
        prop_assert_eq!(groups.item_count(), sizes.iter().sum::<usize>());

        let mut next = 0;
        for (group, &size) in groups.groups().iter().zip(&sizes) {
            prop_assert_eq!(group.start_index, next);
            prop_assert_eq!(group.count, size);
            next = group.end_index();
        }
    }

    #[test]
    fn group_from_item_finds_the_owner(sizes in group_sizes()) {
        let groups = rebuilt(&sizes);
        for index in 0..groups.item_count() {
            let owner = groups.group_from_item(index);
            prop_assert!(owner.is_some());
            let group = groups.group(owner.unwrap_or_default()).cloned();
            prop_assert!(
                group.as_ref().is_some_and(|g| g.contains_item(index)),
                "item {} resolved to {:?}", index, owner
            );
        }
    }

    #[test]
    fn group_from_offset_is_last_group_at_or_before(
        sizes in group_sizes(),
        spans in proptest::collection::vec(0u64..=300, 6),
        probe in 0u64..=2_000,
    ) {
        let mut groups = rebuilt(&sizes);
        let mut offset = 0;
        let offsets: Vec<u64> = spans
            .iter()
            .take(sizes.len())
            .map(|span| {
                let at = offset;
                offset += span;
                at
            })
            .collect();
        groups.set_offsets(offsets.iter().copied());

        let found = groups.group_from_offset(probe);
        let expected = offsets.iter().rposition(|&o| o <= probe).unwrap_or(0);
        prop_assert_eq!(found, Some(expected));
    }
}

proptest! {
    #[test]
    fn notifications_keep_groups_in_step_with_the_source(
        sizes in group_sizes(),
        edits in proptest::collection::vec(edit_strategy(), 1..=30),
    ) {
        let mut source = VecSource::grouped(&sizes);
        let mut groups = GroupsContainer::new();
        groups.rebuild(&source);

        for edit in &edits {
            for notification in apply(&mut source, edit) {
                groups.notify(&notification);
                assert_tiled(&groups)?;
            }
            prop_assert!(!groups.needs_reload(), "{:?} forced a reload", edit);

            let expected = source.group_count().unwrap_or(0);
            prop_assert_eq!(groups.len(), expected, "after {:?}", edit);
            for g in 0..expected {
                let descriptor = source.group(g);
                let group = groups.group(g);
                prop_assert_eq!(descriptor.as_ref().map(|d| d.key), group.map(|g| g.key), "key of {}", g);
                prop_assert_eq!(descriptor.as_ref().map(|d| d.size), group.map(|g| g.count), "size of {}", g);
            }
            prop_assert_eq!(groups.item_count(), source.item_count());

            for index in 0..groups.item_count() {
                let owner = groups.group_from_item(index);
                prop_assert!(
                    owner
                        .and_then(|g| groups.group(g))
                        .is_some_and(|g| g.contains_item(index)),
                    "item {} resolved to {:?} after {:?}", index, owner, edit
                );
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Occupancy map
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn placements_never_share_a_cell(
        slots in 1usize..=6,
        spans in proptest::collection::vec((1usize..=3, 1usize..=3, any::<bool>()), 1..=40),
    ) {
        let mut map = OccupancyMap::new(slots);
        for (index, &(columns, rows, new_column)) in spans.iter().enumerate() {
            let rows = rows.min(slots);
            let (column, row) = map.place(index, Size::new(10, 10), columns, rows, new_column);
            prop_assert!(row + rows <= slots, "item {} leaves its column", index);
            prop_assert_eq!(map.entry_at(column, row), Some(index));
        }

        let entries = map.entries();
        prop_assert_eq!(entries.len(), spans.len());
        for (i, a) in entries.iter().enumerate() {
            for b in &entries[i + 1..] {
                let apart = a.column + a.columns <= b.column
                    || b.column + b.columns <= a.column
                    || a.row + a.rows <= b.row
                    || b.row + b.rows <= a.row;
                prop_assert!(apart, "{:?} overlaps {:?}", a, b);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5-7. Uniform layouts
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn uniform_prepare_is_deterministic(
        sizes in group_sizes(),
        (list, orientation, position) in uniform_strategy(),
        viewport in size_strategy(50, 600),
        item in size_strategy(10, 120),
        header in size_strategy(10, 80),
    ) {
        let groups = rebuilt(&sizes);
        let count = groups.item_count();

        let mut first = uniform(list, orientation, position);
        prepare(&mut first, groups.groups(), viewport, item, header)?;
        let mut second = uniform(list, orientation, position);
        prepare(&mut second, groups.groups(), viewport, item, header)?;
        prop_assert_eq!(all_bounds(&first, count), all_bounds(&second, count));
        prop_assert_eq!(first.content_extent(), second.content_extent());

        // Preparing the same snapshot again leaves the geometry alone.
        prepare(&mut first, groups.groups(), viewport, item, header)?;
        prop_assert_eq!(all_bounds(&first, count), all_bounds(&second, count));
    }

    #[test]
    fn uniform_items_are_disjoint_and_in_extent(
        sizes in group_sizes(),
        (list, orientation, position) in uniform_strategy(),
        viewport in size_strategy(50, 600),
        item in size_strategy(10, 120),
        header in size_strategy(10, 80),
    ) {
        let groups = rebuilt(&sizes);
        let count = groups.item_count();
        let mut layout = uniform(list, orientation, position);
        prepare(&mut layout, groups.groups(), viewport, item, header)?;

        let extent = layout.content_extent();
        let bounds: Vec<Bounds> = all_bounds(&layout, count).into_iter().flatten().collect();
        prop_assert_eq!(bounds.len(), count);
        for (i, b) in bounds.iter().enumerate() {
            prop_assert!(b.main_end(orientation) <= extent, "item {} past extent {}", i, extent);
            for (j, other) in bounds.iter().enumerate().skip(i + 1) {
                prop_assert!(!overlaps(*b, *other), "items {} and {} overlap", i, j);
            }
        }
        prop_assert_eq!(layout.item_bounds(count), None);
    }

    #[test]
    fn items_from_range_covers_each_item(
        sizes in group_sizes(),
        (list, orientation, position) in uniform_strategy(),
        viewport in size_strategy(50, 600),
        item in size_strategy(10, 120),
        header in size_strategy(10, 80),
    ) {
        let groups = rebuilt(&sizes);
        let mut layout = uniform(list, orientation, position);
        prepare(&mut layout, groups.groups(), viewport, item, header)?;

        for index in 0..groups.item_count() {
            let Some(b) = layout.item_bounds(index) else {
                return Err(TestCaseError::fail(format!("item {index} has no bounds")));
            };
            let range = layout.items_from_range(b.main_start(orientation), b.main_end(orientation) - 1);
            prop_assert!(
                range.is_some_and(|r| r.contains(index)),
                "item {} not in {:?}", index, range
            );
        }
    }
}
