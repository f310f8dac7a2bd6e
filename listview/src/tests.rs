use crate::testing::{ManualAnimations, StaticRenderer, VecSource};
use crate::*;

use alloc::vec::Vec;

#[derive(Clone, Copy, Debug)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        // Deterministic, dependency-free PRNG for tests.
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    fn gen_range_u64(&mut self, start: u64, end_exclusive: u64) -> u64 {
        debug_assert!(start < end_exclusive);
        let span = end_exclusive - start;
        start + (self.next_u64() % span)
    }

    fn gen_range_usize(&mut self, start: usize, end_exclusive: usize) -> usize {
        self.gen_range_u64(start as u64, end_exclusive as u64) as usize
    }

    fn gen_range_u32(&mut self, start: u32, end_exclusive: u32) -> u32 {
        self.gen_range_u64(start as u64, end_exclusive as u64) as u32
    }
}

const VIEWPORT: Size = Size::new(400, 300);
const ITEM: Size = Size::new(100, 100);
const HEADER: Size = Size::new(400, 50);

fn options() -> ViewOptions {
    ViewOptions::new(LayoutOptions::Grid(
        GridOptions::new().with_orientation(Orientation::Vertical),
    ))
}

fn start<A: AnimationDriver>(
    mut view: ContentsView<VecSource, StaticRenderer, A>,
) -> ContentsView<VecSource, StaticRenderer, A> {
    view.set_viewport(VIEWPORT);
    view.relayout();
    view
}

/// A vertical grid: 4 items per row, 3 rows on screen.
fn grid_view(source: VecSource) -> ContentsView<VecSource, StaticRenderer> {
    start(ContentsView::new(
        source,
        StaticRenderer::new(ITEM, HEADER),
        options(),
    ))
}

fn deferred_view(source: VecSource) -> ContentsView<VecSource, StaticRenderer> {
    start(ContentsView::new(
        source,
        StaticRenderer::new(ITEM, HEADER).deferred(),
        options(),
    ))
}

fn settle_with<A: AnimationDriver>(
    view: &mut ContentsView<VecSource, StaticRenderer, A>,
    now: &mut u64,
    mut each: impl FnMut(&mut ContentsView<VecSource, StaticRenderer, A>),
) {
    for _ in 0..1_000 {
        each(view);
        view.with_renderer(|renderer, tree| renderer.flush(tree));
        let pending = view.pump(*now, 10_000);
        *now += 16;
        if !pending {
            return;
        }
    }
    panic!("view did not settle, state {}", view.state());
}

fn settle<A: AnimationDriver>(view: &mut ContentsView<VecSource, StaticRenderer, A>, now: &mut u64) {
    settle_with(view, now, |_| {});
}

fn send<A: AnimationDriver>(
    view: &mut ContentsView<VecSource, StaticRenderer, A>,
    batch: Vec<Notification>,
) {
    for notification in batch {
        view.notify(notification);
    }
}

/// Every element the view created is either under the surface or gone.
fn assert_no_orphans<A: AnimationDriver>(view: &ContentsView<VecSource, StaticRenderer, A>) {
    let reachable = view.tree().descendants(view.surface()).len();
    assert_eq!(view.tree().len(), reachable, "orphaned elements");
}

fn assert_records_match_source<A: AnimationDriver>(
    view: &ContentsView<VecSource, StaticRenderer, A>,
) {
    for (index, record) in view.items().iter() {
        let key = record.item.as_ref().map(|h| h.key);
        assert_eq!(key, view.source().key_at(index), "record at {index}");
        let container = view.get_container(index);
        assert!(container.is_some(), "realized item {index} has no container");
        let node = record.item_box.unwrap_or(record.element);
        assert_eq!(view.tree().parent(node), container, "item {index} attached elsewhere");
    }
}

#[test]
fn build_realizes_the_first_page_and_completes() {
    let mut view = grid_view(VecSource::ungrouped(100));
    assert_eq!(view.state(), ViewState::Building);
    let mut now = 0;
    settle(&mut view, &mut now);

    assert_eq!(view.state(), ViewState::Completed);
    assert_eq!(view.first_displayed(), Some(0));
    assert_eq!(view.last_displayed(), Some(11));
    // One page of prefetch below the viewport, whole blocks expanded.
    assert_eq!(view.items().count(), 24);
    assert!((0..24).all(|i| view.items().is_realized(i)));
    assert!(!view.items().is_realized(24));
    assert_eq!(view.expanded_range(), ExpandedRange::new(0, 30));
    assert_eq!(view.container_count(), 30);
    assert_eq!(view.content_extent(), Ok(2500));

    let container = view.get_container(5).unwrap();
    assert_eq!(view.tree().bounds(container), Some(Bounds::new(100, 100, 100, 100)));
    // Unrealized containers of the expanded range are laid out too.
    let container = view.get_container(27).unwrap();
    assert_eq!(view.tree().bounds(container), Some(Bounds::new(300, 600, 100, 100)));

    let events = view.take_events();
    assert!(events.contains(&ViewEvent::LayoutComplete));
    assert!(events.contains(&ViewEvent::ViewComplete));
    assert!(view.layout_complete().is_none());
    assert_records_match_source(&view);
    assert_no_orphans(&view);
}

#[test]
fn element_lookups_walk_to_the_container() {
    let mut view = grid_view(VecSource::ungrouped(20));
    let mut now = 0;
    settle(&mut view, &mut now);

    let record = view.items().record_at(3).unwrap().clone();
    assert_eq!(view.index_of_element(record.element), Some(3));
    assert_eq!(view.container_from(record.element), record.container);
    assert_eq!(view.item_box_from(record.element), record.item_box);
    assert!(view.tree().has_class(record.element, classes::ITEM));

    let pending = view.request_item(3);
    assert!(pending.is_pending());
    assert_eq!(view.items().pending_requests(3), 1);
}

#[test]
fn scrolling_realizes_ahead_first_and_evicts_behind() {
    let options = options().with_max_deferred_item_cleanup(0);
    let mut view = start(ContentsView::new(
        VecSource::ungrouped(100),
        StaticRenderer::new(ITEM, HEADER),
        options,
    ));
    let mut now = 0;
    settle(&mut view, &mut now);
    view.with_renderer(|renderer, _| renderer.clear_log());

    view.on_scroll(1000, now);
    assert_eq!(view.state(), ViewState::Scrolling);
    assert!(view.is_scrolling());
    settle(&mut view, &mut now);

    assert_eq!(view.state(), ViewState::Completed);
    assert!(!view.is_scrolling());
    assert_eq!(view.first_displayed(), Some(40));
    assert_eq!(view.last_displayed(), Some(51));

    let mut expected: Vec<usize> = (40..=63).collect();
    expected.extend((28..40).rev());
    assert_eq!(view.renderer().rendered(), expected.as_slice());

    assert_eq!(view.expanded_range(), ExpandedRange::new(20, 70));
    assert!(!view.items().is_realized(0));
    assert!(view.items().is_realized(20));
    assert!((28..=63).all(|i| view.items().is_realized(i)));
    assert_eq!(view.container_count(), 50);
    assert_no_orphans(&view);
}

#[test]
fn onscreen_items_render_before_offscreen_ones() {
    let mut view = deferred_view(VecSource::ungrouped(100));
    let mut now = 0;

    // The representative item is still rendering.
    view.pump(now, 10_000);
    assert_eq!(view.state(), ViewState::LayingOut);
    assert_eq!(view.renderer().rendered(), [0]);

    view.with_renderer(|renderer, tree| renderer.flush(tree));
    view.pump(now, 10_000);
    assert_eq!(view.state(), ViewState::Realizing);
    let mut expected: Vec<usize> = alloc::vec![0];
    expected.extend(0..12);
    assert_eq!(view.renderer().rendered(), expected.as_slice());
    assert_eq!(view.pending_renders(), 12);
    assert_eq!(view.items().count(), 0);

    view.with_renderer(|renderer, tree| renderer.flush(tree));
    view.pump(now, 10_000);
    assert_eq!(view.items().count(), 12);
    expected.extend(12..24);
    assert_eq!(view.renderer().rendered(), expected.as_slice());

    now += 16;
    settle(&mut view, &mut now);
    assert_eq!(view.state(), ViewState::Completed);
    assert_eq!(view.items().count(), 24);
}

#[test]
fn renders_from_before_an_edit_are_discarded() {
    let mut view = deferred_view(VecSource::ungrouped(100));
    let mut now = 0;
    view.pump(now, 10_000);
    view.with_renderer(|renderer, tree| renderer.flush(tree));
    view.pump(now, 10_000);
    assert_eq!(view.pending_renders(), 12);
    let version = view.version();

    let batch = view.source_mut().insert_item(0);
    send(&mut view, batch);
    assert!(view.version() > version);
    assert_eq!(view.state(), ViewState::LayingOut);

    settle(&mut view, &mut now);
    assert_eq!(view.state(), ViewState::Completed);
    assert_eq!(view.items().count(), 24);
    assert_records_match_source(&view);
    assert_no_orphans(&view);
}

#[test]
fn edits_during_layout_cancel_it() {
    let mut view = deferred_view(VecSource::ungrouped(100));
    let mut now = 0;
    view.pump(now, 10_000);
    assert_eq!(view.state(), ViewState::LayingOut);

    view.begin_updating();
    let batch = view.source_mut().insert_item(5);
    send(&mut view, batch);
    assert_eq!(view.state(), ViewState::LayoutCanceled);
    // Nothing restarts while the host update is open.
    view.pump(now, 10_000);
    assert_eq!(view.state(), ViewState::LayoutCanceled);

    view.relayout();
    assert_eq!(view.state(), ViewState::LayingOut);
    view.end_updating();
    assert_eq!(view.state(), ViewState::LayingOut);

    settle(&mut view, &mut now);
    assert_eq!(view.state(), ViewState::Completed);
    assert_eq!(view.groups().item_count(), 101);
    assert_records_match_source(&view);
    assert_no_orphans(&view);
}

#[test]
fn stop_leaves_the_view_restartable() {
    let mut now = 0;

    let mut view = ContentsView::new(
        VecSource::ungrouped(50),
        StaticRenderer::new(ITEM, HEADER),
        options(),
    );
    view.stop();
    assert_eq!(view.state(), ViewState::Canceled);
    view.set_viewport(VIEWPORT);
    view.relayout();
    assert_eq!(view.state(), ViewState::Building);
    settle(&mut view, &mut now);
    assert_eq!(view.state(), ViewState::Completed);

    let mut view = grid_view(VecSource::ungrouped(50));
    view.stop();
    assert_eq!(view.state(), ViewState::Canceled);
    view.relayout();
    settle(&mut view, &mut now);
    assert_eq!(view.state(), ViewState::Completed);

    let mut view = deferred_view(VecSource::ungrouped(50));
    view.pump(now, 10_000);
    assert_eq!(view.state(), ViewState::LayingOut);
    view.stop();
    view.relayout();
    assert_eq!(view.state(), ViewState::LayingOut);
    settle(&mut view, &mut now);
    assert_eq!(view.state(), ViewState::Completed);
    assert_no_orphans(&view);

    let mut view = deferred_view(VecSource::ungrouped(50));
    view.pump(now, 10_000);
    view.with_renderer(|renderer, tree| renderer.flush(tree));
    view.pump(now, 10_000);
    assert_eq!(view.state(), ViewState::Realizing);
    assert_eq!(view.pending_renders(), 12);
    view.stop();
    assert_eq!(view.state(), ViewState::Canceled);
    assert_eq!(view.pending_renders(), 0);
    assert!(!view.has_pending_work());
    view.realize_page();
    assert_eq!(view.state(), ViewState::Realizing);
    settle(&mut view, &mut now);
    assert_eq!(view.state(), ViewState::Completed);
    assert_eq!(view.items().count(), 24);
    assert_no_orphans(&view);

    view.stop();
    view.relayout();
    assert_eq!(view.state(), ViewState::LayingOut);
    settle(&mut view, &mut now);
    assert_eq!(view.state(), ViewState::Completed);
    assert_records_match_source(&view);
}

#[test]
fn hidden_viewport_waits_for_a_size() {
    let mut view = ContentsView::new(
        VecSource::ungrouped(20),
        StaticRenderer::new(ITEM, HEADER),
        options(),
    );
    view.relayout();
    let mut now = 0;
    settle(&mut view, &mut now);
    assert_eq!(view.state(), ViewState::Created);
    assert_eq!(view.take_events(), [ViewEvent::ViewComplete]);
    assert_eq!(view.items().count(), 0);

    view.set_viewport(VIEWPORT);
    assert_eq!(view.state(), ViewState::Building);
    settle(&mut view, &mut now);
    assert_eq!(view.state(), ViewState::Completed);
    assert_eq!(view.items().count(), 20);
}

#[test]
fn invalid_item_info_fails_the_layout() {
    let layout = CellSpanningOptions::new()
        .with_group_info(|_| GroupInfo {
            cell_width: 100.0,
            cell_height: 100.0,
        })
        .with_item_info(|index| {
            if index == 5 {
                ItemInfo::new(0.0, 100.0)
            } else {
                ItemInfo::new(100.0, 100.0)
            }
        });
    let mut view = start(ContentsView::new(
        VecSource::ungrouped(20),
        StaticRenderer::new(ITEM, HEADER),
        ViewOptions::new(LayoutOptions::CellSpanning(layout)),
    ));
    let mut now = 0;
    settle(&mut view, &mut now);

    assert_eq!(view.state(), ViewState::Created);
    assert!(matches!(
        view.layout_error(),
        Some(Error::InvalidItemInfo { index: 5, .. })
    ));
    assert!(view.layout_error().unwrap().is_configuration());
    assert!(
        view.take_events()
            .iter()
            .any(|e| matches!(e, ViewEvent::LayoutFailed(Error::InvalidItemInfo { .. })))
    );
    assert!(matches!(
        view.items_from_range(0, 100),
        Err(Error::InvalidState {
            operation: "items_from_range",
            ..
        })
    ));
}

#[test]
fn cell_spanning_view_over_empty_groups_completes() {
    let mut view = start(ContentsView::new(
        VecSource::grouped(&[0, 0]),
        StaticRenderer::new(ITEM, HEADER),
        ViewOptions::new(LayoutOptions::CellSpanning(CellSpanningOptions::new())),
    ));
    let mut now = 0;
    settle(&mut view, &mut now);

    assert!(view.layout_error().is_none());
    assert_eq!(view.state(), ViewState::Completed);
    assert_eq!(view.items_from_range(0, 100), Ok(None));
    assert_eq!(view.first_displayed(), None);
    assert!(
        !view
            .take_events()
            .iter()
            .any(|e| matches!(e, ViewEvent::LayoutFailed(_)))
    );
    assert_no_orphans(&view);
}

#[test]
fn cell_spanning_view_survives_removing_every_item() {
    let mut view = start(ContentsView::new(
        VecSource::grouped(&[3, 2]),
        StaticRenderer::new(ITEM, HEADER),
        ViewOptions::new(LayoutOptions::CellSpanning(CellSpanningOptions::new())),
    ));
    let mut now = 0;
    settle(&mut view, &mut now);
    assert_eq!(view.state(), ViewState::Completed);

    for g in 0..2 {
        let batch = view.source_mut().resize_group(g, 0);
        send(&mut view, batch);
    }
    settle(&mut view, &mut now);

    assert!(view.layout_error().is_none());
    assert_eq!(view.state(), ViewState::Completed);
    assert_eq!(view.groups().item_count(), 0);
    assert_eq!(view.items().count(), 0);
    assert_no_orphans(&view);
}

#[test]
fn grouped_view_attaches_headers_and_crosses_groups() {
    let mut view = grid_view(VecSource::grouped(&[10, 0, 10]));
    assert!(view.get_adjacent(ItemTarget::item(0), Direction::Down).is_err());
    let mut now = 0;
    settle(&mut view, &mut now);
    assert_eq!(view.state(), ViewState::Completed);

    for g in 0..3 {
        let header = view.groups().group(g).and_then(|group| group.header).unwrap();
        assert!(view.tree().has_class(header, classes::HEADER));
        assert_eq!(view.tree().parent(header), view.header_container(g));
    }
    assert_eq!(view.first_displayed(), Some(0));
    assert_eq!(view.last_displayed(), Some(9));
    assert_eq!(view.groups().group(2).map(|g| g.offset), Some(400));

    // Item 9 sits in the last row of group 0, slot 1; group 1 is empty.
    assert_eq!(
        view.get_adjacent(ItemTarget::item(9), Direction::Down),
        Ok(Some(ItemTarget::item(11)))
    );
    assert_eq!(
        view.get_adjacent(ItemTarget::item(11), Direction::Up),
        Ok(Some(ItemTarget::item(9)))
    );
    assert_eq!(
        view.get_adjacent(ItemTarget::item(1), Direction::Up),
        Ok(None)
    );
    assert_eq!(
        view.get_adjacent(ItemTarget::item(4), Direction::Right),
        Ok(Some(ItemTarget::item(5)))
    );
    assert_records_match_source(&view);
    assert_no_orphans(&view);
}

#[test]
fn aria_pass_links_headers_and_items_in_reading_order() {
    let mut view = grid_view(VecSource::grouped(&[3, 3]));
    let mut now = 0;
    settle(&mut view, &mut now);
    assert_eq!(view.state(), ViewState::Completed);

    let tree = view.tree();
    let header = |g: usize| view.groups().group(g).and_then(|group| group.header).unwrap();
    let item = |i: usize| view.items().item_at(i).unwrap();
    let id = |element| tree.attribute(element, "id").unwrap();

    assert_eq!(tree.attribute(header(0), "role"), Some("heading"));
    assert!(id(header(1)).ends_with("-h1"));
    assert!(id(item(4)).ends_with("-i4"));
    assert_eq!(tree.attribute(item(4), "role"), Some("option"));
    assert_eq!(tree.attribute(item(4), "aria-setsize"), Some("6"));
    assert_eq!(tree.attribute(item(4), "aria-posinset"), Some("5"));

    assert_eq!(tree.attribute(header(0), "aria-flowto"), Some(id(item(0))));
    assert_eq!(tree.attribute(item(2), "aria-flowto"), Some(id(header(1))));
    assert_eq!(tree.attribute(header(1), "aria-flowto"), Some(id(item(3))));
    assert_eq!(tree.attribute(item(5), "aria-flowto"), None);
}

#[test]
fn list_items_use_the_configured_role() {
    let options = ViewOptions::new(LayoutOptions::List(
        ListOptions::new().with_orientation(Orientation::Vertical),
    ))
    .with_item_role(ItemRole::ListItem);
    let mut view = start(ContentsView::new(
        VecSource::ungrouped(5),
        StaticRenderer::new(ITEM, HEADER),
        options,
    ));
    let mut now = 0;
    settle(&mut view, &mut now);
    let element = view.items().item_at(0).unwrap();
    assert_eq!(view.tree().attribute(element, "role"), Some("listitem"));
    // A list stretches its single item across the viewport.
    let container = view.get_container(1).unwrap();
    assert_eq!(view.tree().bounds(container), Some(Bounds::new(0, 100, 400, 100)));
}

#[test]
fn appends_past_the_expanded_range_only_lay_out_new_containers() {
    let mut view = grid_view(VecSource::ungrouped(100));
    let mut now = 0;
    settle(&mut view, &mut now);
    view.take_events();
    let realized = view.items().indexes();

    let batch = view.source_mut().insert_item(100);
    send(&mut view, batch);
    assert_eq!(view.state(), ViewState::LayingOutNewContainers);
    settle(&mut view, &mut now);

    assert_eq!(view.state(), ViewState::Completed);
    assert!(view.take_events().contains(&ViewEvent::ViewComplete));
    assert_eq!(view.items().indexes(), realized);
    assert_eq!(view.groups().item_count(), 101);
    assert!(view.item_bounds(100).unwrap().is_some());

    let batch = view.source_mut().insert_item(0);
    send(&mut view, batch);
    assert_eq!(view.state(), ViewState::LayingOut);
    settle(&mut view, &mut now);
    assert_records_match_source(&view);
}

#[test]
fn edits_animate_and_buffer_notifications_until_the_animation_ends() {
    let mut view = start(ContentsView::with_animation_driver(
        VecSource::ungrouped(100),
        StaticRenderer::new(ITEM, HEADER),
        ManualAnimations::new(),
        options(),
    ));
    let mut now = 0;
    settle(&mut view, &mut now);
    assert!(view.animations().plans().is_empty());

    let batch = view.source_mut().remove_item(0);
    send(&mut view, batch);
    for _ in 0..10 {
        if view.state() == ViewState::RealizingAnimating {
            break;
        }
        view.pump(now, 10_000);
    }
    assert_eq!(view.state(), ViewState::RealizingAnimating);
    let plan = &view.animations().plans()[0];
    assert_eq!(plan.removals.len(), 1);
    assert!(!plan.moves.is_empty());

    // Arrives mid-animation: held back until the animation finished.
    let version = view.version();
    let batch = view.source_mut().remove_item(0);
    send(&mut view, batch);
    assert_eq!(view.state(), ViewState::RealizingAnimating);
    assert_eq!(view.version(), version);

    settle_with(&mut view, &mut now, |view| {
        view.animations_mut().finish();
    });
    assert_eq!(view.state(), ViewState::Completed);
    assert_eq!(view.animations().plans().len(), 2);
    assert_eq!(view.groups().item_count(), 98);
    assert_eq!(
        view.items().item_data_at(0).map(|h| h.key),
        view.source().key_at(0)
    );
    assert_records_match_source(&view);
    assert_no_orphans(&view);
}

#[test]
fn disabled_animations_apply_edits_directly() {
    let mut view = start(ContentsView::with_animation_driver(
        VecSource::ungrouped(40),
        StaticRenderer::new(ITEM, HEADER),
        ManualAnimations::new(),
        options().with_animations_enabled(false),
    ));
    let mut now = 0;
    settle(&mut view, &mut now);
    let batch = view.source_mut().remove_item(3);
    send(&mut view, batch);
    settle(&mut view, &mut now);
    assert_eq!(view.state(), ViewState::Completed);
    assert!(view.animations().plans().is_empty());
    assert_records_match_source(&view);
    assert_no_orphans(&view);
}

#[test]
fn group_edits_keep_realized_items_consistent() {
    let mut view = grid_view(VecSource::grouped(&[5, 5, 5]));
    let mut now = 0;
    settle(&mut view, &mut now);

    let batch = view.source_mut().insert_group(1, 3);
    send(&mut view, batch);
    settle(&mut view, &mut now);
    assert_eq!(view.groups().len(), 4);
    assert_records_match_source(&view);

    let batch = view.source_mut().remove_group(0);
    send(&mut view, batch);
    settle(&mut view, &mut now);
    assert_eq!(view.groups().item_count(), 13);
    assert_records_match_source(&view);

    let batch = view.source_mut().resize_group(0, 1);
    send(&mut view, batch);
    settle(&mut view, &mut now);
    assert_eq!(view.groups().item_count(), 11);
    assert_eq!(view.state(), ViewState::Completed);
    assert_records_match_source(&view);
    assert_no_orphans(&view);
    for g in 0..view.groups().len() {
        assert!(view.groups().group(g).and_then(|group| group.header).is_some());
    }
}

#[test]
fn dispose_removes_everything() {
    let mut view = grid_view(VecSource::grouped(&[4, 4]));
    let mut now = 0;
    settle(&mut view, &mut now);
    assert!(!view.styles().is_empty());

    let changes = view.dispose();
    assert!(!changes.is_empty());
    assert!(view.styles().is_empty());
    assert_eq!(view.tree().len(), 1);
    assert_eq!(view.state(), ViewState::Canceled);
}

#[test]
fn random_edits_and_scrolls_settle_consistently() {
    for seed in 0..8u64 {
        let mut rng = Lcg::new(seed);
        let options = options().with_max_deferred_item_cleanup(rng.gen_range_usize(0, 20));
        let mut view = start(ContentsView::new(
            VecSource::ungrouped(200),
            StaticRenderer::new(ITEM, HEADER),
            options,
        ));
        let mut now = 0;
        settle(&mut view, &mut now);

        for _ in 0..40 {
            let count = view.source().item_count();
            let batch = match rng.gen_range_u32(0, 6) {
                0 => view.source_mut().insert_item(rng.gen_range_usize(0, count + 1)),
                1 if count > 1 => view.source_mut().remove_item(rng.gen_range_usize(0, count)),
                2 if count > 1 => {
                    let from = rng.gen_range_usize(0, count);
                    let to = rng.gen_range_usize(0, count);
                    view.source_mut().move_item(from, to)
                }
                3 if count > 0 => view.source_mut().change_item(rng.gen_range_usize(0, count)),
                4 => {
                    let extent = view.content_extent().unwrap_or(0).max(1);
                    view.on_scroll(rng.gen_range_u64(0, extent), now);
                    Vec::new()
                }
                _ => Vec::new(),
            };
            send(&mut view, batch);
            for _ in 0..rng.gen_range_usize(0, 4) {
                view.pump(now, rng.gen_range_u32(1, 40));
                now += rng.gen_range_u64(1, 40);
            }
        }
        settle(&mut view, &mut now);

        assert_eq!(view.state(), ViewState::Completed, "seed {seed}");
        assert_eq!(view.groups().item_count(), view.source().item_count());
        if let (Some(first), Some(last)) = (view.first_displayed(), view.last_displayed()) {
            assert!((first..=last).all(|i| view.items().is_realized(i)), "seed {seed}");
            assert!(view.expanded_range().covers(ItemRange::new(first, last)));
        }
        assert_records_match_source(&view);
        assert_no_orphans(&view);
    }
}

#[test]
fn random_group_edits_and_scrolls_settle_consistently() {
    for seed in 0..8u64 {
        let mut rng = Lcg::new(seed ^ 0x9e37_79b9);
        let sizes: Vec<usize> = (0..rng.gen_range_usize(1, 6))
            .map(|_| rng.gen_range_usize(0, 15))
            .collect();
        let options = options().with_max_deferred_item_cleanup(rng.gen_range_usize(0, 20));
        let mut view = start(ContentsView::new(
            VecSource::grouped(&sizes),
            StaticRenderer::new(ITEM, HEADER),
            options,
        ));
        let mut now = 0;
        settle(&mut view, &mut now);

        for _ in 0..40 {
            let count = view.source().item_count();
            let groups = view.source().group_count().unwrap_or(0);
            let batch = match rng.gen_range_u32(0, 9) {
                0 => {
                    let at = rng.gen_range_usize(0, groups + 1);
                    view.source_mut().insert_group(at, rng.gen_range_usize(0, 8))
                }
                1 if groups > 1 => view.source_mut().remove_group(rng.gen_range_usize(0, groups)),
                2 if groups > 0 => {
                    let at = rng.gen_range_usize(0, groups);
                    view.source_mut().resize_group(at, rng.gen_range_usize(0, 12))
                }
                3 if groups > 1 => {
                    let from = rng.gen_range_usize(0, groups);
                    let to = rng.gen_range_usize(0, groups);
                    view.source_mut().move_group(from, to)
                }
                4 => view.source_mut().insert_item(rng.gen_range_usize(0, count + 1)),
                5 if count > 0 => view.source_mut().remove_item(rng.gen_range_usize(0, count)),
                6 if count > 1 => {
                    let from = rng.gen_range_usize(0, count);
                    let to = rng.gen_range_usize(0, count);
                    view.source_mut().move_item(from, to)
                }
                7 => {
                    let extent = view.content_extent().unwrap_or(0).max(1);
                    view.on_scroll(rng.gen_range_u64(0, extent), now);
                    Vec::new()
                }
                _ => Vec::new(),
            };
            send(&mut view, batch);
            for _ in 0..rng.gen_range_usize(0, 4) {
                view.pump(now, rng.gen_range_u32(1, 40));
                now += rng.gen_range_u64(1, 40);
            }
        }
        settle(&mut view, &mut now);

        assert_eq!(view.state(), ViewState::Completed, "seed {seed}");
        assert_eq!(view.groups().item_count(), view.source().item_count());
        assert_eq!(
            Some(view.groups().len()),
            view.source().group_count(),
            "seed {seed}"
        );
        for g in 0..view.groups().len() {
            let group = view.groups().group(g);
            assert_eq!(
                group.map(|group| group.key),
                view.source().group_key(g),
                "seed {seed} group {g}"
            );
            assert!(group.and_then(|group| group.header).is_some(), "seed {seed} group {g}");
        }
        if let (Some(first), Some(last)) = (view.first_displayed(), view.last_displayed()) {
            assert!((first..=last).all(|i| view.items().is_realized(i)), "seed {seed}");
            assert!(view.expanded_range().covers(ItemRange::new(first, last)));
        }
        assert_records_match_source(&view);
        assert_no_orphans(&view);
    }
}
