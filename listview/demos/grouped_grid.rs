// Example: a grouped grid driven frame by frame, with an edit and a scroll.
use listview::testing::{StaticRenderer, VecSource};
use listview::{ContentsView, GridOptions, LayoutOptions, Orientation, Size, ViewOptions};

fn run_frames(view: &mut ContentsView<VecSource, StaticRenderer>, now: &mut u64) {
    for _ in 0..200 {
        view.with_renderer(|renderer, tree| renderer.flush(tree));
        let pending = view.pump(*now, 500);
        *now += 16;
        if !pending {
            break;
        }
    }
}

fn main() {
    let options = ViewOptions::new(LayoutOptions::Grid(
        GridOptions::new().with_orientation(Orientation::Vertical),
    ));
    let mut view = ContentsView::new(
        VecSource::grouped(&[12, 40, 7, 60]),
        StaticRenderer::new(Size::new(120, 90), Size::new(480, 40)).deferred(),
        options,
    );
    view.set_viewport(Size::new(480, 360));
    view.relayout();

    let mut now = 0;
    run_frames(&mut view, &mut now);
    println!(
        "state={} extent={:?} visible={:?}..={:?} realized={} containers={}",
        view.state(),
        view.content_extent(),
        view.first_displayed(),
        view.last_displayed(),
        view.items().count(),
        view.container_count()
    );

    // Edits arrive as notification batches from the data source.
    for notification in view.source_mut().insert_item(3) {
        view.notify(notification);
    }
    run_frames(&mut view, &mut now);
    println!("after insert: state={} version={}", view.state(), view.version());

    view.on_scroll(1_500, now);
    run_frames(&mut view, &mut now);
    println!(
        "after scroll: visible={:?}..={:?} expanded={:?} realized={}",
        view.first_displayed(),
        view.last_displayed(),
        view.expanded_range(),
        view.items().count()
    );

    for event in view.take_events() {
        println!("event: {event:?}");
    }
    for change in view.flush_styles() {
        println!("style: {change:?}");
    }
}
