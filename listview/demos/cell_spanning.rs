// Example: a cell-spanning layout with mixed item sizes and keyboard navigation.
use listview::testing::{StaticRenderer, VecSource};
use listview::{
    CellSpanningOptions, ContentsView, Direction, GroupInfo, ItemInfo, ItemTarget, LayoutOptions,
    Size, ViewOptions,
};

fn main() {
    let layout = CellSpanningOptions::new()
        .with_group_info(|_| GroupInfo {
            cell_width: 80.0,
            cell_height: 80.0,
        })
        // Every fifth item is a 2x2 tile.
        .with_item_info(|index| {
            if index % 5 == 0 {
                ItemInfo::new(160.0, 160.0)
            } else {
                ItemInfo::new(80.0, 80.0)
            }
        });
    let mut view = ContentsView::new(
        VecSource::grouped(&[9, 14]),
        StaticRenderer::new(Size::new(80, 80), Size::new(200, 30)),
        ViewOptions::new(LayoutOptions::CellSpanning(layout)),
    );
    view.set_viewport(Size::new(800, 400));
    view.relayout();

    let mut now = 0;
    for _ in 0..200 {
        view.with_renderer(|renderer, tree| renderer.flush(tree));
        if !view.pump(now, 1_000) {
            break;
        }
        now += 16;
    }
    println!("state={} extent={:?}", view.state(), view.content_extent());

    for index in [0, 1, 5, 9] {
        println!("item {index}: {:?}", view.item_bounds(index));
    }

    let mut target = ItemTarget::item(0);
    for direction in [Direction::Right, Direction::Down, Direction::Right, Direction::End] {
        match view.get_adjacent(target, direction) {
            Ok(Some(next)) => {
                println!("{direction:?}: {} -> {}", target.index, next.index);
                target = next;
            }
            Ok(None) => println!("{direction:?}: stays at {}", target.index),
            Err(err) => println!("{direction:?}: {err}"),
        }
    }
}
