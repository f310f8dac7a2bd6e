// Example: driving a view with the frame controller, a smooth scroll and an animated edit.
use listview::testing::{StaticRenderer, VecSource};
use listview::{ListOptions, LayoutOptions, Orientation, Size, ViewOptions};
use listview_adapter::{Align, Controller, Easing};

fn main() {
    let options = ViewOptions::new(LayoutOptions::List(
        ListOptions::new().with_orientation(Orientation::Vertical),
    ));
    let mut c = Controller::new(
        VecSource::ungrouped(10_000),
        StaticRenderer::new(Size::new(320, 48), Size::new(320, 32)),
        options,
    );
    c.on_viewport_size(Size::new(320, 480));

    let mut now = 0;
    let mut frames = 0;
    loop {
        let frame = c.tick(now);
        frames += 1;
        now += 16;
        if let Some(offset) = frame.scroll_offset {
            println!("frame {frames}: scroll to {offset}");
        }
        for event in &frame.events {
            println!("frame {frames}: {event:?}");
        }
        if frames == 20 {
            let target = c.start_tween_to_index(5_000, Align::Center, now, 400, Easing::EaseInOutCubic);
            println!("tween target={target:?}");
        }
        if frames == 80 {
            let batch = c.view_mut().source_mut().remove_item(5_001);
            for notification in batch {
                c.view_mut().notify(notification);
            }
        }
        if !frame.pending && frames > 80 {
            break;
        }
    }
    println!(
        "settled after {frames} frames: state={} visible={:?}..={:?}",
        c.view().state(),
        c.view().first_displayed(),
        c.view().last_displayed()
    );
}
