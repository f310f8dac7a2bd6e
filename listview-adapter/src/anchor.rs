use listview::{AnimationDriver, ContentsView, DataSource, ItemKey, Renderer};

/// A scroll anchor that preserves the visual position across data changes.
///
/// Typical use cases:
/// - loading older entries above the viewport without the content jumping
/// - any reorder or replace where the viewport should stay on an item identity
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollAnchor {
    pub key: ItemKey,
    /// The distance from the anchor item's start to the scroll offset.
    pub offset_in_viewport: u64,
}

/// Largest scroll offset that still fills the viewport, or `None` before the first layout.
pub fn max_scroll_offset<S: DataSource, R: Renderer, A: AnimationDriver>(
    view: &ContentsView<S, R, A>,
) -> Option<u64> {
    let extent = view.content_extent().ok()?;
    let viewport = view.layout().orientation().main(view.viewport());
    Some(extent.saturating_sub(u64::from(viewport)))
}

/// Captures an anchor on the item at `offset_in_viewport` from the leading edge.
///
/// Returns `None` when nothing is laid out there or the item is not realized yet.
pub fn capture_anchor_at<S: DataSource, R: Renderer, A: AnimationDriver>(
    view: &ContentsView<S, R, A>,
    offset_in_viewport: u64,
) -> Option<ScrollAnchor> {
    let at = view.scroll_offset().saturating_add(offset_in_viewport);
    let range = view.items_from_range(at, at).ok()??;
    anchor_for(view, range.first)
}

/// Captures an anchor on the first visible item.
pub fn capture_first_visible_anchor<S: DataSource, R: Renderer, A: AnimationDriver>(
    view: &ContentsView<S, R, A>,
) -> Option<ScrollAnchor> {
    anchor_for(view, view.first_displayed()?)
}

fn anchor_for<S: DataSource, R: Renderer, A: AnimationDriver>(
    view: &ContentsView<S, R, A>,
    index: usize,
) -> Option<ScrollAnchor> {
    let key = view.items().item_data_at(index)?.key;
    let bounds = view.item_bounds(index).ok()??;
    let start = bounds.main_start(view.layout().orientation());
    Some(ScrollAnchor {
        key,
        offset_in_viewport: view.scroll_offset().saturating_sub(start),
    })
}

/// Scroll offset that puts the anchored item back where it was captured.
///
/// The host provides `key_to_index` for the *current* data. The result is clamped to the
/// scrollable range.
pub fn anchor_offset<S: DataSource, R: Renderer, A: AnimationDriver>(
    view: &ContentsView<S, R, A>,
    anchor: &ScrollAnchor,
    mut key_to_index: impl FnMut(ItemKey) -> Option<usize>,
) -> Option<u64> {
    let index = key_to_index(anchor.key)?;
    let bounds = view.item_bounds(index).ok()??;
    let start = bounds.main_start(view.layout().orientation());
    let target = start.saturating_add(anchor.offset_in_viewport);
    Some(target.min(max_scroll_offset(view)?))
}

/// Applies a previously captured anchor by scrolling the view.
///
/// Returns `true` when the anchor was applied.
pub fn apply_anchor<S: DataSource, R: Renderer, A: AnimationDriver>(
    view: &mut ContentsView<S, R, A>,
    anchor: &ScrollAnchor,
    key_to_index: impl FnMut(ItemKey) -> Option<usize>,
    now_ms: u64,
) -> bool {
    let Some(offset) = anchor_offset(view, anchor, key_to_index) else {
        vtrace!(key = anchor.key, "anchor not found");
        return false;
    };
    view.on_scroll(offset, now_ms);
    true
}
