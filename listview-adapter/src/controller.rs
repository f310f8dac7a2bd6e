use alloc::vec::Vec;

use listview::{ContentsView, DataSource, ItemKey, Renderer, Size, ViewEvent, ViewOptions, ViewState};

use crate::{
    Easing, ScrollAnchor, Tween, TweenAnimationDriver, anchor_offset, capture_anchor_at,
    capture_first_visible_anchor, max_scroll_offset,
};

/// Where a scrolled-to item ends up in the viewport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Align {
    Start,
    Center,
    End,
    /// Scroll only as far as needed to bring the item fully into view.
    #[default]
    Auto,
}

/// Outcome of one [`Controller::tick`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    /// The offset the host should scroll its container to, while a tween is active.
    pub scroll_offset: Option<u64>,
    /// Whether another frame is needed to make progress.
    pub pending: bool,
    pub events: Vec<ViewEvent>,
}

/// A framework-neutral controller that owns a [`ContentsView`] and runs the per-frame work a
/// host otherwise wires up by hand.
///
/// This type does not hold any UI objects. Hosts drive it by calling:
/// - `on_viewport_size` / `on_scroll` when UI events occur
/// - `tick(now_ms)` every frame, which advances scroll tweens and edit animations and pumps the
///   engine's scheduler with the frame budget
#[derive(Debug)]
pub struct Controller<S, R> {
    view: ContentsView<S, R, TweenAnimationDriver>,
    tween: Option<Tween>,
    budget: u32,
}

impl<S: DataSource, R: Renderer> Controller<S, R> {
    /// Default work units per frame.
    pub const DEFAULT_BUDGET: u32 = 64;

    pub fn new(source: S, renderer: R, options: ViewOptions) -> Self {
        Self::from_view(ContentsView::with_animation_driver(
            source,
            renderer,
            TweenAnimationDriver::new(),
            options,
        ))
    }

    pub fn from_view(view: ContentsView<S, R, TweenAnimationDriver>) -> Self {
        Self {
            view,
            tween: None,
            budget: Self::DEFAULT_BUDGET,
        }
    }

    pub fn with_budget(mut self, budget: u32) -> Self {
        self.budget = budget.max(1);
        self
    }

    pub fn view(&self) -> &ContentsView<S, R, TweenAnimationDriver> {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ContentsView<S, R, TweenAnimationDriver> {
        &mut self.view
    }

    pub fn into_view(self) -> ContentsView<S, R, TweenAnimationDriver> {
        self.view
    }

    /// Whether a scroll tween is running.
    pub fn is_animating(&self) -> bool {
        self.tween.is_some()
    }

    pub fn cancel_animation(&mut self) {
        self.tween = None;
    }

    /// Reports the viewport size. The first usable size starts the view.
    pub fn on_viewport_size(&mut self, viewport: Size) {
        self.view.set_viewport(viewport);
        if self.view.state() == ViewState::Created && !viewport.is_empty() {
            self.view.relayout();
        }
    }

    /// Call this when the UI reports a scroll offset change (e.g. user wheel/drag).
    ///
    /// This cancels any active tween.
    pub fn on_scroll(&mut self, scroll_offset: u64, now_ms: u64) {
        self.cancel_animation();
        self.view.on_scroll(scroll_offset, now_ms);
    }

    /// Advances tweens and edit animations to `now_ms`, then pumps the engine.
    pub fn tick(&mut self, now_ms: u64) -> Frame {
        let mut scroll_offset = None;
        if let Some(tween) = self.tween {
            let offset = self.clamp_scroll_offset(tween.sample_offset(now_ms));
            self.view.on_scroll(offset, now_ms);
            if tween.is_done(now_ms) {
                vdebug!(offset, "scroll tween finished");
                self.tween = None;
            }
            scroll_offset = Some(self.view.scroll_offset());
        }
        let animating = self
            .view
            .with_animations(|driver, tree| driver.tick(tree, now_ms));
        let pending = self.view.pump(now_ms, self.budget);
        Frame {
            scroll_offset,
            pending: pending || animating || self.tween.is_some(),
            events: self.view.take_events(),
        }
    }

    pub fn clamp_scroll_offset(&self, offset: u64) -> u64 {
        offset.min(max_scroll_offset(&self.view).unwrap_or(0))
    }

    /// The scroll offset that aligns item `index`, or `None` before layout or out of range.
    pub fn scroll_to_index_offset(&self, index: usize, align: Align) -> Option<u64> {
        let bounds = self.view.item_bounds(index).ok()??;
        let orientation = self.view.layout().orientation();
        let start = bounds.main_start(orientation);
        let end = bounds.main_end(orientation);
        let viewport = u64::from(orientation.main(self.view.viewport()));
        let current = self.view.scroll_offset();
        let offset = match align {
            Align::Start => start,
            Align::End => end.saturating_sub(viewport),
            Align::Center => (start + (end - start) / 2).saturating_sub(viewport / 2),
            Align::Auto if start >= current && end <= current + viewport => current,
            Align::Auto if start < current => start,
            Align::Auto => end.saturating_sub(viewport),
        };
        Some(self.clamp_scroll_offset(offset))
    }

    /// Scrolls to item `index` immediately (no animation). Returns the applied offset.
    pub fn scroll_to_index(&mut self, index: usize, align: Align, now_ms: u64) -> Option<u64> {
        let offset = self.scroll_to_index_offset(index, align)?;
        Some(self.scroll_to_offset(offset, now_ms))
    }

    /// Scrolls to `offset` immediately (no animation). Returns the applied (clamped) offset.
    pub fn scroll_to_offset(&mut self, offset: u64, now_ms: u64) -> u64 {
        self.cancel_animation();
        let offset = self.clamp_scroll_offset(offset);
        self.view.on_scroll(offset, now_ms);
        self.view.scroll_offset()
    }

    /// Starts a tween to item `index`. Returns the clamped target offset.
    pub fn start_tween_to_index(
        &mut self,
        index: usize,
        align: Align,
        now_ms: u64,
        duration_ms: u64,
        easing: Easing,
    ) -> Option<u64> {
        let to = self.scroll_to_index_offset(index, align)?;
        Some(self.start_tween_to_offset(to, now_ms, duration_ms, easing))
    }

    /// Starts a tween to `offset`, or retargets the running one. Returns the clamped target.
    pub fn start_tween_to_offset(
        &mut self,
        offset: u64,
        now_ms: u64,
        duration_ms: u64,
        easing: Easing,
    ) -> u64 {
        let to = self.clamp_scroll_offset(offset);
        match self.tween.as_mut() {
            Some(tween) => tween.retarget(now_ms, to as f64, duration_ms),
            None => {
                let from = self.view.scroll_offset();
                self.tween = Some(Tween::offsets(from, to, now_ms, duration_ms, easing));
            }
        }
        to
    }

    pub fn capture_first_visible_anchor(&self) -> Option<ScrollAnchor> {
        capture_first_visible_anchor(&self.view)
    }

    /// Captures an anchor on the item `offset_in_viewport` past the leading edge.
    pub fn capture_anchor_at_offset_in_viewport(
        &self,
        offset_in_viewport: u64,
    ) -> Option<ScrollAnchor> {
        capture_anchor_at(&self.view, offset_in_viewport)
    }

    /// Applies a previously captured anchor. Returns the applied offset.
    ///
    /// This cancels any active tween.
    pub fn apply_anchor(
        &mut self,
        anchor: &ScrollAnchor,
        key_to_index: impl FnMut(ItemKey) -> Option<usize>,
        now_ms: u64,
    ) -> Option<u64> {
        let offset = anchor_offset(&self.view, anchor, key_to_index)?;
        Some(self.scroll_to_offset(offset, now_ms))
    }
}
