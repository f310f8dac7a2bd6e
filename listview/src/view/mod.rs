//! The virtualization state machine.
//!
//! [`ContentsView`] owns the element skeleton, the realized items and every piece of in-flight
//! work. The host feeds it viewport changes, scroll offsets and data-source notifications, and
//! drives it by calling [`ContentsView::pump`] with a clock and a work budget. All work runs as
//! cooperative jobs on one [`Scheduler`]; nothing happens outside a host call.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};
use core::task::Poll;

use smallvec::SmallVec;

use crate::element::{ElementId, ElementTree, classes};
use crate::error::{Error, Result};
use crate::groups::GroupsContainer;
use crate::items::ItemsContainer;
use crate::layout::{Layout, LayoutContext, LayoutProgress, LayoutSurface, UnrealizedCursor};
use crate::options::ViewOptions;
use crate::promise::{Promise, Resolver};
use crate::scheduler::{JobId, JobInfo, JobStep, Priority, Scheduler};
use crate::source::{AnimationDriver, DataSource, NoAnimations, Notification, Renderer, Target};
use crate::style::{StyleChange, StyleRegistry};
use crate::version::VersionManager;
use crate::{
    Adjacent, Bounds, Direction, ExpandedRange, HitTestResult, ItemRange, ItemTarget, Point, Size,
    TargetKind,
};

mod aria;
mod edit;
mod realize;
mod scroll;
mod state;
mod structure;
mod unrealize;

use aria::AriaCursor;
use edit::{EditCapture, RunningAnimation};
use realize::{PendingHeader, PendingRender, QueueKind, RealizePass};
use scroll::ScrollTracker;
use structure::{Containers, Structure};

pub use state::{ViewEvent, ViewState};

static NEXT_INSTANCE: AtomicU32 = AtomicU32::new(1);

/// A scheduled unit of view work. Each variant carries its own continuation.
#[derive(Debug)]
enum Task {
    Build {
        next_group: usize,
        synced: bool,
    },
    Layout,
    LayoutUnrealized(UnrealizedCursor),
    Realize {
        queue: QueueKind,
        indexes: Vec<usize>,
        pos: usize,
        pass: u64,
    },
    Unrealize {
        evict: Vec<usize>,
        pos: usize,
    },
    Aria(AriaCursor),
}

impl Task {
    /// Build, layout and realization work. A new layout pass supersedes all of it.
    fn is_pipeline(&self) -> bool {
        !matches!(self, Self::Aria(_))
    }
}

#[derive(Debug)]
struct Measure {
    target: ItemTarget,
    element: Promise<ElementId>,
}

/// Settles an element promise that nobody will attach: removes a rendered element, cancels a
/// pending one.
fn discard_element(tree: &mut ElementTree, element: &Promise<ElementId>) {
    match element.poll() {
        Poll::Ready(Ok(element)) => tree.remove(element),
        Poll::Ready(Err(_)) => {}
        Poll::Pending => {
            element.cancel();
        }
    }
}

/// A virtualized, grouped list or grid over a [`DataSource`].
///
/// Only the items around the viewport are realized. The view builds a skeleton of group nodes and
/// container blocks under [`ContentsView::surface`], lays it out through the configured
/// [`Layout`], realizes the onscreen items first, then the offscreen ones ahead of and behind the
/// scroll direction, and finally evicts what drifted too far away.
pub struct ContentsView<S, R, A = NoAnimations> {
    options: ViewOptions,
    source: S,
    renderer: R,
    animations: A,
    tree: ElementTree,
    surface: ElementId,
    styles: StyleRegistry,
    versions: VersionManager,
    groups: GroupsContainer,
    items: ItemsContainer,
    layout: Box<dyn Layout>,
    layout_class: Option<String>,
    scheduler: Scheduler<Task>,
    structure: Structure,
    state: ViewState,
    instance: u32,

    viewport: Size,
    scroll: ScrollTracker,
    now_ms: u64,
    laid_out: bool,
    built: bool,
    retry_when_visible: bool,

    sync: Option<Promise<()>>,
    measure: Option<Measure>,
    layout_complete: Option<Resolver<()>>,

    visible: Option<ItemRange>,
    window: Option<ItemRange>,
    expanded: ExpandedRange,
    pass: Option<RealizePass>,
    next_pass: u64,

    renders: Vec<PendingRender>,
    headers: Vec<PendingHeader>,

    edit: Option<EditCapture>,
    /// An edit awaits its layout pass; `true` while every change of the batch lies past the
    /// expanded range.
    edit_pending: Option<bool>,
    animation: Option<RunningAnimation>,
    buffered: Vec<Notification>,
    scroll_pending: bool,

    aria_due: Option<u64>,
    events: Vec<ViewEvent>,
    layout_error: Option<Error>,
}

impl<S, R, A> core::fmt::Debug for ContentsView<S, R, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContentsView")
            .field("instance", &self.instance)
            .field("state", &self.state)
            .field("viewport", &self.viewport)
            .field("expanded", &self.expanded)
            .field("realized", &self.items.count())
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl<S: DataSource, R: Renderer> ContentsView<S, R, NoAnimations> {
    pub fn new(source: S, renderer: R, options: ViewOptions) -> Self {
        Self::with_animation_driver(source, renderer, NoAnimations, options)
    }
}

impl<S: DataSource, R: Renderer, A: AnimationDriver> ContentsView<S, R, A> {
    pub fn with_animation_driver(
        source: S,
        renderer: R,
        animations: A,
        options: ViewOptions,
    ) -> Self {
        let instance = NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed);
        let mut tree = ElementTree::new();
        let surface = tree.create(&[classes::SURFACE]);
        let mut styles = StyleRegistry::new(instance);
        let mut layout = options.layout.build();
        layout.initialize(&mut styles);
        let structure = Structure::new(options.block_size);
        let mut view = Self {
            options,
            source,
            renderer,
            animations,
            tree,
            surface,
            styles,
            versions: VersionManager::new(),
            groups: GroupsContainer::new(),
            items: ItemsContainer::new(),
            layout,
            layout_class: None,
            scheduler: Scheduler::new(),
            structure,
            state: ViewState::Created,
            instance,
            viewport: Size::default(),
            scroll: ScrollTracker::default(),
            now_ms: 0,
            laid_out: false,
            built: false,
            retry_when_visible: false,
            sync: None,
            measure: None,
            layout_complete: None,
            visible: None,
            window: None,
            expanded: ExpandedRange::default(),
            pass: None,
            next_pass: 1,
            renders: Vec::new(),
            headers: Vec::new(),
            edit: None,
            edit_pending: None,
            animation: None,
            buffered: Vec::new(),
            scroll_pending: false,
            aria_due: None,
            events: Vec::new(),
            layout_error: None,
        };
        view.apply_layout_class();
        view
    }

    /// Replaces the layout, see [`Self::set_layout`].
    pub fn with_layout(mut self, layout: Box<dyn Layout>) -> Self {
        self.set_layout(layout);
        self
    }

    /// Swaps the layout. A built view lays out again.
    pub fn set_layout(&mut self, layout: Box<dyn Layout>) {
        self.cancel_work();
        self.layout.uninitialize(&mut self.styles);
        if let Some(class) = self.layout_class.take() {
            self.tree.remove_class(self.surface, &class);
        }
        self.layout = layout;
        self.layout.initialize(&mut self.styles);
        self.apply_layout_class();
        self.laid_out = false;
        if self.built {
            self.begin_layout();
        }
    }

    fn apply_layout_class(&mut self) {
        if let Some(class) = self.layout.class_name() {
            let class = String::from(class);
            self.tree.add_class(self.surface, class.clone());
            self.layout_class = Some(class);
        }
    }

    fn transition(&mut self, next: ViewState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            vwarn!(from = %self.state, to = %next, "unexpected state transition");
        }
        vdebug!(from = %self.state, to = %next, "state");
        self.state = next;
    }

    // Host operations.

    /// Discards the skeleton and every realized item, then builds everything again from the
    /// data source.
    pub fn rebuild_tree(&mut self) {
        vdebug!(instance = self.instance, "rebuild tree");
        self.cancel_work();
        for (_, record) in self.items.remove_items() {
            self.tree.remove(record.item_box.unwrap_or(record.element));
        }
        for header in self.groups.reset_groups() {
            self.tree.remove(header);
        }
        self.structure.clear(&mut self.tree);
        self.layout.invalidate();
        self.laid_out = false;
        self.built = false;
        self.retry_when_visible = false;
        self.visible = None;
        self.window = None;
        self.expanded = ExpandedRange::default();
        self.transition(ViewState::Building);
        self.scheduler.schedule(
            Task::Build {
                next_group: 0,
                synced: false,
            },
            Priority::High,
            "build",
        );
    }

    /// Lays the existing skeleton out again, building it first when there is none.
    pub fn relayout(&mut self) {
        match self.state {
            ViewState::Building => {}
            ViewState::Created => self.rebuild_tree(),
            _ if !self.built => self.rebuild_tree(),
            _ => self.begin_layout(),
        }
    }

    /// Realizes the page at the current scroll offset.
    pub fn realize_page(&mut self) {
        match self.state {
            ViewState::Building
            | ViewState::LayingOut
            | ViewState::LayingOutNewContainers
            | ViewState::RealizingAnimating => {}
            _ if !self.laid_out || self.groups.is_dirty() || self.groups.needs_reload() => {
                self.relayout()
            }
            _ => self.start_realize_pass(self.realizing_state()),
        }
    }

    /// Reports the scroll offset along the layout's scroll axis.
    pub fn on_scroll(&mut self, offset: u64, now_ms: u64) {
        self.now_ms = now_ms;
        let changed = self.scroll.set_offset(offset);
        self.scroll.notify_scroll_event(now_ms);
        if !changed || !self.laid_out {
            return;
        }
        match self.state {
            ViewState::RealizingAnimating => self.scroll_pending = true,
            ViewState::Realizing
            | ViewState::Scrolling
            | ViewState::Unrealizing
            | ViewState::Completed => {
                if self.visible_range() != self.visible {
                    self.start_realize_pass(ViewState::Scrolling);
                } else if self.state == ViewState::Realizing {
                    self.reprioritize(true);
                    self.transition(ViewState::Scrolling);
                }
            }
            _ => {}
        }
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        if self.viewport == viewport {
            return;
        }
        vdebug!(width = viewport.width, height = viewport.height, "viewport");
        self.viewport = viewport;
        match self.state {
            ViewState::Created => {
                if self.retry_when_visible && !viewport.is_empty() {
                    self.rebuild_tree();
                }
            }
            ViewState::Building | ViewState::Canceled => {}
            _ => self.relayout(),
        }
    }

    /// Delivers a data-source notification.
    pub fn notify(&mut self, notification: Notification) {
        match notification {
            Notification::BeginNotifications => self.versions.begin_notifications(),
            Notification::EndNotifications => {
                self.versions.end_notifications();
                self.settle_edit();
            }
            notification if self.state == ViewState::RealizingAnimating => {
                vtrace!(?notification, "buffering notification during animation");
                self.buffered.push(notification);
            }
            notification => self.apply_edit(notification),
        }
    }

    /// Opens a host update scope. Edits are laid out once every scope closed.
    pub fn begin_updating(&mut self) {
        self.versions.begin_updating();
    }

    pub fn end_updating(&mut self) {
        self.versions.end_updating();
        self.settle_edit();
    }

    /// Cancels all in-flight work. The view can be restarted with [`Self::relayout`],
    /// [`Self::realize_page`] or [`Self::rebuild_tree`].
    pub fn stop(&mut self) {
        vdebug!(state = %self.state, "stop");
        self.cancel_work();
        self.transition(ViewState::Canceled);
    }

    /// Stops the view and removes everything it created. Returns the style changes the host must
    /// apply to drop the view's rules.
    pub fn dispose(&mut self) -> Vec<StyleChange> {
        self.stop();
        for (_, record) in self.items.remove_items() {
            self.tree.remove(record.item_box.unwrap_or(record.element));
        }
        for header in self.groups.reset_groups() {
            self.tree.remove(header);
        }
        self.structure.clear(&mut self.tree);
        self.built = false;
        self.laid_out = false;
        self.layout.uninitialize(&mut self.styles);
        if let Some(class) = self.layout_class.take() {
            self.tree.remove_class(self.surface, &class);
        }
        self.styles.teardown()
    }

    /// Runs scheduled work until `budget` units are used or nothing is runnable.
    ///
    /// Returns whether work is still outstanding, including renders and animations the host has
    /// yet to settle.
    pub fn pump(&mut self, now_ms: u64, budget: u32) -> bool {
        self.now_ms = now_ms;
        if self
            .scroll
            .update_scrolling(now_ms, self.options.is_scrolling_reset_delay_ms)
        {
            vtrace!("scrolling ended");
            self.reprioritize(false);
            if self.state == ViewState::Scrolling {
                self.transition(ViewState::Realizing);
            }
        }
        if self.state == ViewState::LayoutCanceled && !self.versions.locked() {
            self.begin_layout();
        }
        if self.state == ViewState::Completed && self.aria_due.is_some_and(|due| now_ms >= due) {
            self.aria_due = None;
            let cursor = self.aria_cursor();
            self.scheduler.cancel_where(|t| matches!(t, Task::Aria(_)));
            self.scheduler
                .schedule(Task::Aria(cursor), Priority::Idle, "aria");
        }
        self.advance();

        let mut info = JobInfo::new(budget, now_ms);
        let mut waiting: SmallVec<[JobId; 4]> = SmallVec::new();
        while !info.should_yield() {
            let Some(mut job) = self.scheduler.take_next() else {
                break;
            };
            let used = info.used();
            let step = self.run_task(&mut job.task, &mut info);
            if step == JobStep::Yield {
                let id = job.id;
                vtrace!(job = job.name, "job yielded");
                self.scheduler.requeue(job);
                if info.used() == used {
                    // Waiting on a promise: park it for the rest of this turn.
                    self.scheduler.pause(id);
                    waiting.push(id);
                }
            }
            self.advance();
        }
        for id in waiting {
            self.scheduler.resume(id);
        }
        self.has_pending_work()
    }

    pub fn has_pending_work(&self) -> bool {
        self.scheduler.has_runnable()
            || !self.renders.is_empty()
            || !self.headers.is_empty()
            || self.animation.is_some()
            || self.aria_due.is_some()
            || self.state == ViewState::LayoutCanceled
    }

    // Queries.

    pub fn state(&self) -> ViewState {
        self.state
    }

    /// The structural version, bumped by every notification.
    pub fn version(&self) -> u64 {
        self.versions.version()
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    pub fn take_events(&mut self) -> Vec<ViewEvent> {
        core::mem::take(&mut self.events)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutable access to the data source. Changes must be reported through [`Self::notify`].
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Runs `f` with the renderer and the element tree, e.g. to settle deferred renders.
    pub fn with_renderer<T>(&mut self, f: impl FnOnce(&mut R, &mut ElementTree) -> T) -> T {
        f(&mut self.renderer, &mut self.tree)
    }

    pub fn animations(&self) -> &A {
        &self.animations
    }

    pub fn animations_mut(&mut self) -> &mut A {
        &mut self.animations
    }

    /// Runs `f` with the animation driver and the element tree, e.g. to advance running
    /// animations by a frame.
    pub fn with_animations<T>(&mut self, f: impl FnOnce(&mut A, &mut ElementTree) -> T) -> T {
        f(&mut self.animations, &mut self.tree)
    }

    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ElementTree {
        &mut self.tree
    }

    pub fn surface(&self) -> ElementId {
        self.surface
    }

    pub fn layout(&self) -> &dyn Layout {
        self.layout.as_ref()
    }

    pub fn groups(&self) -> &GroupsContainer {
        &self.groups
    }

    pub fn items(&self) -> &ItemsContainer {
        &self.items
    }

    pub fn styles(&self) -> &StyleRegistry {
        &self.styles
    }

    /// Style changes since the last flush.
    pub fn flush_styles(&mut self) -> Vec<StyleChange> {
        self.styles.flush()
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn scroll_offset(&self) -> u64 {
        self.scroll.offset()
    }

    pub fn is_scrolling(&self) -> bool {
        self.scroll.is_scrolling()
    }

    /// Items whose blocks currently have live containers.
    pub fn expanded_range(&self) -> ExpandedRange {
        self.expanded
    }

    pub fn first_displayed(&self) -> Option<usize> {
        self.visible.map(|r| r.first)
    }

    pub fn last_displayed(&self) -> Option<usize> {
        self.visible.map(|r| r.last)
    }

    /// The configuration error that aborted the last layout pass.
    pub fn layout_error(&self) -> Option<&Error> {
        self.layout_error.as_ref()
    }

    /// Resolves once geometry of the current pass has been applied to the whole expanded range.
    /// Canceled when the pass is superseded.
    pub fn layout_complete(&self) -> Option<Promise<()>> {
        self.layout_complete.as_ref().map(Resolver::promise)
    }

    pub fn pending_renders(&self) -> usize {
        self.renders.len()
    }

    pub fn container_count(&self) -> usize {
        self.structure.container_count()
    }

    /// The live container of item `index`.
    pub fn get_container(&self, index: usize) -> Option<ElementId> {
        self.structure.container(&self.groups, index)
    }

    pub fn header_container(&self, group: usize) -> Option<ElementId> {
        self.structure.header_container(group)
    }

    /// The index of the realized item `element` belongs to.
    pub fn index_of_element(&self, element: ElementId) -> Option<usize> {
        self.items.index(&self.tree, element, |tree, e| {
            tree.has_class(e, classes::CONTAINER)
        })
    }

    pub fn container_from(&self, element: ElementId) -> Option<ElementId> {
        self.items.container_from(&self.tree, element, |tree, e| {
            tree.has_class(e, classes::CONTAINER)
        })
    }

    pub fn item_box_from(&self, element: ElementId) -> Option<ElementId> {
        self.items.item_box_from(&self.tree, element, |tree, e| {
            tree.has_class(e, classes::ITEM_BOX)
        })
    }

    /// Resolves with the element of item `index` once it is realized.
    pub fn request_item(&mut self, index: usize) -> Promise<ElementId> {
        self.items.request_item(index)
    }

    fn require_layout(&self, operation: &'static str) -> Result<()> {
        if self.laid_out {
            Ok(())
        } else {
            Err(Error::InvalidState {
                state: self.state.as_str(),
                operation,
            })
        }
    }

    pub fn content_extent(&self) -> Result<u64> {
        self.require_layout("content_extent")?;
        Ok(self.layout.content_extent())
    }

    pub fn items_from_range(&self, first_offset: u64, last_offset: u64) -> Result<Option<ItemRange>> {
        self.require_layout("items_from_range")?;
        Ok(self.layout.items_from_range(first_offset, last_offset))
    }

    pub fn item_bounds(&self, index: usize) -> Result<Option<Bounds>> {
        self.require_layout("item_bounds")?;
        Ok(self.layout.item_bounds(index))
    }

    pub fn header_bounds(&self, group: usize) -> Result<Option<Bounds>> {
        self.require_layout("header_bounds")?;
        Ok(self.layout.header_bounds(group))
    }

    pub fn hit_test(&self, point: Point) -> Result<HitTestResult> {
        self.require_layout("hit_test")?;
        Ok(self.layout.hit_test(point))
    }

    pub fn drag_over(&mut self, point: Point) -> Result<HitTestResult> {
        self.require_layout("drag_over")?;
        Ok(self.layout.drag_over(point))
    }

    pub fn drag_leave(&mut self) {
        self.layout.drag_leave();
    }

    /// The keyboard navigation target from `current`. Leaving a group enters the nearest
    /// non-empty neighbouring group at the same bar slot.
    pub fn get_adjacent(&self, current: ItemTarget, direction: Direction) -> Result<Option<ItemTarget>> {
        self.require_layout("get_adjacent")?;
        let slot = match self.layout.get_adjacent(current, direction) {
            None => return Ok(None),
            Some(Adjacent::Target(target)) => return Ok(Some(target)),
            Some(Adjacent::Boundary { slot }) => slot,
        };
        let group = match current.kind {
            TargetKind::Item => self.groups.group_from_item(current.index),
            TargetKind::Header => Some(current.index),
        };
        let Some(mut group) = group else {
            return Ok(None);
        };
        let backward = direction.is_backward();
        loop {
            group = match backward {
                true => match group.checked_sub(1) {
                    Some(previous) => previous,
                    None => return Ok(None),
                },
                false => group + 1,
            };
            if group >= self.groups.len() {
                return Ok(None);
            }
            if let Some(index) = self.layout.group_entry(group, backward, slot) {
                return Ok(Some(ItemTarget::item(index)));
            }
        }
    }

    // Internals.

    fn realizing_state(&self) -> ViewState {
        if self.scroll.is_scrolling() {
            ViewState::Scrolling
        } else {
            ViewState::Realizing
        }
    }

    fn resolve_layout_complete(&mut self) {
        if let Some(resolver) = self.layout_complete.take() {
            if resolver.resolve(()) {
                self.events.push(ViewEvent::LayoutComplete);
            }
        }
    }

    fn discard_measure(&mut self) {
        if let Some(measure) = self.measure.take() {
            discard_element(&mut self.tree, &measure.element);
        }
    }

    /// Cancels every job and outstanding promise. Realized items and the skeleton stay.
    fn cancel_work(&mut self) {
        self.scheduler.clear();
        self.pass = None;
        self.sync = None;
        self.discard_measure();
        for render in core::mem::take(&mut self.renders) {
            render.item.cancel();
            discard_element(&mut self.tree, &render.element);
        }
        for header in core::mem::take(&mut self.headers) {
            discard_element(&mut self.tree, &header.element);
        }
        self.settle_animation();
        self.discard_edit();
        for notification in core::mem::take(&mut self.buffered) {
            self.apply_structural(&notification);
        }
        self.edit_pending = None;
        self.scroll_pending = false;
        if let Some(resolver) = self.layout_complete.take() {
            resolver.cancel();
        }
        self.aria_due = None;
    }

    /// Starts a full layout pass over the existing skeleton.
    fn begin_layout(&mut self) {
        self.scheduler.cancel_where(Task::is_pipeline);
        self.pass = None;
        if self.animation.is_some() {
            self.settle_animation();
            for notification in core::mem::take(&mut self.buffered) {
                self.apply_structural(&notification);
            }
        }
        self.discard_measure();
        if let Some(previous) = self.layout_complete.take() {
            previous.cancel();
        }
        let (_, resolver) = Promise::new();
        self.layout_complete = Some(resolver);
        self.transition(ViewState::LayingOut);
        self.scheduler
            .schedule(Task::Layout, Priority::High, "layout");
    }

    fn cancel_layout(&mut self) {
        vdebug!(state = %self.state, "layout canceled");
        self.scheduler.cancel_where(Task::is_pipeline);
        self.discard_measure();
        self.sync = None;
        if let Some(resolver) = self.layout_complete.take() {
            resolver.cancel();
        }
        self.transition(ViewState::LayoutCanceled);
    }

    /// Whether `notification` only touches items past the expanded range.
    fn is_beyond_expanded(&self, notification: &Notification) -> bool {
        if self.expanded.is_empty() {
            return false;
        }
        let end = self.expanded.end;
        let group_start = |g: usize| {
            self.groups
                .group(g)
                .map_or(self.groups.item_count(), |group| group.start_index)
        };
        match *notification {
            Notification::Inserted {
                target: Target::Item,
                index,
                ..
            }
            | Notification::Removed {
                target: Target::Item,
                index,
                ..
            }
            | Notification::Changed {
                target: Target::Item,
                index,
                ..
            } => index >= end,
            Notification::Moved {
                target: Target::Item,
                old_index,
                new_index,
                ..
            } => old_index.min(new_index) >= end,
            Notification::Changed {
                target: Target::Group,
                key,
                size,
                ..
            } => match size {
                None => true,
                Some(size) => self
                    .groups
                    .group_index_from_key(key)
                    .and_then(|g| self.groups.group(g))
                    .is_some_and(|group| group.start_index + group.count.min(size) >= end),
            },
            Notification::Inserted {
                target: Target::Group,
                index,
                ..
            } => group_start(index) >= end,
            Notification::Removed {
                target: Target::Group,
                key,
                ..
            } => self
                .groups
                .group_index_from_key(key)
                .is_some_and(|g| group_start(g) >= end),
            Notification::IndexChanged { .. } => true,
            _ => false,
        }
    }

    fn apply_edit(&mut self, notification: Notification) {
        let beyond =
            self.state == ViewState::Completed && self.is_beyond_expanded(&notification);
        if !beyond {
            self.capture_edit();
        }
        vtrace!(?notification, beyond, "notification");
        self.apply_structural(&notification);
        self.scheduler.cancel_where(|t| matches!(t, Task::Aria(_)));
        self.aria_due = None;
        self.edit_pending = Some(self.edit_pending.unwrap_or(true) && beyond);
        if matches!(
            self.state,
            ViewState::LayingOut | ViewState::LayingOutNewContainers
        ) {
            self.cancel_layout();
        }
        self.settle_edit();
    }

    /// Lays out pending edits once no update or notification scope is open.
    fn settle_edit(&mut self) {
        if self.versions.locked() {
            return;
        }
        let Some(beyond_only) = self.edit_pending.take() else {
            return;
        };
        match self.state {
            ViewState::Building => self.rebuild_tree(),
            ViewState::Completed if beyond_only => {
                vdebug!("laying out new containers");
                self.transition(ViewState::LayingOutNewContainers);
                self.scheduler
                    .schedule(Task::Layout, Priority::High, "layout");
            }
            ViewState::Realizing
            | ViewState::Scrolling
            | ViewState::Unrealizing
            | ViewState::Completed
            | ViewState::LayingOut
            | ViewState::LayoutCanceled => self.begin_layout(),
            _ => {}
        }
    }

    /// Gives up until the viewport gets a usable size.
    fn hidden(&mut self) {
        vdebug!("viewport hidden, waiting for a size");
        self.scheduler.cancel_where(Task::is_pipeline);
        self.discard_measure();
        if let Some(resolver) = self.layout_complete.take() {
            resolver.cancel();
        }
        self.discard_edit();
        self.retry_when_visible = true;
        self.transition(ViewState::Created);
        self.events.push(ViewEvent::ViewComplete);
    }

    fn layout_failed(&mut self, error: Error) {
        vwarn!(%error, "layout failed");
        self.scheduler.cancel_where(Task::is_pipeline);
        self.discard_measure();
        if let Some(resolver) = self.layout_complete.take() {
            resolver.cancel();
        }
        self.discard_edit();
        self.laid_out = false;
        self.layout_error = Some(error.clone());
        self.events.push(ViewEvent::LayoutFailed(error));
        self.transition(ViewState::Created);
    }

    /// Polls renders and moves the current phase forward.
    fn advance(&mut self) {
        self.poll_renders();
        if self.state.is_realizing() {
            self.advance_realization();
        }
        if self.state == ViewState::Unrealizing {
            self.advance_unrealize();
        }
    }

    fn run_task(&mut self, task: &mut Task, info: &mut JobInfo) -> JobStep {
        match task {
            Task::Build { next_group, synced } => self.run_build(next_group, synced, info),
            Task::Layout => self.run_layout(info),
            Task::LayoutUnrealized(cursor) => {
                let step = {
                    let containers = Containers {
                        structure: &self.structure,
                        groups: &self.groups,
                    };
                    let mut surface = LayoutSurface {
                        tree: &mut self.tree,
                        containers: &containers,
                    };
                    self.layout
                        .layout_unrealized_range(&mut surface, cursor, info)
                };
                if step == JobStep::Complete {
                    self.resolve_layout_complete();
                }
                step
            }
            Task::Realize {
                queue,
                indexes,
                pos,
                pass,
            } => self.run_realize(*queue, indexes, pos, *pass, info),
            Task::Unrealize { evict, pos } => self.run_unrealize(evict, pos, info),
            Task::Aria(cursor) => self.run_aria(cursor, info),
        }
    }

    fn run_build(&mut self, next_group: &mut usize, synced: &mut bool, info: &mut JobInfo) -> JobStep {
        if !*synced {
            match self.sync.take() {
                Some(sync) if sync.is_pending() => {
                    self.sync = Some(sync);
                    return JobStep::Yield;
                }
                Some(_) => {}
                None => {
                    if self.viewport.is_empty() {
                        self.hidden();
                        return JobStep::Complete;
                    }
                    let sync = self
                        .groups
                        .synchronize_groups(&mut self.versions, &self.source);
                    self.groups.take_dirty();
                    for group in self.groups.take_removed() {
                        if let Some(header) = group.header {
                            self.tree.remove(header);
                        }
                    }
                    if sync.is_pending() {
                        self.sync = Some(sync);
                        return JobStep::Yield;
                    }
                }
            }
            *synced = true;
            for g in 0..self.groups.len() {
                if let Some(header) = self.groups.set_header(g, None) {
                    self.tree.remove(header);
                }
            }
            self.structure.clear(&mut self.tree);
        }

        let mut built = 0;
        while let Some(group) = self.groups.group(*next_group) {
            let blocks = self
                .structure
                .build_group(&mut self.tree, self.surface, group)
                .max(1);
            *next_group += 1;
            built += blocks;
            info.consume(blocks as u32);
            if (built >= self.options.build_chunk_size || info.should_yield())
                && *next_group < self.groups.len()
            {
                return JobStep::Yield;
            }
        }
        self.request_headers();
        self.built = true;
        vdebug!(
            groups = self.groups.len(),
            blocks = self.structure.block_count(),
            "tree built"
        );
        self.begin_layout();
        JobStep::Complete
    }

    /// Brings the skeleton in line with a re-synchronized group sequence, keeping realized items.
    fn reconcile_structure(&mut self) {
        for group in self.groups.take_removed() {
            if let Some(header) = group.header {
                self.tree.remove(header);
            }
        }
        for (_, record) in self.items.iter() {
            self.tree.detach(record.item_box.unwrap_or(record.element));
        }
        self.structure
            .reconcile(&mut self.tree, self.surface, self.groups.groups());
        self.request_headers();
        for index in self.items.indexes() {
            let container = self.structure.container(&self.groups, index);
            match container {
                Some(container) => {
                    if let Some(record) = self.items.record_at_mut(index) {
                        record.container = Some(container);
                        let node = record.item_box.unwrap_or(record.element);
                        self.tree.append_child(container, node);
                    }
                }
                None => {
                    if let Some(record) = self.items.remove_item(index) {
                        self.tree.remove(record.item_box.unwrap_or(record.element));
                    }
                }
            }
        }
    }

    fn run_layout(&mut self, info: &mut JobInfo) -> JobStep {
        match self.sync.take() {
            Some(sync) if sync.is_pending() => {
                self.sync = Some(sync);
                return JobStep::Yield;
            }
            Some(_) => {}
            None => {
                let sync = self
                    .groups
                    .synchronize_groups(&mut self.versions, &self.source);
                if self.groups.take_dirty() {
                    self.reconcile_structure();
                }
                if sync.is_pending() {
                    self.sync = Some(sync);
                    return JobStep::Yield;
                }
            }
        }

        loop {
            let progress = {
                let mut ctx = LayoutContext {
                    groups: self.groups.groups(),
                    headers: !self.groups.is_ungrouped(),
                    viewport: self.viewport,
                    styles: &mut self.styles,
                };
                self.layout.prepare_layout(&mut ctx, info)
            };
            match progress {
                Ok(LayoutProgress::Ready) => {
                    self.finish_layout();
                    return JobStep::Complete;
                }
                Ok(LayoutProgress::Yielded) => return JobStep::Yield,
                Ok(LayoutProgress::NeedsMeasure(target)) => match self.measure(target) {
                    Some(size) => {
                        vtrace!(?target, ?size, "measured");
                        self.layout.provide_measurement(target, size);
                        info.consume(1);
                        if info.should_yield() {
                            return JobStep::Yield;
                        }
                    }
                    None => return JobStep::Yield,
                },
                Ok(LayoutProgress::Hidden) => {
                    self.hidden();
                    return JobStep::Complete;
                }
                Err(error) => {
                    self.layout_failed(error);
                    return JobStep::Complete;
                }
            }
        }
    }

    /// The intrinsic size of `target`, rendering a throwaway element when the item is not
    /// realized. `None` while that render is outstanding.
    fn measure(&mut self, target: ItemTarget) -> Option<Size> {
        if target.kind == TargetKind::Header {
            if self.groups.group(target.index)?.header.is_none() {
                self.request_headers();
            }
            let header = self.groups.group(target.index)?.header?;
            return self.tree.content_size(header);
        }

        if let Some(size) = self
            .items
            .item_at(target.index)
            .and_then(|element| self.tree.content_size(element))
        {
            return Some(size);
        }
        if self.measure.as_ref().is_some_and(|m| m.target != target) {
            self.discard_measure();
        }
        if self.measure.is_none() {
            let item = self.source.item(target.index);
            if item.is_pending() {
                self.versions.cancel_on_notification(item.clone());
            }
            let element = self.renderer.render_item(&mut self.tree, item);
            self.measure = Some(Measure { target, element });
        }
        let element = match self.measure.as_ref()?.element.poll() {
            Poll::Pending => return None,
            Poll::Ready(Ok(element)) => element,
            Poll::Ready(Err(_)) => {
                self.measure = None;
                return None;
            }
        };
        match self.tree.content_size(element) {
            Some(size) => {
                self.tree.remove(element);
                self.measure = None;
                Some(size)
            }
            None => {
                if !self.tree.is_attached(element) {
                    self.tree.add_class(element, classes::MEASURING);
                    self.tree.append_child(self.surface, element);
                }
                None
            }
        }
    }

    fn finish_layout(&mut self) {
        let mut last = 0;
        let offsets: Vec<u64> = (0..self.groups.len())
            .map(|g| {
                last = self.layout.group_offset(g).unwrap_or(last).max(last);
                last
            })
            .collect();
        self.groups.set_offsets(offsets);
        self.laid_out = true;
        self.layout_error = None;
        vdebug!(extent = self.layout.content_extent(), "layout ready");

        if self.state != ViewState::LayingOutNewContainers {
            self.start_realize_pass(self.realizing_state());
            return;
        }
        if let Some(window) = self.window {
            self.expanded = self
                .structure
                .block_span(&self.groups, window.first, window.last);
            self.structure
                .expand(&mut self.tree, &self.groups, self.expanded);
            if !self.expanded.is_empty() {
                self.apply_layout(ItemRange::new(self.expanded.begin, self.expanded.end - 1));
            }
        }
        self.resolve_layout_complete();
        self.transition(ViewState::Completed);
        self.events.push(ViewEvent::ViewComplete);
        self.aria_due = Some(self.now_ms + self.options.aria_delay_ms);
    }

    /// Applies computed geometry to the live containers of `range`.
    fn apply_layout(&mut self, range: ItemRange) {
        let containers = Containers {
            structure: &self.structure,
            groups: &self.groups,
        };
        let mut surface = LayoutSurface {
            tree: &mut self.tree,
            containers: &containers,
        };
        self.layout.layout_realized_range(&mut surface, range);
    }
}
