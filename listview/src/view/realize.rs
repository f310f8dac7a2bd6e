//! Realization passes.
//!
//! A pass splits the prefetch window into three queues: the onscreen items, the offscreen items
//! ahead in the scroll direction ("front") and the ones behind ("back"). The onscreen queue runs
//! first at high priority; the offscreen queues are scheduled paused and resumed one after the
//! other once every render of the previous queue settled.

use alloc::vec::Vec;
use core::task::Poll;

use super::{ContentsView, Task, ViewState};
use crate::element::{ElementId, classes};
use crate::items::ItemRecord;
use crate::layout::UnrealizedCursor;
use crate::promise::Promise;
use crate::scheduler::{JobId, JobInfo, JobStep, Priority};
use crate::source::{AnimationDriver, DataSource, ItemHandle, Renderer};
use crate::{ExpandedRange, GroupKey, ItemRange, ScrollDirection};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum QueueKind {
    Onscreen,
    Front,
    Back,
}

impl QueueKind {
    pub const ORDER: [QueueKind; 3] = [Self::Onscreen, Self::Front, Self::Back];

    fn job_name(self) -> &'static str {
        match self {
            Self::Onscreen => "realize-onscreen",
            Self::Front => "realize-front",
            Self::Back => "realize-back",
        }
    }
}

#[derive(Debug)]
pub(super) struct PendingRender {
    pub index: usize,
    pub queue: QueueKind,
    pub pass: u64,
    pub version: u64,
    pub item: Promise<ItemHandle>,
    pub element: Promise<ElementId>,
}

#[derive(Debug)]
pub(super) struct PendingHeader {
    pub key: GroupKey,
    pub element: Promise<ElementId>,
}

#[derive(Debug)]
pub(super) struct RealizePass {
    pub id: u64,
    pub jobs: [Option<JobId>; 3],
    /// The queue currently allowed to run; `3` once all of them drained.
    pub stage: usize,
}

impl<S: DataSource, R: Renderer, A: AnimationDriver> ContentsView<S, R, A> {
    fn viewport_main(&self) -> u64 {
        self.layout.orientation().main(self.viewport) as u64
    }

    /// Items intersecting the viewport at the current scroll offset.
    pub(super) fn visible_range(&self) -> Option<ItemRange> {
        let main = self.viewport_main();
        if main == 0 {
            return None;
        }
        let start = self.scroll.offset();
        self.layout.items_from_range(start, start + main - 1)
    }

    fn prefetch_range(&self) -> Option<ItemRange> {
        let main = self.viewport_main();
        if main == 0 {
            return None;
        }
        let margin = main * self.options.pages_to_prefetch as u64;
        let start = self.scroll.offset();
        self.layout
            .items_from_range(start.saturating_sub(margin), start + main - 1 + margin)
    }

    /// Offscreen indexes of `window`, nearest first, split into (front, back).
    fn offscreen_queues(
        &self,
        visible: Option<ItemRange>,
        window: ItemRange,
    ) -> (Vec<usize>, Vec<usize>) {
        let Some(visible) = visible else {
            return ((window.first..=window.last).collect(), Vec::new());
        };
        let after: Vec<usize> = (visible.last + 1..=window.last).collect();
        let before: Vec<usize> = (window.first..visible.first).rev().collect();
        match self.scroll.direction() {
            Some(ScrollDirection::Backward) => (before, after),
            _ => (after, before),
        }
    }

    fn schedule_queue(
        &mut self,
        queue: QueueKind,
        indexes: Vec<usize>,
        pass: u64,
        priority: Priority,
    ) -> Option<JobId> {
        if indexes.is_empty() {
            return None;
        }
        let task = Task::Realize {
            queue,
            indexes,
            pos: 0,
            pass,
        };
        Some(if queue == QueueKind::Onscreen {
            self.scheduler.schedule(task, priority, queue.job_name())
        } else {
            self.scheduler
                .schedule_paused(task, priority, queue.job_name())
        })
    }

    fn offscreen_priorities(scrolling: bool) -> (Priority, Priority) {
        if scrolling {
            (Priority::AboveNormal, Priority::Idle)
        } else {
            (Priority::Normal, Priority::BelowNormal)
        }
    }

    /// Starts a realization pass for the current scroll position.
    pub(super) fn start_realize_pass(&mut self, next: ViewState) {
        self.scheduler.cancel_where(|t| {
            matches!(
                t,
                Task::Realize { .. } | Task::Unrealize { .. } | Task::LayoutUnrealized(_)
            )
        });
        let id = self.next_pass;
        self.next_pass += 1;

        let visible = self.visible_range();
        let window = self.prefetch_range().or(visible);
        self.visible = visible;
        self.window = window;
        let mut pass = RealizePass {
            id,
            jobs: [None; 3],
            stage: 0,
        };

        match window {
            Some(window) => {
                let expanded = self
                    .structure
                    .block_span(&self.groups, window.first, window.last);
                self.expanded = expanded;
                self.structure.expand(&mut self.tree, &self.groups, expanded);
                self.apply_layout(window);
                let cursor = UnrealizedCursor::new(expanded, window);
                if cursor.is_done() {
                    self.resolve_layout_complete();
                } else {
                    self.scheduler.schedule(
                        Task::LayoutUnrealized(cursor),
                        Priority::Normal,
                        "layout-unrealized",
                    );
                }

                let onscreen: Vec<usize> = visible
                    .map(|v| (v.first..=v.last).collect())
                    .unwrap_or_default();
                let (front, back) = self.offscreen_queues(visible, window);
                let (front_priority, back_priority) =
                    Self::offscreen_priorities(next == ViewState::Scrolling);
                pass.jobs = [
                    self.schedule_queue(QueueKind::Onscreen, onscreen, id, Priority::High),
                    self.schedule_queue(QueueKind::Front, front, id, front_priority),
                    self.schedule_queue(QueueKind::Back, back, id, back_priority),
                ];
            }
            None => {
                self.expanded = ExpandedRange::default();
                self.resolve_layout_complete();
            }
        }
        vdebug!(pass = id, ?visible, ?window, expanded = ?self.expanded, "realize pass");
        self.pass = Some(pass);
        self.transition(next);
    }

    /// Raises or lowers the offscreen queues when scrolling starts or stops.
    pub(super) fn reprioritize(&mut self, scrolling: bool) {
        let Some(pass) = self.pass.as_ref() else {
            return;
        };
        let (front, back) = Self::offscreen_priorities(scrolling);
        if let Some(job) = pass.jobs[1] {
            self.scheduler.set_priority(job, front);
        }
        if let Some(job) = pass.jobs[2] {
            self.scheduler.set_priority(job, back);
        }
    }

    pub(super) fn run_realize(
        &mut self,
        queue: QueueKind,
        indexes: &[usize],
        pos: &mut usize,
        pass: u64,
        info: &mut JobInfo,
    ) -> JobStep {
        while *pos < indexes.len() {
            let index = indexes[*pos];
            *pos += 1;
            if self.request_render(index, queue, pass) {
                info.consume(1);
                if info.should_yield() && *pos < indexes.len() {
                    return JobStep::Yield;
                }
            }
        }
        JobStep::Complete
    }

    fn request_render(&mut self, index: usize, queue: QueueKind, pass: u64) -> bool {
        let version = self.versions.version();
        if self.items.is_realized(index)
            || self
                .renders
                .iter()
                .any(|r| r.index == index && r.version == version)
            || self.structure.container(&self.groups, index).is_none()
        {
            return false;
        }
        let item = self.source.item(index);
        if item.is_pending() {
            self.versions.cancel_on_notification(item.clone());
        }
        let element = self.renderer.render_item(&mut self.tree, item.clone());
        self.renders.push(PendingRender {
            index,
            queue,
            pass,
            version,
            item,
            element,
        });
        true
    }

    /// Attaches every render that settled since the last turn.
    pub(super) fn poll_renders(&mut self) {
        let version = self.versions.version();
        let mut i = 0;
        while i < self.renders.len() {
            let result = match self.renders[i].element.poll() {
                Poll::Pending => {
                    i += 1;
                    continue;
                }
                Poll::Ready(result) => result,
            };
            let render = self.renders.remove(i);
            match result {
                Ok(element) => self.attach_render(render, element, version),
                Err(_) => {
                    vtrace!(index = render.index, "render canceled");
                }
            }
        }
        self.poll_headers();
    }

    fn attach_render(&mut self, render: PendingRender, element: ElementId, version: u64) {
        if render.version != version || self.items.is_realized(render.index) {
            vtrace!(
                index = render.index,
                captured = render.version,
                version,
                "discarding stale render"
            );
            self.tree.remove(element);
            return;
        }
        let Some(container) = self.structure.container(&self.groups, render.index) else {
            self.tree.remove(element);
            return;
        };
        let item_box = self.tree.create(&[classes::ITEM_BOX]);
        self.tree.append_child(container, item_box);
        self.tree.append_child(item_box, element);
        self.tree.add_class(element, classes::ITEM);
        self.items.set_item_at(
            render.index,
            ItemRecord {
                element,
                item_box: Some(item_box),
                container: Some(container),
                detached: false,
                item: render.item.value(),
            },
        );
    }

    /// Requests a header for every group that has none yet.
    pub(super) fn request_headers(&mut self) {
        if self.groups.is_ungrouped() {
            return;
        }
        for g in 0..self.groups.len() {
            let Some(group) = self.groups.group(g) else {
                continue;
            };
            let key = group.key;
            if group.header.is_some() || self.headers.iter().any(|h| h.key == key) {
                continue;
            }
            let Some(descriptor) = self.source.group(g) else {
                continue;
            };
            let element = self.renderer.render_header(&mut self.tree, &descriptor);
            self.headers.push(PendingHeader { key, element });
        }
        self.poll_headers();
    }

    fn poll_headers(&mut self) {
        let mut i = 0;
        while i < self.headers.len() {
            let result = match self.headers[i].element.poll() {
                Poll::Pending => {
                    i += 1;
                    continue;
                }
                Poll::Ready(result) => result,
            };
            let header = self.headers.remove(i);
            if let Ok(element) = result {
                self.attach_header(header.key, element);
            }
        }
    }

    fn attach_header(&mut self, key: GroupKey, element: ElementId) {
        let target = self.groups.group_index_from_key(key).filter(|&g| {
            self.groups.group(g).is_some_and(|group| group.header.is_none())
        });
        let container = target.and_then(|g| self.structure.header_container(g));
        let (Some(g), Some(container)) = (target, container) else {
            self.tree.remove(element);
            return;
        };
        self.tree.append_child(container, element);
        self.tree.add_class(element, classes::HEADER);
        self.groups.set_header(g, Some(element));
    }

    /// Moves the realization pass forward: resumes the next queue once the current one drained,
    /// starts the edit animation after the onscreen queue, and hands over to unrealization at the
    /// end.
    pub(super) fn advance_realization(&mut self) {
        if self.state == ViewState::RealizingAnimating {
            self.poll_animation();
        }
        if !self.state.is_realizing() {
            return;
        }
        let Some(pass) = self.pass.as_ref() else {
            return;
        };
        let (id, jobs, mut stage) = (pass.id, pass.jobs, pass.stage);
        while stage < QueueKind::ORDER.len() {
            let kind = QueueKind::ORDER[stage];
            let busy = jobs[stage].is_some_and(|job| self.scheduler.is_scheduled(job))
                || self.renders.iter().any(|r| r.pass == id && r.queue == kind);
            if busy {
                break;
            }
            stage += 1;
            if kind == QueueKind::Onscreen && self.edit.is_some() {
                self.start_animation();
            }
            if let Some(job) = jobs.get(stage).copied().flatten() {
                self.scheduler.resume(job);
            }
        }
        if let Some(pass) = self.pass.as_mut() {
            pass.stage = stage;
        }
        if stage == QueueKind::ORDER.len() && self.state != ViewState::RealizingAnimating {
            self.begin_unrealize();
        }
    }
}
