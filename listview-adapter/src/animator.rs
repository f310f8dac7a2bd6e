use alloc::vec::Vec;

use listview::{
    AnimationDriver, AnimationPlan, AnimationTarget, ElementId, ElementTree, Promise, Resolver,
};

use crate::{Easing, Tween};

/// Stage durations of an edit animation. An empty stage takes no time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnimationTimings {
    pub removal_ms: u64,
    pub move_ms: u64,
    pub entrance_ms: u64,
    pub easing: Easing,
}

impl Default for AnimationTimings {
    fn default() -> Self {
        Self {
            removal_ms: 120,
            move_ms: 300,
            entrance_ms: 150,
            easing: Easing::EaseOutCubic,
        }
    }
}

impl AnimationTimings {
    /// Start offset and duration of each stage of `plan`: removals, moves, entrances.
    fn stages(&self, plan: &AnimationPlan) -> [(u64, u64); 3] {
        let removal = if plan.removals.is_empty() { 0 } else { self.removal_ms };
        let moves = if plan.moves.is_empty() { 0 } else { self.move_ms };
        let entrance = if plan.entrances.is_empty() { 0 } else { self.entrance_ms };
        [
            (0, removal),
            (removal, moves),
            (removal + moves, entrance),
        ]
    }

    fn total(&self, plan: &AnimationPlan) -> u64 {
        let [_, _, (start, duration)] = self.stages(plan);
        start + duration
    }
}

#[derive(Debug)]
struct RunningPlan {
    plan: AnimationPlan,
    resolver: Resolver<()>,
    /// Set on the first tick after `play`.
    start_ms: Option<u64>,
}

/// Plays edit animations as tweens on element opacity and translation.
///
/// The driver has no clock of its own: the host advances it with [`Self::tick`] every frame.
/// Removals fade out, then moved items slide from their old position, then new items fade in.
#[derive(Debug, Default)]
pub struct TweenAnimationDriver {
    timings: AnimationTimings,
    running: Vec<RunningPlan>,
}

impl TweenAnimationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timings(timings: AnimationTimings) -> Self {
        Self {
            timings,
            running: Vec::new(),
        }
    }

    pub fn timings(&self) -> AnimationTimings {
        self.timings
    }

    pub fn set_timings(&mut self, timings: AnimationTimings) {
        self.timings = timings;
    }

    pub fn is_running(&self) -> bool {
        !self.running.is_empty()
    }

    /// Advances every running plan to `now_ms`. Returns whether any plan is still running.
    pub fn tick(&mut self, tree: &mut ElementTree, now_ms: u64) -> bool {
        let timings = self.timings;
        self.running.retain_mut(|running| {
            if running.resolver.is_settled() {
                return false;
            }
            let start = *running.start_ms.get_or_insert(now_ms);
            if now_ms.saturating_sub(start) >= timings.total(&running.plan) {
                finish_plan(tree, &running.plan);
                running.resolver.resolve(());
                vtrace!(targets = running.plan.len(), "animation finished");
                return false;
            }
            apply_frame(tree, &running.plan, &timings, start, now_ms);
            true
        });
        self.is_running()
    }
}

impl AnimationDriver for TweenAnimationDriver {
    fn play(&mut self, tree: &mut ElementTree, plan: &AnimationPlan) -> Promise<()> {
        if plan.is_empty() || self.timings.total(plan) == 0 {
            finish_plan(tree, plan);
            return Promise::resolved(());
        }
        vdebug!(
            removals = plan.removals.len(),
            moves = plan.moves.len(),
            entrances = plan.entrances.len(),
            "animation queued"
        );
        let (promise, resolver) = Promise::new();
        self.running.push(RunningPlan {
            plan: plan.clone(),
            resolver,
            start_ms: None,
        });
        promise
    }

    fn finish_all(&mut self, tree: &mut ElementTree) {
        for running in self.running.drain(..) {
            finish_plan(tree, &running.plan);
            running.resolver.resolve(());
        }
    }
}

fn apply_frame(
    tree: &mut ElementTree,
    plan: &AnimationPlan,
    timings: &AnimationTimings,
    start: u64,
    now_ms: u64,
) {
    let [removal, moves, entrance] = timings.stages(plan);
    let progress = |(offset, duration): (u64, u64)| {
        Tween::new(0.0, 1.0, start + offset, duration, timings.easing).progress(now_ms)
    };

    let p = progress(removal);
    for target in &plan.removals {
        if let AnimationTarget::Removal { element } = *target {
            tree.set_opacity(element, 1.0 - p);
        }
    }
    let p = progress(moves);
    for target in &plan.moves {
        if let AnimationTarget::Move { element, from, to } = *target {
            let dx = from.x as i64 - to.x as i64;
            let dy = from.y as i64 - to.y as i64;
            slide(tree, element, dx, dy, p);
        }
    }
    let p = progress(entrance);
    for target in &plan.entrances {
        if let AnimationTarget::Entrance { element } = *target {
            tree.set_opacity(element, p);
        }
    }
}

fn slide(tree: &mut ElementTree, element: ElementId, dx: i64, dy: i64, progress: f32) {
    let remaining = 1.0 - f64::from(progress);
    let x = (dx as f64 * remaining) as i64;
    let y = (dy as f64 * remaining) as i64;
    tree.set_translation(element, x, y);
}

fn finish_plan(tree: &mut ElementTree, plan: &AnimationPlan) {
    for target in plan.targets() {
        match *target {
            AnimationTarget::Removal { element } => tree.set_opacity(element, 0.0),
            AnimationTarget::Move { element, .. } => tree.set_translation(element, 0, 0),
            AnimationTarget::Entrance { element } => tree.set_opacity(element, 1.0),
        }
    }
}
