//! Interfaces of the external collaborators: the data source, the renderer and the animation
//! driver.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use crate::element::{ElementId, ElementTree};
use crate::promise::Promise;
use crate::{Bounds, GroupKey, ItemKey};

/// Opaque host data attached to an item or group.
#[derive(Clone, Default)]
pub struct UserData(Option<Rc<dyn Any>>);

impl UserData {
    pub fn new(value: impl Any) -> Self {
        Self(Some(Rc::new(value)))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|v| v.downcast_ref::<T>())
    }

    pub fn is_some(&self) -> bool {
        self.0.is_some()
    }
}

impl fmt::Debug for UserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_some() {
            f.write_str("UserData(..)")
        } else {
            f.write_str("UserData(None)")
        }
    }
}

/// A resolved item from the data source.
#[derive(Clone, Debug)]
pub struct ItemHandle {
    pub key: ItemKey,
    pub index: usize,
    pub group_key: Option<GroupKey>,
    pub data: UserData,
}

/// A group as described by the data source.
#[derive(Clone, Debug)]
pub struct GroupDescriptor {
    pub key: GroupKey,
    /// Index of the group's first item in the flat item sequence.
    pub first_item_index_hint: usize,
    pub size: usize,
    pub data: UserData,
}

/// The ordered, key-identified data collection the view displays.
pub trait DataSource {
    fn item_count(&self) -> usize;

    /// Requests the item at `index`. The promise may stay pending while the source fetches it.
    fn item(&mut self, index: usize) -> Promise<ItemHandle>;

    /// Number of groups, or `None` when the collection is not grouped.
    fn group_count(&self) -> Option<usize>;

    fn group(&self, index: usize) -> Option<GroupDescriptor>;
}

/// Which sequence a notification refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Target {
    Item,
    Group,
}

/// Change notifications delivered by the data source.
///
/// Neighbour keys (`previous`/`next`) let the receiver splice its local sequence without
/// re-querying; the index hints are authoritative when the neighbours are unknown.
#[derive(Clone, Debug)]
pub enum Notification {
    BeginNotifications,
    EndNotifications,
    Inserted {
        target: Target,
        key: u64,
        index: usize,
        previous: Option<u64>,
        next: Option<u64>,
        /// Item count of an inserted group.
        size: usize,
        data: UserData,
    },
    Removed {
        target: Target,
        key: u64,
        index: usize,
    },
    Moved {
        target: Target,
        key: u64,
        old_index: usize,
        new_index: usize,
        previous: Option<u64>,
        next: Option<u64>,
    },
    Changed {
        target: Target,
        key: u64,
        index: usize,
        /// New item count of a changed group.
        size: Option<usize>,
        data: UserData,
    },
    CountChanged {
        target: Target,
        new_count: usize,
        old_count: usize,
    },
    IndexChanged {
        target: Target,
        key: u64,
        new_index: usize,
        old_index: usize,
    },
    Reload,
}

impl Notification {
    /// Whether this notification changes structure (and therefore the version).
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::BeginNotifications | Self::EndNotifications)
    }

    pub fn target(&self) -> Option<Target> {
        match self {
            Self::Inserted { target, .. }
            | Self::Removed { target, .. }
            | Self::Moved { target, .. }
            | Self::Changed { target, .. }
            | Self::CountChanged { target, .. }
            | Self::IndexChanged { target, .. } => Some(*target),
            Self::BeginNotifications | Self::EndNotifications | Self::Reload => None,
        }
    }
}

/// Produces visual content for items and headers.
///
/// The engine owns placement and lifecycle of the returned element but never its internal
/// markup.
pub trait Renderer {
    fn render_item(&mut self, tree: &mut ElementTree, item: Promise<ItemHandle>)
    -> Promise<ElementId>;

    fn render_header(&mut self, tree: &mut ElementTree, group: &GroupDescriptor)
    -> Promise<ElementId>;
}

/// One element's part in an animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationTarget {
    /// Fades out; the element is removed once the animation finishes.
    Removal { element: ElementId },
    /// Slides from its previous position to its laid-out position.
    Move {
        element: ElementId,
        from: Bounds,
        to: Bounds,
    },
    /// Fades in at its laid-out position.
    Entrance { element: ElementId },
}

/// Staged choreography: removals, then moves, then entrances.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimationPlan {
    pub removals: Vec<AnimationTarget>,
    pub moves: Vec<AnimationTarget>,
    pub entrances: Vec<AnimationTarget>,
}

impl AnimationPlan {
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.moves.is_empty() && self.entrances.is_empty()
    }

    pub fn len(&self) -> usize {
        self.removals.len() + self.moves.len() + self.entrances.len()
    }

    /// Every target in stage order.
    pub fn targets(&self) -> impl Iterator<Item = &AnimationTarget> {
        self.removals
            .iter()
            .chain(self.moves.iter())
            .chain(self.entrances.iter())
    }
}

/// Plays animation plans. The returned promise settles when the whole plan finished.
pub trait AnimationDriver {
    fn play(&mut self, tree: &mut ElementTree, plan: &AnimationPlan) -> Promise<()>;

    /// Jumps every running animation to its end state.
    fn finish_all(&mut self, tree: &mut ElementTree) {
        let _ = tree;
    }
}

/// Applies plans instantly.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAnimations;

impl AnimationDriver for NoAnimations {
    fn play(&mut self, tree: &mut ElementTree, plan: &AnimationPlan) -> Promise<()> {
        for target in plan.targets() {
            match *target {
                AnimationTarget::Removal { element } => tree.set_opacity(element, 0.0),
                AnimationTarget::Move { element, .. } => tree.set_translation(element, 0, 0),
                AnimationTarget::Entrance { element } => tree.set_opacity(element, 1.0),
            }
        }
        Promise::resolved(())
    }
}
