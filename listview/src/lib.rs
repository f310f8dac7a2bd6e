//! A headless virtualization and layout engine for grouped list and grid views.
//!
//! For host-side utilities (tween animations, a frame controller, scroll anchoring), see the
//! `listview-adapter` crate.
//!
//! The engine keeps only the items around the viewport realized. It owns:
//! - the group sequence and its reconciliation with data-source notifications
//! - a skeleton of group nodes and container blocks in an [`ElementTree`]
//! - layouts (uniform grid/list, cell spanning, host-provided) behind the [`Layout`] trait
//! - a cooperative scheduler that time-slices building, layout, realization and cleanup
//!
//! It is UI-agnostic. A host is expected to provide:
//! - a [`DataSource`] and a [`Renderer`] producing item and header elements
//! - viewport size and scroll offset
//! - a clock, by calling [`ContentsView::pump`] every frame
//! - optionally an [`AnimationDriver`] for edit animations
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod element;
mod error;
mod groups;
mod items;
mod key;
pub mod layout;
mod options;
mod promise;
mod scheduler;
mod source;
mod style;
pub mod testing;
mod types;
mod version;
mod view;

#[cfg(test)]
mod tests;

pub use element::{Ancestors, ClassName, Element, ElementId, ElementTree, classes};
pub use error::{Error, Result};
pub use groups::{Group, GroupState, GroupsContainer};
pub use items::{ItemRecord, ItemsContainer};
pub use layout::{
    CellSpanningLayout, ContainerLookup, CustomLayout, CustomLayoutAdapter, CustomLayoutGeometry,
    GroupSummary, Layout, LayoutContext, LayoutProgress, LayoutSurface, OccupancyMap,
    OccupancyMapEntry, UniformLayout, UnrealizedCursor,
};
pub use options::{
    CellSpanningOptions, GridOptions, GroupInfo, GroupInfoCallback, ItemInfo, ItemInfoCallback,
    ItemRole, LayoutOptions, ListOptions, ViewOptions,
};
pub use promise::{Cancelable, Promise, Resolver, join_all};
pub use scheduler::{JobId, JobInfo, JobStep, Priority, ScheduledJob, Scheduler};
pub use source::{
    AnimationDriver, AnimationPlan, AnimationTarget, DataSource, GroupDescriptor, ItemHandle,
    NoAnimations, Notification, Renderer, Target, UserData,
};
pub use style::{StyleChange, StyleRegistry, StyleRule};
pub use types::{
    Adjacent, Bounds, Direction, ExpandedRange, GroupKey, HeaderPosition, HitTestResult, ItemKey,
    ItemRange, ItemTarget, Orientation, Point, ScrollDirection, Size, TargetKind,
};
pub use version::VersionManager;
pub use view::{ContentsView, ViewEvent, ViewState};
