//! Host-side utilities for the `listview` crate.
//!
//! The `listview` engine is UI-agnostic and leaves the clock, animation playback and scroll
//! container to the host. This crate provides small, framework-neutral helpers commonly needed
//! to drive it:
//!
//! - A tween-based [`AnimationDriver`](listview::AnimationDriver) for edit animations
//! - A frame [`Controller`] that pumps the engine and runs smooth-scroll tweens
//! - Key-based scroll anchoring across edits (e.g. prepending above the viewport)
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod anchor;
mod animator;
mod controller;
mod tween;


pub use anchor::{
    ScrollAnchor, anchor_offset, apply_anchor, capture_anchor_at, capture_first_visible_anchor,
    max_scroll_offset,
};
pub use animator::{AnimationTimings, TweenAnimationDriver};
pub use controller::{Align, Controller, Frame};
pub use tween::{Easing, Tween};
