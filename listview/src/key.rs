#[cfg(not(feature = "std"))]
use alloc::collections::BTreeMap;
#[cfg(feature = "std")]
use std::collections::HashMap;

use crate::ItemKey;

/// Lookup table keyed by data-source identity.
///
/// Ordering is irrelevant for key lookups, so `std` builds hash and `no_std` builds fall back to
/// a B-tree.
#[cfg(feature = "std")]
pub(crate) type KeyMap<V> = HashMap<ItemKey, V>;
#[cfg(not(feature = "std"))]
pub(crate) type KeyMap<V> = BTreeMap<ItemKey, V>;
