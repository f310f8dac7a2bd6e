use alloc::boxed::Box;
use alloc::sync::Arc;

use crate::layout::{CellSpanningLayout, Layout, UniformLayout};
use crate::{HeaderPosition, Orientation};

/// Cell size of a cell-spanning group, in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupInfo {
    pub cell_width: f64,
    pub cell_height: f64,
}

/// Size of one cell-spanning item, in pixels.
///
/// The item spans `ceil(width / cell_width)` columns and `ceil(height / cell_height)` rows.
/// `new_column` forces placement to start in the next column.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemInfo {
    pub width: f64,
    pub height: f64,
    pub new_column: bool,
}

impl ItemInfo {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            new_column: false,
        }
    }

    pub fn with_new_column(mut self, new_column: bool) -> Self {
        self.new_column = new_column;
        self
    }
}

/// Returns the cell size for a group index.
pub type GroupInfoCallback = Arc<dyn Fn(usize) -> GroupInfo + Send + Sync>;

/// Returns the size of the item at an item index.
pub type ItemInfoCallback = Arc<dyn Fn(usize) -> ItemInfo + Send + Sync>;

/// Uniform grid configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridOptions {
    pub orientation: Orientation,
    pub group_header_position: HeaderPosition,
    /// Upper bound on items per bar. `0` is unbounded.
    pub maximum_rows_or_columns: usize,
}

impl GridOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_group_header_position(mut self, position: HeaderPosition) -> Self {
        self.group_header_position = position;
        self
    }

    pub fn with_maximum_rows_or_columns(mut self, maximum: usize) -> Self {
        self.maximum_rows_or_columns = maximum;
        self
    }
}

/// Single-column (or single-row) list configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListOptions {
    pub orientation: Orientation,
    pub group_header_position: HeaderPosition,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            orientation: Orientation::Vertical,
            group_header_position: HeaderPosition::Top,
        }
    }
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_group_header_position(mut self, position: HeaderPosition) -> Self {
        self.group_header_position = position;
        self
    }
}

/// Cell-spanning grid configuration.
///
/// Without `group_info` every group uses the measured size of a representative item as its cell
/// size; without `item_info` every item occupies one cell.
#[derive(Clone, Default)]
pub struct CellSpanningOptions {
    pub orientation: Orientation,
    pub group_header_position: HeaderPosition,
    /// Upper bound on rows per column. `0` is unbounded.
    pub maximum_rows_or_columns: usize,
    pub group_info: Option<GroupInfoCallback>,
    pub item_info: Option<ItemInfoCallback>,
}

impl CellSpanningOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_group_header_position(mut self, position: HeaderPosition) -> Self {
        self.group_header_position = position;
        self
    }

    pub fn with_maximum_rows_or_columns(mut self, maximum: usize) -> Self {
        self.maximum_rows_or_columns = maximum;
        self
    }

    pub fn with_group_info(
        mut self,
        group_info: impl Fn(usize) -> GroupInfo + Send + Sync + 'static,
    ) -> Self {
        self.group_info = Some(Arc::new(group_info));
        self
    }

    pub fn with_item_info(
        mut self,
        item_info: impl Fn(usize) -> ItemInfo + Send + Sync + 'static,
    ) -> Self {
        self.item_info = Some(Arc::new(item_info));
        self
    }
}

impl core::fmt::Debug for CellSpanningOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CellSpanningOptions")
            .field("orientation", &self.orientation)
            .field("group_header_position", &self.group_header_position)
            .field("maximum_rows_or_columns", &self.maximum_rows_or_columns)
            .field("group_info", &self.group_info.is_some())
            .field("item_info", &self.item_info.is_some())
            .finish_non_exhaustive()
    }
}

/// Which built-in layout the view uses. Custom layouts are installed with
/// [`crate::ContentsView::with_layout`].
#[derive(Clone, Debug)]
pub enum LayoutOptions {
    Grid(GridOptions),
    List(ListOptions),
    CellSpanning(CellSpanningOptions),
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self::Grid(GridOptions::default())
    }
}

impl LayoutOptions {
    pub fn orientation(&self) -> Orientation {
        match self {
            Self::Grid(o) => o.orientation,
            Self::List(o) => o.orientation,
            Self::CellSpanning(o) => o.orientation,
        }
    }

    pub(crate) fn build(&self) -> Box<dyn Layout> {
        match self {
            Self::Grid(o) => Box::new(UniformLayout::grid(*o)),
            Self::List(o) => Box::new(UniformLayout::list(*o)),
            Self::CellSpanning(o) => Box::new(CellSpanningLayout::new(o.clone())),
        }
    }
}

/// ARIA role written on realized items.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ItemRole {
    #[default]
    Option,
    ListItem,
}

impl ItemRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Option => "option",
            Self::ListItem => "listitem",
        }
    }
}

/// Configuration for [`crate::ContentsView`].
///
/// Cheap to clone: layout callbacks are stored in `Arc`s.
#[derive(Clone)]
pub struct ViewOptions {
    pub layout: LayoutOptions,

    /// Prefetch margin on each side of the viewport, in viewport pages.
    pub pages_to_prefetch: u32,

    /// How many realized items outside the expanded range may survive an unrealize pass.
    pub max_deferred_item_cleanup: usize,

    /// Item containers per block.
    pub block_size: usize,

    /// Blocks created per build slice.
    pub build_chunk_size: usize,

    /// Debounced fallback for resetting the scrolling flag after the last scroll event.
    pub is_scrolling_reset_delay_ms: u64,

    /// Delay before the ARIA pass runs after realization settles.
    pub aria_delay_ms: u64,

    pub item_role: ItemRole,

    /// Whether edits play removal, move and entrance animations.
    pub animations_enabled: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            layout: LayoutOptions::default(),
            pages_to_prefetch: 1,
            max_deferred_item_cleanup: 64,
            block_size: 10,
            build_chunk_size: 50,
            is_scrolling_reset_delay_ms: 150,
            aria_delay_ms: 50,
            item_role: ItemRole::default(),
            animations_enabled: true,
        }
    }
}

impl ViewOptions {
    pub fn new(layout: LayoutOptions) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    pub fn with_layout(mut self, layout: LayoutOptions) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_pages_to_prefetch(mut self, pages: u32) -> Self {
        self.pages_to_prefetch = pages;
        self
    }

    pub fn with_max_deferred_item_cleanup(mut self, slack: usize) -> Self {
        self.max_deferred_item_cleanup = slack;
        self
    }

    /// Sets the number of containers per block. Values below 1 are clamped.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    pub fn with_build_chunk_size(mut self, chunk: usize) -> Self {
        self.build_chunk_size = chunk.max(1);
        self
    }

    pub fn with_is_scrolling_reset_delay_ms(mut self, delay_ms: u64) -> Self {
        self.is_scrolling_reset_delay_ms = delay_ms;
        self
    }

    pub fn with_aria_delay_ms(mut self, delay_ms: u64) -> Self {
        self.aria_delay_ms = delay_ms;
        self
    }

    pub fn with_item_role(mut self, role: ItemRole) -> Self {
        self.item_role = role;
        self
    }

    pub fn with_animations_enabled(mut self, enabled: bool) -> Self {
        self.animations_enabled = enabled;
        self
    }
}

impl core::fmt::Debug for ViewOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ViewOptions")
            .field("layout", &self.layout)
            .field("pages_to_prefetch", &self.pages_to_prefetch)
            .field("max_deferred_item_cleanup", &self.max_deferred_item_cleanup)
            .field("block_size", &self.block_size)
            .field("build_chunk_size", &self.build_chunk_size)
            .field(
                "is_scrolling_reset_delay_ms",
                &self.is_scrolling_reset_delay_ms,
            )
            .field("aria_delay_ms", &self.aria_delay_ms)
            .field("item_role", &self.item_role)
            .field("animations_enabled", &self.animations_enabled)
            .finish()
    }
}
