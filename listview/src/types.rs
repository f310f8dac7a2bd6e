/// Stable identity of an item, supplied by the data source.
pub type ItemKey = u64;

/// Stable identity of a group, supplied by the data source.
pub type GroupKey = u64;

/// Scroll axis of a layout.
///
/// `Horizontal` scrolls left/right and fills bars (columns) top to bottom; `Vertical` scrolls
/// up/down and fills bars (rows) left to right.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Horizontal)
    }

    /// Size along the scroll axis.
    pub fn main(self, size: Size) -> u32 {
        match self {
            Self::Horizontal => size.width,
            Self::Vertical => size.height,
        }
    }

    /// Size across the scroll axis.
    pub fn cross(self, size: Size) -> u32 {
        match self {
            Self::Horizontal => size.height,
            Self::Vertical => size.width,
        }
    }

    /// Builds bounds from axis-relative coordinates.
    pub fn bounds(self, main: u64, cross: u64, main_size: u32, cross_size: u32) -> Bounds {
        match self {
            Self::Horizontal => Bounds {
                x: main,
                y: cross,
                width: main_size,
                height: cross_size,
            },
            Self::Vertical => Bounds {
                x: cross,
                y: main,
                width: cross_size,
                height: main_size,
            },
        }
    }

    /// Splits a point into `(main, cross)` coordinates.
    pub fn split(self, point: Point) -> (u64, u64) {
        match self {
            Self::Horizontal => (point.x, point.y),
            Self::Vertical => (point.y, point.x),
        }
    }
}

/// Where group headers sit relative to their items.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HeaderPosition {
    #[default]
    Top,
    Left,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScrollDirection {
    Forward,
    Backward,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: u64,
    pub y: u64,
}

impl Point {
    pub const fn new(x: u64, y: u64) -> Self {
        Self { x, y }
    }
}

/// Position and size of an element on the layout surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub x: u64,
    pub y: u64,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub const fn new(x: u64, y: u64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u64 {
        self.x.saturating_add(self.width as u64)
    }

    pub fn bottom(&self) -> u64 {
        self.y.saturating_add(self.height as u64)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Start offset along the scroll axis.
    pub fn main_start(&self, orientation: Orientation) -> u64 {
        match orientation {
            Orientation::Horizontal => self.x,
            Orientation::Vertical => self.y,
        }
    }

    /// End offset (exclusive) along the scroll axis.
    pub fn main_end(&self, orientation: Orientation) -> u64 {
        match orientation {
            Orientation::Horizontal => self.right(),
            Orientation::Vertical => self.bottom(),
        }
    }

    /// End offset (exclusive) across the scroll axis.
    pub fn cross_end(&self, orientation: Orientation) -> u64 {
        match orientation {
            Orientation::Horizontal => self.bottom(),
            Orientation::Vertical => self.right(),
        }
    }
}

/// An inclusive range of item indexes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemRange {
    pub first: usize,
    pub last: usize, // inclusive
}

impl ItemRange {
    pub fn new(first: usize, last: usize) -> Self {
        Self { first, last }
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        self.last - self.first + 1
    }

    pub fn is_empty(&self) -> bool {
        self.last < self.first
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.first && index <= self.last
    }
}

/// The window `[begin, end)` of item indexes whose blocks hold live containers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpandedRange {
    pub begin: usize,
    pub end: usize, // exclusive
}

impl ExpandedRange {
    pub fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }

    pub fn is_empty(&self) -> bool {
        self.begin >= self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.begin && index < self.end
    }

    /// Whether `[first, last]` lies completely inside this window.
    pub fn covers(&self, range: ItemRange) -> bool {
        range.first >= self.begin && range.last < self.end
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetKind {
    Item,
    Header,
}

/// An item (by item index) or a group header (by group index).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemTarget {
    pub kind: TargetKind,
    pub index: usize,
}

impl ItemTarget {
    pub const fn item(index: usize) -> Self {
        Self {
            kind: TargetKind::Item,
            index,
        }
    }

    pub const fn header(index: usize) -> Self {
        Self {
            kind: TargetKind::Header,
            index,
        }
    }
}

/// A keyboard navigation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Home,
    End,
}

impl Direction {
    /// Whether the movement goes toward lower indexes.
    pub fn is_backward(self) -> bool {
        matches!(self, Self::Up | Self::Left | Self::PageUp | Self::Home)
    }
}

/// Result of a layout's adjacency query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Adjacent {
    Target(ItemTarget),
    /// Movement would leave the current group. `slot` is the bar slot to keep when entering the
    /// neighbouring group.
    Boundary { slot: usize },
}

/// Result of mapping a surface point to an item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HitTestResult {
    pub index: Option<usize>,
    /// Drop position: insert after this index, `None` inserts before the first item.
    pub insert_after_index: Option<usize>,
}
