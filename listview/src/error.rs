/// Result type alias for engine operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors produced by the engine.
///
/// Only configuration errors ever reach the host. `Canceled` and `Stale` are control-flow
/// signals used to unwind superseded work and are recovered inside the engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The cell-spanning `item_info` callback returned an unusable size.
    #[error("invalid item info for item {index}: width={width}, height={height}")]
    InvalidItemInfo { index: usize, width: f64, height: f64 },

    /// The cell-spanning `group_info` callback returned an unusable cell size.
    #[error("invalid group info for group {group}: cell_width={cell_width}, cell_height={cell_height}")]
    InvalidGroupInfo {
        group: usize,
        cell_width: f64,
        cell_height: f64,
    },

    /// A promise or scheduled job was canceled.
    #[error("operation canceled")]
    Canceled,

    /// Work captured against an older structural version finished after a newer notification.
    #[error("stale result: captured version {captured}, current version {current}")]
    Stale { captured: u64, current: u64 },

    /// The operation is not valid in the current state of the view.
    #[error("`{operation}` is not allowed while the view is {state}")]
    InvalidState {
        state: &'static str,
        operation: &'static str,
    },
}

impl Error {
    /// Whether this is a configuration error that the host must fix.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidItemInfo { .. } | Self::InvalidGroupInfo { .. }
        )
    }

    /// Whether this error only signals superseded work.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Canceled | Self::Stale { .. })
    }
}
