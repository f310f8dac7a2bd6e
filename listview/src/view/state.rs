use crate::Error;

/// Phase of the virtualization state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ViewState {
    /// Idle. Nothing is built, or the last pass found the viewport hidden.
    Created,
    /// Group nodes and blocks are being created, a chunk per turn.
    Building,
    /// The layout is computing geometry.
    LayingOut,
    /// A structural change preempted layout; the next relayout starts over.
    LayoutCanceled,
    /// Items around the viewport are being rendered.
    Realizing,
    /// Same as `Realizing`, prioritized toward the scroll direction.
    Scrolling,
    /// Edit choreography is playing while offscreen realization continues.
    RealizingAnimating,
    /// Items far outside the expanded range are being evicted.
    Unrealizing,
    Completed,
    /// Containers added past the expanded range are being laid out without realization.
    LayingOutNewContainers,
    /// `stop()` was called; every entry point is safe to call again.
    Canceled,
}

impl ViewState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Building => "building",
            Self::LayingOut => "laying-out",
            Self::LayoutCanceled => "layout-canceled",
            Self::Realizing => "realizing",
            Self::Scrolling => "scrolling",
            Self::RealizingAnimating => "realizing-animating",
            Self::Unrealizing => "unrealizing",
            Self::Completed => "completed",
            Self::LayingOutNewContainers => "laying-out-new-containers",
            Self::Canceled => "canceled",
        }
    }

    /// Whether realization queues may be running.
    pub fn is_realizing(self) -> bool {
        matches!(
            self,
            Self::Realizing | Self::Scrolling | Self::RealizingAnimating
        )
    }

    /// Whether realized content is on screen and edits can animate from it.
    pub(crate) fn shows_content(self) -> bool {
        matches!(
            self,
            Self::Realizing | Self::Scrolling | Self::Unrealizing | Self::Completed
        )
    }

    /// The transition table.
    ///
    /// `stop()` (to `Canceled`) and `rebuild_tree()` (to `Building`) are valid from every state.
    pub fn can_transition_to(self, next: Self) -> bool {
        use ViewState::*;
        if self == next || matches!(next, Canceled | Building) {
            return true;
        }
        match self {
            Created => matches!(next, LayingOut),
            Building => matches!(next, LayingOut | Created),
            LayingOut => matches!(next, Realizing | Scrolling | LayoutCanceled | Created),
            LayoutCanceled => matches!(next, LayingOut | Created),
            Realizing | Scrolling => matches!(
                next,
                Realizing | Scrolling | RealizingAnimating | Unrealizing | LayingOut
            ),
            RealizingAnimating => matches!(next, Realizing | Scrolling | LayingOut),
            Unrealizing => matches!(next, Completed | Realizing | Scrolling | LayingOut),
            Completed => matches!(
                next,
                LayingOutNewContainers | LayingOut | Realizing | Scrolling
            ),
            LayingOutNewContainers => {
                matches!(next, Completed | LayingOut | LayoutCanceled | Created)
            }
            Canceled => matches!(next, LayingOut | Realizing | Scrolling),
        }
    }
}

impl core::fmt::Display for ViewState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notifications raised to the host, drained with `ContentsView::take_events`.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewEvent {
    /// The view settled, or gave up because the viewport is hidden.
    ViewComplete,
    /// Geometry for the whole expanded window has been applied.
    LayoutComplete,
    /// A layout pass aborted on invalid configuration.
    LayoutFailed(Error),
}
