use core::cmp;

use crate::ScrollDirection;

/// Scroll position, direction and the debounced "is scrolling" flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct ScrollTracker {
    offset: u64,
    is_scrolling: bool,
    direction: Option<ScrollDirection>,
    last_event_ms: Option<u64>,
}

impl ScrollTracker {
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn is_scrolling(&self) -> bool {
        self.is_scrolling
    }

    pub fn direction(&self) -> Option<ScrollDirection> {
        self.direction
    }

    /// Returns whether the offset changed.
    pub fn set_offset(&mut self, offset: u64) -> bool {
        if self.offset == offset {
            return false;
        }
        let prev = self.offset;
        self.offset = offset;
        self.direction = match offset.cmp(&prev) {
            cmp::Ordering::Greater => Some(ScrollDirection::Forward),
            cmp::Ordering::Less => Some(ScrollDirection::Backward),
            cmp::Ordering::Equal => self.direction,
        };
        true
    }

    pub fn notify_scroll_event(&mut self, now_ms: u64) {
        self.last_event_ms = Some(now_ms);
        self.is_scrolling = true;
    }

    /// Clears the scrolling flag once `delay_ms` passed since the last scroll event.
    ///
    /// Returns `true` when this call ended scrolling.
    pub fn update_scrolling(&mut self, now_ms: u64, delay_ms: u64) -> bool {
        if !self.is_scrolling {
            return false;
        }
        let Some(last) = self.last_event_ms else {
            return false;
        };
        if now_ms.saturating_sub(last) < delay_ms {
            return false;
        }
        self.is_scrolling = false;
        self.direction = None;
        self.last_event_ms = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_follows_offset_changes() {
        let mut s = ScrollTracker::default();
        assert!(s.set_offset(100));
        assert_eq!(s.direction(), Some(ScrollDirection::Forward));
        assert!(s.set_offset(40));
        assert_eq!(s.direction(), Some(ScrollDirection::Backward));
        assert!(!s.set_offset(40));
        assert_eq!(s.direction(), Some(ScrollDirection::Backward));
    }

    #[test]
    fn scrolling_resets_after_delay() {
        let mut s = ScrollTracker::default();
        s.set_offset(10);
        s.notify_scroll_event(1_000);
        assert!(s.is_scrolling());
        assert!(!s.update_scrolling(1_100, 150));
        assert!(s.update_scrolling(1_150, 150));
        assert!(!s.is_scrolling());
        assert_eq!(s.direction(), None);
        assert!(!s.update_scrolling(2_000, 150));
    }
}
