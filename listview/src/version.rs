use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::promise::{Cancelable, Promise, Resolver};
use crate::{Error, Result};

/// Tracks whether structural state is stable enough for derived work.
///
/// The view is *locked* while an update (`begin_updating`) or a notification batch
/// (`begin_notifications`) is open. Every structural notification bumps [`Self::version`] and
/// cancels the speculative work registered through [`Self::cancel_on_notification`].
#[derive(Default)]
pub struct VersionManager {
    updating: usize,
    notifications: usize,
    version: u64,
    cancel_on_notification: Vec<Box<dyn Cancelable>>,
    unlocked: Vec<Resolver<()>>,
}

impl VersionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn locked(&self) -> bool {
        self.updating > 0 || self.notifications > 0
    }

    pub fn updating(&self) -> usize {
        self.updating
    }

    pub fn notifications(&self) -> usize {
        self.notifications
    }

    pub fn begin_updating(&mut self) {
        self.updating += 1;
    }

    pub fn end_updating(&mut self) {
        debug_assert!(self.updating > 0, "end_updating without begin_updating");
        if self.updating == 0 {
            vwarn!("VersionManager: unbalanced end_updating");
            return;
        }
        self.updating -= 1;
        self.check_unlocked();
    }

    pub fn begin_notifications(&mut self) {
        self.notifications += 1;
    }

    pub fn end_notifications(&mut self) {
        debug_assert!(
            self.notifications > 0,
            "end_notifications without begin_notifications"
        );
        if self.notifications == 0 {
            vwarn!("VersionManager: unbalanced end_notifications");
            return;
        }
        self.notifications -= 1;
        self.check_unlocked();
    }

    /// Records a structural notification.
    ///
    /// Increments the version and cancels everything registered through
    /// [`Self::cancel_on_notification`], then clears the registry.
    pub fn received_notification(&mut self) {
        self.version += 1;
        let registered = core::mem::take(&mut self.cancel_on_notification);
        let mut _canceled = 0usize;
        for work in registered {
            if work.cancel() {
                _canceled += 1;
            }
        }
        vtrace!(version = self.version, canceled = _canceled, "received_notification");
    }

    /// Registers speculative work to be canceled by the next notification.
    ///
    /// Already settled work is not retained.
    pub fn cancel_on_notification(&mut self, work: impl Cancelable + 'static) {
        if work.is_settled() {
            return;
        }
        self.cancel_on_notification
            .retain(|registered| !registered.is_settled());
        self.cancel_on_notification.push(Box::new(work));
    }

    pub fn pending_cancelations(&self) -> usize {
        self.cancel_on_notification
            .iter()
            .filter(|w| !w.is_settled())
            .count()
    }

    /// A promise that resolves once neither updates nor notifications are outstanding.
    pub fn unlocked(&mut self) -> Promise<()> {
        if !self.locked() {
            return Promise::resolved(());
        }
        let (promise, resolver) = Promise::new();
        self.unlocked.push(resolver);
        promise
    }

    /// Fails with [`Error::Stale`] when `captured` is no longer the current version.
    pub fn check(&self, captured: u64) -> Result<()> {
        if captured == self.version {
            Ok(())
        } else {
            Err(Error::Stale {
                captured,
                current: self.version,
            })
        }
    }

    fn check_unlocked(&mut self) {
        if self.locked() {
            return;
        }
        for waiter in self.unlocked.drain(..) {
            waiter.resolve(());
        }
    }
}

impl core::fmt::Debug for VersionManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VersionManager")
            .field("updating", &self.updating)
            .field("notifications", &self.notifications)
            .field("version", &self.version)
            .field("pending_cancelations", &self.pending_cancelations())
            .finish_non_exhaustive()
    }
}
