//! Single-threaded, poll-driven promises.
//!
//! The engine runs on one logical thread and is advanced by the host through
//! `ContentsView::pump`. Asynchronous results (rendered elements, measurements, animation
//! completion) are exchanged through [`Promise`] handles that the consumer polls on its next
//! turn, while the producer settles them through the paired [`Resolver`].

use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;
use core::task::Poll;

use crate::{Error, Result};

enum Slot<T> {
    Pending,
    Ready(T),
    Canceled,
}

/// The consumer side of a single-assignment asynchronous value.
///
/// Cloning a promise yields another handle to the same slot.
pub struct Promise<T> {
    slot: Rc<RefCell<Slot<T>>>,
}

/// The producer side of a [`Promise`].
pub struct Resolver<T> {
    slot: Rc<RefCell<Slot<T>>>,
}

impl<T> Promise<T> {
    /// Creates a pending promise together with its resolver.
    pub fn new() -> (Self, Resolver<T>) {
        let slot = Rc::new(RefCell::new(Slot::Pending));
        (
            Self {
                slot: Rc::clone(&slot),
            },
            Resolver { slot },
        )
    }

    pub fn resolved(value: T) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot::Ready(value))),
        }
    }

    pub fn canceled() -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot::Canceled)),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.slot.borrow(), Slot::Pending)
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.slot.borrow(), Slot::Ready(_))
    }

    pub fn is_canceled(&self) -> bool {
        matches!(*self.slot.borrow(), Slot::Canceled)
    }

    /// Cancels a pending promise. Settled promises are left untouched.
    ///
    /// Returns `true` if this call performed the cancellation.
    pub fn cancel(&self) -> bool {
        let mut slot = self.slot.borrow_mut();
        if matches!(*slot, Slot::Pending) {
            *slot = Slot::Canceled;
            return true;
        }
        false
    }

    /// Whether both handles observe the same slot.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

impl<T: Clone> Promise<T> {
    /// Polls the promise without consuming its value.
    pub fn poll(&self) -> Poll<Result<T>> {
        match &*self.slot.borrow() {
            Slot::Pending => Poll::Pending,
            Slot::Ready(v) => Poll::Ready(Ok(v.clone())),
            Slot::Canceled => Poll::Ready(Err(Error::Canceled)),
        }
    }

    /// Returns the value if the promise resolved.
    pub fn value(&self) -> Option<T> {
        match &*self.slot.borrow() {
            Slot::Ready(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.slot.borrow() {
            Slot::Pending => "Pending",
            Slot::Ready(_) => "Ready",
            Slot::Canceled => "Canceled",
        };
        f.debug_tuple("Promise").field(&state).finish()
    }
}

impl<T> Resolver<T> {
    /// Settles the promise with `value`.
    ///
    /// Returns `false` (and drops `value`) if the promise was already resolved or canceled.
    pub fn resolve(&self, value: T) -> bool {
        let mut slot = self.slot.borrow_mut();
        if matches!(*slot, Slot::Pending) {
            *slot = Slot::Ready(value);
            return true;
        }
        false
    }

    pub fn cancel(&self) -> bool {
        let mut slot = self.slot.borrow_mut();
        if matches!(*slot, Slot::Pending) {
            *slot = Slot::Canceled;
            return true;
        }
        false
    }

    pub fn is_canceled(&self) -> bool {
        matches!(*self.slot.borrow(), Slot::Canceled)
    }

    pub fn is_settled(&self) -> bool {
        !matches!(*self.slot.borrow(), Slot::Pending)
    }

    /// Returns a consumer handle for the same slot.
    pub fn promise(&self) -> Promise<T> {
        Promise {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// Anything that can be canceled by a structural notification.
pub trait Cancelable {
    fn cancel(&self) -> bool;
    fn is_settled(&self) -> bool;
}

impl<T> Cancelable for Promise<T> {
    fn cancel(&self) -> bool {
        Promise::cancel(self)
    }

    fn is_settled(&self) -> bool {
        !self.is_pending()
    }
}

impl<T> Cancelable for Resolver<T> {
    fn cancel(&self) -> bool {
        Resolver::cancel(self)
    }

    fn is_settled(&self) -> bool {
        Resolver::is_settled(self)
    }
}

/// Polls a set of unit promises: ready once all resolved, canceled as soon as one is.
pub fn join_all<'a>(promises: impl IntoIterator<Item = &'a Promise<()>>) -> Poll<Result<()>> {
    let mut pending = false;
    for p in promises {
        match p.poll() {
            Poll::Pending => pending = true,
            Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
            Poll::Ready(Ok(())) => {}
        }
    }
    if pending {
        Poll::Pending
    } else {
        Poll::Ready(Ok(()))
    }
}
