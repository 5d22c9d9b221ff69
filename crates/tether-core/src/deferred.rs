//! Single-fire asynchronous results
//!
//! A [`Deferred`] is the receiving half of a result that may not exist yet.
//! Its [`Resolver`] settles it exactly once, and exactly one completion
//! callback observes the outcome. Everything runs on the hub's event loop,
//! so callbacks fire synchronously at the moment of settlement (or at
//! registration, if the result was already settled).

use crate::DispatchError;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Outcome of a deferred computation
pub type Settled<T> = std::result::Result<T, DispatchError>;

type Callback<T> = Box<dyn FnOnce(Settled<T>)>;

enum Slot<T> {
    /// Not settled, maybe with a waiting callback
    Pending(Option<Callback<T>>),
    /// Settled, result not yet taken by a callback
    Settled(Settled<T>),
    /// Result delivered to its callback
    Consumed,
}

/// The receiving half of a single-fire result
pub struct Deferred<T> {
    slot: Rc<RefCell<Slot<T>>>,
}

/// The settling half of a single-fire result
///
/// Dropping an unsettled resolver rejects the deferred.
pub struct Resolver<T> {
    slot: Option<Rc<RefCell<Slot<T>>>>,
}

/// Create a linked resolver/deferred pair
pub fn deferred<T>() -> (Resolver<T>, Deferred<T>) {
    let slot = Rc::new(RefCell::new(Slot::Pending(None)));
    (
        Resolver {
            slot: Some(slot.clone()),
        },
        Deferred { slot },
    )
}

impl<T: 'static> Deferred<T> {
    /// An already-resolved result
    pub fn resolved(value: T) -> Self {
        Self::settled(Ok(value))
    }

    /// An already-rejected result
    pub fn rejected(error: impl Into<DispatchError>) -> Self {
        Self::settled(Err(error.into()))
    }

    fn settled(result: Settled<T>) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot::Settled(result))),
        }
    }

    /// Whether the result is available
    pub fn is_settled(&self) -> bool {
        matches!(*self.slot.borrow(), Slot::Settled(_))
    }

    /// Register the completion callback
    ///
    /// Fires immediately when the result is already settled, otherwise when
    /// the resolver settles it.
    pub fn on_settle(self, callback: impl FnOnce(Settled<T>) + 'static) {
        let ready = {
            let mut slot = self.slot.borrow_mut();
            match std::mem::replace(&mut *slot, Slot::Consumed) {
                Slot::Settled(result) => Some(result),
                Slot::Pending(_) => {
                    *slot = Slot::Pending(Some(Box::new(callback)));
                    return;
                }
                Slot::Consumed => None,
            }
        };
        if let Some(result) = ready {
            callback(result);
        }
    }

    /// Transform the resolved value
    pub fn map<U: 'static>(self, f: impl FnOnce(T) -> U + 'static) -> Deferred<U> {
        let (resolver, mapped) = deferred();
        self.on_settle(move |result| resolver.settle(result.map(f)));
        mapped
    }
}

impl<T> Resolver<T> {
    /// Settle with a value
    pub fn resolve(self, value: T) {
        self.settle(Ok(value));
    }

    /// Settle with an error
    pub fn reject(self, error: impl Into<DispatchError>) {
        self.settle(Err(error.into()));
    }

    /// Settle with a finished result
    pub fn settle(mut self, result: Settled<T>) {
        if let Some(slot) = self.slot.take() {
            fire(&slot, result);
        }
    }
}

fn fire<T>(slot: &RefCell<Slot<T>>, result: Settled<T>) {
    let callback = {
        let mut slot = slot.borrow_mut();
        match std::mem::replace(&mut *slot, Slot::Consumed) {
            Slot::Pending(Some(callback)) => Some(callback),
            Slot::Pending(None) => {
                *slot = Slot::Settled(result);
                return;
            }
            // A resolver settles at most once
            settled => {
                *slot = settled;
                return;
            }
        }
    };
    if let Some(callback) = callback {
        callback(result);
    }
}

impl<T> Drop for Resolver<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            fire(&slot, Err(DispatchError::new("dispatch abandoned")));
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match *self.slot.borrow() {
            Slot::Pending(_) => "pending",
            Slot::Settled(Ok(_)) => "resolved",
            Slot::Settled(Err(_)) => "rejected",
            Slot::Consumed => "consumed",
        };
        f.debug_struct("Deferred").field("state", &state).finish()
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("settled", &self.slot.is_none())
            .finish()
    }
}
